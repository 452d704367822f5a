use serde::{Deserialize, Serialize};
use tourney_core::StageKind;

use crate::id::{StageId, StageItemId, TeamId, TournamentId};

/// A schedulable unit within a stage, i.e. a single group or bracket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageItem {
    pub id: StageItemId,
    pub stage_id: StageId,
    pub tournament_id: TournamentId,
    #[serde(rename = "type")]
    pub kind: StageKind,
    /// The ordered teams of the stage item. The position of a team is its seed.
    pub inputs: Vec<TeamId>,
    /// The number of groups, only set for group stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_count: Option<u32>,
}

/// The request body to create a new [`StageItem`] in a stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStageItem {
    pub tournament_id: TournamentId,
    #[serde(rename = "type")]
    pub kind: StageKind,
    pub inputs: Vec<TeamId>,
    /// Overrides the number of groups for group stages.
    #[serde(default)]
    pub group_count: Option<u32>,
}

/// A [`StageItem`] with the number of rounds created for it so far.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageItemOverview {
    #[serde(flatten)]
    pub item: StageItem,
    pub rounds_count: u32,
}
