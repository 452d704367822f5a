use serde::{Deserialize, Serialize};
use tourney_core::standings::TeamStats;

use crate::id::TeamId;

/// A single row of the standings table of a stage item.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingsEntry {
    pub team_id: TeamId,
    /// The 0-based group of the team. Always 0 outside of group stages.
    pub group: u32,
    /// The 1-based rank of the team within its group.
    pub rank: u32,
    #[serde(flatten)]
    pub stats: TeamStats,
    pub goal_difference: i64,
}
