use serde::{Deserialize, Serialize};

use crate::id::{RoundId, StageItemId};
use crate::matches::Match;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: RoundId,
    pub stage_item_id: StageItemId,
    /// The 1-based number of the round within its stage item.
    pub number: u32,
}

/// A [`Round`] together with all its matches in slot order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundWithMatches {
    #[serde(flatten)]
    pub round: Round,
    pub matches: Vec<Match>,
}

/// The response of a schedule generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedRounds {
    pub rounds: Vec<RoundWithMatches>,
}
