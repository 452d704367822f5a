use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{MatchId, RoundId, StageItemId, TeamId};

/// A single match of a round.
///
/// A match with only one participant is a bye. Byes are created completed and always have the
/// lone participant in `participant1`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    pub round_id: RoundId,
    pub stage_item_id: StageItemId,
    /// The 0-based slot of the match within its round.
    pub position: u32,
    pub participant1: Option<TeamId>,
    pub participant2: Option<TeamId>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub winner_id: Option<TeamId>,
    #[serde(default)]
    pub score: Score,
}

impl Match {
    #[inline]
    pub fn participants(&self) -> [Option<TeamId>; 2] {
        [self.participant1, self.participant2]
    }

    #[inline]
    pub fn is_bye(&self) -> bool {
        self.participant1.is_none() || self.participant2.is_none()
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn state(&self) -> MatchState {
        match (self.start_time, self.end_time) {
            (_, Some(_)) => MatchState::Completed,
            (Some(_), None) => MatchState::InProgress,
            (None, None) => MatchState::Scheduled,
        }
    }
}

/// The lifecycle state of a [`Match`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchState {
    Scheduled,
    InProgress,
    Completed,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub team1_score: u32,
    pub team2_score: u32,
}

impl Score {
    #[inline]
    pub const fn new(team1_score: u32, team2_score: u32) -> Self {
        Self {
            team1_score,
            team2_score,
        }
    }
}

/// A score as sent by a client. Values are signed so that negative scores reach the server and
/// can be rejected with a proper error.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub team1: i64,
    pub team2: i64,
}

/// The request body of the score update and end match endpoints.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBody {
    pub score: ScoreUpdate,
}
