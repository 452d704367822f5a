pub mod id;

mod memory;
mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

use std::fmt::Debug;

use futures::future::BoxFuture;
use thiserror::Error;
use tourney_api::id::{MatchId, RoundId, StageId, StageItemId, TeamId, TournamentId};
use tourney_api::matches::Match;
use tourney_api::rounds::{Round, RoundWithMatches};
use tourney_api::stages::StageItem;
use tourney_api::{RankingConfig, TeamStats};

pub type Result<T> = std::result::Result<T, Error>;

/// The storage backend of the engine.
///
/// Rounds are always returned ordered by their number, matches by their position.
pub trait Persistence: Debug + Send + Sync + 'static {
    fn load_stage_item(&self, id: StageItemId) -> BoxFuture<'_, Result<Option<StageItem>>>;

    /// Returns all stage items of a stage ordered by id.
    fn list_stage_items(&self, stage_id: StageId) -> BoxFuture<'_, Result<Vec<StageItem>>>;

    fn insert_stage_item(&self, item: StageItem) -> BoxFuture<'_, Result<()>>;

    /// Returns the ordered team ids of a stage item, or `None` if the stage item doesn't exist.
    fn load_entrants_for_stage_item(
        &self,
        id: StageItemId,
    ) -> BoxFuture<'_, Result<Option<Vec<TeamId>>>>;

    fn load_rounds_for_stage_item(&self, id: StageItemId) -> BoxFuture<'_, Result<Vec<Round>>>;

    fn load_matches_for_round(&self, id: RoundId) -> BoxFuture<'_, Result<Vec<Match>>>;

    fn load_match(&self, id: MatchId) -> BoxFuture<'_, Result<Option<Match>>>;

    /// Writes a [`Batch`] atomically. Either all changes of the batch become visible or none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the stage item doesn't have exactly
    /// [`Batch::expected_rounds`] rounds when the batch is applied.
    fn save_rounds_and_matches(&self, batch: Batch) -> BoxFuture<'_, Result<()>>;

    fn update_match(&self, m: Match) -> BoxFuture<'_, Result<()>>;

    /// Replaces all stats of a stage item.
    fn save_team_stats(
        &self,
        id: StageItemId,
        stats: Vec<(TeamId, TeamStats)>,
    ) -> BoxFuture<'_, Result<()>>;

    fn load_team_stats(&self, id: StageItemId) -> BoxFuture<'_, Result<Vec<(TeamId, TeamStats)>>>;

    fn load_ranking(&self, id: TournamentId) -> BoxFuture<'_, Result<Option<RankingConfig>>>;

    fn save_ranking(&self, id: TournamentId, config: RankingConfig) -> BoxFuture<'_, Result<()>>;
}

/// A set of round and match changes of a single stage item that is written as one unit.
#[derive(Clone, Debug)]
pub struct Batch {
    pub stage_item_id: StageItemId,
    /// The number of rounds the stage item had when the batch was created.
    pub expected_rounds: usize,
    /// Delete all existing rounds and matches of the stage item before inserting `rounds`.
    pub replace: bool,
    pub rounds: Vec<RoundWithMatches>,
    /// Existing matches updated together with the new rounds.
    pub updated: Vec<Match>,
}

impl Batch {
    pub fn new(stage_item_id: StageItemId, expected_rounds: usize) -> Self {
        Self {
            stage_item_id,
            expected_rounds,
            replace: false,
            rounds: Vec::new(),
            updated: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(sqlx::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("conflicting concurrent write")]
    Conflict,
    #[error("invalid stored value in column {column}: {value}")]
    InvalidValue { column: &'static str, value: String },
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        // Serialization failures and deadlocks are reported as SQLSTATE 40001.
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some("40001") {
                return Self::Conflict;
            }
        }

        Self::Sqlx(err)
    }
}
