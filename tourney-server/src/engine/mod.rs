//! The fixture engine: schedule generation, result recording and standings.
//!
//! Every mutating operation holds the lock of the affected stage item until all of its writes
//! are done.
mod lock;
mod recorder;
mod schedule;
mod standings;

use lock::StageLocks;
pub use schedule::materialize;

use std::time::Duration;

use thiserror::Error;
use tourney_api::id::{MatchId, StageItemId};
use tourney_api::matches::Match;
use tourney_api::rounds::RoundWithMatches;
use tourney_api::stages::StageItem;

use crate::config::EngineConfig;
use crate::store::{self, Persistence};

#[derive(Debug)]
pub struct Engine {
    store: Box<dyn Persistence>,
    locks: StageLocks,
    group_size: usize,
}

impl Engine {
    pub fn new<S>(store: S, config: &EngineConfig) -> Self
    where
        S: Persistence,
    {
        Self {
            store: Box::new(store),
            locks: StageLocks::new(Duration::from_millis(config.lock_timeout_ms)),
            group_size: config.group_size,
        }
    }

    #[inline]
    pub fn store(&self) -> &dyn Persistence {
        &*self.store
    }

    pub async fn stage_item(&self, id: StageItemId) -> Result<StageItem> {
        match self.store.load_stage_item(id).await? {
            Some(item) => Ok(item),
            None => Err(Error::NotFound {
                kind: "stage item",
                id: id.0,
            }),
        }
    }

    pub async fn get_match(&self, id: MatchId) -> Result<Match> {
        match self.store.load_match(id).await? {
            Some(m) => Ok(m),
            None => Err(Error::NotFound {
                kind: "match",
                id: id.0,
            }),
        }
    }

    /// Returns all rounds of a stage item with their matches.
    pub async fn stage_item_rounds(&self, id: StageItemId) -> Result<Vec<RoundWithMatches>> {
        let rounds = self.store.load_rounds_for_stage_item(id).await?;

        let mut output = Vec::with_capacity(rounds.len());
        for round in rounds {
            let matches = self.store.load_matches_for_round(round.id).await?;

            output.push(RoundWithMatches { round, matches });
        }

        Ok(output)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("stage item is already scheduled: {0}")]
    AlreadyScheduled(String),
    #[error("match {0} is already completed")]
    MatchCompleted(MatchId),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },
    #[error("the stage item is being modified concurrently, try again")]
    ConcurrencyConflict,
    #[error(transparent)]
    Store(store::Error),
}

impl Error {
    /// Returns the machine readable identifier of the error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::AlreadyScheduled(_) => "already_scheduled",
            Self::MatchCompleted(_) => "match_completed",
            Self::NotFound { .. } => "not_found",
            Self::ConcurrencyConflict => "concurrency_conflict",
            Self::Store(_) => "internal",
        }
    }
}

impl From<store::Error> for Error {
    fn from(err: store::Error) -> Self {
        match err {
            store::Error::Conflict => Self::ConcurrencyConflict,
            err => Self::Store(err),
        }
    }
}

impl From<tourney_core::Error> for Error {
    fn from(err: tourney_core::Error) -> Self {
        if err.is_invalid_input() {
            Self::InvalidInput(err.to_string())
        } else {
            Self::AlreadyScheduled(err.to_string())
        }
    }
}
