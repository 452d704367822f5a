//! # tourney-api
//!
//! The JSON types exchanged between the tourney fixture engine and its clients. All fields are
//! serialized in camelCase.
pub mod error;
pub mod id;
pub mod matches;
pub mod rounds;
pub mod stages;
pub mod standings;

pub use tourney_core::standings::{RankingConfig, TeamStats};
pub use tourney_core::StageKind;
