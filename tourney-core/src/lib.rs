//! # tourney-core
//!
//! This crate contains the scheduling and ranking engine for tournament stages. It knows nothing
//! about storage or the network: every function here is a pure transform over seeds.
//!
//! Important types:
//! - [`Entrants`]: The ordered, duplicate-free list of [`Entrant`]s of a stage item. The position
//! of an entrant in the input is its seed.
//! - [`Pairing`]: One scheduled contest between two seeds, or a bye for a single seed.
//! - [`RoundPlan`]: The ordered pairings of a single round.
//! - [`StageKind`]: The type of a stage: league, group or knockout.
//! - [`standings::Standings`]: Team statistics derived from finished matches.
//!
//! The entry point for fixture generation is [`generate`].
//!
//! ## Feature Flags
//!
//! `serde`: Adds `Serialize` and `Deserialize` impls to the public data types.
//!
pub mod groups;
pub mod knockout;
pub mod round_robin;
pub mod standings;

mod utils;

use groups::Groups;
use round_robin::RoundRobin;

use thiserror::Error;

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::hash::Hash;
use std::ops::Deref;
use std::result;
use std::str::FromStr;
use std::vec::IntoIter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The group size used when no explicit group count is requested.
pub const DEFAULT_GROUP_SIZE: usize = 4;

/// A single competing unit within a stage item.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Entrant<T> {
    pub id: T,
    /// The 0-based position of the entrant in the input order.
    pub seed: usize,
}

/// The ordered list of [`Entrant`]s of a stage item.
///
/// The list is never reordered: the seed of every entrant is its index.
#[derive(Clone, Debug, Default)]
#[repr(transparent)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Entrants<T> {
    entrants: Vec<Entrant<T>>,
}

impl<T> Entrants<T>
where
    T: Eq + Hash,
{
    /// Builds the `Entrants` from the ordered list of `inputs`, assigning every input the seed
    /// of its position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] if `inputs` is empty and [`Error::DuplicateEntrant`] if an id is
    /// given more than once.
    pub fn build<I>(inputs: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        let ids: Vec<T> = inputs.into_iter().collect();

        if ids.is_empty() {
            return Err(Error::Empty);
        }

        let mut seen = HashSet::with_capacity(ids.len());
        for (seed, id) in ids.iter().enumerate() {
            if !seen.insert(id) {
                return Err(Error::DuplicateEntrant { seed });
            }
        }

        let entrants = ids
            .into_iter()
            .enumerate()
            .map(|(seed, id)| Entrant { id, seed })
            .collect();

        Ok(Self { entrants })
    }

    /// Returns the seed of the entrant with the given `id`.
    pub fn seed_of(&self, id: &T) -> Option<usize> {
        self.entrants.iter().position(|entrant| entrant.id == *id)
    }
}

impl<T> Entrants<T> {
    /// Returns the id of the entrant with the given `seed`.
    #[inline]
    pub fn id(&self, seed: usize) -> Option<&T> {
        self.entrants.get(seed).map(|entrant| &entrant.id)
    }
}

impl<T> Deref for Entrants<T> {
    type Target = [Entrant<T>];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.entrants
    }
}

impl<T> IntoIterator for Entrants<T> {
    type Item = Entrant<T>;
    type IntoIter = IntoIter<Entrant<T>>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.entrants.into_iter()
    }
}

impl<T, U> PartialEq<U> for Entrants<T>
where
    T: PartialEq,
    U: AsRef<[T]>,
{
    fn eq(&self, other: &U) -> bool {
        let other = other.as_ref();

        self.entrants.len() == other.len()
            && self
                .entrants
                .iter()
                .zip(other)
                .all(|(entrant, id)| entrant.id == *id)
    }
}

/// A scheduled contest between the entrants at two seeds.
///
/// A bye is a `Pairing` with only the first spot set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pairing {
    pub entrants: [Option<usize>; 2],
}

impl Pairing {
    #[inline]
    pub const fn new(first: usize, second: usize) -> Self {
        Self {
            entrants: [Some(first), Some(second)],
        }
    }

    /// Creates a bye for the entrant at `seed`.
    #[inline]
    pub const fn bye(seed: usize) -> Self {
        Self {
            entrants: [Some(seed), None],
        }
    }

    #[inline]
    pub fn is_bye(&self) -> bool {
        self.entrants[0].is_none() || self.entrants[1].is_none()
    }

    /// Returns the single entrant of a bye. Returns `None` for contested pairings.
    pub fn lone(&self) -> Option<usize> {
        match self.entrants {
            [Some(seed), None] | [None, Some(seed)] => Some(seed),
            _ => None,
        }
    }

    #[inline]
    pub fn contains(&self, seed: usize) -> bool {
        self.entrants.contains(&Some(seed))
    }
}

/// The ordered pairings of a single round.
pub type RoundPlan = Vec<Pairing>;

/// The type of a stage. Every stage item inherits the type of its stage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum StageKind {
    /// Every entrant plays every other entrant once.
    League,
    /// Entrants are split into groups, each group plays a league.
    Group,
    /// Single elimination.
    Knockout,
}

impl StageKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::League => "league",
            Self::Group => "group",
            Self::Knockout => "knockout",
        }
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            Self::League => 0,
            Self::Group => 1,
            Self::Knockout => 2,
        }
    }

    pub const fn from_u8(n: u8) -> Option<Self> {
        match n {
            0 => Some(Self::League),
            1 => Some(Self::Group),
            2 => Some(Self::Knockout),
            _ => None,
        }
    }

    /// Returns `true` if the whole schedule is generated at once.
    #[inline]
    pub const fn is_eager(&self) -> bool {
        !matches!(self, Self::Knockout)
    }
}

impl Display for StageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageKind {
    type Err = Error;

    fn from_str(s: &str) -> result::Result<Self, Self::Err> {
        match s {
            "league" => Ok(Self::League),
            "group" => Ok(Self::Group),
            "knockout" => Ok(Self::Knockout),
            _ => Err(Error::UnknownStageKind(s.to_owned())),
        }
    }
}

/// Options for [`generate`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ScheduleOptions {
    /// Allow generating a schedule for a stage item which already has rounds.
    pub regenerate: bool,
    /// The number of groups for [`StageKind::Group`]. Defaults to groups of
    /// [`DEFAULT_GROUP_SIZE`] entrants.
    pub groups: Option<usize>,
}

/// Generates the rounds of a stage item.
///
/// League and group stages are generated completely. Knockout stages only return the first
/// round, the following rounds are created using [`knockout::next_round`] once the winners of
/// the previous round are known.
///
/// # Errors
///
/// Returns [`Error::AlreadyScheduled`] if `existing_rounds` is not zero and
/// [`ScheduleOptions::regenerate`] is not set, [`Error::TooFewEntrants`] if less than two
/// entrants are given and [`Error::InvalidGroupCount`] if the entrants cannot be split into the
/// requested number of groups.
pub fn generate<T>(
    entrants: &Entrants<T>,
    kind: StageKind,
    existing_rounds: usize,
    options: &ScheduleOptions,
) -> Result<Vec<RoundPlan>> {
    if existing_rounds > 0 && !options.regenerate {
        return Err(Error::AlreadyScheduled {
            rounds: existing_rounds,
        });
    }

    let num_entrants = entrants.len();
    if num_entrants < 2 {
        return Err(Error::TooFewEntrants {
            found: num_entrants,
            required: 2,
        });
    }

    log::debug!(
        "Generating {} schedule for {} entrants",
        kind,
        num_entrants
    );

    let rounds = match kind {
        StageKind::League => RoundRobin::new(num_entrants).into_rounds(),
        StageKind::Group => {
            let count = options
                .groups
                .unwrap_or_else(|| groups::default_group_count(num_entrants, DEFAULT_GROUP_SIZE));

            Groups::new(num_entrants, count)?.rounds()
        }
        StageKind::Knockout => vec![knockout::first_round(num_entrants)],
    };

    log::debug!("Generated {} rounds", rounds.len());

    Ok(rounds)
}

/// Returns the total number of rounds a complete schedule of `kind` with `entrants` entrants
/// has. `groups` is only used for [`StageKind::Group`].
pub fn total_rounds(kind: StageKind, entrants: usize, groups: usize) -> usize {
    match kind {
        StageKind::League => RoundRobin::num_rounds(entrants),
        StageKind::Group => match Groups::new(entrants, groups) {
            Ok(groups) => groups
                .iter()
                .map(|group| RoundRobin::num_rounds(group.len()))
                .max()
                .unwrap_or(0),
            Err(_) => 0,
        },
        StageKind::Knockout => knockout::total_rounds(entrants),
    }
}

/// An `Result<T>` using [`enum@Error`] as an error type.
pub type Result<T> = result::Result<T, Error>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("no entrants given")]
    Empty,
    #[error("entrant at seed {seed} is given more than once")]
    DuplicateEntrant { seed: usize },
    #[error("too few entrants: found {found}, at least {required} are required")]
    TooFewEntrants { found: usize, required: usize },
    #[error("cannot split {entrants} entrants into {groups} groups of at least 2")]
    InvalidGroupCount { groups: usize, entrants: usize },
    #[error("unknown stage type: {0}")]
    UnknownStageKind(String),
    #[error("stage item is already scheduled with {rounds} rounds")]
    AlreadyScheduled { rounds: usize },
}

impl Error {
    /// Returns `true` if the error was caused by malformed input rather than by the state of the
    /// stage item.
    #[inline]
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, Self::AlreadyScheduled { .. })
    }
}
