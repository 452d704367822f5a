//! Splitting entrants into groups which each play their own round robin.
use crate::round_robin::RoundRobin;
use crate::{Error, Pairing, Result, RoundPlan};

use std::ops::Index;
use std::slice::Iter;

/// Returns the number of groups required to place `entrants` entrants into groups of at most
/// `group_size` entrants. Always returns at least 1.
///
/// The result never exceeds `entrants / 2` so that every group has at least two entrants, even
/// if that means some groups grow past `group_size`.
pub fn default_group_count(entrants: usize, group_size: usize) -> usize {
    let group_size = group_size.max(2);

    ((entrants + group_size - 1) / group_size)
        .min(entrants / 2)
        .max(1)
}

/// The seeds of a stage item distributed into groups.
///
/// Seeds are dealt in a serpentine order: the first row of seeds goes into groups `0..n`, the
/// second row into groups `n..0` and so on. This keeps the strength of the groups balanced and
/// the group sizes differ by at most one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Groups {
    groups: Vec<Vec<usize>>,
}

impl Groups {
    /// Distributes `entrants` seeds into `count` groups.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGroupCount`] if `count` is zero or a group would end up with less
    /// than two entrants.
    pub fn new(entrants: usize, count: usize) -> Result<Self> {
        if count == 0 || entrants < count * 2 {
            return Err(Error::InvalidGroupCount {
                groups: count,
                entrants,
            });
        }

        let capacity = (entrants + count - 1) / count;
        let mut groups = vec![Vec::with_capacity(capacity); count];

        for seed in 0..entrants {
            groups[Self::group_of(seed, count)].push(seed);
        }

        log::debug!("Distributed {} entrants into {} groups", entrants, count);

        Ok(Self { groups })
    }

    /// Returns the group the entrant at `seed` is placed in when there are `count` groups.
    #[inline]
    pub fn group_of(seed: usize, count: usize) -> usize {
        let row = seed / count;
        let column = seed % count;

        if row % 2 == 0 {
            column
        } else {
            count - column - 1
        }
    }

    /// Returns the number of groups.
    #[inline]
    pub fn count(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn iter(&self) -> Iter<'_, Vec<usize>> {
        self.groups.iter()
    }

    /// Returns the rounds of all groups. Round `r` of every group is merged into the global
    /// round `r`, so all groups play concurrently.
    pub fn rounds(&self) -> Vec<RoundPlan> {
        let mut rounds: Vec<RoundPlan> = Vec::new();

        for group in &self.groups {
            let schedule = RoundRobin::new(group.len());

            for (index, plan) in schedule.rounds().iter().enumerate() {
                if rounds.len() <= index {
                    rounds.push(Vec::new());
                }

                // Translate the group local seeds into stage item seeds.
                rounds[index].extend(plan.iter().map(|pairing| Pairing {
                    entrants: pairing.entrants.map(|seed| seed.map(|seed| group[seed])),
                }));
            }
        }

        rounds
    }
}

impl Index<usize> for Groups {
    type Output = [usize];

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.groups[index]
    }
}
