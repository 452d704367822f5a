//! Team statistics derived from finished matches.
//!
//! Standings are never patched: they are recomputed from the complete set of finished matches
//! every time. The result does not depend on the order in which matches are given.
use crate::groups::Groups;
use crate::Entrants;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::iter::{Enumerate, FusedIterator};
use std::slice;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The points awarded for the outcome of a match.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RankingConfig {
    pub win_points: i64,
    pub draw_points: i64,
    pub loss_points: i64,
    /// Add the own score of every match to the points.
    pub add_score_points: bool,
}

impl RankingConfig {
    /// The largest number of points a single outcome may award or deduct.
    pub const MAX_POINTS: i64 = 1_000_000;

    /// Returns `true` if no outcome awards or deducts more than [`Self::MAX_POINTS`].
    pub fn is_valid(&self) -> bool {
        [self.win_points, self.draw_points, self.loss_points]
            .iter()
            .all(|points| points.unsigned_abs() <= Self::MAX_POINTS as u64)
    }
}

impl Default for RankingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            win_points: 3,
            draw_points: 1,
            loss_points: 0,
            add_score_points: false,
        }
    }
}

/// The statistics of a single entrant.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct TeamStats {
    pub matches_played: u32,
    pub points: i64,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub goals_for: u64,
    pub goals_against: u64,
}

impl TeamStats {
    #[inline]
    pub fn goal_difference(&self) -> i64 {
        self.goals_for as i64 - self.goals_against as i64
    }

    /// Records a single match with the `own` and `opponent` score. Points are assigned by
    /// [`TeamStats::award_points`] once all matches are recorded.
    fn record(&mut self, own: u32, opponent: u32) {
        self.matches_played += 1;
        self.goals_for += u64::from(own);
        self.goals_against += u64::from(opponent);

        match own.cmp(&opponent) {
            Ordering::Greater => self.wins += 1,
            Ordering::Less => self.losses += 1,
            Ordering::Equal => self.draws += 1,
        }
    }

    /// Computes the points from the recorded outcomes. The sum is exact and clamped to the
    /// range of `i64` so that extreme configs cannot overflow.
    fn award_points(&mut self, config: &RankingConfig) {
        let mut points = i128::from(self.wins) * i128::from(config.win_points)
            + i128::from(self.draws) * i128::from(config.draw_points)
            + i128::from(self.losses) * i128::from(config.loss_points);

        if config.add_score_points {
            points += i128::from(self.goals_for);
        }

        self.points = points.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64;
    }
}

/// The result of a match as seen by the standings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome<T> {
    pub entrants: [Option<T>; 2],
    pub scores: [u32; 2],
    /// Only completed matches count towards the standings.
    pub completed: bool,
}

/// Computes the [`Standings`] of `entrants` from `matches`.
///
/// Incomplete matches and byes are ignored. A match referring to an entrant not contained in
/// `entrants` is logged and skipped.
pub fn compute_standings<'a, T, I>(
    entrants: &Entrants<T>,
    matches: I,
    config: &RankingConfig,
) -> Standings
where
    T: Eq + Hash + Debug + 'a,
    I: IntoIterator<Item = &'a Outcome<T>>,
{
    let seeds: HashMap<&T, usize> = entrants
        .iter()
        .map(|entrant| (&entrant.id, entrant.seed))
        .collect();

    let mut stats = vec![TeamStats::default(); entrants.len()];

    for outcome in matches {
        if !outcome.completed {
            continue;
        }

        let (first, second) = match &outcome.entrants {
            [Some(first), Some(second)] => (first, second),
            _ => continue,
        };

        let (first, second) = match (seeds.get(first), seeds.get(second)) {
            (Some(first), Some(second)) if first != second => (*first, *second),
            _ => {
                log::warn!(
                    "Skipping match between {:?} and {:?}: not a pair of entrants",
                    first,
                    second
                );
                continue;
            }
        };

        let [first_score, second_score] = outcome.scores;

        stats[first].record(first_score, second_score);
        stats[second].record(second_score, first_score);
    }

    for stats in &mut stats {
        stats.award_points(config);
    }

    Standings { stats }
}

/// The [`TeamStats`] of every entrant, indexed by seed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Standings {
    stats: Vec<TeamStats>,
}

impl Standings {
    /// Returns the stats of the entrant with the given `seed`.
    #[inline]
    pub fn get(&self, seed: usize) -> Option<&TeamStats> {
        self.stats.get(seed)
    }

    /// Returns an iterator over all seeds and their stats in seed order.
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.stats.iter().enumerate(),
        }
    }

    /// Returns the entries ranked within their group. Without `groups` all entrants are placed
    /// in group 0.
    ///
    /// Entries are ordered by points, goal difference and goals scored. Remaining ties are broken
    /// by the seed.
    pub fn ranked(&self, groups: Option<&Groups>) -> Vec<Ranked> {
        let count = groups.map(Groups::count).unwrap_or(1).max(1);

        let mut entries: Vec<Ranked> = self
            .iter()
            .map(|(seed, stats)| Ranked {
                seed,
                group: match groups {
                    Some(_) => Groups::group_of(seed, count),
                    None => 0,
                },
                rank: 0,
                stats: *stats,
            })
            .collect();

        entries.sort_by(|a, b| {
            a.group
                .cmp(&b.group)
                .then_with(|| b.stats.points.cmp(&a.stats.points))
                .then_with(|| b.stats.goal_difference().cmp(&a.stats.goal_difference()))
                .then_with(|| b.stats.goals_for.cmp(&a.stats.goals_for))
                .then_with(|| a.seed.cmp(&b.seed))
        });

        let mut group = None;
        let mut rank = 0;
        for entry in entries.iter_mut() {
            if group != Some(entry.group) {
                group = Some(entry.group);
                rank = 0;
            }

            rank += 1;
            entry.rank = rank;
        }

        entries
    }
}

/// A single ranked entry of the [`Standings`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ranked {
    pub seed: usize,
    pub group: usize,
    /// The 1-based rank within the group.
    pub rank: usize,
    pub stats: TeamStats,
}

#[derive(Clone, Debug)]
pub struct Iter<'a> {
    inner: Enumerate<slice::Iter<'a, TeamStats>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (usize, &'a TeamStats);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> ExactSizeIterator for Iter<'a> {}

impl<'a> FusedIterator for Iter<'a> {}

#[cfg(test)]
mod tests {
    use crate::groups::Groups;
    use crate::round_robin::RoundRobin;
    use crate::Entrants;

    use super::{compute_standings, Outcome, RankingConfig, TeamStats};

    fn outcome(first: &'static str, second: &'static str, scores: [u32; 2]) -> Outcome<&'static str> {
        Outcome {
            entrants: [Some(first), Some(second)],
            scores,
            completed: true,
        }
    }

    #[test]
    fn test_ranking_config_valid() {
        assert!(RankingConfig::default().is_valid());

        let config = RankingConfig {
            win_points: RankingConfig::MAX_POINTS,
            draw_points: 0,
            loss_points: -RankingConfig::MAX_POINTS,
            add_score_points: true,
        };
        assert!(config.is_valid());

        assert!(!RankingConfig {
            win_points: i64::MAX,
            ..Default::default()
        }
        .is_valid());
        assert!(!RankingConfig {
            loss_points: i64::MIN,
            ..Default::default()
        }
        .is_valid());
    }

    #[test]
    fn test_compute_standings_extreme_points() {
        let entrants = Entrants::build(["a", "b", "c"]).unwrap();
        let matches = [
            outcome("a", "b", [1, 0]),
            outcome("a", "c", [1, 0]),
            outcome("b", "c", [0, 1]),
        ];

        let config = RankingConfig {
            win_points: i64::MAX,
            draw_points: 0,
            loss_points: i64::MIN,
            add_score_points: true,
        };
        let standings = compute_standings(&entrants, &matches, &config);

        assert_eq!(standings.get(0).unwrap().points, i64::MAX);
        assert_eq!(standings.get(0).unwrap().wins, 2);
        assert_eq!(standings.get(1).unwrap().points, i64::MIN);
        // One win and one loss cancel out, leaving the single scored goal.
        assert_eq!(standings.get(2).unwrap().points, 0);

        // The result does not depend on the order of the matches.
        let reversed: Vec<_> = matches.iter().rev().cloned().collect();
        assert_eq!(compute_standings(&entrants, &reversed, &config), standings);
    }

    #[test]
    fn test_compute_standings() {
        let entrants = Entrants::build(["a", "b", "c", "d"]).unwrap();
        let matches = [
            outcome("a", "d", [2, 1]),
            outcome("b", "c", [1, 1]),
            outcome("a", "c", [3, 0]),
            outcome("d", "b", [0, 2]),
            outcome("a", "b", [0, 0]),
            outcome("c", "d", [1, 4]),
        ];

        let config = RankingConfig::default();
        let standings = compute_standings(&entrants, &matches, &config);

        assert_eq!(
            standings.get(0),
            Some(&TeamStats {
                matches_played: 3,
                points: 7,
                wins: 2,
                losses: 0,
                draws: 1,
                goals_for: 5,
                goals_against: 1,
            })
        );
        assert_eq!(standings.get(1).unwrap().points, 5);
        assert_eq!(standings.get(2).unwrap().points, 1);
        assert_eq!(standings.get(3).unwrap().points, 3);

        // 4 decisive matches and 2 draws.
        let total: i64 = standings.iter().map(|(_, stats)| stats.points).sum();
        assert_eq!(total, 3 * 4 + 2 * 2);

        let ranked = standings.ranked(None);
        let order: Vec<usize> = ranked.iter().map(|entry| entry.seed).collect();
        assert_eq!(order, [0, 1, 3, 2]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[3].rank, 4);
    }

    #[test]
    fn test_compute_standings_order_independent() {
        let entrants = Entrants::build(["a", "b", "c", "d"]).unwrap();
        let mut matches = vec![
            outcome("a", "d", [2, 1]),
            outcome("b", "c", [1, 1]),
            outcome("a", "c", [3, 0]),
            outcome("d", "b", [0, 2]),
            outcome("a", "b", [0, 0]),
            outcome("c", "d", [1, 4]),
        ];

        let config = RankingConfig {
            win_points: 2,
            draw_points: 1,
            loss_points: -1,
            add_score_points: true,
        };
        let expected = compute_standings(&entrants, &matches, &config);

        for shift in 1..matches.len() {
            matches.rotate_left(shift);
            assert_eq!(compute_standings(&entrants, &matches, &config), expected);

            matches.reverse();
            assert_eq!(compute_standings(&entrants, &matches, &config), expected);
        }
    }

    #[test]
    fn test_compute_standings_add_score_points() {
        let entrants = Entrants::build(["a", "b"]).unwrap();
        let matches = [outcome("a", "b", [4, 2])];

        let config = RankingConfig {
            add_score_points: true,
            ..Default::default()
        };
        let standings = compute_standings(&entrants, &matches, &config);

        assert_eq!(standings.get(0).unwrap().points, 3 + 4);
        assert_eq!(standings.get(1).unwrap().points, 2);
        assert_eq!(standings.get(1).unwrap().goal_difference(), -2);
    }

    #[test]
    fn test_compute_standings_ignored() {
        let entrants = Entrants::build(["a", "b"]).unwrap();
        let matches = [
            // Bye
            Outcome {
                entrants: [Some("a"), None],
                scores: [0, 0],
                completed: true,
            },
            // Still running
            Outcome {
                entrants: [Some("a"), Some("b")],
                scores: [5, 0],
                completed: false,
            },
            // Unknown entrant
            outcome("a", "z", [1, 0]),
            // Same entrant twice
            outcome("b", "b", [1, 0]),
        ];

        let standings = compute_standings(&entrants, &matches, &RankingConfig::default());

        assert!(standings
            .iter()
            .all(|(_, stats)| *stats == TeamStats::default()));
    }

    #[test]
    fn test_ranked_groups() {
        let entrants = Entrants::build(0..6).unwrap();
        let groups = Groups::new(6, 2).unwrap();

        // Every entrant in a group beats all entrants with a higher seed.
        let mut matches = Vec::new();
        for round in groups.rounds() {
            for pairing in round.iter().filter(|p| !p.is_bye()) {
                let [a, b] = pairing.entrants.map(Option::unwrap);
                let scores = if a < b { [1, 0] } else { [0, 1] };
                matches.push(Outcome {
                    entrants: [Some(a), Some(b)],
                    scores,
                    completed: true,
                });
            }
        }
        assert_eq!(matches.len(), 6);

        let ranked = compute_standings(&entrants, &matches, &RankingConfig::default())
            .ranked(Some(&groups));

        let table: Vec<(usize, usize, usize)> = ranked
            .iter()
            .map(|entry| (entry.group, entry.rank, entry.seed))
            .collect();

        // Group 0 is [0, 3, 4], group 1 is [1, 2, 5].
        assert_eq!(
            table,
            [
                (0, 1, 0),
                (0, 2, 3),
                (0, 3, 4),
                (1, 1, 1),
                (1, 2, 2),
                (1, 3, 5),
            ]
        );
    }

    #[test]
    fn test_league_points_sum() {
        let entrants = Entrants::build(0..5).unwrap();
        let mut matches = Vec::new();
        let mut decisive = 0;
        let mut drawn = 0;

        for (index, pairing) in RoundRobin::new(5)
            .rounds()
            .iter()
            .flatten()
            .filter(|p| !p.is_bye())
            .enumerate()
        {
            let scores = match index % 3 {
                0 => [2, 1],
                1 => [1, 1],
                _ => [3, 0],
            };

            if scores[0] == scores[1] {
                drawn += 1;
            } else {
                decisive += 1;
            }

            matches.push(Outcome {
                entrants: pairing.entrants,
                scores,
                completed: true,
            });
        }

        let standings = compute_standings(&entrants, &matches, &RankingConfig::default());
        let total: i64 = standings.iter().map(|(_, stats)| stats.points).sum();

        assert_eq!(decisive + drawn, 10);
        assert_eq!(total, 3 * decisive + 2 * drawn);
    }
}
