use crate::{Pairing, RoundPlan};

/// A full round robin schedule created using the circle method.
///
/// With an odd number of entrants a synthetic entrant is added. Every pairing with the synthetic
/// entrant becomes a bye for its opponent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundRobin {
    rounds: Vec<RoundPlan>,
}

impl RoundRobin {
    pub fn new(entrants: usize) -> Self {
        log::debug!("Creating new RoundRobin schedule with {} entrants", entrants);

        // entrants if even, entrants + 1 if odd.
        let entrants_even = entrants + entrants % 2;
        let num_rounds = Self::num_rounds(entrants);
        let matches_per_round = entrants_even / 2;

        let mut rounds = Vec::with_capacity(num_rounds);

        // Start by creating two rows: 0..n/2 and n/2..n, facing each other.
        // Pin entrant 0 to the first position for every round and rotate the remaining
        // positions once per round.
        for round in 0..num_rounds {
            let mut plan = Vec::with_capacity(matches_per_round);

            for index in 0..matches_per_round {
                let first = Self::circle_entrant(entrants_even, round, index);
                let second = Self::circle_entrant(entrants_even, round, entrants_even - index - 1);

                let pairing = if first >= entrants {
                    Pairing::bye(second)
                } else if second >= entrants {
                    Pairing::bye(first)
                } else {
                    Pairing::new(first, second)
                };

                plan.push(pairing);
            }

            rounds.push(plan);
        }

        Self { rounds }
    }

    /// Returns the number of rounds required for a round robin with `entrants` entrants.
    #[inline]
    pub fn num_rounds(entrants: usize) -> usize {
        match entrants {
            0 => 0,
            n => n + n % 2 - 1,
        }
    }

    #[inline]
    pub fn rounds(&self) -> &[RoundPlan] {
        &self.rounds
    }

    #[inline]
    pub fn into_rounds(self) -> Vec<RoundPlan> {
        self.rounds
    }

    /// Returns the index of entrant of the at the given `index` in a circle of length `n` at
    /// the given `round`.
    #[inline]
    fn circle_entrant(n: usize, round: usize, index: usize) -> usize {
        debug_assert!(n % 2 == 0);

        if index == 0 {
            return 0;
        }

        match index as isize - round as isize {
            res if res <= 0 => n - res.unsigned_abs() - 1,
            res => res as usize,
        }
    }
}
