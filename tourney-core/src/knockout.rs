//! Single elimination brackets.
//!
//! Only the first round of a bracket is known upfront. Every following round is created from the
//! winners of the previous round using [`next_round`].
use crate::utils::NumExt;
use crate::{Pairing, RoundPlan};

/// Returns the number of slots in the first round of a bracket with `entrants` entrants.
#[inline]
pub fn bracket_size(entrants: usize) -> usize {
    match entrants {
        0 => 0,
        n => n.next_power_of_two(),
    }
}

/// Returns the number of rounds until a bracket with `entrants` entrants has a winner.
#[inline]
pub fn total_rounds(entrants: usize) -> usize {
    entrants.ilog2_ceil()
}

/// Returns the 0-based seeds in slot order for a bracket with `size` slots. `size` must be a
/// power of two.
///
/// Two neighboring slots meet in the first round. The order guarantees that the best seeds meet
/// as late as possible: `[0, 7, 3, 4, 1, 6, 2, 5]` for a bracket of 8.
pub fn seeding(size: usize) -> Vec<usize> {
    debug_assert!(size == 0 || size.is_power_of_two());

    if size == 0 {
        return Vec::new();
    }

    let mut order = Vec::with_capacity(size);
    order.push(0);

    while order.len() < size {
        let len = order.len() * 2;

        order = order
            .into_iter()
            .flat_map(|seed| [seed, len - seed - 1])
            .collect();
    }

    order
}

/// Returns the first round of a bracket with `entrants` entrants.
///
/// Slots without an entrant turn the pairing into a bye for the better seed.
pub fn first_round(entrants: usize) -> RoundPlan {
    let size = bracket_size(entrants);

    log::debug!(
        "Creating knockout bracket of size {} for {} entrants",
        size,
        entrants
    );

    seeding(size)
        .chunks(2)
        .filter_map(|slots| match slots {
            [first, second] if *second < entrants => Some(Pairing::new(*first, *second)),
            [first, _] if *first < entrants => Some(Pairing::bye(*first)),
            [first] if *first < entrants => Some(Pairing::bye(*first)),
            _ => None,
        })
        .collect()
}

/// Returns the next round given the `winners` of the previous round in bracket order. Returns
/// `None` if less than two winners are left, i.e. the bracket is finished.
///
/// With an odd number of winners the last one receives a bye.
pub fn next_round(winners: &[usize]) -> Option<RoundPlan> {
    if winners.len() < 2 {
        return None;
    }

    let plan = winners
        .chunks(2)
        .map(|chunk| match chunk {
            [first, second] => Pairing::new(*first, *second),
            [first] => Pairing::bye(*first),
            _ => unreachable!(),
        })
        .collect();

    Some(plan)
}

#[cfg(test)]
mod tests {
    use crate::Pairing;

    use super::{bracket_size, first_round, next_round, seeding, total_rounds};

    #[test]
    fn test_seeding() {
        assert!(seeding(0).is_empty());
        assert_eq!(seeding(1), [0]);
        assert_eq!(seeding(2), [0, 1]);
        assert_eq!(seeding(4), [0, 3, 1, 2]);
        assert_eq!(seeding(8), [0, 7, 3, 4, 1, 6, 2, 5]);

        let order = seeding(16);
        // Seed 1 and seed 2 are placed in opposite halves.
        assert!(order[..8].contains(&0));
        assert!(order[8..].contains(&1));
        // Every pair adds up to size - 1.
        assert!(order.chunks(2).all(|pair| pair[0] + pair[1] == 15));
    }

    #[test]
    fn test_bracket_size() {
        assert_eq!(bracket_size(0), 0);
        assert_eq!(bracket_size(2), 2);
        assert_eq!(bracket_size(5), 8);
        assert_eq!(bracket_size(8), 8);
        assert_eq!(bracket_size(9), 16);

        assert_eq!(total_rounds(2), 1);
        assert_eq!(total_rounds(5), 3);
        assert_eq!(total_rounds(8), 3);
    }

    #[test]
    fn test_first_round() {
        assert_eq!(first_round(2), [Pairing::new(0, 1)]);
        assert_eq!(first_round(3), [Pairing::bye(0), Pairing::new(1, 2)]);

        // Bracket of 8 where the top three seeds receive a bye.
        assert_eq!(
            first_round(5),
            [
                Pairing::bye(0),
                Pairing::new(3, 4),
                Pairing::bye(1),
                Pairing::bye(2),
            ]
        );

        assert_eq!(
            first_round(8),
            [
                Pairing::new(0, 7),
                Pairing::new(3, 4),
                Pairing::new(1, 6),
                Pairing::new(2, 5),
            ]
        );
    }

    #[test]
    fn test_first_round_byes() {
        for n in 2..=64 {
            let round = first_round(n);
            assert_eq!(round.len(), bracket_size(n) / 2);

            let byes = round.iter().filter(|p| p.is_bye()).count();
            assert_eq!(byes, bracket_size(n) - n);

            // Byes always go to the best seeds.
            for pairing in round.iter().filter(|p| p.is_bye()) {
                assert!(pairing.lone().unwrap() < byes);
            }
        }
    }

    #[test]
    fn test_next_round() {
        assert_eq!(next_round(&[]), None);
        assert_eq!(next_round(&[3]), None);
        assert_eq!(next_round(&[0, 4]), Some(vec![Pairing::new(0, 4)]));
        assert_eq!(
            next_round(&[0, 4, 1, 2]),
            Some(vec![Pairing::new(0, 4), Pairing::new(1, 2)])
        );
        assert_eq!(
            next_round(&[0, 4, 1]),
            Some(vec![Pairing::new(0, 4), Pairing::bye(1)])
        );
    }

    #[test]
    fn test_bracket_to_the_end() {
        // The better seed always wins.
        let mut round = first_round(13);
        let mut rounds = 1;

        loop {
            let winners: Vec<usize> = round
                .iter()
                .map(|pairing| match pairing.lone() {
                    Some(seed) => seed,
                    None => pairing.entrants[0].unwrap().min(pairing.entrants[1].unwrap()),
                })
                .collect();

            match next_round(&winners) {
                Some(next) => {
                    assert_eq!(next.len(), (winners.len() + 1) / 2);
                    round = next;
                    rounds += 1;
                }
                None => {
                    assert_eq!(winners, [0]);
                    break;
                }
            }
        }

        assert_eq!(rounds, total_rounds(13));
    }
}
