//! Responsibility rotation: who fills which chain link, in what order.
//!
//! There is no server deciding turns. Every client derives its own ordered
//! sequence of responsibilities from nothing but the player count and its
//! own number, so any two clients for the same player - separate tabs or
//! devices included - compute the identical sequence.

use super::types::Responsibility;

/// Euclidean remainder: always in `0..n` even for negative `a`.
///
/// Shared by the rotation and its inverse so neither depends on the sign
/// behavior of the `%` operator.
///
/// # Panics
///
/// Panics if `n` is not positive.
pub fn non_negative_mod(a: i64, n: i64) -> i64 {
    assert!(n > 0, "modulus must be positive, got {n}");
    ((a % n) + n) % n
}

/// Number of links in every completed chain.
///
/// A chain must end on a guess (an even index) so the review always closes
/// with an interpretation rather than an unexplained drawing. With an even
/// player count that takes one extra link; with an odd count it falls out
/// naturally.
///
/// # Panics
///
/// Panics if `player_count` is zero.
pub fn max_links(player_count: usize) -> usize {
    assert!(player_count > 0, "a game needs at least one player");
    if player_count % 2 == 0 {
        player_count + 1
    } else {
        player_count
    }
}

/// The first responsibility of the player holding `own_number`.
///
/// With an even player count each player opens on their own chain; with an
/// odd count the opening shifts to a neighbor's chain. Combined with the
/// step rule this makes every chain's closing link come from a distinct
/// player, and no player ever acts on the same chain twice.
pub fn first_responsibility(player_count: usize, own_number: usize) -> Responsibility {
    assert!(
        own_number < player_count,
        "player number {own_number} outside roster of {player_count}"
    );
    let offset = (player_count % 2) as i64;
    let chain = non_negative_mod(own_number as i64 + offset, player_count as i64);
    Responsibility::new(chain as usize, 0)
}

/// The responsibility after `prev`: the next chain over, one link deeper.
pub fn step(prev: Responsibility, player_count: usize) -> Responsibility {
    Responsibility::new(
        (prev.chain_number + 1) % player_count,
        prev.link_index + 1,
    )
}

/// Whether a computed responsibility is past the end of the rotation.
///
/// The link at `max_links - 1` is the chain's closing guess, already written
/// by the player's previous step; nothing is produced from it.
pub fn is_exhausted(responsibility: Responsibility, player_count: usize) -> bool {
    responsibility.link_index == max_links(player_count) - 1
}

/// Iterator over one player's full responsibility sequence.
///
/// Deterministic and side-effect-free: the sequence depends only on the
/// constructor arguments.
#[derive(Debug, Clone)]
pub struct Rotation {
    player_count: usize,
    own_number: usize,
    current: Option<Responsibility>,
    exhausted: bool,
}

impl Rotation {
    /// Creates the rotation for the player holding `own_number` in a game
    /// of `player_count` ordered players.
    ///
    /// # Panics
    ///
    /// Panics if `player_count` is zero or `own_number` is out of range.
    pub fn new(player_count: usize, own_number: usize) -> Self {
        assert!(player_count > 0, "a game needs at least one player");
        assert!(
            own_number < player_count,
            "player number {own_number} outside roster of {player_count}"
        );
        Self {
            player_count,
            own_number,
            current: None,
            exhausted: false,
        }
    }
}

impl Iterator for Rotation {
    type Item = Responsibility;

    fn next(&mut self) -> Option<Responsibility> {
        if self.exhausted {
            return None;
        }
        let next = match self.current {
            None => first_responsibility(self.player_count, self.own_number),
            Some(prev) => step(prev, self.player_count),
        };
        if is_exhausted(next, self.player_count) {
            self.exhausted = true;
            return None;
        }
        self.current = Some(next);
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(player_count: usize, own_number: usize) -> Vec<(usize, usize)> {
        Rotation::new(player_count, own_number)
            .map(|r| (r.chain_number, r.link_index))
            .collect()
    }

    #[test]
    fn non_negative_mod_handles_negatives() {
        assert_eq!(non_negative_mod(-1, 4), 3);
        assert_eq!(non_negative_mod(-5, 4), 3);
        assert_eq!(non_negative_mod(7, 4), 3);
        assert_eq!(non_negative_mod(0, 1), 0);
    }

    #[test]
    #[should_panic(expected = "modulus must be positive")]
    fn non_negative_mod_rejects_zero_modulus() {
        non_negative_mod(3, 0);
    }

    #[test]
    fn chain_length_by_parity() {
        assert_eq!(max_links(1), 1);
        assert_eq!(max_links(2), 3);
        assert_eq!(max_links(3), 3);
        assert_eq!(max_links(4), 5);
        assert_eq!(max_links(5), 5);
    }

    #[test]
    fn solo_player_has_nothing_to_do() {
        // One player's chain is just the seed word.
        assert!(sequence(1, 0).is_empty());
    }

    #[test]
    fn even_count_opens_on_own_chain() {
        assert_eq!(sequence(4, 0), vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
        assert_eq!(sequence(4, 2), vec![(2, 0), (3, 1), (0, 2), (1, 3)]);
    }

    #[test]
    fn odd_count_opens_on_neighbor_chain() {
        assert_eq!(sequence(3, 0), vec![(1, 0), (2, 1)]);
        assert_eq!(sequence(3, 2), vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn two_players_swap_after_drawing_their_own_word() {
        assert_eq!(sequence(2, 0), vec![(0, 0), (1, 1)]);
        assert_eq!(sequence(2, 1), vec![(1, 0), (0, 1)]);
    }

    #[test]
    fn identical_inputs_give_identical_sequences() {
        assert_eq!(sequence(7, 3), sequence(7, 3));
    }
}
