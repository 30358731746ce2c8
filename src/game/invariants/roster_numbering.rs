//! Roster numbering invariant: ordered numbers form a unique permutation.

use super::Invariant;
use crate::game::types::{GameSnapshot, UNORDERED};
use std::collections::HashSet;

/// Invariant: assigned player numbers are `0..k`, each exactly once.
///
/// Before ordering, any player may carry the [`UNORDERED`] sentinel; that is
/// a valid display-only value, not a violation. A partially-applied
/// numbering - some numbers assigned but with gaps or duplicates - must
/// never be observable, because ordering is written as one atomic batch.
pub struct RosterNumberingInvariant;

impl Invariant<GameSnapshot> for RosterNumberingInvariant {
    fn holds(snapshot: &GameSnapshot) -> bool {
        let mut seen = HashSet::new();

        for player in &snapshot.players {
            if player.number == UNORDERED {
                continue;
            }
            if player.number < 0 || !seen.insert(player.number) {
                return false;
            }
        }

        // Assigned numbers must be exactly 0..k with no gaps.
        (0..seen.len() as i64).all(|n| seen.contains(&n))
    }

    fn description() -> &'static str {
        "Assigned player numbers form a gapless, duplicate-free permutation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::PlayerSnapshot;

    fn roster(numbers: &[i64]) -> GameSnapshot {
        GameSnapshot {
            exists: Some(true),
            started: false,
            players: numbers
                .iter()
                .enumerate()
                .map(|(i, &number)| PlayerSnapshot {
                    user_id: format!("u{i}"),
                    username: Some(format!("player{i}")),
                    number,
                })
                .collect(),
        }
    }

    #[test]
    fn unordered_roster_holds() {
        assert!(RosterNumberingInvariant::holds(&roster(&[0, -1, -1])));
    }

    #[test]
    fn full_permutation_holds() {
        assert!(RosterNumberingInvariant::holds(&roster(&[0, 1, 2, 3, 4])));
    }

    #[test]
    fn duplicate_number_violates() {
        assert!(!RosterNumberingInvariant::holds(&roster(&[0, 1, 1])));
    }

    #[test]
    fn gap_in_numbering_violates() {
        assert!(!RosterNumberingInvariant::holds(&roster(&[0, 2, -1])));
    }
}
