//! Unique user invariant: one roster entry per user id.

use super::Invariant;
use crate::game::types::GameSnapshot;
use std::collections::HashSet;

/// Invariant: at most one player per user id.
///
/// A user joining from several tabs writes the same player document, so the
/// roster can never grow a second entry for them.
pub struct UniqueUserInvariant;

impl Invariant<GameSnapshot> for UniqueUserInvariant {
    fn holds(snapshot: &GameSnapshot) -> bool {
        let mut seen = HashSet::new();
        snapshot
            .players
            .iter()
            .all(|player| seen.insert(player.user_id.as_str()))
    }

    fn description() -> &'static str {
        "Each user id appears at most once in the roster"
    }
}
