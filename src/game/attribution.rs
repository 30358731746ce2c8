//! Chain attribution: which player authored a given link.
//!
//! The rotation walks forward from a player to the links they fill; review
//! needs the inverse - from a link in the viewer's own chain back to the
//! player who produced it. The formula below is the algebraic inverse of
//! the rotation's stepping rule, and the two are held together by
//! round-trip tests.

use super::rotation::{max_links, non_negative_mod};

/// Number of the player who authored `link_index` of the chain owned by
/// the player holding `own_number`.
///
/// Index 0 is the owner's own seed word. For later links, the author is
/// found by walking the rotation backwards: each step forward moved one
/// chain over and one link deeper, so stepping back subtracts the link
/// index, and the opening parity offset is removed the same way it was
/// added.
///
/// # Panics
///
/// Panics if `player_count` is zero or `link_index` is outside the chain.
pub fn author_of(own_number: usize, player_count: usize, link_index: usize) -> usize {
    assert!(player_count > 0, "a game needs at least one player");
    assert!(
        link_index < max_links(player_count),
        "link index {link_index} outside chain of {} links",
        max_links(player_count)
    );
    if link_index == 0 {
        return own_number;
    }
    let parity = (player_count % 2) as i64;
    non_negative_mod(
        own_number as i64 - link_index as i64 + 1 - parity,
        player_count as i64,
    ) as usize
}
