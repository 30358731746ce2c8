//! Alternating media invariant: words and drawings alternate along a chain.

use super::Invariant;
use crate::game::types::Link;

/// Invariant: a chain alternates between text and drawings.
///
/// Index 0 is the seed word, every odd index is a drawing of the previous
/// text, every even non-zero index is a guess at the previous drawing.
pub struct AlternatingMediaInvariant;

impl Invariant<Vec<Link>> for AlternatingMediaInvariant {
    fn holds(chain: &Vec<Link>) -> bool {
        chain.iter().enumerate().all(|(index, link)| {
            if index % 2 == 0 {
                link.is_word()
            } else {
                link.is_drawing()
            }
        })
    }

    fn description() -> &'static str {
        "Chains alternate word, drawing, guess, drawing, ..."
    }
}
