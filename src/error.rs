//! Crate-level error types.

use crate::images::ImageError;
use crate::signal::SignalLost;
use crate::store::StoreError;
use derive_more::{Display, Error, From};

/// Errors surfaced by the game service and state machine.
///
/// The state machine itself has no failure states beyond its two terminal
/// lifecycle outcomes; these errors come from the collaborators it drives -
/// the document store, the blob store, and the local input channels.
#[derive(Debug, Display, Error, From)]
pub enum GameError {
    /// A document store operation failed.
    #[display("store: {_0}")]
    #[from]
    Store(#[error(source)] StoreError),

    /// A blob store operation failed.
    #[display("images: {_0}")]
    #[from]
    Images(#[error(source)] ImageError),

    /// A store subscription ended before the awaited value arrived.
    #[display("signal: {_0}")]
    #[from]
    Signal(#[error(source)] SignalLost),

    /// The roster holds no player with the given number.
    #[display("no player holds number {number}")]
    UnknownPlayerNumber {
        /// The number no roster entry carries.
        number: usize,
    },

    /// The local user is not part of this game's roster.
    #[display("user {user_id} has not joined this game")]
    NotJoined {
        /// The user missing from the roster.
        user_id: String,
    },

    /// The local input channel closed while a turn was waiting on it.
    #[display("local input channel closed")]
    InputClosed,
}
