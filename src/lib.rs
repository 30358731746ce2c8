//! Telesketch library - leaderless coordination for telephone-drawing games
//!
//! Players seed a phrase, then alternate drawing what the previous player
//! wrote and guessing what the previous player drew, against a shared
//! eventually-consistent document store. No server decides turns: every
//! client derives its own responsibilities from the roster and resolves
//! "another tab already did this" races by observation alone.
//!
//! # Architecture
//!
//! - **Rotation**: pure arithmetic assigning each player their ordered
//!   sequence of chain links to fill
//! - **Attribution**: the inverse, mapping a reviewed link back to its author
//! - **Machine**: the per-client reactive lifecycle, driven purely by store
//!   signals
//! - **Service**: the store-facing layer folding documents into snapshots
//!   and actions into writes
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use telesketch::{DocumentStore, GameClient, GameService, ImageStore, MemoryImages, MemoryStore};
//!
//! # async fn example() -> Result<(), telesketch::GameError> {
//! let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
//! let images: Arc<dyn ImageStore> = Arc::new(MemoryImages::new());
//!
//! GameService::create_game(&store, "user-1", "ocean-lantern-fox").await?;
//! let service = GameService::connect(store, "user-1", "ocean-lantern-fox");
//! let client = GameClient::new(service, images);
//!
//! let handle = client.handle();
//! let final_state = client.run().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod error;
mod game;
mod images;
mod machine;
mod profile;
mod service;
mod signal;
mod sim;
mod store;
mod words;

// Crate-level exports - errors
pub use error::GameError;

// Crate-level exports - domain types
pub use game::types::{
    GameSnapshot, ImageRef, Link, PlayerSnapshot, Responsibility, ReviewLink, UNORDERED,
};

// Crate-level exports - rotation and attribution
pub use game::attribution::author_of;
pub use game::rotation::{
    Rotation, first_responsibility, is_exhausted, max_links, non_negative_mod, step,
};

// Crate-level exports - invariants
pub use game::invariants::{
    AlternatingMediaInvariant, Invariant, InvariantSet, InvariantViolation, RosterInvariants,
    RosterNumberingInvariant, UniqueUserInvariant,
};

// Crate-level exports - state machine
pub use machine::{ClientHandle, GameClient, GameState, GameView};

// Crate-level exports - store-facing service
pub use service::{GameService, TurnStreams, parse_chain};

// Crate-level exports - document store
pub use store::{CollectionPath, DocPath, Document, DocumentStore, MemoryStore, StoreError};

// Crate-level exports - collaborators
pub use images::{ImageError, ImageStore, MemoryImages};
pub use profile::{IdentityProvider, MemoryIdentity};
pub use words::{game_id, random_word};

// Crate-level exports - signal primitives
pub use signal::{First, SignalLost, first_match, select_first};

// Crate-level exports - simulation
pub use sim::{PlayerChain, SimulationReport, run_bot, simulate};
