//! Replicated document store abstraction.
//!
//! The store holds small field-map documents addressed by slash-separated
//! paths, mirroring the layout of a hosted document database:
//!
//! - `games/{gameId}` - the game document
//! - `games/{gameId}/players/{userId}` - one document per player
//! - `games/{gameId}/players/{userId}/chain/{linkIndex}` - one document per chain link
//!
//! Subscriptions are `watch` channels: the current value is observable
//! immediately and every later write is pushed to all subscribers. Writes are
//! upserts that merge fields into the existing document. A batch write is
//! atomic with respect to collection observers - they see all of it or none
//! of it.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

/// Path to a single document, e.g. `games/ocean-lantern-fox/players/u1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath(String);

impl DocPath {
    /// The game document for a game id.
    pub fn game(game_id: &str) -> Self {
        Self(format!("games/{game_id}"))
    }

    /// A player's document within a game.
    pub fn player(game_id: &str, user_id: &str) -> Self {
        Self(format!("games/{game_id}/players/{user_id}"))
    }

    /// One link of a player's chain.
    pub fn link(game_id: &str, user_id: &str, index: usize) -> Self {
        Self(format!("games/{game_id}/players/{user_id}/chain/{index}"))
    }

    /// Splits the path into its parent collection and document key.
    pub fn split(&self) -> (CollectionPath, String) {
        let (collection, key) = self
            .0
            .rsplit_once('/')
            .expect("document paths always have a parent collection");
        (CollectionPath(collection.to_string()), key.to_string())
    }

    /// The raw path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Path to a collection of documents, e.g. `games/ocean-lantern-fox/players`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// The players collection of a game.
    pub fn players(game_id: &str) -> Self {
        Self(format!("games/{game_id}/players"))
    }

    /// The chain collection of one player.
    pub fn chain(game_id: &str, user_id: &str) -> Self {
        Self(format!("games/{game_id}/players/{user_id}/chain"))
    }

    /// The document with the given key inside this collection.
    pub fn doc(&self, key: &str) -> DocPath {
        DocPath(format!("{}/{key}", self.0))
    }

    /// The raw path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A field-map document stored at a [`DocPath`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document(serde_json::Map<String, Value>);

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes a typed value into a document.
    ///
    /// # Errors
    ///
    /// Fails if the value does not serialize to a JSON object.
    pub fn encode<T: Serialize>(value: &T) -> Result<Self, StoreError> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(StoreError::new("document must serialize to an object")),
        }
    }

    /// Deserializes the document into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(Value::Object(self.0.clone()))?)
    }

    /// Merges the fields of `patch` into this document, overwriting
    /// fields that exist in both.
    pub fn merge(&mut self, patch: Document) {
        for (field, value) in patch.0 {
            self.0.insert(field, value);
        }
    }

    /// Returns a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Whether the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The subscribe/write surface of the replicated store.
///
/// Conflict resolution within the store is last-writer-wins per field; the
/// coordination protocol on top never overwrites a value it has observed, so
/// racing clients converge on a single ground truth.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Subscribes to a document. The receiver starts with the current value
    /// (`None` while the document is absent) and observes every write.
    fn subscribe_doc(&self, path: &DocPath) -> watch::Receiver<Option<Document>>;

    /// Subscribes to a collection. Entries are `(key, document)` pairs in
    /// arrival order of their first write.
    fn subscribe_collection(
        &self,
        path: &CollectionPath,
    ) -> watch::Receiver<Vec<(String, Document)>>;

    /// Upserts a document, merging `patch` into any existing fields.
    async fn write(&self, path: &DocPath, patch: Document) -> Result<(), StoreError>;

    /// Applies all writes atomically: collection subscribers observe either
    /// none of the batch or all of it, never a partial application.
    async fn batch_write(&self, writes: Vec<(DocPath, Document)>) -> Result<(), StoreError>;
}
