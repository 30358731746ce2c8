//! Blob storage for drawings.
//!
//! The coordination core never looks inside an image; it moves opaque
//! references between the blob store and the chain documents.

use crate::game::types::ImageRef;
use async_trait::async_trait;
use derive_more::{Display, Error};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Blob store error.
#[derive(Debug, Clone, Display, Error)]
#[display("Image store error: {message}")]
pub struct ImageError {
    /// Error message.
    pub message: String,
}

impl ImageError {
    /// Creates a new image store error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Stores drawing bytes and resolves references to displayable locations.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Uploads a drawing, returning the reference to persist in a chain.
    async fn put(&self, bytes: Vec<u8>) -> Result<ImageRef, ImageError>;

    /// Resolves a reference to a location a display surface can load.
    async fn resolve(&self, image: &ImageRef) -> Result<String, ImageError>;
}

/// In-memory [`ImageStore`] for simulations and tests.
///
/// All clients of one simulated game share a single instance, the same way
/// they would share one hosted bucket.
#[derive(Debug, Default)]
pub struct MemoryImages {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    next_id: AtomicU64,
}

impl MemoryImages {
    /// Creates an empty image store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes of a stored drawing, for assertions.
    pub fn bytes(&self, image: &ImageRef) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(&image.0).cloned()
    }
}

#[async_trait]
impl ImageStore for MemoryImages {
    async fn put(&self, bytes: Vec<u8>) -> Result<ImageRef, ImageError> {
        let name = format!("{}.svg", self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(%name, size = bytes.len(), "image stored");
        self.blobs.lock().unwrap().insert(name.clone(), bytes);
        Ok(ImageRef(name))
    }

    async fn resolve(&self, image: &ImageRef) -> Result<String, ImageError> {
        let blobs = self.blobs.lock().unwrap();
        if blobs.contains_key(&image.0) {
            Ok(format!("mem://{}", image.0))
        } else {
            Err(ImageError::new(format!("no image named {}", image.0)))
        }
    }
}
