//! In-process document store backed by watch channels.

use super::{CollectionPath, DocPath, Document, DocumentStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::debug;

/// In-memory [`DocumentStore`] for simulations and tests.
///
/// Every document and collection gets its own watch channel, so subscribers
/// observe the current value immediately and each write afterwards. All
/// clients of one simulated game share a single instance.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    docs: HashMap<DocPath, watch::Sender<Option<Document>>>,
    collections: HashMap<CollectionPath, CollectionNode>,
}

#[derive(Debug)]
struct CollectionNode {
    /// Document keys in arrival order of their first write.
    order: Vec<String>,
    tx: watch::Sender<Vec<(String, Document)>>,
}

impl CollectionNode {
    fn new() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self { order: Vec::new(), tx }
    }
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn doc_sender(&mut self, path: &DocPath) -> &watch::Sender<Option<Document>> {
        self.docs
            .entry(path.clone())
            .or_insert_with(|| watch::channel(None).0)
    }

    fn collection_node(&mut self, path: &CollectionPath) -> &mut CollectionNode {
        self.collections
            .entry(path.clone())
            .or_insert_with(CollectionNode::new)
    }

    /// Merges `patch` into the document and notifies its subscribers.
    /// Returns the parent collection so the caller can rebuild it.
    fn apply(&mut self, path: &DocPath, patch: Document) -> CollectionPath {
        let sender = self.doc_sender(path);
        let created = sender.borrow().is_none();
        let mut merged = sender.borrow().clone().unwrap_or_default();
        merged.merge(patch);
        sender.send_replace(Some(merged));

        let (collection, key) = path.split();
        let node = self.collection_node(&collection);
        if created {
            node.order.push(key);
        }
        collection
    }

    /// Publishes a fresh snapshot of the collection to its subscribers.
    fn rebuild(&mut self, collection: &CollectionPath) {
        let order = match self.collections.get(collection) {
            Some(node) => node.order.clone(),
            None => return,
        };
        let mut entries = Vec::with_capacity(order.len());
        for key in order {
            if let Some(sender) = self.docs.get(&collection.doc(&key)) {
                if let Some(doc) = sender.borrow().clone() {
                    entries.push((key, doc));
                }
            }
        }
        if let Some(node) = self.collections.get(collection) {
            node.tx.send_replace(entries);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn subscribe_doc(&self, path: &DocPath) -> watch::Receiver<Option<Document>> {
        let mut inner = self.inner.lock().unwrap();
        inner.doc_sender(path).subscribe()
    }

    fn subscribe_collection(
        &self,
        path: &CollectionPath,
    ) -> watch::Receiver<Vec<(String, Document)>> {
        let mut inner = self.inner.lock().unwrap();
        inner.collection_node(path).tx.subscribe()
    }

    async fn write(&self, path: &DocPath, patch: Document) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        debug!(path = %path, "write");
        let collection = inner.apply(path, patch);
        inner.rebuild(&collection);
        Ok(())
    }

    async fn batch_write(&self, writes: Vec<(DocPath, Document)>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        debug!(count = writes.len(), "batch write");
        // Apply every document first, then publish each affected collection
        // once, so collection subscribers never observe a partial batch.
        let mut affected = Vec::new();
        for (path, patch) in writes {
            let collection = inner.apply(&path, patch);
            if !affected.contains(&collection) {
                affected.push(collection);
            }
        }
        for collection in affected {
            inner.rebuild(&collection);
        }
        Ok(())
    }
}
