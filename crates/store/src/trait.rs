use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use nightstocker_core::DocumentId;

use crate::document::{Document, Fields, Snapshot, Write, WriteResult};
use crate::subscription::Subscription;

/// Document store operation error.
///
/// These are **infrastructure errors** (connectivity, preconditions, decoding)
/// as opposed to domain errors (validation, workflow).
///
/// ## Error Categories
///
/// - **NotFound**: An update targeted a document that does not exist
/// - **Conflict**: A precondition failed (someone else changed the document)
/// - **Unavailable**: The store could not be reached
/// - **InvalidWrite**: The write batch itself was malformed
/// - **Backend**: The store rejected the request for another reason
/// - **Decode**: A response or document could not be decoded
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("precondition failed: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid write: {0}")]
    InvalidWrite(String),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether retrying the same operation later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Conflict(_))
    }
}

/// Remote collection store with live subscriptions.
///
/// ## Commit Semantics
///
/// `commit()` applies a batch of writes atomically: either every write lands
/// or none does. Each committed write gets a new, strictly increasing
/// `update_time`, and every subscriber of an affected collection receives a
/// fresh snapshot afterwards.
///
/// ## Listen Semantics
///
/// `listen()` returns a subscription whose first message is the current
/// snapshot of the collection. Errors are delivered in-band; the subscription
/// stays open unless the store shuts down.
///
/// ## Implementation Requirements
///
/// Implementations must:
/// - reject `Create` for an id that already exists (`Conflict`)
/// - reject `Update` for a missing document (`NotFound`)
/// - reject `Update` whose `UpdateTime` precondition is stale (`Conflict`)
/// - treat `Delete` of a missing document as success
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Subscribe to full snapshots of `collection`.
    async fn listen(&self, collection: &str) -> Result<Subscription, StoreError>;

    /// Fetch one document; `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &DocumentId)
        -> Result<Option<Document>, StoreError>;

    /// Fetch every document of a collection.
    async fn list(&self, collection: &str) -> Result<Snapshot, StoreError>;

    /// Apply `writes` atomically.
    async fn commit(&self, writes: Vec<Write>) -> Result<Vec<WriteResult>, StoreError>;

    /// Create a document with a generated id and return that id.
    async fn create(&self, collection: &str, fields: Fields) -> Result<DocumentId, StoreError> {
        let write = Write::create(collection, fields);
        let id = write.id().clone();
        self.commit(vec![write]).await?;
        Ok(id)
    }

    /// Merge `fields` into an existing document.
    async fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<WriteResult, StoreError> {
        let mut results = self
            .commit(vec![Write::update(collection, id.clone(), fields)])
            .await?;
        results
            .pop()
            .ok_or_else(|| StoreError::Backend("commit returned no write results".to_string()))
    }

    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<(), StoreError> {
        self.commit(vec![Write::delete(collection, id.clone())])
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn listen(&self, collection: &str) -> Result<Subscription, StoreError> {
        (**self).listen(collection).await
    }

    async fn get(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        (**self).get(collection, id).await
    }

    async fn list(&self, collection: &str) -> Result<Snapshot, StoreError> {
        (**self).list(collection).await
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<Vec<WriteResult>, StoreError> {
        (**self).commit(writes).await
    }
}
