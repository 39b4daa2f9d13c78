use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use nightstocker_core::DocumentId;

use crate::document::{Document, Precondition, Snapshot, Write, WriteResult, timestamp_value};
use crate::subscription::{SnapshotSender, Subscription};
use crate::r#trait::{DocumentStore, StoreError};

type Collection = BTreeMap<DocumentId, Document>;

#[derive(Debug)]
struct Inner {
    collections: HashMap<String, Collection>,
    subscribers: HashMap<String, Vec<SnapshotSender>>,
    last_commit: DateTime<Utc>,
    available: bool,
    failing_commits: usize,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            collections: HashMap::new(),
            subscribers: HashMap::new(),
            last_commit: DateTime::<Utc>::MIN_UTC,
            available: true,
            failing_commits: 0,
        }
    }
}

impl Inner {
    /// Strictly increasing commit clock.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = if now > self.last_commit {
            now
        } else {
            self.last_commit + TimeDelta::nanoseconds(1)
        };
        self.last_commit = next;
        next
    }

    fn snapshot(&self, collection: &str, read_time: DateTime<Utc>) -> Snapshot {
        let documents = self
            .collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        Snapshot {
            collection: collection.to_string(),
            documents,
            read_time,
        }
    }

    /// Send a message to every live subscriber of `collection`, forgetting closed ones.
    fn publish(&mut self, collection: &str, message: Result<Snapshot, StoreError>) {
        if let Some(subs) = self.subscribers.get_mut(collection) {
            subs.retain(|tx| tx.send(message.clone()).is_ok());
        }
    }

    fn publish_snapshot(&mut self, collection: &str) {
        let snapshot = self.snapshot(collection, Utc::now());
        self.publish(collection, Ok(snapshot));
    }
}

/// In-memory document store.
///
/// Intended for tests/dev. Can simulate an unreachable store
/// (`set_available`) and one-off commit failures (`fail_next_commits`).
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: Mutex<Inner>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    /// Toggle reachability. While unavailable every call fails with
    /// `Unavailable` and subscribers receive that error; coming back
    /// online pushes a fresh snapshot to every subscriber.
    pub fn set_available(&self, available: bool) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner.available == available {
            return Ok(());
        }
        inner.available = available;

        let collections: Vec<String> = inner.subscribers.keys().cloned().collect();
        for collection in collections {
            if available {
                inner.publish_snapshot(&collection);
            } else {
                inner.publish(
                    &collection,
                    Err(StoreError::Unavailable("connection lost".to_string())),
                );
            }
        }
        Ok(())
    }

    /// Make the next `count` commits fail with `Unavailable`.
    pub fn fail_next_commits(&self, count: usize) -> Result<(), StoreError> {
        self.lock()?.failing_commits = count;
        Ok(())
    }

    /// Number of live subscribers of `collection` as of the last publish.
    pub fn subscriber_count(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.subscribers.get(collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn ensure_available(inner: &Inner) -> Result<(), StoreError> {
        if inner.available {
            Ok(())
        } else {
            Err(StoreError::Unavailable("store is offline".to_string()))
        }
    }

    fn apply(
        staged: &mut HashMap<String, Collection>,
        write: Write,
        commit_time: DateTime<Utc>,
    ) -> Result<WriteResult, StoreError> {
        match write {
            Write::Create {
                collection,
                id,
                mut fields,
                server_timestamps,
            } => {
                let docs = staged.entry(collection.clone()).or_default();
                if docs.contains_key(&id) {
                    return Err(StoreError::Conflict(format!(
                        "{collection}/{id} already exists"
                    )));
                }
                for field in server_timestamps {
                    fields.insert(field, timestamp_value(commit_time));
                }
                docs.insert(
                    id.clone(),
                    Document {
                        id: id.clone(),
                        fields,
                        create_time: commit_time,
                        update_time: commit_time,
                    },
                );
                Ok(WriteResult {
                    id,
                    update_time: Some(commit_time),
                })
            }
            Write::Update {
                collection,
                id,
                fields,
                precondition,
            } => {
                let doc = staged
                    .get_mut(&collection)
                    .and_then(|docs| docs.get_mut(&id))
                    .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;
                if let Precondition::UpdateTime(expected) = precondition
                    && doc.update_time != expected
                {
                    return Err(StoreError::Conflict(format!(
                        "{collection}/{id} changed since {expected}"
                    )));
                }
                doc.fields.extend(fields);
                doc.update_time = commit_time;
                Ok(WriteResult {
                    id,
                    update_time: Some(commit_time),
                })
            }
            Write::Delete { collection, id } => {
                if let Some(docs) = staged.get_mut(&collection) {
                    docs.remove(&id);
                }
                Ok(WriteResult {
                    id,
                    update_time: None,
                })
            }
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn listen(&self, collection: &str) -> Result<Subscription, StoreError> {
        let mut inner = self.lock()?;
        let (tx, subscription) = Subscription::channel();

        let first = if inner.available {
            Ok(inner.snapshot(collection, Utc::now()))
        } else {
            Err(StoreError::Unavailable("store is offline".to_string()))
        };
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(first);

        inner
            .subscribers
            .entry(collection.to_string())
            .or_default()
            .push(tx);
        Ok(subscription)
    }

    async fn get(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        let inner = self.lock()?;
        Self::ensure_available(&inner)?;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn list(&self, collection: &str) -> Result<Snapshot, StoreError> {
        let inner = self.lock()?;
        Self::ensure_available(&inner)?;
        Ok(inner.snapshot(collection, Utc::now()))
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<Vec<WriteResult>, StoreError> {
        let mut inner = self.lock()?;
        Self::ensure_available(&inner)?;
        if inner.failing_commits > 0 {
            inner.failing_commits -= 1;
            return Err(StoreError::Unavailable("simulated commit failure".to_string()));
        }
        if writes.is_empty() {
            return Ok(vec![]);
        }

        // Apply to a staged copy so a failing write leaves nothing behind.
        let commit_time = inner.tick();
        let mut staged = inner.collections.clone();
        let mut touched: Vec<String> = Vec::new();
        let mut results = Vec::with_capacity(writes.len());
        for write in writes {
            let collection = write.collection().to_string();
            results.push(Self::apply(&mut staged, write, commit_time)?);
            if !touched.contains(&collection) {
                touched.push(collection);
            }
        }
        inner.collections = staged;

        for collection in touched {
            inner.publish_snapshot(&collection);
        }
        tracing::debug!(writes = results.len(), %commit_time, "in-memory commit applied");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Fields;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn id(s: &str) -> DocumentId {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn listen_starts_with_current_snapshot_and_follows_commits() {
        let store = InMemoryDocumentStore::new();
        store
            .commit(vec![Write::create_with_id(
                "inventory",
                id("a"),
                fields(json!({"name": "Alpha", "size": "1", "quantity": 1})),
            )])
            .await
            .unwrap();

        let mut sub = store.listen("inventory").await.unwrap();
        let first = sub.next().await.unwrap().unwrap();
        assert_eq!(first.documents.len(), 1);

        store.delete("inventory", &id("a")).await.unwrap();
        let second = sub.next().await.unwrap().unwrap();
        assert!(second.documents.is_empty());
    }

    #[tokio::test]
    async fn failing_write_rolls_back_the_whole_batch() {
        let store = InMemoryDocumentStore::new();
        let err = store
            .commit(vec![
                Write::create_with_id("tireLogs", id("log"), Fields::new()),
                Write::update("inventory", id("missing"), fields(json!({"quantity": 0}))),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.get("tireLogs", &id("log")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_update_time_is_a_conflict() {
        let store = InMemoryDocumentStore::new();
        store
            .commit(vec![Write::create_with_id(
                "inventory",
                id("a"),
                fields(json!({"quantity": 3})),
            )])
            .await
            .unwrap();
        let seen = store.get("inventory", &id("a")).await.unwrap().unwrap();

        store
            .update("inventory", &id("a"), fields(json!({"quantity": 2})))
            .await
            .unwrap();

        let err = store
            .commit(vec![
                Write::update("inventory", id("a"), fields(json!({"quantity": 2})))
                    .with_precondition(Precondition::UpdateTime(seen.update_time)),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_times_strictly_increase() {
        let store = InMemoryDocumentStore::new();
        let a = store.create("inventory", Fields::new()).await.unwrap();
        let mut last = store.get("inventory", &a).await.unwrap().unwrap().update_time;
        for q in 0..5 {
            let r = store
                .update("inventory", &a, fields(json!({ "quantity": q })))
                .await
                .unwrap();
            let t = r.update_time.unwrap();
            assert!(t > last);
            last = t;
        }
    }

    #[tokio::test]
    async fn deleting_a_missing_document_succeeds() {
        let store = InMemoryDocumentStore::new();
        store.delete("inventory", &id("nope")).await.unwrap();
    }

    #[tokio::test]
    async fn server_timestamps_are_filled_with_commit_time() {
        let store = InMemoryDocumentStore::new();
        let results = store
            .commit(vec![
                Write::create_with_id("tireLogs", id("l1"), Fields::new())
                    .with_server_timestamp("timestamp"),
            ])
            .await
            .unwrap();
        let doc = store.get("tireLogs", &id("l1")).await.unwrap().unwrap();
        let expected = timestamp_value(results[0].update_time.unwrap());
        assert_eq!(doc.fields.get("timestamp"), Some(&expected));
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned_on_publish() {
        let store = InMemoryDocumentStore::new();
        let sub = store.listen("inventory").await.unwrap();
        assert_eq!(store.subscriber_count("inventory"), 1);
        drop(sub);

        store.create("inventory", Fields::new()).await.unwrap();
        assert_eq!(store.subscriber_count("inventory"), 0);
    }

    #[tokio::test]
    async fn offline_store_rejects_calls_and_notifies_subscribers() {
        let store = InMemoryDocumentStore::new();
        let mut sub = store.listen("inventory").await.unwrap();
        sub.next().await.unwrap().unwrap();

        store.set_available(false).unwrap();
        assert!(matches!(
            sub.next().await.unwrap(),
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.create("inventory", Fields::new()).await.is_err());

        store.set_available(true).unwrap();
        assert!(sub.next().await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn simulated_commit_failures_are_consumed() {
        let store = InMemoryDocumentStore::new();
        store.fail_next_commits(1).unwrap();
        assert!(store.create("inventory", Fields::new()).await.is_err());
        assert!(store.create("inventory", Fields::new()).await.is_ok());
    }
}
