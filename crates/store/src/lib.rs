//! Document store layer: the remote collection store the screens persist to.
//!
//! - `document.rs`: documents, snapshots and writes
//! - `trait.rs`: the `DocumentStore` contract and its error type
//! - `subscription.rs`: live snapshot subscriptions
//! - `in_memory.rs`: in-process store for tests/dev
//! - `firestore/`: Cloud Firestore REST backend (feature `firestore`)

pub mod document;
#[cfg(feature = "firestore")]
pub mod firestore;
pub mod in_memory;
pub mod subscription;
pub mod r#trait;

pub use document::{Document, Fields, Precondition, Snapshot, Write, WriteResult};
#[cfg(feature = "firestore")]
pub use firestore::{FirestoreConfig, FirestoreStore};
pub use in_memory::InMemoryDocumentStore;
pub use subscription::{SnapshotSender, Subscription};
pub use r#trait::{DocumentStore, StoreError};
