//! Live collection subscriptions.
//!
//! A subscription delivers full snapshots: the first message is the current
//! state of the collection, and every committed change to it produces another
//! one. Consumers never see deltas, so a missed intermediate snapshot is
//! harmless.
//!
//! ## Cancellation
//!
//! Dropping the `Subscription` cancels it. Stores notice the closed channel
//! the next time they publish and forget the subscriber.
//!
//! ## Usage Pattern
//!
//! ```ignore
//! let mut sub = store.listen("inventory").await?;
//! while let Some(next) = sub.next().await {
//!     match next {
//!         Ok(snapshot) => render(snapshot),
//!         Err(e) => tracing::warn!("listen failed: {e}"),
//!     }
//! }
//! ```

use tokio::sync::mpsc;

use crate::document::Snapshot;
use crate::r#trait::StoreError;

/// Sending half held by the store for each live subscriber.
pub type SnapshotSender = mpsc::UnboundedSender<Result<Snapshot, StoreError>>;

#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Result<Snapshot, StoreError>>,
}

impl Subscription {
    pub fn new(receiver: mpsc::UnboundedReceiver<Result<Snapshot, StoreError>>) -> Self {
        Self { receiver }
    }

    /// Create a connected sender/subscription pair.
    pub fn channel() -> (SnapshotSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx))
    }

    /// Wait for the next snapshot. `None` once the store side is gone.
    pub async fn next(&mut self) -> Option<Result<Snapshot, StoreError>> {
        self.receiver.recv().await
    }

    /// Take a snapshot if one is already queued.
    pub fn try_next(&mut self) -> Result<Result<Snapshot, StoreError>, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain queued messages and keep only the newest.
    pub fn latest(&mut self) -> Option<Result<Snapshot, StoreError>> {
        let mut latest = None;
        while let Ok(msg) = self.receiver.try_recv() {
            latest = Some(msg);
        }
        latest
    }
}
