//! Inventory view-model shared by the Stocker and Tech screens.
//!
//! Activation opens a live subscription to the `inventory` collection and
//! replaces the local list with every full snapshot. Writes go to the store
//! and are never applied locally: the list only changes when the next
//! snapshot arrives.
//!
//! Quantity changes read the document from the store and write it back with
//! an update-time precondition, retrying when another writer got there first.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use nightstocker_core::{DomainError, TireId};
use nightstocker_inventory::tire::quantity_fields;
use nightstocker_inventory::{
    INVENTORY_COLLECTION, InventoryList, NewTire, PullRejection, StockSummary, TireRecord,
    adjusted_quantity,
};
use nightstocker_store::{DocumentStore, Precondition, Snapshot, StoreError, Write};

use crate::prompt::{DELETE_CONFIRMATION, Prompter};

/// Attempts at a conditional write before giving up.
pub const MAX_WRITE_ATTEMPTS: usize = 5;

pub const LOAD_ERROR_MESSAGE: &str = "Failed to load inventory. Check the logs for details.";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ViewModelError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Rejected(#[from] PullRejection),

    #[error("gave up after {attempts} conflicting updates")]
    Contended { attempts: usize },
}

/// What the screens render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryState {
    /// No snapshot received yet.
    pub loading: bool,
    pub error: Option<String>,
    pub inventory: InventoryList,
}

impl Default for InventoryState {
    fn default() -> Self {
        Self {
            loading: true,
            error: None,
            inventory: InventoryList::new(),
        }
    }
}

impl InventoryState {
    pub fn summary(&self) -> StockSummary {
        self.inventory.summary()
    }
}

/// Keeps the subscription alive; dropping it deactivates the view-model.
#[derive(Debug)]
pub struct Activation {
    task: JoinHandle<()>,
}

impl Activation {
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Activation {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone)]
pub struct InventoryViewModel<S> {
    store: S,
    state: Arc<RwLock<InventoryState>>,
    updates: broadcast::Sender<InventoryState>,
}

/// Rebuild the sorted list from a full snapshot. Undecodable documents are skipped.
pub fn inventory_from_snapshot(snapshot: &Snapshot) -> InventoryList {
    InventoryList::from_records(snapshot.documents.iter().filter_map(|doc| {
        let id = TireId::from(doc.id.clone());
        match TireRecord::from_fields(id, &doc.fields) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(id = %doc.id, error = %e, "skipping malformed inventory document");
                None
            }
        }
    }))
}

/// Fold one subscription message into the shared state and broadcast the result.
fn apply(
    state: &RwLock<InventoryState>,
    updates: &broadcast::Sender<InventoryState>,
    message: Result<Snapshot, StoreError>,
) {
    let next = {
        let mut guard = match state.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        match message {
            Ok(snapshot) => {
                guard.inventory = inventory_from_snapshot(&snapshot);
                guard.error = None;
                tracing::debug!(records = guard.inventory.len(), "inventory snapshot applied");
            }
            Err(e) => {
                tracing::error!(error = %e, "inventory subscription failed");
                guard.error = Some(LOAD_ERROR_MESSAGE.to_string());
            }
        }
        guard.loading = false;
        guard.clone()
    };
    // No receivers is fine.
    let _ = updates.send(next);
}

impl<S> InventoryViewModel<S>
where
    S: DocumentStore,
{
    pub fn new(store: S) -> Self {
        let (updates, _) = broadcast::channel(64);
        Self {
            store,
            state: Arc::new(RwLock::new(InventoryState::default())),
            updates,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current state (cloned).
    pub fn state(&self) -> InventoryState {
        match self.state.read() {
            Ok(s) => s.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<InventoryState> {
        self.updates.subscribe()
    }

    /// Open the live subscription to `inventory`.
    ///
    /// Failing to subscribe, and listen errors after activation, are logged
    /// and surfaced through `InventoryState::error`; neither is returned.
    pub async fn activate(&self) -> Activation {
        let state = Arc::clone(&self.state);
        let updates = self.updates.clone();

        let mut subscription = match self.store.listen(INVENTORY_COLLECTION).await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::error!(error = %e, "could not subscribe to inventory");
                apply(&state, &updates, Err(e));
                return Activation {
                    task: tokio::spawn(async {}),
                };
            }
        };

        let task = tokio::spawn(async move {
            while let Some(message) = subscription.next().await {
                apply(&state, &updates, message);
            }
            tracing::debug!("inventory subscription closed");
        });

        tracing::info!("inventory view-model activated");
        Activation { task }
    }

    /// Wait until the state satisfies `pred` or `timeout` elapses, then
    /// return the latest state either way.
    pub async fn wait_for<F>(&self, timeout: Duration, mut pred: F) -> InventoryState
    where
        F: FnMut(&InventoryState) -> bool,
    {
        let mut rx = self.updates.subscribe();
        let current = self.state();
        if pred(&current) {
            return current;
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Ok(state)) => {
                    if pred(&state) {
                        return state;
                    }
                }
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => {
                    let state = self.state();
                    if pred(&state) {
                        return state;
                    }
                }
                Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => return self.state(),
            }
        }
    }

    /// Validate and submit a new tire type. The list picks it up from the
    /// next snapshot.
    pub async fn add(&self, name: &str, size: &str, quantity: i64) -> Result<TireId, ViewModelError> {
        let tire = NewTire::new(name, size, quantity)?;
        self.add_tire(&tire).await
    }

    pub async fn add_tire(&self, tire: &NewTire) -> Result<TireId, ViewModelError> {
        let id = self
            .store
            .create(INVENTORY_COLLECTION, tire.to_fields())
            .await
            .inspect_err(|e| tracing::error!(error = %e, "could not add tire"))?;
        tracing::info!(%id, name = tire.name(), size = tire.size(), quantity = tire.quantity(), "tire added");
        Ok(TireId::from(id))
    }

    /// Apply `delta` to a record's quantity, clamping at zero.
    ///
    /// Returns `Ok(None)` without touching the store when `id` is not in the
    /// local list. Otherwise returns the quantity that was written.
    pub async fn adjust_quantity(
        &self,
        id: &TireId,
        delta: i64,
    ) -> Result<Option<u64>, ViewModelError> {
        if self.state().inventory.get(id).is_none() {
            tracing::debug!(%id, delta, "adjust ignored: tire not in local list");
            return Ok(None);
        }

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let doc = self
                .store
                .get(INVENTORY_COLLECTION, id.as_document_id())
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("{INVENTORY_COLLECTION}/{id}")))?;
            let current = TireRecord::from_fields(id.clone(), &doc.fields)?;
            let quantity = adjusted_quantity(current.quantity(), delta);

            let write = Write::update(
                INVENTORY_COLLECTION,
                id.as_document_id().clone(),
                quantity_fields(quantity),
            )
            .with_precondition(Precondition::UpdateTime(doc.update_time));

            match self.store.commit(vec![write]).await {
                Ok(_) => {
                    tracing::info!(%id, delta, quantity, "quantity adjusted");
                    return Ok(Some(quantity));
                }
                Err(StoreError::Conflict(reason)) => {
                    tracing::debug!(%id, attempt, %reason, "quantity changed concurrently; retrying");
                }
                Err(e) => {
                    tracing::error!(%id, error = %e, "could not update quantity");
                    return Err(e.into());
                }
            }
        }

        tracing::warn!(%id, "giving up on contended quantity update");
        Err(ViewModelError::Contended {
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }

    /// Permanently remove a tire type after confirmation.
    ///
    /// Returns `Ok(false)` when the user declined. Deleting an id that is
    /// already gone succeeds.
    pub async fn delete(&self, id: &TireId, prompter: &dyn Prompter) -> Result<bool, ViewModelError> {
        if !prompter.confirm(DELETE_CONFIRMATION) {
            return Ok(false);
        }
        self.store
            .delete(INVENTORY_COLLECTION, id.as_document_id())
            .await
            .inspect_err(|e| tracing::error!(%id, error = %e, "could not delete tire"))?;
        tracing::info!(%id, "tire deleted");
        Ok(true)
    }
}
