use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use thiserror::Error;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use nightstocker_core::UserId;
use nightstocker_inventory::TechnicianRoster;
use nightstocker_store::{DocumentStore, InMemoryDocumentStore, StoreError};

use crate::app::dto;
use crate::config::{AppConfig, ConfigError, StoreBackend, StoreConfig};
use crate::tech::TechPullService;
use crate::view_model::{Activation, InventoryState, InventoryViewModel};

/// The store every screen talks to, chosen at startup.
pub type SharedStore = Arc<dyn DocumentStore>;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything the HTTP handlers need.
///
/// Holds the view-model activation: the inventory subscription lives as
/// long as the services do.
pub struct AppServices {
    inventory: InventoryViewModel<SharedStore>,
    tech: TechPullService<SharedStore>,
    default_user: UserId,
    _activation: Activation,
}

impl AppServices {
    /// Wire services over `store` and activate the inventory view-model.
    pub async fn start(
        store: SharedStore,
        roster: TechnicianRoster,
        default_user: UserId,
    ) -> Result<Self, StartupError> {
        if roster.is_empty() {
            tracing::warn!("technician roster is empty; every Tech screen pull will be rejected");
        }
        let inventory = InventoryViewModel::new(Arc::clone(&store));
        let activation = inventory.activate().await;
        let tech = TechPullService::new(store, roster);

        Ok(Self {
            inventory,
            tech,
            default_user,
            _activation: activation,
        })
    }

    pub fn inventory(&self) -> &InventoryViewModel<SharedStore> {
        &self.inventory
    }

    pub fn tech(&self) -> &TechPullService<SharedStore> {
        &self.tech
    }

    pub fn default_user(&self) -> &UserId {
        &self.default_user
    }

    /// Current inventory state.
    pub fn inventory_state(&self) -> InventoryState {
        self.inventory.state()
    }
}

/// Build services from configuration (used by `main.rs`).
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StartupError> {
    let store = open_store(&config.store)?;
    AppServices::start(store, config.roster()?, config.default_user()?).await
}

fn open_store(config: &StoreConfig) -> Result<SharedStore, StartupError> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store; data is lost on exit");
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
        StoreBackend::Firestore => open_firestore(config),
    }
}

#[cfg(feature = "firestore")]
fn open_firestore(config: &StoreConfig) -> Result<SharedStore, StartupError> {
    let settings = config.firestore.clone().ok_or_else(|| {
        ConfigError::Invalid("store.backend = \"firestore\" requires [store.firestore]".to_string())
    })?;
    tracing::info!(project = %settings.project_id, database = %settings.database, "using firestore");
    Ok(Arc::new(nightstocker_store::FirestoreStore::new(settings)?))
}

#[cfg(not(feature = "firestore"))]
fn open_firestore(_config: &StoreConfig) -> Result<SharedStore, StartupError> {
    Err(ConfigError::Invalid("built without the `firestore` feature".to_string()).into())
}

/// SSE stream of inventory states (used by `/api/inventory/stream`).
///
/// Starts with the current state; lagging clients skip to the next update.
pub fn inventory_sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.inventory().subscribe();
    let initial = services.inventory_state();

    let to_event = |state: InventoryState| -> Result<SseEvent, Infallible> {
        let data = serde_json::to_string(&dto::inventory_to_json(&state))
            .unwrap_or_else(|_| "{}".to_string());
        Ok(SseEvent::default().event("inventory").data(data))
    };

    let updates = BroadcastStream::new(rx).filter_map(move |msg| msg.ok().map(to_event));
    let stream = tokio_stream::once(to_event(initial)).chain(updates);

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
