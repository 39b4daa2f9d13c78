//! Tire inventory domain module.
//!
//! This crate contains business rules for the tire stock room, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage). Store
//! documents come in and go out as plain JSON field maps.

pub mod list;
pub mod ordering;
pub mod pull;
pub mod stock;
pub mod technician;
pub mod tire;

pub use list::InventoryList;
pub use ordering::locale_cmp;
pub use pull::{
    PULL_LOG_COLLECTION, PullLogDraft, PullLogEntry, PullPlan, PullRejection, PullState,
    PullWorkflow,
};
pub use stock::{MAX_QUANTITY, StockChange, StockSummary, adjusted_quantity};
pub use technician::{Identification, Technician, TechnicianRoster};
pub use tire::{INVALID_TIRE_MESSAGE, INVENTORY_COLLECTION, NewTire, TireRecord};
