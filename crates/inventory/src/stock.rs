//! Quantity rules and derived stock statistics.

use serde::Serialize;

use crate::tire::TireRecord;

/// Largest quantity a record can hold; the store keeps quantities as int64.
pub const MAX_QUANTITY: u64 = i64::MAX as u64;

/// Quantity after applying `delta`, clamped to `0..=MAX_QUANTITY`.
///
/// Positive deltas restock, negative deltas pull; the sign is not validated.
pub fn adjusted_quantity(current: u64, delta: i64) -> u64 {
    let next = i128::from(current) + i128::from(delta);
    next.clamp(0, i128::from(MAX_QUANTITY)) as u64
}

/// The two single-step quantity changes offered on every row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StockChange {
    Pull,
    Restock,
}

impl StockChange {
    pub fn delta(self) -> i64 {
        match self {
            StockChange::Pull => -1,
            StockChange::Restock => 1,
        }
    }
}

/// Summary statistics shown above the inventory list.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StockSummary {
    /// Number of tire records.
    pub distinct_types: usize,
    /// Sum of all quantities, saturating at `u64::MAX`.
    pub total_stock: u64,
}

impl StockSummary {
    pub fn of(records: &[TireRecord]) -> Self {
        Self {
            distinct_types: records.len(),
            total_stock: records
                .iter()
                .map(TireRecord::quantity)
                .fold(0, u64::saturating_add),
        }
    }
}
