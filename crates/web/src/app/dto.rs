use serde::Deserialize;
use serde_json::{Value, json};

use crate::screens::RowView;
use crate::view_model::InventoryState;

// -------------------------
// JSON request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct AddTireRequest {
    pub name: String,
    pub size: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdjustQuantityRequest {
    pub delta: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteTireRequest {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PullRequest {
    /// Free text as typed at the prompt; absent means cancelled.
    pub tech_id: Option<String>,
}

// -------------------------
// HTML form DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct AddTireForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub quantity: String,
}

#[derive(Debug, Deserialize)]
pub struct AdjustForm {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    pub confirm: String,
}

impl DeleteForm {
    pub fn confirmed(&self) -> bool {
        matches!(self.confirm.as_str(), "yes" | "true" | "on")
    }
}

#[derive(Debug, Deserialize)]
pub struct PullForm {
    #[serde(default)]
    pub tech_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScreenQuery {
    pub notice: Option<String>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn inventory_to_json(state: &InventoryState) -> Value {
    let summary = state.summary();
    let items: Vec<RowView> = state.inventory.iter().map(RowView::from).collect();
    json!({
        "loading": state.loading,
        "error": state.error,
        "summary": summary,
        "items": items,
    })
}
