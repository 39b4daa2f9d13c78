//! What each screen shows, independent of how it is rendered.

use serde::Serialize;

use nightstocker_inventory::TireRecord;

use crate::context::SessionContext;
use crate::view_model::InventoryState;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenKind {
    Stocker,
    Tech,
}

impl ScreenKind {
    pub fn path(self) -> &'static str {
        match self {
            ScreenKind::Stocker => "/stocker",
            ScreenKind::Tech => "/tech",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub label: &'static str,
    pub path: &'static str,
}

/// Landing page: one button per screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HomeMenu {
    pub entries: Vec<MenuEntry>,
}

impl Default for HomeMenu {
    fn default() -> Self {
        Self {
            entries: vec![
                MenuEntry {
                    label: "RoadTech",
                    path: ScreenKind::Tech.path(),
                },
                MenuEntry {
                    label: "Stocker",
                    path: ScreenKind::Stocker.path(),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub id: String,
    pub name: String,
    pub size: String,
    pub quantity: u64,
    /// Pull is offered only while stock remains.
    pub pull_enabled: bool,
}

impl From<&TireRecord> for RowView {
    fn from(record: &TireRecord) -> Self {
        Self {
            id: record.id_typed().to_string(),
            name: record.name().to_string(),
            size: record.size().to_string(),
            quantity: record.quantity(),
            pull_enabled: record.can_pull(),
        }
    }
}

/// Values typed into the Stocker creation form, echoed back after a
/// validation error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormValues {
    pub name: String,
    pub size: String,
    pub quantity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenView {
    pub kind: ScreenKind,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub status_line: String,
    pub loading: bool,
    /// Subscription or form error; empty when there is none.
    pub error: String,
    pub notice: String,
    pub distinct_types: usize,
    pub total_stock: u64,
    pub rows: Vec<RowView>,
    pub empty_message: &'static str,
    /// Creation form (Stocker only).
    pub form: Option<FormValues>,
}

impl ScreenView {
    pub fn build(kind: ScreenKind, state: &InventoryState, session: &SessionContext) -> Self {
        let summary = state.summary();
        let (title, subtitle, status_line, empty_message, form) = match kind {
            ScreenKind::Stocker => (
                "Night Room Inventory",
                "This version is connected to the document store. Data changes will persist.",
                format!("Connected User ID: {}", session.user_id()),
                "Inventory is empty. Add a tire type above!",
                Some(FormValues::default()),
            ),
            ScreenKind::Tech => (
                "Night Room Inventory (Live Data)",
                "This screen is fetching and updating data in real time from the document store.",
                if state.error.is_some() {
                    "Connection Status: Offline".to_string()
                } else {
                    "Connection Status: Live".to_string()
                },
                "Inventory is empty. (Add tires using the Stocker screen.)",
                None,
            ),
        };

        Self {
            kind,
            title,
            subtitle,
            status_line,
            loading: state.loading,
            error: state.error.clone().unwrap_or_default(),
            notice: String::new(),
            distinct_types: summary.distinct_types,
            total_stock: summary.total_stock,
            rows: state.inventory.iter().map(RowView::from).collect(),
            empty_message,
            form,
        }
    }

    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = notice.into();
        self
    }

    /// Show a form error and keep what the user typed.
    pub fn with_form_error(mut self, error: impl Into<String>, values: FormValues) -> Self {
        self.error = error.into();
        if self.form.is_some() {
            self.form = Some(values);
        }
        self
    }

    pub fn is_tech(&self) -> bool {
        self.kind == ScreenKind::Tech
    }

    pub fn has_form(&self) -> bool {
        self.form.is_some()
    }

    /// Form values to render; empty when the screen has no form.
    pub fn form_values(&self) -> FormValues {
        self.form.clone().unwrap_or_default()
    }
}
