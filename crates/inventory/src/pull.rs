//! Technician-gated pull workflow and the pull audit log.
//!
//! ```text
//! Idle → AwaitingTechId → Validated → Applying → Logged
//!              │
//!              ├─→ Idle      (blank / cancelled input)
//!              └─→ Rejected  (unknown technician)
//! ```
//!
//! A pull on a record with zero stock is rejected at trigger time, before the
//! technician prompt has any effect. The decrement and the log entry are
//! planned together so the caller can commit them as one atomic write.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use nightstocker_core::{DomainError, DomainResult, PullLogId, TechId, TireId};

use crate::stock::{StockChange, adjusted_quantity};
use crate::technician::{Identification, Technician, TechnicianRoster};
use crate::tire::TireRecord;

/// Append-only collection of pull audit records.
pub const PULL_LOG_COLLECTION: &str = "tireLogs";

/// Document field names in the `tireLogs` collection.
pub mod fields {
    pub const TECH_ID: &str = "techId";
    pub const TECH_NAME: &str = "techName";
    pub const TIRE: &str = "tire";
    pub const TIMESTAMP: &str = "timestamp";
}

/// Why a pull did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PullRejection {
    #[error("No stock available.")]
    OutOfStock { tire_id: TireId },

    #[error("Invalid Tech ID. Try again.")]
    UnknownTechnician { input: String },

    #[error("Tire not found.")]
    UnknownTire { tire_id: TireId },
}

impl From<PullRejection> for DomainError {
    fn from(value: PullRejection) -> Self {
        match value {
            PullRejection::UnknownTechnician { .. } => DomainError::unauthorized(value.to_string()),
            PullRejection::UnknownTire { .. } => DomainError::not_found(),
            PullRejection::OutOfStock { .. } => DomainError::invariant(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullState {
    Idle,
    AwaitingTechId {
        tire: TireRecord,
    },
    Validated {
        tire: TireRecord,
        technician: Technician,
    },
    Applying {
        tire: TireRecord,
        technician: Technician,
        new_quantity: u64,
    },
    Logged {
        tire_id: TireId,
        technician: Technician,
        new_quantity: u64,
    },
    Rejected(PullRejection),
}

impl PullState {
    pub fn name(&self) -> &'static str {
        match self {
            PullState::Idle => "idle",
            PullState::AwaitingTechId { .. } => "awaiting_tech_id",
            PullState::Validated { .. } => "validated",
            PullState::Applying { .. } => "applying",
            PullState::Logged { .. } => "logged",
            PullState::Rejected(_) => "rejected",
        }
    }
}

/// Writes a validated pull needs: the quantity update and the log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullPlan {
    pub tire_id: TireId,
    /// Quantity the plan was computed from.
    pub previous_quantity: u64,
    pub new_quantity: u64,
    pub log: PullLogDraft,
}

/// One pull attempt, driven step by step by the Tech screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullWorkflow {
    state: PullState,
}

impl Default for PullWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl PullWorkflow {
    pub fn new() -> Self {
        Self {
            state: PullState::Idle,
        }
    }

    pub fn state(&self) -> &PullState {
        &self.state
    }

    /// Pull button pressed for `tire` (`None` when the id is not in the list).
    pub fn trigger(&mut self, tire: Option<&TireRecord>, tire_id: &TireId) -> DomainResult<&PullState> {
        self.expect_state(matches!(self.state, PullState::Idle), "trigger")?;

        self.state = match tire {
            None => PullState::Rejected(PullRejection::UnknownTire {
                tire_id: tire_id.clone(),
            }),
            Some(t) if !t.can_pull() => PullState::Rejected(PullRejection::OutOfStock {
                tire_id: t.id_typed().clone(),
            }),
            Some(t) => PullState::AwaitingTechId { tire: t.clone() },
        };
        Ok(&self.state)
    }

    /// Technician id entered at the prompt (`None` when cancelled).
    pub fn submit_tech_id(
        &mut self,
        input: Option<&str>,
        roster: &TechnicianRoster,
    ) -> DomainResult<&PullState> {
        let tire = match &self.state {
            PullState::AwaitingTechId { tire } => tire.clone(),
            _ => return Err(self.invalid_transition("submit_tech_id")),
        };

        self.state = match roster.identify(input.unwrap_or_default()) {
            Identification::Blank => PullState::Idle,
            Identification::Unknown(input) => {
                PullState::Rejected(PullRejection::UnknownTechnician { input })
            }
            Identification::Known(technician) => PullState::Validated {
                tire,
                technician: technician.clone(),
            },
        };
        Ok(&self.state)
    }

    /// Move a validated pull to `Applying` and return the writes to commit.
    pub fn begin_apply(&mut self) -> DomainResult<PullPlan> {
        let (tire, technician) = match &self.state {
            PullState::Validated { tire, technician } => (tire.clone(), technician.clone()),
            _ => return Err(self.invalid_transition("begin_apply")),
        };
        self.plan_for(tire, technician)
    }

    /// Re-plan an in-flight pull against a fresher copy of the record, after
    /// the store reported the previous plan as stale.
    pub fn refresh(&mut self, tire: &TireRecord) -> DomainResult<PullPlan> {
        let technician = match &self.state {
            PullState::Applying { technician, .. } => technician.clone(),
            _ => return Err(self.invalid_transition("refresh")),
        };
        if !tire.can_pull() {
            let rejection = PullRejection::OutOfStock {
                tire_id: tire.id_typed().clone(),
            };
            self.state = PullState::Rejected(rejection.clone());
            return Err(rejection.into());
        }
        self.plan_for(tire.clone(), technician)
    }

    /// Both writes were committed.
    pub fn complete(&mut self) -> DomainResult<&PullState> {
        let (tire_id, technician, new_quantity) = match &self.state {
            PullState::Applying {
                tire,
                technician,
                new_quantity,
            } => (tire.id_typed().clone(), technician.clone(), *new_quantity),
            _ => return Err(self.invalid_transition("complete")),
        };
        self.state = PullState::Logged {
            tire_id,
            technician,
            new_quantity,
        };
        Ok(&self.state)
    }

    /// The record disappeared while the pull was in flight.
    pub fn tire_vanished(&mut self) -> DomainResult<&PullState> {
        let tire_id = match &self.state {
            PullState::Applying { tire, .. } => tire.id_typed().clone(),
            _ => return Err(self.invalid_transition("tire_vanished")),
        };
        self.state = PullState::Rejected(PullRejection::UnknownTire { tire_id });
        Ok(&self.state)
    }

    /// Abandon the attempt (e.g. the store write failed). Nothing was written.
    pub fn reset(&mut self) {
        self.state = PullState::Idle;
    }

    fn plan_for(&mut self, tire: TireRecord, technician: Technician) -> DomainResult<PullPlan> {
        let new_quantity = adjusted_quantity(tire.quantity(), StockChange::Pull.delta());
        let plan = PullPlan {
            tire_id: tire.id_typed().clone(),
            previous_quantity: tire.quantity(),
            new_quantity,
            log: PullLogDraft::new(&technician, &tire),
        };
        self.state = PullState::Applying {
            tire,
            technician,
            new_quantity,
        };
        Ok(plan)
    }

    fn expect_state(&self, ok: bool, op: &str) -> DomainResult<()> {
        if ok { Ok(()) } else { Err(self.invalid_transition(op)) }
    }

    fn invalid_transition(&self, op: &str) -> DomainError {
        DomainError::invariant(format!(
            "pull workflow cannot {op} from state {}",
            self.state.name()
        ))
    }
}

/// Pull log fields known before the write; the timestamp is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullLogDraft {
    pub tech_id: TechId,
    pub tech_name: String,
    pub tire: String,
}

impl PullLogDraft {
    pub fn new(technician: &Technician, tire: &TireRecord) -> Self {
        Self {
            tech_id: technician.id,
            tech_name: technician.name.clone(),
            tire: tire.description(),
        }
    }

    pub fn to_fields(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert(fields::TECH_ID.to_string(), Value::from(self.tech_id.get()));
        doc.insert(fields::TECH_NAME.to_string(), Value::from(self.tech_name.clone()));
        doc.insert(fields::TIRE.to_string(), Value::from(self.tire.clone()));
        doc
    }
}

/// A committed pull audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullLogEntry {
    pub id: PullLogId,
    pub tech_id: TechId,
    pub tech_name: String,
    pub tire: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl PullLogEntry {
    pub fn from_fields(id: PullLogId, doc: &Map<String, Value>) -> DomainResult<Self> {
        let tech_id = doc
            .get(fields::TECH_ID)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .map(TechId::new)
            .ok_or_else(|| DomainError::validation("techId is missing or not a number"))?;
        let tech_name = doc
            .get(fields::TECH_NAME)
            .and_then(Value::as_str)
            .ok_or_else(|| DomainError::validation("techName is missing"))?
            .to_string();
        let tire = doc
            .get(fields::TIRE)
            .and_then(Value::as_str)
            .ok_or_else(|| DomainError::validation("tire is missing"))?
            .to_string();
        let timestamp = doc
            .get(fields::TIMESTAMP)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc));

        Ok(Self {
            id,
            tech_id,
            tech_name,
            tire,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roster() -> TechnicianRoster {
        TechnicianRoster::new(vec![
            Technician::new(2719, "Mariano"),
            Technician::new(2720, "Alejandro"),
            Technician::new(2721, "Carlos"),
        ])
        .unwrap()
    }

    fn tire(qty: u64) -> TireRecord {
        TireRecord::new("t1".parse().unwrap(), "Michelin Agilis 51", "245/70R19.5", qty)
    }

    #[test]
    fn valid_technician_pull_plans_decrement_and_log() {
        let t = tire(5);
        let mut wf = PullWorkflow::new();
        wf.trigger(Some(&t), t.id_typed()).unwrap();
        assert!(matches!(wf.state(), PullState::AwaitingTechId { .. }));

        wf.submit_tech_id(Some("2719"), &roster()).unwrap();
        assert!(matches!(wf.state(), PullState::Validated { .. }));

        let plan = wf.begin_apply().unwrap();
        assert_eq!(plan.previous_quantity, 5);
        assert_eq!(plan.new_quantity, 4);
        assert_eq!(plan.log.tech_id, TechId::new(2719));
        assert_eq!(plan.log.tech_name, "Mariano");
        assert_eq!(plan.log.tire, "Michelin Agilis 51 245/70R19.5");

        wf.complete().unwrap();
        match wf.state() {
            PullState::Logged { new_quantity, technician, .. } => {
                assert_eq!(*new_quantity, 4);
                assert_eq!(technician.name, "Mariano");
            }
            other => panic!("expected Logged, got {other:?}"),
        }
    }

    #[test]
    fn unknown_technician_is_rejected() {
        let t = tire(5);
        let mut wf = PullWorkflow::new();
        wf.trigger(Some(&t), t.id_typed()).unwrap();
        wf.submit_tech_id(Some("9999"), &roster()).unwrap();
        assert_eq!(
            wf.state(),
            &PullState::Rejected(PullRejection::UnknownTechnician {
                input: "9999".to_string()
            })
        );
        assert!(wf.begin_apply().is_err());
    }

    #[test]
    fn cancelled_prompt_returns_to_idle() {
        let t = tire(5);
        let mut wf = PullWorkflow::new();
        wf.trigger(Some(&t), t.id_typed()).unwrap();
        wf.submit_tech_id(None, &roster()).unwrap();
        assert_eq!(wf.state(), &PullState::Idle);

        wf.trigger(Some(&t), t.id_typed()).unwrap();
        wf.submit_tech_id(Some(""), &roster()).unwrap();
        assert_eq!(wf.state(), &PullState::Idle);
    }

    #[test]
    fn zero_stock_is_rejected_before_prompt() {
        let t = tire(0);
        let mut wf = PullWorkflow::new();
        wf.trigger(Some(&t), t.id_typed()).unwrap();
        assert!(matches!(wf.state(), PullState::Rejected(PullRejection::OutOfStock { .. })));
        assert!(wf.submit_tech_id(Some("2719"), &roster()).is_err());
    }

    #[test]
    fn missing_tire_is_rejected() {
        let id: TireId = "gone".parse().unwrap();
        let mut wf = PullWorkflow::new();
        wf.trigger(None, &id).unwrap();
        assert_eq!(
            wf.state(),
            &PullState::Rejected(PullRejection::UnknownTire { tire_id: id })
        );
    }

    #[test]
    fn refresh_replans_from_fresh_quantity() {
        let t = tire(5);
        let mut wf = PullWorkflow::new();
        wf.trigger(Some(&t), t.id_typed()).unwrap();
        wf.submit_tech_id(Some("2720"), &roster()).unwrap();
        wf.begin_apply().unwrap();

        let plan = wf.refresh(&tire(3)).unwrap();
        assert_eq!(plan.previous_quantity, 3);
        assert_eq!(plan.new_quantity, 2);

        let err = wf.refresh(&tire(0)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(matches!(wf.state(), PullState::Rejected(PullRejection::OutOfStock { .. })));
    }

    #[test]
    fn out_of_order_transitions_are_errors() {
        let mut wf = PullWorkflow::new();
        assert!(wf.begin_apply().is_err());
        assert!(wf.complete().is_err());
        assert!(wf.submit_tech_id(Some("2719"), &roster()).is_err());
    }

    #[test]
    fn log_entry_round_trips_through_fields() {
        let draft = PullLogDraft::new(&Technician::new(2719, "Mariano"), &tire(5));
        let mut doc = draft.to_fields();
        doc.insert(fields::TIMESTAMP.to_string(), json!("2026-10-16T03:00:00Z"));

        let entry = PullLogEntry::from_fields("log1".parse().unwrap(), &doc).unwrap();
        assert_eq!(entry.tech_id, TechId::new(2719));
        assert_eq!(entry.tech_name, "Mariano");
        assert_eq!(entry.tire, "Michelin Agilis 51 245/70R19.5");
        assert!(entry.timestamp.is_some());
    }
}
