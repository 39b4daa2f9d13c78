//! Technician-gated pulls for the Tech screen.
//!
//! A pull decrements the record and appends one `tireLogs` entry in a single
//! atomic commit. The decrement is conditional on the record's update time,
//! so two technicians pulling the same tire at once both get counted.

use std::sync::Arc;

use serde::Serialize;

use nightstocker_core::{PullLogId, TireId};
use nightstocker_inventory::pull::fields as log_fields;
use nightstocker_inventory::tire::quantity_fields;
use nightstocker_inventory::{
    INVENTORY_COLLECTION, InventoryList, PULL_LOG_COLLECTION, PullLogEntry, PullRejection,
    PullState, PullWorkflow, Technician, TechnicianRoster, TireRecord,
};
use nightstocker_store::{DocumentStore, Precondition, StoreError, Write};

use crate::prompt::{Prompter, TECH_ID_PROMPT};
use crate::view_model::{MAX_WRITE_ATTEMPTS, ViewModelError};

/// How a pull attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PullOutcome {
    /// The prompt was left blank or cancelled.
    Cancelled,
    Rejected { rejection: PullRejection },
    Pulled {
        tire_id: TireId,
        technician: Technician,
        quantity: u64,
        log_id: PullLogId,
    },
}

#[derive(Debug, Clone)]
pub struct TechPullService<S> {
    store: S,
    roster: Arc<TechnicianRoster>,
}

impl<S> TechPullService<S>
where
    S: DocumentStore,
{
    pub fn new(store: S, roster: TechnicianRoster) -> Self {
        Self {
            store,
            roster: Arc::new(roster),
        }
    }

    pub fn roster(&self) -> &TechnicianRoster {
        &self.roster
    }

    /// Run one pull for `tire_id` as shown in `inventory`.
    ///
    /// Rejections are reported through `prompter.notify` and returned as
    /// `PullOutcome::Rejected`; nothing is written in that case.
    pub async fn pull(
        &self,
        inventory: &InventoryList,
        tire_id: &TireId,
        prompter: &dyn Prompter,
    ) -> Result<PullOutcome, ViewModelError> {
        let mut workflow = PullWorkflow::new();

        workflow.trigger(inventory.get(tire_id), tire_id)?;
        if let Some(outcome) = rejected(&workflow, prompter) {
            return Ok(outcome);
        }

        let input = prompter.prompt(TECH_ID_PROMPT);
        workflow.submit_tech_id(input.as_deref(), &self.roster)?;
        if matches!(workflow.state(), PullState::Idle) {
            return Ok(PullOutcome::Cancelled);
        }
        if let Some(outcome) = rejected(&workflow, prompter) {
            tracing::info!(%tire_id, "pull rejected: unknown technician");
            return Ok(outcome);
        }

        workflow.begin_apply()?;
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let Some(doc) = self
                .store
                .get(INVENTORY_COLLECTION, tire_id.as_document_id())
                .await?
            else {
                workflow.tire_vanished()?;
                return Ok(rejected(&workflow, prompter).unwrap_or(PullOutcome::Cancelled));
            };
            let fresh = TireRecord::from_fields(tire_id.clone(), &doc.fields)?;

            let plan = match workflow.refresh(&fresh) {
                Ok(plan) => plan,
                Err(e) => {
                    return match rejected(&workflow, prompter) {
                        Some(outcome) => Ok(outcome),
                        None => Err(e.into()),
                    };
                }
            };

            let decrement = Write::update(
                INVENTORY_COLLECTION,
                plan.tire_id.as_document_id().clone(),
                quantity_fields(plan.new_quantity),
            )
            .with_precondition(Precondition::UpdateTime(doc.update_time));
            let log = Write::create(PULL_LOG_COLLECTION, plan.log.to_fields())
                .with_server_timestamp(log_fields::TIMESTAMP);
            let log_id = PullLogId::from(log.id().clone());

            match self.store.commit(vec![decrement, log]).await {
                Ok(_) => {
                    workflow.complete()?;
                    let PullState::Logged {
                        technician,
                        new_quantity,
                        ..
                    } = workflow.state().clone()
                    else {
                        return Err(nightstocker_core::DomainError::invariant(
                            "pull did not reach the logged state",
                        )
                        .into());
                    };
                    tracing::info!(
                        %tire_id,
                        tech_id = %technician.id,
                        tech = %technician.name,
                        quantity = new_quantity,
                        %log_id,
                        "tire pulled"
                    );
                    return Ok(PullOutcome::Pulled {
                        tire_id: tire_id.clone(),
                        technician,
                        quantity: new_quantity,
                        log_id,
                    });
                }
                Err(StoreError::Conflict(reason)) => {
                    tracing::debug!(%tire_id, attempt, %reason, "pull raced another write; retrying");
                }
                Err(e) => {
                    workflow.reset();
                    tracing::error!(%tire_id, error = %e, "pull failed; nothing was written");
                    return Err(e.into());
                }
            }
        }

        workflow.reset();
        Err(ViewModelError::Contended {
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }

    /// All pull log entries, newest first.
    pub async fn pull_logs(&self) -> Result<Vec<PullLogEntry>, ViewModelError> {
        let snapshot = self.store.list(PULL_LOG_COLLECTION).await?;
        let mut entries: Vec<PullLogEntry> = snapshot
            .documents
            .iter()
            .filter_map(|doc| {
                PullLogEntry::from_fields(PullLogId::from(doc.id.clone()), &doc.fields)
                    .inspect_err(|e| tracing::warn!(id = %doc.id, error = %e, "skipping malformed pull log"))
                    .ok()
            })
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }
}

fn rejected(workflow: &PullWorkflow, prompter: &dyn Prompter) -> Option<PullOutcome> {
    match workflow.state() {
        PullState::Rejected(rejection) => {
            prompter.notify(&rejection.to_string());
            Some(PullOutcome::Rejected {
                rejection: rejection.clone(),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::FormPrompter;
    use crate::view_model::{InventoryViewModel, inventory_from_snapshot};
    use nightstocker_inventory::NewTire;
    use nightstocker_store::InMemoryDocumentStore;

    fn roster() -> TechnicianRoster {
        TechnicianRoster::new(vec![
            Technician::new(2719, "Mariano"),
            Technician::new(2720, "Alejandro"),
            Technician::new(2721, "Carlos"),
        ])
        .unwrap()
    }

    async fn seeded(quantity: i64) -> (Arc<InMemoryDocumentStore>, TireId) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let tire = NewTire::new("Michelin Agilis 51", "245/70R19.5", quantity).unwrap();
        let id = store.create(INVENTORY_COLLECTION, tire.to_fields()).await.unwrap();
        (store, TireId::from(id))
    }

    async fn inventory(store: &Arc<InMemoryDocumentStore>) -> InventoryList {
        inventory_from_snapshot(&store.list(INVENTORY_COLLECTION).await.unwrap())
    }

    async fn quantity(store: &Arc<InMemoryDocumentStore>, id: &TireId) -> u64 {
        inventory(store).await.get(id).unwrap().quantity()
    }

    async fn log_count(store: &Arc<InMemoryDocumentStore>) -> usize {
        store.list(PULL_LOG_COLLECTION).await.unwrap().documents.len()
    }

    #[tokio::test]
    async fn known_technician_pulls_and_logs_once() {
        let (store, id) = seeded(5).await;
        let service = TechPullService::new(Arc::clone(&store), roster());
        let prompter = FormPrompter::new().with_answer(Some("2719".to_string()));

        let outcome = service
            .pull(&inventory(&store).await, &id, &prompter)
            .await
            .unwrap();
        assert!(matches!(outcome, PullOutcome::Pulled { quantity: 4, .. }));
        assert_eq!(quantity(&store, &id).await, 4);

        let logs = service.pull_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].tech_id.get(), 2719);
        assert_eq!(logs[0].tech_name, "Mariano");
        assert_eq!(logs[0].tire, "Michelin Agilis 51 245/70R19.5");
        assert!(logs[0].timestamp.is_some());
    }

    #[tokio::test]
    async fn unknown_technician_changes_nothing() {
        let (store, id) = seeded(5).await;
        let service = TechPullService::new(Arc::clone(&store), roster());
        let prompter = FormPrompter::new().with_answer(Some("9999".to_string()));

        let outcome = service
            .pull(&inventory(&store).await, &id, &prompter)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            PullOutcome::Rejected {
                rejection: PullRejection::UnknownTechnician { .. }
            }
        ));
        assert_eq!(prompter.notices(), vec!["Invalid Tech ID. Try again.".to_string()]);
        assert_eq!(quantity(&store, &id).await, 5);
        assert_eq!(log_count(&store).await, 0);
    }

    #[tokio::test]
    async fn blank_input_cancels_silently() {
        let (store, id) = seeded(5).await;
        let service = TechPullService::new(Arc::clone(&store), roster());
        let prompter = FormPrompter::new().with_answer(Some("   ".to_string()));

        let outcome = service
            .pull(&inventory(&store).await, &id, &prompter)
            .await
            .unwrap();
        assert_eq!(outcome, PullOutcome::Cancelled);
        assert!(prompter.notices().is_empty());
        assert_eq!(log_count(&store).await, 0);
    }

    #[tokio::test]
    async fn empty_stock_is_rejected_before_prompting() {
        let (store, id) = seeded(0).await;
        let service = TechPullService::new(Arc::clone(&store), roster());
        let prompter = FormPrompter::new().with_answer(Some("2719".to_string()));

        let outcome = service
            .pull(&inventory(&store).await, &id, &prompter)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            PullOutcome::Rejected {
                rejection: PullRejection::OutOfStock { .. }
            }
        ));
        assert_eq!(log_count(&store).await, 0);
    }

    #[tokio::test]
    async fn stock_emptied_elsewhere_is_rejected_at_commit_time() {
        let (store, id) = seeded(1).await;
        let cached = inventory(&store).await;
        store
            .update(INVENTORY_COLLECTION, id.as_document_id(), quantity_fields(0))
            .await
            .unwrap();

        let service = TechPullService::new(Arc::clone(&store), roster());
        let prompter = FormPrompter::new().with_answer(Some("2720".to_string()));
        let outcome = service.pull(&cached, &id, &prompter).await.unwrap();

        assert!(matches!(
            outcome,
            PullOutcome::Rejected {
                rejection: PullRejection::OutOfStock { .. }
            }
        ));
        assert_eq!(prompter.notices(), vec!["No stock available.".to_string()]);
        assert_eq!(log_count(&store).await, 0);
    }

    #[tokio::test]
    async fn failed_commit_writes_neither_decrement_nor_log() {
        let (store, id) = seeded(3).await;
        let service = TechPullService::new(Arc::clone(&store), roster());
        let prompter = FormPrompter::new().with_answer(Some("2721".to_string()));

        store.fail_next_commits(1).unwrap();
        let err = service
            .pull(&inventory(&store).await, &id, &prompter)
            .await
            .unwrap_err();
        assert!(matches!(err, ViewModelError::Store(StoreError::Unavailable(_))));
        assert_eq!(quantity(&store, &id).await, 3);
        assert_eq!(log_count(&store).await, 0);
    }

    #[tokio::test]
    async fn concurrent_pulls_are_all_counted() {
        let (store, id) = seeded(10).await;
        let service = TechPullService::new(Arc::clone(&store), roster());
        let cached = inventory(&store).await;

        let mut tasks = Vec::new();
        for tech in ["2719", "2720", "2721"] {
            let service = service.clone();
            let cached = cached.clone();
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                let prompter = FormPrompter::new().with_answer(Some(tech.to_string()));
                service.pull(&cached, &id, &prompter).await
            }));
        }
        for task in tasks {
            assert!(matches!(task.await.unwrap(), Ok(PullOutcome::Pulled { .. })));
        }

        assert_eq!(quantity(&store, &id).await, 7);
        assert_eq!(log_count(&store).await, 3);
    }

    #[tokio::test]
    async fn restock_needs_no_technician() {
        let (store, id) = seeded(0).await;
        let vm = InventoryViewModel::new(Arc::clone(&store));
        let _activation = vm.activate().await;
        let wanted = id.clone();
        vm.wait_for(std::time::Duration::from_secs(2), move |s| s.inventory.get(&wanted).is_some())
            .await;

        assert_eq!(vm.adjust_quantity(&id, 1).await.unwrap(), Some(1));
        assert_eq!(log_count(&store).await, 0);
    }
}
