//! HTML screens.
//!
//! Form posts redirect back to their screen (303) once the view-model has
//! seen the change, carrying an optional `?notice=<code>`. Validation errors
//! on the Stocker form re-render the screen with status 422 instead.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Form, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};

use nightstocker_core::{DomainError, TireId};
use nightstocker_inventory::{NewTire, StockChange};

use crate::app::dto::{AddTireForm, AdjustForm, DeleteForm, PullForm, ScreenQuery};
use crate::app::errors;
use crate::app::routes::parse_tire_id;
use crate::app::services::AppServices;
use crate::app::templates::{self, HomeTemplate, ScreenTemplate};
use crate::context::SessionContext;
use crate::prompt::FormPrompter;
use crate::screens::{FormValues, HomeMenu, ScreenKind, ScreenView};
use crate::tech::PullOutcome;
use crate::view_model::{InventoryState, ViewModelError};

/// How long a form post waits for its change to show up in the list.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

pub const ADD_FAILED_MESSAGE: &str = "Could not add tire. Try again.";

pub fn router() -> Router {
    Router::new()
        .route("/", get(home))
        .route("/stocker", get(stocker))
        .route("/stocker/add", post(stocker_add))
        .route("/stocker/:id/adjust", post(stocker_adjust))
        .route("/stocker/:id/delete", post(stocker_delete))
        .route("/tech", get(tech))
        .route("/tech/:id/pull", post(tech_pull))
        .route("/tech/:id/restock", post(tech_restock))
        .route("/tech/:id/delete", post(tech_delete))
}

/// Text shown for a `?notice=` code. Unknown codes show nothing.
pub fn notice_text(code: &str) -> Option<&'static str> {
    let text = match code {
        "added" => "Tire added.",
        "deleted" => "Tire type deleted.",
        "pulled" => "Tire pulled and logged.",
        "invalid_tech_id" => "Invalid Tech ID. Try again.",
        "out_of_stock" => "No stock available.",
        "unknown_tire" | "not_found" | "invalid_id" => "That tire is no longer in the inventory.",
        "conflict" => "Too many changes at once. Try again.",
        "store_unavailable" => "The inventory store is unavailable. Try again.",
        "store_error" | "validation_error" | "invariant_violation" | "unauthorized" => {
            "Could not save the change. Try again."
        }
        _ => return None,
    };
    Some(text)
}

pub async fn home() -> Response {
    templates::render(
        StatusCode::OK,
        &HomeTemplate {
            menu: &HomeMenu::default(),
        },
    )
}

pub async fn stocker(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<ScreenQuery>,
) -> Response {
    render_screen(ScreenKind::Stocker, &services, &session, query)
}

pub async fn tech(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<ScreenQuery>,
) -> Response {
    render_screen(ScreenKind::Tech, &services, &session, query)
}

fn render_screen(
    kind: ScreenKind,
    services: &AppServices,
    session: &SessionContext,
    query: ScreenQuery,
) -> Response {
    let mut view = ScreenView::build(kind, &services.inventory_state(), session);
    if let Some(text) = query.notice.as_deref().and_then(notice_text) {
        view = view.with_notice(text);
    }
    templates::render(StatusCode::OK, &ScreenTemplate { view: &view })
}

fn back_to(kind: ScreenKind, notice: Option<&str>) -> Response {
    match notice {
        Some(code) => Redirect::to(&format!("{}?notice={code}", kind.path())).into_response(),
        None => Redirect::to(kind.path()).into_response(),
    }
}

fn failed(kind: ScreenKind, err: &ViewModelError) -> Response {
    let (_, code) = errors::classify(err);
    back_to(kind, Some(code))
}

async fn settle_quantity(services: &AppServices, id: &TireId, quantity: u64) -> InventoryState {
    services
        .inventory()
        .wait_for(SETTLE_TIMEOUT, |s| {
            s.inventory.get(id).is_none_or(|r| r.quantity() == quantity)
        })
        .await
}

/// POST /stocker/add
pub async fn stocker_add(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Form(form): Form<AddTireForm>,
) -> Response {
    let values = FormValues {
        name: form.name,
        size: form.size,
        quantity: form.quantity,
    };
    let rerender = |status: StatusCode, message: &str, values: FormValues| {
        let view = ScreenView::build(ScreenKind::Stocker, &services.inventory_state(), &session)
            .with_form_error(message, values);
        templates::render(status, &ScreenTemplate { view: &view })
    };

    let tire = match NewTire::parse(&values.name, &values.size, &values.quantity) {
        Ok(tire) => tire,
        Err(DomainError::Validation(message)) => {
            return rerender(StatusCode::UNPROCESSABLE_ENTITY, &message, values);
        }
        Err(e) => return rerender(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string(), values),
    };

    match services.inventory().add_tire(&tire).await {
        Ok(id) => {
            services
                .inventory()
                .wait_for(SETTLE_TIMEOUT, |s| s.inventory.get(&id).is_some())
                .await;
            back_to(ScreenKind::Stocker, Some("added"))
        }
        Err(_) => rerender(StatusCode::BAD_GATEWAY, ADD_FAILED_MESSAGE, values),
    }
}

/// POST /stocker/:id/adjust
pub async fn stocker_adjust(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Form(form): Form<AdjustForm>,
) -> Response {
    adjust(ScreenKind::Stocker, &services, &id, form.delta).await
}

/// POST /tech/:id/restock
pub async fn tech_restock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    adjust(ScreenKind::Tech, &services, &id, StockChange::Restock.delta()).await
}

async fn adjust(kind: ScreenKind, services: &AppServices, raw_id: &str, delta: i64) -> Response {
    let id = match parse_tire_id(raw_id) {
        Ok(id) => id,
        Err(e) => return failed(kind, &e),
    };
    match services.inventory().adjust_quantity(&id, delta).await {
        Ok(Some(quantity)) => {
            settle_quantity(services, &id, quantity).await;
            back_to(kind, None)
        }
        Ok(None) => back_to(kind, None),
        Err(e) => failed(kind, &e),
    }
}

/// POST /stocker/:id/delete
pub async fn stocker_delete(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Form(form): Form<DeleteForm>,
) -> Response {
    delete(ScreenKind::Stocker, &services, &id, &form).await
}

/// POST /tech/:id/delete
pub async fn tech_delete(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Form(form): Form<DeleteForm>,
) -> Response {
    delete(ScreenKind::Tech, &services, &id, &form).await
}

async fn delete(kind: ScreenKind, services: &AppServices, raw_id: &str, form: &DeleteForm) -> Response {
    let id = match parse_tire_id(raw_id) {
        Ok(id) => id,
        Err(e) => return failed(kind, &e),
    };
    let prompter = FormPrompter::new().with_confirmation(form.confirmed());
    match services.inventory().delete(&id, &prompter).await {
        Ok(true) => {
            services
                .inventory()
                .wait_for(SETTLE_TIMEOUT, |s| s.inventory.get(&id).is_none())
                .await;
            back_to(kind, Some("deleted"))
        }
        Ok(false) => back_to(kind, None),
        Err(e) => failed(kind, &e),
    }
}

/// POST /tech/:id/pull
pub async fn tech_pull(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Form(form): Form<PullForm>,
) -> Response {
    let kind = ScreenKind::Tech;
    let id = match parse_tire_id(&id) {
        Ok(id) => id,
        Err(e) => return failed(kind, &e),
    };
    let prompter = FormPrompter::new().with_answer(Some(form.tech_id));
    let inventory = services.inventory_state().inventory;

    match services.tech().pull(&inventory, &id, &prompter).await {
        Ok(PullOutcome::Pulled { quantity, .. }) => {
            settle_quantity(&services, &id, quantity).await;
            back_to(kind, Some("pulled"))
        }
        Ok(PullOutcome::Rejected { rejection }) => {
            let (_, code) = errors::rejection_status(&rejection);
            back_to(kind, Some(code))
        }
        Ok(PullOutcome::Cancelled) => back_to(kind, None),
        Err(e) => failed(kind, &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_code_has_a_notice() {
        for code in [
            "invalid_tech_id",
            "out_of_stock",
            "unknown_tire",
            "not_found",
            "conflict",
            "store_unavailable",
            "store_error",
        ] {
            assert!(notice_text(code).is_some(), "{code}");
        }
    }

    #[test]
    fn unknown_notice_codes_are_ignored() {
        assert_eq!(notice_text("<script>"), None);
        assert_eq!(notice_text(""), None);
    }
}
