//! Askama HTML templates (files under `templates/`).

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::app::errors;
use crate::screens::{HomeMenu, ScreenView};

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate<'a> {
    pub menu: &'a HomeMenu,
}

#[derive(Template)]
#[template(path = "screen.html")]
pub struct ScreenTemplate<'a> {
    pub view: &'a ScreenView,
}

/// Render a template into an HTML response with `status`.
pub fn render<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "template rendering failed");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "render_error", e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SessionContext;
    use crate::screens::ScreenKind;
    use crate::view_model::InventoryState;
    use nightstocker_core::{TireId, UserId};
    use nightstocker_inventory::{InventoryList, TireRecord};

    fn view(kind: ScreenKind) -> ScreenView {
        let state = InventoryState {
            loading: false,
            error: None,
            inventory: InventoryList::from_records(vec![
                TireRecord::new("t1".parse::<TireId>().unwrap(), "<Michelin>", "245/70R19.5", 0),
                TireRecord::new("t2".parse::<TireId>().unwrap(), "Goodyear", "11R22.5", 4),
            ]),
        };
        ScreenView::build(kind, &state, &SessionContext::new(UserId::new("bay-1").unwrap()))
    }

    #[test]
    fn home_lists_both_screens() {
        let html = HomeTemplate {
            menu: &HomeMenu::default(),
        }
        .render()
        .unwrap();
        assert!(html.contains("href=\"/tech\""));
        assert!(html.contains("href=\"/stocker\""));
        assert!(html.contains("RoadTech"));
    }

    #[test]
    fn screen_escapes_record_text() {
        let html = ScreenTemplate {
            view: &view(ScreenKind::Stocker),
        }
        .render()
        .unwrap();
        assert!(html.contains("&lt;Michelin&gt;"));
        assert!(!html.contains("<Michelin>"));
    }

    #[test]
    fn stocker_has_the_form_and_tech_asks_for_an_id() {
        let stocker = ScreenTemplate {
            view: &view(ScreenKind::Stocker),
        }
        .render()
        .unwrap();
        assert!(stocker.contains("Add New Tire Type"));
        assert!(stocker.contains("Total Stock Count"));

        let tech = ScreenTemplate {
            view: &view(ScreenKind::Tech),
        }
        .render()
        .unwrap();
        assert!(!tech.contains("Add New Tire Type"));
        assert!(tech.contains("name=\"tech_id\""));
        assert!(tech.contains("/tech/t2/pull"));
    }
}
