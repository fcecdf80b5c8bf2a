//! Dashboard pages and lazily loaded panel fragments

use std::sync::Arc;

use askama::Template;
use axum::Router;
use axum::extract::{Path, State};
use axum::response::Html;
use axum::routing::get;

use crate::api::types::ApiError;
use crate::domain::metrics::{
    MetricsContext, Panel, PanelBody, PanelView, build_all_panels, build_panel,
};

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate<'a> {
    title: &'a str,
    org_name: &'a str,
    version: &'static str,
    panels: Vec<PanelView>,
}

#[derive(Template)]
#[template(path = "panel.html")]
struct PanelTemplate {
    view: PanelView,
}

/// Shared state for dashboard endpoints
#[derive(Clone)]
pub struct DashboardState {
    pub ctx: Arc<MetricsContext>,
}

/// Build dashboard routes
pub fn routes(ctx: Arc<MetricsContext>) -> Router<()> {
    Router::new()
        .route("/", get(dashboard))
        .route("/state", get(state))
        .route("/status/{panel}", get(panel_status))
        .with_state(DashboardState { ctx })
}

fn render(template: &impl Template) -> Result<Html<String>, ApiError> {
    template.render().map(Html).map_err(ApiError::from_render)
}

/// Dashboard with every panel as a placeholder that loads itself
async fn dashboard(State(state): State<DashboardState>) -> Result<Html<String>, ApiError> {
    let org = state.ctx.organization().await;
    let panels = Panel::ALL
        .into_iter()
        .map(|panel| PanelView::loading(panel, &org))
        .collect();

    render(&DashboardTemplate {
        title: "Zentry",
        org_name: &org.name,
        version: env!("CARGO_PKG_VERSION"),
        panels,
    })
}

/// Every panel fetched before the page is sent
async fn state(State(state): State<DashboardState>) -> Result<Html<String>, ApiError> {
    let org = state.ctx.organization().await;
    let panels = build_all_panels(&state.ctx, &org).await;

    render(&DashboardTemplate {
        title: "Zentry - State of the System",
        org_name: &org.name,
        version: env!("CARGO_PKG_VERSION"),
        panels,
    })
}

/// Fragment for a single panel
async fn panel_status(
    State(state): State<DashboardState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, ApiError> {
    let panel = Panel::from_slug(&slug)
        .ok_or_else(|| ApiError::not_found("UNKNOWN_PANEL", format!("Unknown panel: {}", slug)))?;

    let org = state.ctx.organization().await;
    let view = build_panel(&state.ctx, &org, panel).await;
    render(&PanelTemplate { view })
}
