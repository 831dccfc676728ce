// Presentation layer - HTTP surface for the host UI
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    chart_svg, events, health_check, list_panels, panel_snapshot, refresh_panel, set_history_page,
    set_interaction, update_chart_filter, update_view,
};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    // Chart SVGs are compressed in the handler, so only the JSON routes get the layer
    let json_routes = Router::new()
        .route("/panels", get(list_panels))
        .route("/panels/:name", get(panel_snapshot))
        .layer(CompressionLayer::new());

    Router::new()
        .route("/healthz", get(health_check))
        .merge(json_routes)
        .route("/panels/:name/charts/:chart", get(chart_svg))
        .route("/panels/:name/refresh", post(refresh_panel))
        .route("/panels/:name/filter", put(update_chart_filter))
        .route("/panels/:name/page", put(set_history_page))
        .route("/view", post(update_view))
        .route("/view/interaction", post(set_interaction))
        .route("/events", get(events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
