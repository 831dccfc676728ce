// HTTP request handlers
use crate::application::dashboard_service::{ChartFilter, CHARTS, HISTORY, REALTIME};
use crate::application::refresh_orchestrator::TriggerResult;
use crate::domain::chart::Theme;
use crate::domain::dashboard::PanelSnapshot;
use crate::domain::sensor::{Sensor, TimeRange};
use crate::infrastructure::http_response::{accepts_brotli, svg_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Serialize)]
pub struct PanelSummary {
    pub panel: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub fetching: bool,
}

#[derive(Debug, Deserialize)]
pub struct FilterUpdate {
    pub time_range: Option<TimeRange>,
    pub sensors: Option<Vec<Sensor>>,
}

#[derive(Debug, Deserialize)]
pub struct PageUpdate {
    pub page: u32,
}

#[derive(Debug, Deserialize)]
pub struct ViewUpdate {
    pub visible: Option<bool>,
    pub theme: Option<Theme>,
}

#[derive(Debug, Serialize)]
pub struct ViewStatus {
    pub visible: bool,
    pub theme: Theme,
}

#[derive(Debug, Deserialize)]
pub struct InteractionUpdate {
    pub panel: String,
    pub active: bool,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Every registered panel with its last update time
pub async fn list_panels(State(state): State<Arc<AppState>>) -> Json<Vec<PanelSummary>> {
    let panels = state
        .orchestrator
        .task_names()
        .map(|name| PanelSummary {
            panel: name.to_string(),
            updated_at: state.store.get(name).map(|s| s.updated_at),
            fetching: state.orchestrator.is_fetching(name).unwrap_or(false),
        })
        .collect();
    Json(panels)
}

pub async fn panel_snapshot(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<PanelSnapshot>, StatusCode> {
    state.store.get(&name).map(Json).ok_or(StatusCode::NOT_FOUND)
}

pub async fn chart_svg(
    Path((name, chart)): Path<(String, String)>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let svg = state
        .store
        .get(&name)
        .and_then(|snapshot| snapshot.chart(&chart).map(|c| c.svg.clone()));

    let Some(svg) = svg else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match svg_response(svg, accepts_brotli(&headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

fn trigger_status(state: &AppState, name: &str) -> StatusCode {
    match state.orchestrator.trigger(name) {
        TriggerResult::Started | TriggerResult::InFlight => StatusCode::ACCEPTED,
        TriggerResult::UnknownTask => StatusCode::NOT_FOUND,
        TriggerResult::Stopped => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub async fn refresh_panel(Path(name): Path<String>, State(state): State<Arc<AppState>>) -> StatusCode {
    trigger_status(&state, &name)
}

/// Change the charts panel time range or sensor selection, then refresh it
pub async fn update_chart_filter(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(update): Json<FilterUpdate>,
) -> Result<(StatusCode, Json<ChartFilter>), (StatusCode, String)> {
    if name != CHARTS {
        return Err((StatusCode::NOT_FOUND, format!("panel {} has no filter", name)));
    }

    let current = state.dashboard.charts.filter();
    let filter = ChartFilter {
        time_range: update.time_range.unwrap_or(current.time_range),
        sensors: update.sensors.unwrap_or(current.sensors),
    };

    state
        .dashboard
        .charts
        .set_filter(filter.clone())
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    tracing::info!(time_range = filter.time_range.as_query(), sensors = filter.sensors.len(), "chart filter changed");

    Ok((trigger_status(&state, CHARTS), Json(filter)))
}

pub async fn set_history_page(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(update): Json<PageUpdate>,
) -> StatusCode {
    if name != HISTORY {
        return StatusCode::NOT_FOUND;
    }
    state.dashboard.history.set_page(update.page);
    trigger_status(&state, HISTORY)
}

/// Visibility and theme reported by the host UI
pub async fn update_view(State(state): State<Arc<AppState>>, Json(update): Json<ViewUpdate>) -> Json<ViewStatus> {
    if let Some(theme) = update.theme {
        state.view.set_theme(theme);
    }

    if let Some(visible) = update.visible {
        if state.view.set_visible(visible) {
            tracing::debug!("view visible again, refreshing realtime panel");
            trigger_status(&state, REALTIME);
        }
    }

    Json(ViewStatus {
        visible: state.view.is_visible(),
        theme: state.view.theme(),
    })
}

pub async fn set_interaction(State(state): State<Arc<AppState>>, Json(update): Json<InteractionUpdate>) -> StatusCode {
    state.view.set_interacting(&update.panel, update.active);
    StatusCode::NO_CONTENT
}

/// Server-sent events: `notification` toasts and `panel` update names
pub async fn events(State(state): State<Arc<AppState>>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut notifications = state.notifier.subscribe();
    let mut updates = state.store.subscribe();

    let notification_events = async_stream::stream! {
        loop {
            match notifications.recv().await {
                Ok(notification) => match Event::default().event("notification").json_data(&notification) {
                    Ok(event) => yield Ok(event),
                    Err(e) => tracing::warn!(error = %e, "failed to encode notification event"),
                },
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "event client lagging"),
                Err(RecvError::Closed) => break,
            }
        }
    };

    let panel_events = async_stream::stream! {
        loop {
            match updates.recv().await {
                Ok(panel) => yield Ok(Event::default().event("panel").data(panel)),
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "event client lagging"),
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream::select(notification_events, panel_events)).keep_alive(KeepAlive::default())
}
