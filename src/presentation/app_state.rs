// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::refresh_orchestrator::Orchestrator;
use crate::application::view_context::ViewContext;
use crate::infrastructure::broadcast_notifier::BroadcastNotifier;
use crate::infrastructure::panel_store::PanelStore;
use std::sync::Arc;

pub struct AppState {
    pub store: Arc<PanelStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub view: Arc<ViewContext>,
    pub dashboard: Arc<DashboardService>,
    pub notifier: Arc<BroadcastNotifier>,
}
