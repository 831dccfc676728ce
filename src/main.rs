// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::refresh_orchestrator::Orchestrator;
use crate::application::view_context::ViewContext;
use crate::infrastructure::api_repository::HttpTelemetryRepository;
use crate::infrastructure::broadcast_notifier::BroadcastNotifier;
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::panel_store::PanelStore;
use crate::presentation::app_state::AppState;

const EVENT_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_dashboard_config()?;
    tracing::info!(backend = %config.backend.base_url, "configuration loaded");

    // Create repository (infrastructure layer)
    let repository = Arc::new(HttpTelemetryRepository::new(
        &config.backend.base_url,
        std::time::Duration::from_millis(config.backend.timeout_ms),
    )?);
    let store = Arc::new(PanelStore::new(EVENT_CAPACITY));
    let notifier = Arc::new(BroadcastNotifier::new(EVENT_CAPACITY));
    let view = Arc::new(ViewContext::new(config.view.theme));

    // Create panel jobs and the orchestrator (application layer)
    let dashboard = Arc::new(DashboardService::new(repository, view.clone(), &config));
    let mut orchestrator = Orchestrator::new(
        store.clone(),
        notifier.clone(),
        view.clone(),
        config.refresh.notification_cooldown(),
    );
    dashboard.register(&mut orchestrator, &config.refresh);
    let orchestrator = Arc::new(orchestrator);
    orchestrator.start();

    // Create application state
    let state = Arc::new(AppState {
        store,
        orchestrator: orchestrator.clone(),
        view,
        dashboard,
        notifier,
    });

    // Build router (presentation layer)
    let router = presentation::router(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!(%addr, "starting weather-dashboard service");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    orchestrator.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await
}

/// Resolves once the signal fires. A signal that cannot be installed keeps the server running.
async fn wait_for_shutdown(signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
