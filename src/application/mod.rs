// Application layer - Use cases and orchestration
pub mod chart_scale;
pub mod dashboard_service;
pub mod notification;
pub mod refresh_orchestrator;
pub mod renderer;
pub mod telemetry_repository;
pub mod view_context;
