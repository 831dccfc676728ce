// Infrastructure layer - External dependencies and adapters
pub mod api_repository;
pub mod broadcast_notifier;
pub mod config;
pub mod http_response;
pub mod panel_store;
pub mod svg_surface;
