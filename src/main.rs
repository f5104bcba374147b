// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{
    routing::{get, patch, put},
    Router,
};
use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::classification_service::ClassificationService;
use crate::application::polygon_registry::{PolygonRegistry, Settings};
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::open_meteo_provider::OpenMeteoProvider;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    add_rule, create_polygon, delete_polygon, delete_rule, get_polygon, get_settings,
    health_check, list_polygons, put_rules, put_time_window, update_rule,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create series provider (infrastructure layer)
    let provider = Arc::new(OpenMeteoProvider::new(
        config.open_meteo.base_url,
        config.open_meteo.hourly_variable,
    ));

    // Create services (application layer)
    let classifier = ClassificationService::new(provider);
    let settings = Settings {
        time_window: config.defaults.time_window(),
        rules: config.defaults.rule_set(),
    };
    let registry = PolygonRegistry::new(classifier, settings);

    let state = Arc::new(AppState { registry });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/polygons", get(list_polygons).post(create_polygon))
        .route("/polygons/:id", get(get_polygon).delete(delete_polygon))
        .route("/settings", get(get_settings))
        .route("/time-window", put(put_time_window))
        .route("/rules", put(put_rules).post(add_rule))
        .route("/rules/:index", patch(update_rule).delete(delete_rule))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind_addr))?;
    tracing::info!("Starting polygon-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
