mod app_state;
mod config;
mod models;
mod routes;
mod services;

use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::{generation::GeminiClient, render::StubRenderer, store::JobStore};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing animagen server");
    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; every pipeline will fail at its first stage");
    }

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("animation_jobs_total", "Total animation jobs submitted");
    metrics::describe_counter!(
        "animation_jobs_completed",
        "Total animation jobs that completed all four stages"
    );
    metrics::describe_counter!(
        "animation_jobs_failed",
        "Total animation jobs that ended in a failed state"
    );
    metrics::describe_histogram!(
        "pipeline_duration_seconds",
        "Wall-clock time from pipeline start to terminal commit"
    );

    // Initialize the generation capability client
    tracing::info!(model = %config.gemini_model, "Initializing Gemini generation client");
    let generation =
        GeminiClient::new(&config).expect("Failed to initialize generation client");

    // Create shared application state
    let generation_configured = config.gemini_api_key.is_some();
    let state = AppState::new(
        JobStore::new(),
        Arc::new(generation),
        Arc::new(StubRenderer::new()),
        config.retry_policy(),
        generation_configured,
    );

    // Build API routes
    let app = routes::api_router(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024)); // prompts, not payloads

    tracing::info!("Starting animagen on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
