// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use opentsdb_datasource::application::annotations_service::{AnnotationsService, StaticRegistry};
use opentsdb_datasource::application::datasource::OpenTsdbDatasource;
use opentsdb_datasource::infrastructure::alert_log::AlertLog;
use opentsdb_datasource::infrastructure::config::load_app_config;
use opentsdb_datasource::infrastructure::dates::RelativeDateParser;
use opentsdb_datasource::infrastructure::opentsdb_client::OpenTsdbClient;
use opentsdb_datasource::infrastructure::variables::VariableMap;
use opentsdb_datasource::presentation::app_state::AppState;
use opentsdb_datasource::presentation::handlers::{
    annotations, find, health_check, lookup, query, recent_alerts, refresh_annotations, suggest,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Backend client and collaborators (infrastructure layer)
    let backend = Arc::new(
        OpenTsdbClient::new(&config.opentsdb.url, Duration::from_secs(config.opentsdb.timeout_secs))
            .context("Failed to build OpenTSDB client")?,
    );
    let templates = Arc::new(VariableMap::new(config.variables.clone()));
    let alerts = Arc::new(AlertLog::new(config.server.alert_capacity));

    // Datasource and annotation aggregation (application layer)
    let datasource = Arc::new(OpenTsdbDatasource::new(
        config.opentsdb.name.clone(),
        backend,
        templates,
        Arc::new(RelativeDateParser::new()),
    ));
    let registry = Arc::new(StaticRegistry::new(config.opentsdb.name.clone(), datasource.clone()));
    let annotations_service = Arc::new(AnnotationsService::new(registry, alerts.clone()));

    let state = Arc::new(AppState {
        datasource,
        annotations: annotations_service,
        alerts,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/api/query", post(query))
        .route("/api/suggest", post(suggest))
        .route("/api/lookup", post(lookup))
        .route("/api/find", get(find))
        .route("/api/annotations", post(annotations))
        .route("/api/annotations/refresh", post(refresh_annotations))
        .route("/api/alerts", get(recent_alerts))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server.listen_addr))?;
    tracing::info!(
        "Starting opentsdb-datasource on {} (backend {})",
        addr,
        config.opentsdb.url
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
