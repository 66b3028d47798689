use anyhow::Result;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};

use quire_server::api::api_router;
use quire_server::config::Config;
use quire_server::store::SqliteStore;
use quire_server::AppState;

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "quire"
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting Quire peer-review tracker");

    let config = Config::from_env().expect("Failed to load configuration from environment");

    let db_path = config.state_dir.join("quire-state.db");
    info!("Using state database: {}", db_path.display());
    let store = SqliteStore::new(&db_path).expect("Failed to initialize SQLite database");

    let app_state = Arc::new(AppState::new(Arc::new(store)));

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(api_router())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
