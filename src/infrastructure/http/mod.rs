use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::controllers::conversion::{ConversionController, MAX_UPLOAD_BYTES};
use crate::controllers::health;
use crate::infrastructure::config::Config;
use crate::infrastructure::db::DbPool;

/// Boundary admission policy for cross-origin requests: localhost origins
/// are allowed outside production, plus the configured frontend URL exactly.
pub fn is_origin_allowed(origin: &str, development: bool, frontend_url: Option<&str>) -> bool {
    if development
        && (origin.starts_with("http://localhost") || origin.starts_with("http://127.0.0.1"))
    {
        return true;
    }
    frontend_url == Some(origin)
}

/// Build the application router with all routes configured
pub fn build_router(
    pool: Arc<DbPool>,
    config: Arc<Config>,
    conversion_controller: Arc<ConversionController>,
) -> Router {
    let development = config.is_development();
    let frontend_url = config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _request| match origin.to_str() {
                Ok(origin) => is_origin_allowed(origin, development, frontend_url.as_deref()),
                Err(_) => false,
            },
        ))
        .allow_methods(Any)
        .allow_headers(Any);

    let conversion_routes = Router::new()
        .route("/api/upload", post(ConversionController::upload))
        .route("/api/status/:id", get(ConversionController::status))
        .route("/api/audio/:id", get(ConversionController::audio))
        .route("/api/conversions", get(ConversionController::list))
        .with_state(conversion_controller)
        // Multipart framing overhead on top of the file cap
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(pool)
        .merge(conversion_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server with all routes configured
pub async fn start_http_server(
    pool: Arc<DbPool>,
    config: Arc<Config>,
    conversion_controller: Arc<ConversionController>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(pool, config.clone(), conversion_controller);

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutting down server...");
}
