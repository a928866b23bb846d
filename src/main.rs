mod config;
mod errors;
mod handlers;
mod intent;
mod llm_client;
mod maps_client;
mod models;
mod validation;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorError,
    GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::llm_client::OllamaClient;
use crate::maps_client::MapsService;

/// Maps rate-limiter rejections onto the standard error envelope so the
/// `RATE_LIMIT_EXCEEDED` code stays stable for clients.
fn rate_limit_error(err: GovernorError) -> Response {
    match err {
        GovernorError::TooManyRequests { .. } => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "success": false,
                "error": "Too many requests, please slow down",
                "code": "RATE_LIMIT_EXCEEDED",
                "timestamp": Utc::now().to_rfc3339(),
            })),
        )
            .into_response(),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": "Rate limiter failure",
                "code": "INTERNAL_ERROR",
                "timestamp": Utc::now().to_rfc3339(),
            })),
        )
            .into_response(),
    }
}

/// Main entry point for the application.
///
/// Initializes logging, configuration and the two upstream clients, then
/// assembles the HTTP routes and middleware (CORS, tracing, body limit,
/// per-IP rate limiting with health exempt) and starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maps_assistant_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize upstream clients
    let maps = match MapsService::new(&config) {
        Ok(client) => {
            tracing::info!("✓ Maps client initialized: {}", config.maps_base_url);
            client
        }
        Err(e) => {
            tracing::error!("Failed to initialize maps client: {}", e);
            anyhow::bail!("maps client initialization failed");
        }
    };
    let llm = match OllamaClient::new(&config) {
        Ok(client) => {
            tracing::info!(
                "✓ LLM client initialized: {} (model {})",
                config.llm_base_url,
                config.llm_model
            );
            client
        }
        Err(e) => {
            tracing::error!("Failed to initialize LLM client: {}", e);
            anyhow::bail!("LLM client initialization failed");
        }
    };

    let port = config.port;

    // Build application state
    let app_state = Arc::new(handlers::AppState { config, maps, llm });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .error_handler(rate_limit_error)
            .finish()
            .unwrap(),
    );

    // API endpoints, reachable bare and under /api (the chat frontend
    // calls /api/search)
    let api_routes = handlers::routes();

    let protected_routes = Router::new()
        .merge(api_routes.clone())
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                // Request size limit: 1MB max payload
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health checks bypass rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
