//! # Chrysalis HTTP API Module
//!
//! This module implements the HTTP REST control plane using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Engine status
//! - `GET /identity/{id}` - Current record state
//! - `GET /identity/{id}/uri` - Resolved display index + token URI
//! - `POST /identity/{id}/init` - Initialize a trait record
//! - `POST /identity/{id}/evolve` - Append a new history entry
//! - `POST /identity/{id}/override` - Pin the displayed history index
//! - `POST /stake/{id}` - Accept a stake-oracle balance report
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `CHRYSALIS_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `CHRYSALIS_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `CHRYSALIS_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

// Re-exports for external use
pub use auth::get_api_key_from_env;
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
// Re-export handlers and types for integration tests (via `chrysalis::api::*`)
#[allow(unused_imports)]
pub use handlers::{
    evolve_handler, health_handler, init_handler, override_handler, record_handler, stake_handler,
    status_handler, uri_handler,
};
#[allow(unused_imports)]
pub use types::{
    ErrorResponse, EvolveRequest, HealthResponse, InitRequest, MutationResponse, OverrideRequest,
    RecordResponse, StakeReportRequest, StakeReportResponse, StatusResponse, UriResponse,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use chrysalis_core::{ChrysalisError, SharedStakeTable, TraitEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the engine and the oracle-report table.
#[derive(Clone)]
pub struct AppState {
    /// The trait-evolution engine.
    pub engine: Arc<RwLock<TraitEngine>>,
    /// Writable handle to the same stake table the engine reads through
    /// its `StakeReader` seam.
    pub stake: SharedStakeTable,
    /// Optional sidecar file carrying stake reports across restarts.
    pub stake_file: Option<PathBuf>,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(engine: TraitEngine, stake: SharedStakeTable, stake_file: Option<PathBuf>) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
            stake,
            stake_file,
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads `CHRYSALIS_CORS_ORIGINS` environment variable:
/// - If "*": allows all origins (development mode - use with caution!)
/// - If not set: defaults to localhost only (restrictive default)
/// - Otherwise: parses comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("CHRYSALIS_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (CHRYSALIS_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in CHRYSALIS_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No CHRYSALIS_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let localhost_origins = vec![
        "http://localhost:3000".parse::<HeaderValue>().ok(),
        "http://localhost:8080".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:3000".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:8080".parse::<HeaderValue>().ok(),
    ];
    let origins: Vec<HeaderValue> = localhost_origins.into_iter().flatten().collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. CORS - handles preflight requests
/// 2. Tracing - logs all requests
/// 3. Rate Limiting - protects against DoS (if enabled)
/// 4. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    // Check if rate limiting is enabled
    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    // Check if authentication is enabled
    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "⚠️  API key authentication DISABLED - all endpoints are publicly accessible! \
             Set CHRYSALIS_API_KEY environment variable to enable authentication."
        );
    }

    // Build base router with routes
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/identity/{id}", get(handlers::record_handler))
        .route("/identity/{id}/uri", get(handlers::uri_handler))
        .route("/identity/{id}/init", post(handlers::init_handler))
        .route("/identity/{id}/evolve", post(handlers::evolve_handler))
        .route("/identity/{id}/override", post(handlers::override_handler))
        .route("/stake/{id}", post(handlers::stake_handler));

    // Apply authentication middleware (innermost - runs last on request)
    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    // Apply rate limiting middleware
    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    // Apply CORS, body limit, and tracing (outermost layers)
    router
        .layer(axum::extract::DefaultBodyLimit::max(64 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), ChrysalisError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ChrysalisError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("Chrysalis HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| ChrysalisError::Io(format!("Server error: {}", e)))
}
