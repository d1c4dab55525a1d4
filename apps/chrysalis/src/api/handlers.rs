//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        ErrorResponse, EvolveRequest, HealthResponse, InitRequest, MutationResponse,
        OverrideRequest, RecordResponse, StakeReportRequest, StakeReportResponse, StatusResponse,
        UriResponse, parse_caller,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrysalis_core::{ChrysalisError, IdentityId, TraitEngine};

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// Map a core error to the HTTP status of the triggering call.
fn error_status(err: &ChrysalisError) -> StatusCode {
    match err {
        // API-key auth answers 401; a wrong controller principal is 403
        ChrysalisError::Unauthorized => StatusCode::FORBIDDEN,
        ChrysalisError::AlreadyInitialized(_) | ChrysalisError::EvolutionNotEligible(_) => {
            StatusCode::CONFLICT
        }
        ChrysalisError::NotInitialized(_) => StatusCode::NOT_FOUND,
        ChrysalisError::IndexOutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ChrysalisError::OracleUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ChrysalisError::Serialization(_) => StatusCode::BAD_REQUEST,
        ChrysalisError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Post-mutation view: the new chain length and displayed URI.
fn mutation_success(
    engine: &TraitEngine,
    identity: IdentityId,
) -> (StatusCode, Json<MutationResponse>) {
    let count = engine.history_count(identity).unwrap_or(0);
    let uri = engine.token_uri(identity).unwrap_or_default();
    (StatusCode::OK, Json(MutationResponse::success(count, uri)))
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Get engine status.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let engine = state.engine.read().await;

    let response = StatusResponse {
        identity_count: engine.identity_count().unwrap_or(0),
        entry_total: engine.entry_total().unwrap_or(0),
        evolution_threshold: engine.config().evolution_threshold.value().to_string(),
    };

    (StatusCode::OK, Json(response))
}

// =============================================================================
// MUTATION HANDLERS
// =============================================================================

/// Initialize an identity's trait record.
pub async fn init_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<InitRequest>,
) -> impl IntoResponse {
    let identity = IdentityId(id);

    // Validate and convert request before taking the write lock
    let (caller, seed) = match request.to_seed() {
        Ok(parsed) => parsed,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(MutationResponse::error(format!("Invalid request: {}", e))),
            );
        }
    };

    let mut engine = state.engine.write().await;
    match engine.init_traits(&caller, identity, seed) {
        Ok(()) => mutation_success(&engine, identity),
        Err(e) => (error_status(&e), Json(MutationResponse::error(e.to_string()))),
    }
}

/// Evolve an identity's trait record.
pub async fn evolve_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<EvolveRequest>,
) -> impl IntoResponse {
    let identity = IdentityId(id);

    let caller = match parse_caller(&request.caller) {
        Ok(caller) => caller,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(MutationResponse::error(format!("Invalid request: {}", e))),
            );
        }
    };

    let mut engine = state.engine.write().await;
    match engine.evolve(&caller, identity) {
        Ok(()) => mutation_success(&engine, identity),
        Err(e) => (error_status(&e), Json(MutationResponse::error(e.to_string()))),
    }
}

/// Pin the displayed history index for an identity.
pub async fn override_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<OverrideRequest>,
) -> impl IntoResponse {
    let identity = IdentityId(id);

    let caller = match parse_caller(&request.caller) {
        Ok(caller) => caller,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(MutationResponse::error(format!("Invalid request: {}", e))),
            );
        }
    };

    let mut engine = state.engine.write().await;
    match engine.override_history(&caller, identity, request.index) {
        Ok(()) => mutation_success(&engine, identity),
        Err(e) => (error_status(&e), Json(MutationResponse::error(e.to_string()))),
    }
}

// =============================================================================
// READ HANDLERS
// =============================================================================

/// Build the full record view; a blank identity is an answer, not an error.
fn build_record_view(
    engine: &TraitEngine,
    identity: IdentityId,
) -> Result<RecordResponse, ChrysalisError> {
    let initialized = !engine.is_uninitialized(identity)?;
    let record = engine.latest_trait_data(identity)?;

    Ok(RecordResponse {
        identity: identity.0,
        initialized,
        gender: record.gender,
        skin: record.skin,
        dna: record.dna.to_string(),
        last_recorded_stake: record.last_recorded_stake.value().to_string(),
        last_recorded_at: record.last_recorded_at.secs(),
        history_count: engine.history_count(identity)?,
        history_override: engine.history_override(identity)?,
        displayed_index: engine.resolved_display_index(identity)?,
        can_evolve: engine.can_evolve(identity)?,
    })
}

/// Get an identity's current record state.
pub async fn record_handler(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let engine = state.engine.read().await;
    match build_record_view(&engine, IdentityId(id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => (error_status(&e), Json(ErrorResponse::new(e.to_string()))).into_response(),
    }
}

/// Resolve an identity's displayed index and token URI.
pub async fn uri_handler(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let engine = state.engine.read().await;
    let identity = IdentityId(id);

    let resolved = engine
        .resolved_display_index(identity)
        .and_then(|index| engine.token_uri(identity).map(|uri| (index, uri)));

    match resolved {
        Ok((displayed_index, token_uri)) => (
            StatusCode::OK,
            Json(UriResponse {
                identity: id,
                displayed_index,
                token_uri,
            }),
        )
            .into_response(),
        Err(e) => (error_status(&e), Json(ErrorResponse::new(e.to_string()))).into_response(),
    }
}

// =============================================================================
// STAKE REPORT HANDLER
// =============================================================================

/// Accept a stake-oracle balance report.
///
/// This is collaborator plumbing: the report feeds the shared table the
/// engine reads through its `StakeReader` seam. The engine itself never
/// writes stake.
pub async fn stake_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<StakeReportRequest>,
) -> impl IntoResponse {
    let identity = IdentityId(id);

    let amount = match request.to_amount() {
        Ok(amount) => amount,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(StakeReportResponse::error(id, format!("Invalid request: {}", e))),
            );
        }
    };

    state.stake.set_stake(identity, amount);

    // Carry the report across restarts when a sidecar file is configured
    if let Some(path) = &state.stake_file {
        if let Err(e) = crate::config::save_stakes(path, &state.stake) {
            tracing::warn!("Failed to persist stake reports: {}", e);
        }
    }

    (
        StatusCode::OK,
        Json(StakeReportResponse::success(id, amount.value())),
    )
}
