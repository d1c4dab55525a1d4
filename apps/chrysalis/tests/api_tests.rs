//! Integration tests for the Chrysalis HTTP API.
//!
//! Uses axum-test to test the API handlers without starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
// Allow holding MutexGuard across await in auth tests - tests are serialized
// intentionally to avoid env var conflicts
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

use axum::http::HeaderValue;
use axum_test::TestServer;
use chrysalis::api::{
    AppState, HealthResponse, InitRequest, MutationResponse, RecordResponse, StakeReportResponse,
    StatusResponse, UriResponse, create_router,
};
use chrysalis_core::{EngineConfig, ManualClock, Principal, SharedStakeTable, StakeAmount, TraitEngine};
use serde_json::json;
use std::sync::Mutex;

/// Mutex to serialize auth tests since they modify env vars.
static AUTH_TEST_MUTEX: Mutex<()> = Mutex::new(());

const CONTROLLER: &str = "governance";

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Guard wrapper that holds the mutex and ensures cleanup on drop.
struct TestGuard {
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
        unsafe { std::env::remove_var("CHRYSALIS_API_KEY") };
    }
}

/// Create a test server with a fresh in-memory engine.
/// Returns the oracle handle for stake updates and a guard that must be
/// kept alive during the test.
fn create_test_server() -> (TestServer, SharedStakeTable, TestGuard) {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::remove_var("CHRYSALIS_API_KEY") };

    let stake = SharedStakeTable::new();
    let clock = ManualClock::at(1_700_000_000);
    let engine = TraitEngine::with_config(
        Principal::new(CONTROLLER),
        stake.clone(),
        clock,
        EngineConfig {
            evolution_threshold: StakeAmount::new(1_000),
            token_uri_base: "https://meta.example.org".to_string(),
        },
    );
    let state = AppState::new(engine, stake.clone(), None);
    let router = create_router(state);
    (
        TestServer::new(router).unwrap(),
        stake,
        TestGuard { _guard: guard },
    )
}

fn init_request() -> InitRequest {
    InitRequest {
        caller: CONTROLLER.to_string(),
        gender: 1,
        skin: 3,
        dna: "64206".to_string(),
    }
}

/// Initialize identity 1 with the 250-unit bootstrap balance.
async fn bootstrap_identity(server: &TestServer, stake: &SharedStakeTable) {
    stake.set_stake(chrysalis_core::IdentityId(1), StakeAmount::new(250));
    let response = server.post("/identity/1/init").json(&init_request()).await;
    response.assert_status_ok();
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _, _guard) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// STATUS ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_status_empty_engine() {
    let (server, _, _guard) = create_test_server();

    let response = server.get("/status").await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert_eq!(status.identity_count, 0);
    assert_eq!(status.entry_total, 0);
    assert_eq!(status.evolution_threshold, "1000");
}

#[tokio::test]
async fn test_status_counts_initialized_identities() {
    let (server, stake, _guard) = create_test_server();
    bootstrap_identity(&server, &stake).await;

    let response = server.get("/status").await;
    let status: StatusResponse = response.json();
    assert_eq!(status.identity_count, 1);
    assert_eq!(status.entry_total, 1);
}

// =============================================================================
// INIT ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_init_snapshots_bootstrap_stake() {
    let (server, stake, _guard) = create_test_server();
    bootstrap_identity(&server, &stake).await;

    let response = server.get("/identity/1").await;
    response.assert_status_ok();
    let record: RecordResponse = response.json();
    assert!(record.initialized);
    assert_eq!(record.gender, 1);
    assert_eq!(record.skin, 3);
    assert_eq!(record.dna, "64206");
    assert_eq!(record.last_recorded_stake, "250");
    assert_eq!(record.history_count, 1);
    assert_eq!(record.displayed_index, 1);
    assert!(!record.can_evolve);
}

#[tokio::test]
async fn test_init_reports_uri() {
    let (server, stake, _guard) = create_test_server();
    stake.set_stake(chrysalis_core::IdentityId(1), StakeAmount::new(250));

    let response = server.post("/identity/1/init").json(&init_request()).await;
    response.assert_status_ok();
    let body: MutationResponse = response.json();
    assert!(body.success);
    assert_eq!(body.history_count, Some(1));
    assert_eq!(
        body.token_uri.as_deref(),
        Some("https://meta.example.org/token-uri/id-1-history-1.json")
    );
}

#[tokio::test]
async fn test_reinit_conflicts() {
    let (server, stake, _guard) = create_test_server();
    bootstrap_identity(&server, &stake).await;

    let response = server.post("/identity/1/init").json(&init_request()).await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
    let body: MutationResponse = response.json();
    assert!(!body.success);
}

#[tokio::test]
async fn test_init_wrong_caller_forbidden() {
    let (server, _, _guard) = create_test_server();

    let request = InitRequest {
        caller: "stranger".to_string(),
        ..init_request()
    };
    let response = server.post("/identity/1/init").json(&request).await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_init_invalid_dna_rejected() {
    let (server, _, _guard) = create_test_server();

    let response = server
        .post("/identity/1/init")
        .json(&json!({
            "caller": CONTROLLER,
            "gender": 1,
            "skin": 3,
            "dna": "not-a-number",
        }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

// =============================================================================
// EVOLVE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_evolve_requires_threshold_growth() {
    let (server, stake, _guard) = create_test_server();
    bootstrap_identity(&server, &stake).await;

    // +100 units: gate stays closed
    let response = server
        .post("/stake/1")
        .json(&json!({ "amount": "350" }))
        .await;
    response.assert_status_ok();
    let report: StakeReportResponse = response.json();
    assert!(report.success);

    let response = server
        .post("/identity/1/evolve")
        .json(&json!({ "caller": CONTROLLER }))
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);

    // +1000 over the recorded baseline: gate opens
    let response = server
        .post("/stake/1")
        .json(&json!({ "amount": "1250" }))
        .await;
    response.assert_status_ok();

    let response = server
        .post("/identity/1/evolve")
        .json(&json!({ "caller": CONTROLLER }))
        .await;
    response.assert_status_ok();
    let body: MutationResponse = response.json();
    assert_eq!(body.history_count, Some(2));
    assert!(
        body.token_uri
            .as_deref()
            .unwrap()
            .ends_with("id-1-history-2.json")
    );
}

#[tokio::test]
async fn test_evolve_uninitialized_not_found() {
    let (server, _, _guard) = create_test_server();

    let response = server
        .post("/identity/9/evolve")
        .json(&json!({ "caller": CONTROLLER }))
        .await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
}

// =============================================================================
// OVERRIDE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_override_pins_display() {
    let (server, stake, _guard) = create_test_server();
    bootstrap_identity(&server, &stake).await;
    stake.set_stake(chrysalis_core::IdentityId(1), StakeAmount::new(1_250));
    server
        .post("/identity/1/evolve")
        .json(&json!({ "caller": CONTROLLER }))
        .await
        .assert_status_ok();

    let response = server
        .post("/identity/1/override")
        .json(&json!({ "caller": CONTROLLER, "index": 1 }))
        .await;
    response.assert_status_ok();

    // The URI pins to entry 1 while the chain stays two long
    let response = server.get("/identity/1/uri").await;
    let uri: UriResponse = response.json();
    assert_eq!(uri.displayed_index, 1);
    assert!(uri.token_uri.ends_with("id-1-history-1.json"));

    let record: RecordResponse = server.get("/identity/1").await.json();
    assert_eq!(record.history_count, 2);
    assert_eq!(record.history_override, 1);
    // The true latest stays override-blind
    assert_eq!(record.last_recorded_stake, "1250");
}

#[tokio::test]
async fn test_override_out_of_range_unprocessable() {
    let (server, stake, _guard) = create_test_server();
    bootstrap_identity(&server, &stake).await;

    let response = server
        .post("/identity/1/override")
        .json(&json!({ "caller": CONTROLLER, "index": 2 }))
        .await;
    response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);

    // Display state is untouched
    let uri: UriResponse = server.get("/identity/1/uri").await.json();
    assert_eq!(uri.displayed_index, 1);
}

// =============================================================================
// READ ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_record_uninitialized_is_blank_answer() {
    let (server, _, _guard) = create_test_server();

    let response = server.get("/identity/7").await;
    response.assert_status_ok();
    let record: RecordResponse = response.json();
    assert!(!record.initialized);
    assert_eq!(record.history_count, 0);
    assert_eq!(record.displayed_index, 0);
    assert_eq!(record.dna, "0");
    assert!(!record.can_evolve);
}

#[tokio::test]
async fn test_uri_uninitialized_resolves_index_zero() {
    let (server, _, _guard) = create_test_server();

    let response = server.get("/identity/7/uri").await;
    response.assert_status_ok();
    let uri: UriResponse = response.json();
    assert_eq!(uri.displayed_index, 0);
    assert!(uri.token_uri.ends_with("id-7-history-0.json"));
}

// =============================================================================
// STAKE REPORT TESTS
// =============================================================================

#[tokio::test]
async fn test_stake_report_invalid_amount_rejected() {
    let (server, _, _guard) = create_test_server();

    let response = server
        .post("/stake/1")
        .json(&json!({ "amount": "-5" }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stake_report_feeds_gate() {
    let (server, stake, _guard) = create_test_server();
    bootstrap_identity(&server, &stake).await;

    server
        .post("/stake/1")
        .json(&json!({ "amount": "1250" }))
        .await
        .assert_status_ok();

    let record: RecordResponse = server.get("/identity/1").await.json();
    assert!(record.can_evolve);
}

// =============================================================================
// AUTHENTICATION TESTS
// =============================================================================

/// Create a test server with authentication enabled.
/// Must be called while holding AUTH_TEST_MUTEX.
fn create_auth_test_server(api_key: &str) -> TestServer {
    // SAFETY: Tests run sequentially under AUTH_TEST_MUTEX, so no concurrent env access.
    unsafe { std::env::set_var("CHRYSALIS_API_KEY", api_key) };
    let stake = SharedStakeTable::new();
    let engine = TraitEngine::new(Principal::new(CONTROLLER), stake.clone(), ManualClock::at(1));
    let router = create_router(AppState::new(engine, stake, None));
    TestServer::new(router).unwrap()
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let server = create_auth_test_server("test-secret-key");
    let _guard = TestGuard { _guard: guard };

    let response = server.get("/status").await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let server = create_auth_test_server("correct-key");
    let _guard = TestGuard { _guard: guard };

    let response = server
        .get("/status")
        .add_header(
            axum::http::header::AUTHORIZATION,
            "Bearer wrong-key".parse::<HeaderValue>().unwrap(),
        )
        .await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let api_key = "test-secret-key-12345";
    let server = create_auth_test_server(api_key);
    let _guard = TestGuard { _guard: guard };

    let response = server
        .get("/status")
        .add_header(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {}", api_key)
                .parse::<HeaderValue>()
                .unwrap(),
        )
        .await;
    response.assert_status_ok();

    let status: StatusResponse = response.json();
    assert_eq!(status.identity_count, 0);
}

#[tokio::test]
async fn test_auth_health_bypasses_api_key() {
    let guard = AUTH_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let server = create_auth_test_server("test-secret-key");
    let _guard = TestGuard { _guard: guard };

    // Health stays open for load balancer checks
    let response = server.get("/health").await;
    response.assert_status_ok();
}
