//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Large unsigned quantities (`dna`, stake amounts) travel as base-10
//! strings: JSON numbers cannot represent the full 128-bit range.

use chrysalis_core::{
    ChrysalisError, Principal, StakeAmount, TraitRecord, primitives::MAX_PRINCIPAL_LENGTH,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Engine status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub identity_count: u64,
    pub entry_total: u64,
    pub evolution_threshold: String,
}

// =============================================================================
// VALIDATION HELPERS
// =============================================================================

/// Parse a caller principal, enforcing the boundary length limit.
///
/// This runs before data reaches the core engine, keeping oversized
/// payloads out of the authorization comparison.
pub fn parse_caller(raw: &str) -> Result<Principal, ChrysalisError> {
    if raw.is_empty() || raw.len() > MAX_PRINCIPAL_LENGTH {
        return Err(ChrysalisError::Serialization(format!(
            "caller must be 1..={} bytes",
            MAX_PRINCIPAL_LENGTH
        )));
    }
    Ok(Principal::new(raw))
}

/// Parse a base-10 128-bit quantity from a request string.
pub fn parse_u128(field: &str, raw: &str) -> Result<u128, ChrysalisError> {
    raw.parse().map_err(|_| {
        ChrysalisError::Serialization(format!("{} must be a base-10 unsigned integer", field))
    })
}

// =============================================================================
// MUTATION REQUESTS/RESPONSE
// =============================================================================

/// Record initialization request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitRequest {
    pub caller: String,
    pub gender: u8,
    pub skin: u8,
    pub dna: String,
}

impl InitRequest {
    /// Convert to a caller and seed record, validating fields.
    pub fn to_seed(&self) -> Result<(Principal, TraitRecord), ChrysalisError> {
        let caller = parse_caller(&self.caller)?;
        let dna = parse_u128("dna", &self.dna)?;
        Ok((caller, TraitRecord::with_traits(self.gender, self.skin, dna)))
    }
}

/// Evolution request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolveRequest {
    pub caller: String,
}

/// History-pin request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideRequest {
    pub caller: String,
    pub index: u32,
}

/// Response for all mutating record endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse {
    pub success: bool,
    pub history_count: Option<u32>,
    pub token_uri: Option<String>,
    pub error: Option<String>,
}

impl MutationResponse {
    pub fn success(history_count: u32, token_uri: String) -> Self {
        Self {
            success: true,
            history_count: Some(history_count),
            token_uri: Some(token_uri),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            history_count: None,
            token_uri: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// RECORD / URI RESPONSES
// =============================================================================

/// Full view of an identity's current record state.
///
/// `initialized == false` reports the blank sentinel with zero counts;
/// a blank identity is an answer, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResponse {
    pub identity: u64,
    pub initialized: bool,
    pub gender: u8,
    pub skin: u8,
    pub dna: String,
    pub last_recorded_stake: String,
    pub last_recorded_at: u64,
    pub history_count: u32,
    pub history_override: u32,
    pub displayed_index: u32,
    pub can_evolve: bool,
}

/// Token URI resolution response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UriResponse {
    pub identity: u64,
    pub displayed_index: u32,
    pub token_uri: String,
}

// =============================================================================
// STAKE REPORT
// =============================================================================

/// Oracle balance report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeReportRequest {
    pub amount: String,
}

impl StakeReportRequest {
    /// Parse the reported amount.
    pub fn to_amount(&self) -> Result<StakeAmount, ChrysalisError> {
        Ok(StakeAmount::new(parse_u128("amount", &self.amount)?))
    }
}

/// Oracle balance report acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeReportResponse {
    pub success: bool,
    pub identity: u64,
    pub amount: Option<String>,
    pub error: Option<String>,
}

impl StakeReportResponse {
    pub fn success(identity: u64, amount: u128) -> Self {
        Self {
            success: true,
            identity,
            amount: Some(amount.to_string()),
            error: None,
        }
    }

    pub fn error(identity: u64, msg: impl Into<String>) -> Self {
        Self {
            success: false,
            identity,
            amount: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Error body for read endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}
