//! # Innate Primitives
//!
//! Hardcoded runtime constants for the Chrysalis engine.
//!
//! The engine starts with zero records but fixed rules. These values are
//! compiled defaults; the evolution threshold and URI base are surfaced
//! through `EngineConfig` because the numbers observed in any one
//! deployment are environment-specific, not laws.

/// Default stake growth (in oracle units) required over the last recorded
/// baseline before an identity may evolve.
///
/// - Growth `>= DEFAULT_EVOLUTION_THRESHOLD` opens the gate.
/// - The bar resets against the new baseline after every evolution.
///
/// Deployments with scaled balances (e.g. 10^18 units per token) configure
/// a scaled threshold instead of relying on this default.
pub const DEFAULT_EVOLUTION_THRESHOLD: u128 = 1000;

/// Default base for token URI fragments.
///
/// Empty by default: resolvers emit a rooted path fragment and downstream
/// consumers prepend their own host.
pub const DEFAULT_TOKEN_URI_BASE: &str = "";

/// Fixed path segment of every token URI fragment.
pub const TOKEN_URI_SEGMENT: &str = "token-uri";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for principal strings.
///
/// Principals longer than this are rejected at the API boundary.
/// This prevents memory exhaustion from malicious or malformed input.
pub const MAX_PRINCIPAL_LENGTH: usize = 256;

/// Maximum length for a configured token URI base.
///
/// Bases longer than this are rejected when loading configuration.
pub const MAX_URI_BASE_LENGTH: usize = 2048;
