//! # Core Type Definitions
//!
//! This module contains all core types for the Chrysalis trait-evolution
//! engine:
//! - Identifiers and quantities (`IdentityId`, `StakeAmount`, `Timestamp`)
//! - The versioned record (`TraitRecord`)
//! - The controller principal (`Principal`)
//! - Error types (`ChrysalisError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`
//! - Use saturating arithmetic for balance deltas to prevent overflow

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS & QUANTITIES
// =============================================================================

/// Unique identifier for an identity in the external ownership registry.
/// Identities are never created or destroyed by this engine; they are the
/// pre-existing subjects of every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityId(pub u64);

/// An externally reported locked-stake balance, in opaque integer units.
///
/// The engine never interprets the scale; a deployment using 10^18-scaled
/// balances simply configures a scaled evolution threshold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct StakeAmount(pub u128);

impl StakeAmount {
    /// Create a new stake amount with the given value.
    #[must_use]
    pub const fn new(units: u128) -> Self {
        Self(units)
    }

    /// Get the raw unit value.
    #[must_use]
    pub const fn value(self) -> u128 {
        self.0
    }

    /// Growth of `self` over `baseline`, clamped to zero when the balance
    /// has decreased. A decrease never counts toward the evolution gate.
    #[must_use]
    pub const fn gain_over(self, baseline: Self) -> u128 {
        self.0.saturating_sub(baseline.0)
    }

    /// Add units using saturating arithmetic.
    #[must_use]
    pub const fn saturating_add(self, units: u128) -> Self {
        Self(self.0.saturating_add(units))
    }
}

/// Wall-clock seconds since the Unix epoch, as stamped into provenance
/// fields at initialization and evolution time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create a timestamp from raw seconds.
    #[must_use]
    pub const fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the raw seconds value.
    #[must_use]
    pub const fn secs(self) -> u64 {
        self.0
    }
}

// =============================================================================
// PRINCIPAL
// =============================================================================

/// The authenticated caller of a mutating operation.
///
/// Access control is a single flat check: one controller principal is
/// configured at engine construction and every mutating call compares its
/// caller against it by equality. No roles, no hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Principal(pub String);

impl Principal {
    /// Create a principal from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the principal as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// TRAIT RECORD
// =============================================================================

/// One versioned snapshot of an identity's descriptive and provenance data.
///
/// `gender` and `skin` are enum-like small integers and `dna` is an opaque
/// bit-packed genetic payload; the engine never interprets any of them.
/// `last_recorded_stake` and `last_recorded_at` are provenance: the oracle
/// reading and wall-clock time captured when this version was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TraitRecord {
    /// Enum-like gender code.
    pub gender: u8,
    /// Enum-like skin code.
    pub skin: u8,
    /// Opaque bit-packed genetic payload.
    pub dna: u128,
    /// Stake balance snapshotted when this version was written.
    pub last_recorded_stake: StakeAmount,
    /// Wall-clock time of the snapshot.
    pub last_recorded_at: Timestamp,
}

impl TraitRecord {
    /// Create a record from descriptive fields only. Provenance fields are
    /// zeroed; the engine overwrites them from the oracle and clock when
    /// the record is appended.
    #[must_use]
    pub const fn with_traits(gender: u8, skin: u8, dna: u128) -> Self {
        Self {
            gender,
            skin,
            dna,
            last_recorded_stake: StakeAmount::new(0),
            last_recorded_at: Timestamp::new(0),
        }
    }

    /// The blank sentinel: the implicit pre-initialization entry 0.
    ///
    /// Whether an identity is initialized is detected via the ledger's
    /// history count, never by comparing against this value — a seed of
    /// all zeroes is a perfectly valid first entry.
    #[must_use]
    pub const fn blank() -> Self {
        Self {
            gender: 0,
            skin: 0,
            dna: 0,
            last_recorded_stake: StakeAmount::new(0),
            last_recorded_at: Timestamp::new(0),
        }
    }

    /// Derive the next version: descriptive fields carried forward
    /// unchanged, provenance refreshed from the given reading and time.
    #[must_use]
    pub const fn evolved(self, stake: StakeAmount, at: Timestamp) -> Self {
        Self {
            gender: self.gender,
            skin: self.skin,
            dna: self.dna,
            last_recorded_stake: stake,
            last_recorded_at: at,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Chrysalis engine.
///
/// - All failures are local, synchronous failures of the triggering call
/// - No partial state is ever committed on failure
/// - The engine never panics; all errors are surfaced as `Result`
#[derive(Debug, Error)]
pub enum ChrysalisError {
    /// The caller is not the configured controller.
    #[error("Caller is not the configured controller")]
    Unauthorized,

    /// `init_traits` was called on an identity that already has history.
    #[error("Identity {0:?} is already initialized")]
    AlreadyInitialized(IdentityId),

    /// An operation requiring prior initialization hit a blank identity.
    #[error("Identity {0:?} has not been initialized")]
    NotInitialized(IdentityId),

    /// `evolve` was called while the stake-growth gate is false.
    #[error("Identity {0:?} is not eligible to evolve")]
    EvolutionNotEligible(IdentityId),

    /// A history override index outside `[1, history_count]`.
    #[error("History index {index} out of range (1..={count})")]
    IndexOutOfRange {
        /// The rejected index.
        index: u32,
        /// The history length at the time of the call.
        count: u32,
    },

    /// The stake oracle failed to answer for an identity.
    #[error("Stake oracle unavailable for identity {0:?}")]
    OracleUnavailable(IdentityId),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred in the persistent backend.
    #[error("I/O error: {0}")]
    Io(String),
}

// =============================================================================
// TESTS
// =============================================================================
