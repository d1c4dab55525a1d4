//! # chrysalis-core
//!
//! The deterministic trait-evolution engine for Chrysalis - THE LOGIC.
//!
//! Chrysalis tracks one versioned trait record per identity. Records may
//! only evolve when the identity's externally reported stake balance has
//! grown past a configured threshold since the last recorded baseline;
//! every evolution appends to an immutable history chain, and a display
//! pin can retroactively select any historical version without touching
//! the audit trail.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is the ONLY place where record state exists (stateful)
//! - Is closed: stake balances and wall-clock time enter only through the
//!   injected `StakeReader` and `Clock` capabilities
//! - Authorizes every mutation against a single controller principal
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod clock;
pub mod engine;
pub mod ledger;
pub mod primitives;
pub mod resolver;
pub mod stake;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{ChrysalisError, IdentityId, Principal, StakeAmount, Timestamp, TraitRecord};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{EngineConfig, LedgerBackend, TraitEngine};
pub use ledger::{MemoryLedger, TraitLedger};
pub use stake::{SharedStakeTable, StakeReader, StakeTable};
pub use storage::RedbLedger;
