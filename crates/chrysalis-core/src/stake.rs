//! # Stake Reader
//!
//! The query seam to the externally owned stake oracle.
//!
//! The engine never writes to the oracle and never caches its answers:
//! every gate evaluation is a live read. The oracle is abstracted as an
//! injected capability so tests (and the binary) can substitute a
//! deterministic table for whatever system actually tracks locked
//! balances.

use crate::{ChrysalisError, IdentityId, StakeAmount};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

// =============================================================================
// STAKEREADER TRAIT
// =============================================================================

/// Read-only view of an identity's locked-stake balance.
///
/// Implementors must be `Send + Sync`; the engine holds the reader for its
/// whole lifetime and the binary shares it with the report boundary.
///
/// A reader that cannot answer must return
/// `ChrysalisError::OracleUnavailable`; the engine propagates the failure
/// and never retries internally.
pub trait StakeReader: Send + Sync {
    /// Current balance for `identity`, in oracle units.
    fn stake_of(&self, identity: IdentityId) -> Result<StakeAmount, ChrysalisError>;
}

// =============================================================================
// STAKE TABLE
// =============================================================================

/// Deterministic in-memory stake oracle.
///
/// Identities without an entry report a zero balance, matching the
/// behavior of the production oracle for accounts that have never locked
/// anything.
#[derive(Debug, Clone, Default)]
pub struct StakeTable {
    balances: BTreeMap<IdentityId, StakeAmount>,
}

impl StakeTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reported balance for an identity, replacing any prior value.
    pub fn set_stake(&mut self, identity: IdentityId, amount: StakeAmount) {
        self.balances.insert(identity, amount);
    }

    /// Increase the reported balance using saturating arithmetic.
    pub fn credit(&mut self, identity: IdentityId, units: u128) {
        let current = self.balances.get(&identity).copied().unwrap_or_default();
        self.balances.insert(identity, current.saturating_add(units));
    }

    /// Current balance; zero for unknown identities.
    #[must_use]
    pub fn balance(&self, identity: IdentityId) -> StakeAmount {
        self.balances.get(&identity).copied().unwrap_or_default()
    }

    /// All identities with a recorded balance, in deterministic order.
    #[must_use]
    pub fn entries(&self) -> Vec<(IdentityId, StakeAmount)> {
        self.balances.iter().map(|(id, amt)| (*id, *amt)).collect()
    }
}

impl StakeReader for StakeTable {
    fn stake_of(&self, identity: IdentityId) -> Result<StakeAmount, ChrysalisError> {
        Ok(self.balance(identity))
    }
}

// =============================================================================
// SHARED STAKE TABLE
// =============================================================================

/// A `StakeTable` behind `Arc<RwLock<_>>`.
///
/// The engine owns one handle for gate reads while the report boundary
/// (HTTP endpoint, CLI command, test fixture) keeps another to apply
/// balance updates.
#[derive(Debug, Clone, Default)]
pub struct SharedStakeTable {
    inner: Arc<RwLock<StakeTable>>,
}

impl SharedStakeTable {
    /// Create an empty shared table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing table.
    #[must_use]
    pub fn from_table(table: StakeTable) -> Self {
        Self {
            inner: Arc::new(RwLock::new(table)),
        }
    }

    /// Set the reported balance for an identity.
    pub fn set_stake(&self, identity: IdentityId, amount: StakeAmount) {
        if let Ok(mut table) = self.inner.write() {
            table.set_stake(identity, amount);
        }
    }

    /// Increase the reported balance using saturating arithmetic.
    pub fn credit(&self, identity: IdentityId, units: u128) {
        if let Ok(mut table) = self.inner.write() {
            table.credit(identity, units);
        }
    }

    /// Snapshot of all recorded balances, in deterministic order.
    #[must_use]
    pub fn entries(&self) -> Vec<(IdentityId, StakeAmount)> {
        self.inner
            .read()
            .map(|table| table.entries())
            .unwrap_or_default()
    }
}

impl StakeReader for SharedStakeTable {
    fn stake_of(&self, identity: IdentityId) -> Result<StakeAmount, ChrysalisError> {
        let table = self
            .inner
            .read()
            .map_err(|_| ChrysalisError::OracleUnavailable(identity))?;
        table.stake_of(identity)
    }
}

// =============================================================================
// TESTS
// =============================================================================
