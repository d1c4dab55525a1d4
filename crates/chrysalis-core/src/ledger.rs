//! # Trait Ledger
//!
//! The storage seam for per-identity trait history.
//!
//! This module defines the `TraitLedger` trait and its in-memory
//! implementation. All data structures use `BTreeMap` for deterministic
//! ordering. History is append-only and 1-indexed: entry 0 (the blank
//! pre-initialization record) is implicit and never stored.

use crate::{ChrysalisError, IdentityId, TraitRecord};
use std::collections::BTreeMap;

// =============================================================================
// TRAITLEDGER TRAIT
// =============================================================================

/// Core storage operations for trait history and display overrides.
///
/// All fallible operations return `Result<T, ChrysalisError>` to support
/// both in-memory and persistent storage backends uniformly. Implementors
/// guarantee that a failed mutation leaves no partial state behind.
pub trait TraitLedger {
    /// Append a record as the next history entry for `identity`.
    /// Returns the 1-based index of the appended entry.
    fn append_entry(
        &mut self,
        identity: IdentityId,
        record: TraitRecord,
    ) -> Result<u32, ChrysalisError>;

    /// Number of stored history entries for `identity` (0 when blank).
    fn history_count(&self, identity: IdentityId) -> Result<u32, ChrysalisError>;

    /// The entry at a 1-based index, or `None` when out of range.
    fn entry_at(
        &self,
        identity: IdentityId,
        index: u32,
    ) -> Result<Option<TraitRecord>, ChrysalisError>;

    /// The highest-index entry, or `None` when the identity is blank.
    fn latest_entry(&self, identity: IdentityId) -> Result<Option<TraitRecord>, ChrysalisError>;

    /// The pinned display index for `identity`; 0 means unset.
    fn history_override(&self, identity: IdentityId) -> Result<u32, ChrysalisError>;

    /// Pin the display index for `identity`. Range validation is the
    /// engine's job; the ledger stores what it is given.
    fn set_history_override(
        &mut self,
        identity: IdentityId,
        index: u32,
    ) -> Result<(), ChrysalisError>;

    /// Number of identities with at least one history entry.
    fn identity_count(&self) -> Result<u64, ChrysalisError>;

    /// Total history entries across all identities.
    fn entry_total(&self) -> Result<u64, ChrysalisError>;

    /// All initialized identities, in deterministic order.
    fn identities(&self) -> Result<Vec<IdentityId>, ChrysalisError>;
}

// =============================================================================
// MEMORY LEDGER
// =============================================================================

/// The in-memory ledger.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
/// No `HashMap` allowed.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    /// History chains: identity -> append-only entries (index 0 here is
    /// history entry 1).
    histories: BTreeMap<IdentityId, Vec<TraitRecord>>,

    /// Display overrides: identity -> pinned 1-based index.
    /// Absent means unset (display the latest entry).
    overrides: BTreeMap<IdentityId, u32>,
}

impl MemoryLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TraitLedger for MemoryLedger {
    fn append_entry(
        &mut self,
        identity: IdentityId,
        record: TraitRecord,
    ) -> Result<u32, ChrysalisError> {
        let chain = self.histories.entry(identity).or_default();
        chain.push(record);
        Ok(chain.len() as u32)
    }

    fn history_count(&self, identity: IdentityId) -> Result<u32, ChrysalisError> {
        Ok(self
            .histories
            .get(&identity)
            .map(|chain| chain.len() as u32)
            .unwrap_or(0))
    }

    fn entry_at(
        &self,
        identity: IdentityId,
        index: u32,
    ) -> Result<Option<TraitRecord>, ChrysalisError> {
        if index == 0 {
            return Ok(None);
        }
        Ok(self
            .histories
            .get(&identity)
            .and_then(|chain| chain.get((index - 1) as usize))
            .copied())
    }

    fn latest_entry(&self, identity: IdentityId) -> Result<Option<TraitRecord>, ChrysalisError> {
        Ok(self
            .histories
            .get(&identity)
            .and_then(|chain| chain.last())
            .copied())
    }

    fn history_override(&self, identity: IdentityId) -> Result<u32, ChrysalisError> {
        Ok(self.overrides.get(&identity).copied().unwrap_or(0))
    }

    fn set_history_override(
        &mut self,
        identity: IdentityId,
        index: u32,
    ) -> Result<(), ChrysalisError> {
        self.overrides.insert(identity, index);
        Ok(())
    }

    fn identity_count(&self) -> Result<u64, ChrysalisError> {
        Ok(self.histories.len() as u64)
    }

    fn entry_total(&self) -> Result<u64, ChrysalisError> {
        Ok(self.histories.values().map(|chain| chain.len() as u64).sum())
    }

    fn identities(&self) -> Result<Vec<IdentityId>, ChrysalisError> {
        Ok(self.histories.keys().copied().collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
