//! # Trait Engine
//!
//! The trait-evolution state machine: initialization, stake-gated
//! evolution, and retroactive display pinning over an append-only
//! history chain.
//!
//! The engine is pure with respect to its environment: stake balances
//! arrive through an injected `StakeReader`, wall-clock time through an
//! injected `Clock`, and every mutating call is authorized against one
//! configured controller principal before any state is touched.
//!
//! ## Storage Backends
//!
//! The engine supports two ledger backends:
//! - `InMemory`: `MemoryLedger` (fast, volatile unless explicitly saved)
//! - `Persistent`: `RedbLedger` for disk-backed ACID storage
//!
//! ## Atomicity
//!
//! Mutating methods take `&mut self` (single writer per engine) and
//! perform all validation and oracle/clock reads before the single
//! ledger mutation, so a failed call leaves no partial history entry or
//! override change behind.

use crate::clock::Clock;
use crate::ledger::{MemoryLedger, TraitLedger};
use crate::primitives::{DEFAULT_EVOLUTION_THRESHOLD, DEFAULT_TOKEN_URI_BASE};
use crate::resolver;
use crate::stake::StakeReader;
use crate::storage::RedbLedger;
use crate::{ChrysalisError, IdentityId, Principal, StakeAmount, TraitRecord};
use std::path::Path;

// =============================================================================
// BACKEND & CONFIG
// =============================================================================

/// Ledger backend for a `TraitEngine`.
#[derive(Debug)]
pub enum LedgerBackend {
    /// In-memory ledger (fast, volatile).
    InMemory(MemoryLedger),
    /// Disk-backed ledger using redb (ACID, persistent).
    Persistent(RedbLedger),
}

impl Default for LedgerBackend {
    fn default() -> Self {
        Self::InMemory(MemoryLedger::new())
    }
}

/// Tunable engine configuration.
///
/// The evolution threshold is deliberately configuration rather than a
/// compiled constant: the growth bar observed in one environment is not
/// a law of the mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Stake growth over the last recorded baseline required to evolve.
    pub evolution_threshold: StakeAmount,
    /// Base prepended to token URI fragments.
    pub token_uri_base: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            evolution_threshold: StakeAmount::new(DEFAULT_EVOLUTION_THRESHOLD),
            token_uri_base: DEFAULT_TOKEN_URI_BASE.to_string(),
        }
    }
}

// =============================================================================
// TRAIT ENGINE
// =============================================================================

/// The trait-evolution engine.
///
/// Combines a ledger backend with the injected stake and clock
/// capabilities and the configured controller principal.
pub struct TraitEngine {
    /// The ledger backend (in-memory or persistent).
    backend: LedgerBackend,
    /// Live view of externally locked balances.
    stake: Box<dyn StakeReader>,
    /// Provenance timestamp source.
    clock: Box<dyn Clock>,
    /// The single principal allowed to mutate records.
    controller: Principal,
    /// Threshold and URI configuration.
    config: EngineConfig,
}

impl std::fmt::Debug for TraitEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraitEngine")
            .field("backend", &self.backend)
            .field("controller", &self.controller)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TraitEngine {
    /// Create an in-memory engine with default configuration.
    #[must_use]
    pub fn new(
        controller: Principal,
        stake: impl StakeReader + 'static,
        clock: impl Clock + 'static,
    ) -> Self {
        Self::with_backend(
            LedgerBackend::default(),
            controller,
            stake,
            clock,
            EngineConfig::default(),
        )
    }

    /// Create an in-memory engine with explicit configuration.
    #[must_use]
    pub fn with_config(
        controller: Principal,
        stake: impl StakeReader + 'static,
        clock: impl Clock + 'static,
        config: EngineConfig,
    ) -> Self {
        Self::with_backend(LedgerBackend::default(), controller, stake, clock, config)
    }

    /// Create an engine over a persistent redb ledger.
    ///
    /// Opens or creates a redb database at the given path. All history
    /// and overrides are automatically persisted to disk.
    pub fn with_redb(
        path: impl AsRef<Path>,
        controller: Principal,
        stake: impl StakeReader + 'static,
        clock: impl Clock + 'static,
        config: EngineConfig,
    ) -> Result<Self, ChrysalisError> {
        let ledger = RedbLedger::open(path)?;
        Ok(Self::with_backend(
            LedgerBackend::Persistent(ledger),
            controller,
            stake,
            clock,
            config,
        ))
    }

    /// Create an engine with an explicit backend.
    #[must_use]
    pub fn with_backend(
        backend: LedgerBackend,
        controller: Principal,
        stake: impl StakeReader + 'static,
        clock: impl Clock + 'static,
        config: EngineConfig,
    ) -> Self {
        Self {
            backend,
            stake: Box::new(stake),
            clock: Box::new(clock),
            controller,
            config,
        }
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, LedgerBackend::Persistent(_))
    }

    /// The configured controller principal.
    #[must_use]
    pub fn controller(&self) -> &Principal {
        &self.controller
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn ledger(&self) -> &dyn TraitLedger {
        match &self.backend {
            LedgerBackend::InMemory(ledger) => ledger,
            LedgerBackend::Persistent(ledger) => ledger,
        }
    }

    fn ledger_mut(&mut self) -> &mut dyn TraitLedger {
        match &mut self.backend {
            LedgerBackend::InMemory(ledger) => ledger,
            LedgerBackend::Persistent(ledger) => ledger,
        }
    }

    /// The single flat authorization check applied to every mutation.
    fn authorize(&self, caller: &Principal) -> Result<(), ChrysalisError> {
        if caller == &self.controller {
            Ok(())
        } else {
            Err(ChrysalisError::Unauthorized)
        }
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Initialize an identity's trait record.
    ///
    /// Appends `seed` as history entry 1, with `last_recorded_stake` and
    /// `last_recorded_at` populated from the current oracle reading and
    /// clock — any caller-supplied provenance in the seed is ignored.
    ///
    /// Fails with `AlreadyInitialized` when the identity already has
    /// history; re-initialization never silently overwrites.
    pub fn init_traits(
        &mut self,
        caller: &Principal,
        identity: IdentityId,
        seed: TraitRecord,
    ) -> Result<(), ChrysalisError> {
        self.authorize(caller)?;

        if self.ledger().history_count(identity)? > 0 {
            return Err(ChrysalisError::AlreadyInitialized(identity));
        }

        let stake = self.stake.stake_of(identity)?;
        let now = self.clock.now();
        let record = TraitRecord::with_traits(seed.gender, seed.skin, seed.dna).evolved(stake, now);

        self.ledger_mut().append_entry(identity, record)?;
        Ok(())
    }

    /// Append a new history entry for an eligible identity.
    ///
    /// Descriptive fields are carried forward unchanged from the latest
    /// entry; only the provenance snapshot is refreshed. Evolution
    /// records that the growth happened, it does not rewrite genetics.
    pub fn evolve(
        &mut self,
        caller: &Principal,
        identity: IdentityId,
    ) -> Result<(), ChrysalisError> {
        self.authorize(caller)?;

        let Some(latest) = self.ledger().latest_entry(identity)? else {
            return Err(ChrysalisError::NotInitialized(identity));
        };

        let stake = self.stake.stake_of(identity)?;
        if stake.gain_over(latest.last_recorded_stake) < self.config.evolution_threshold.value() {
            return Err(ChrysalisError::EvolutionNotEligible(identity));
        }

        let now = self.clock.now();
        self.ledger_mut()
            .append_entry(identity, latest.evolved(stake, now))?;
        Ok(())
    }

    /// Pin the displayed history index for an identity.
    ///
    /// The pin supersedes "latest" for display until replaced; later
    /// evolutions never clear it. A failed call leaves the previous pin
    /// (or unset state) intact.
    pub fn override_history(
        &mut self,
        caller: &Principal,
        identity: IdentityId,
        index: u32,
    ) -> Result<(), ChrysalisError> {
        self.authorize(caller)?;

        let count = self.ledger().history_count(identity)?;
        if count == 0 {
            return Err(ChrysalisError::NotInitialized(identity));
        }
        if index == 0 || index > count {
            return Err(ChrysalisError::IndexOutOfRange { index, count });
        }

        self.ledger_mut().set_history_override(identity, index)?;
        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// True iff the identity has no history.
    pub fn is_uninitialized(&self, identity: IdentityId) -> Result<bool, ChrysalisError> {
        Ok(self.ledger().history_count(identity)? == 0)
    }

    /// Number of history entries for the identity.
    pub fn history_count(&self, identity: IdentityId) -> Result<u32, ChrysalisError> {
        self.ledger().history_count(identity)
    }

    /// The TRUE latest record, ignoring any display pin.
    ///
    /// Returns the blank sentinel for uninitialized identities.
    pub fn latest_trait_data(&self, identity: IdentityId) -> Result<TraitRecord, ChrysalisError> {
        Ok(self
            .ledger()
            .latest_entry(identity)?
            .unwrap_or_else(TraitRecord::blank))
    }

    /// The record at a specific 1-based history index.
    pub fn trait_data_at(
        &self,
        identity: IdentityId,
        index: u32,
    ) -> Result<TraitRecord, ChrysalisError> {
        let count = self.ledger().history_count(identity)?;
        if count == 0 {
            return Err(ChrysalisError::NotInitialized(identity));
        }
        self.ledger()
            .entry_at(identity, index)?
            .ok_or(ChrysalisError::IndexOutOfRange { index, count })
    }

    /// Whether the stake-growth gate is currently open.
    ///
    /// Always false for uninitialized identities, even when the oracle
    /// already reports a balance: the baseline does not exist until
    /// initialization snapshots it. The gate re-closes immediately after
    /// each evolution because the bar resets against the new baseline.
    pub fn can_evolve(&self, identity: IdentityId) -> Result<bool, ChrysalisError> {
        let Some(latest) = self.ledger().latest_entry(identity)? else {
            return Ok(false);
        };
        let stake = self.stake.stake_of(identity)?;
        Ok(stake.gain_over(latest.last_recorded_stake) >= self.config.evolution_threshold.value())
    }

    /// The pinned display index; 0 means unset.
    pub fn history_override(&self, identity: IdentityId) -> Result<u32, ChrysalisError> {
        self.ledger().history_override(identity)
    }

    /// The displayed history index: the pin when set, else the latest.
    /// Zero means "no record" (uninitialized).
    pub fn resolved_display_index(&self, identity: IdentityId) -> Result<u32, ChrysalisError> {
        let pinned = self.ledger().history_override(identity)?;
        let count = self.ledger().history_count(identity)?;
        Ok(resolver::resolved_index(pinned, count))
    }

    /// The token URI fragment for the currently displayed entry.
    pub fn token_uri(&self, identity: IdentityId) -> Result<String, ChrysalisError> {
        let index = self.resolved_display_index(identity)?;
        Ok(resolver::token_uri(
            &self.config.token_uri_base,
            identity,
            index,
        ))
    }

    // =========================================================================
    // METRICS
    // =========================================================================

    /// Number of initialized identities.
    pub fn identity_count(&self) -> Result<u64, ChrysalisError> {
        self.ledger().identity_count()
    }

    /// Total history entries across all identities.
    pub fn entry_total(&self) -> Result<u64, ChrysalisError> {
        self.ledger().entry_total()
    }

    /// All initialized identities, in deterministic order.
    pub fn identities(&self) -> Result<Vec<IdentityId>, ChrysalisError> {
        self.ledger().identities()
    }
}

// =============================================================================
// TESTS
// =============================================================================
