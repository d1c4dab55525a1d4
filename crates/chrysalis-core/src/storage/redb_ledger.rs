//! # redb-backed Trait Ledger
//!
//! A disk-backed ledger using the redb embedded database, providing:
//! - ACID transactions (every mutation is a single commit)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//! - Zero configuration
//!
//! History entries are immutable once committed; the only keys ever
//! rewritten are the per-identity count and override slots.

use crate::ledger::TraitLedger;
use crate::{ChrysalisError, IdentityId, TraitRecord};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::collections::BTreeMap;
use std::path::Path;

/// Table for history entries: (identity, 1-based index) -> serialized TraitRecord bytes
const HISTORY: TableDefinition<(u64, u32), &[u8]> = TableDefinition::new("history");

/// Table for display overrides: identity -> pinned index (0 = unset)
const OVERRIDES: TableDefinition<u64, u32> = TableDefinition::new("overrides");

/// Table for per-identity history counts: identity -> count
const COUNTS: TableDefinition<u64, u32> = TableDefinition::new("history_counts");

/// A disk-backed trait ledger using redb.
///
/// Maintains an in-memory count cache for fast gate checks; the cache is
/// rebuilt from the counts table on open and updated only after a
/// successful commit.
pub struct RedbLedger {
    /// The redb database handle.
    db: Database,
    /// In-memory cache of identity -> history count.
    count_cache: BTreeMap<IdentityId, u32>,
}

impl std::fmt::Debug for RedbLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbLedger")
            .field("identity_count", &self.count_cache.len())
            .finish_non_exhaustive()
    }
}

impl RedbLedger {
    /// Open or create a ledger database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ChrysalisError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| ChrysalisError::Io(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| ChrysalisError::Io(e.to_string()))?;
            let _ = write_txn
                .open_table(HISTORY)
                .map_err(|e| ChrysalisError::Io(e.to_string()))?;
            let _ = write_txn
                .open_table(OVERRIDES)
                .map_err(|e| ChrysalisError::Io(e.to_string()))?;
            let _ = write_txn
                .open_table(COUNTS)
                .map_err(|e| ChrysalisError::Io(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| ChrysalisError::Io(e.to_string()))?;
        }

        // Load count cache
        let read_txn = db
            .begin_read()
            .map_err(|e| ChrysalisError::Io(e.to_string()))?;
        let count_cache = {
            let table = read_txn
                .open_table(COUNTS)
                .map_err(|e| ChrysalisError::Io(e.to_string()))?;
            let mut cache = BTreeMap::new();
            for entry in table
                .iter()
                .map_err(|e| ChrysalisError::Io(e.to_string()))?
            {
                let (key, value) = entry.map_err(|e| ChrysalisError::Io(e.to_string()))?;
                cache.insert(IdentityId(key.value()), value.value());
            }
            cache
        };

        Ok(Self { db, count_cache })
    }

    /// Compact the database (optional optimization).
    pub fn compact(&mut self) -> Result<(), ChrysalisError> {
        self.db
            .compact()
            .map_err(|e| ChrysalisError::Io(e.to_string()))?;
        Ok(())
    }

    fn read_record(
        &self,
        identity: IdentityId,
        index: u32,
    ) -> Result<Option<TraitRecord>, ChrysalisError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| ChrysalisError::Io(e.to_string()))?;
        let table = read_txn
            .open_table(HISTORY)
            .map_err(|e| ChrysalisError::Io(e.to_string()))?;

        match table
            .get((identity.0, index))
            .map_err(|e| ChrysalisError::Io(e.to_string()))?
        {
            Some(data) => {
                let record: TraitRecord = postcard::from_bytes(data.value())
                    .map_err(|e| ChrysalisError::Serialization(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

// =============================================================================
// TRAITLEDGER TRAIT IMPLEMENTATION
// =============================================================================

impl TraitLedger for RedbLedger {
    fn append_entry(
        &mut self,
        identity: IdentityId,
        record: TraitRecord,
    ) -> Result<u32, ChrysalisError> {
        let next_index = self
            .count_cache
            .get(&identity)
            .copied()
            .unwrap_or(0)
            .saturating_add(1);

        let record_bytes = postcard::to_allocvec(&record)
            .map_err(|e| ChrysalisError::Serialization(e.to_string()))?;

        // Entry and count land in one transaction; on any failure nothing
        // is committed and the cache stays untouched.
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| ChrysalisError::Io(e.to_string()))?;
        {
            let mut history_table = write_txn
                .open_table(HISTORY)
                .map_err(|e| ChrysalisError::Io(e.to_string()))?;
            history_table
                .insert((identity.0, next_index), record_bytes.as_slice())
                .map_err(|e| ChrysalisError::Io(e.to_string()))?;
        }
        {
            let mut counts_table = write_txn
                .open_table(COUNTS)
                .map_err(|e| ChrysalisError::Io(e.to_string()))?;
            counts_table
                .insert(identity.0, next_index)
                .map_err(|e| ChrysalisError::Io(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| ChrysalisError::Io(e.to_string()))?;

        // Update in-memory state only after successful commit.
        self.count_cache.insert(identity, next_index);

        Ok(next_index)
    }

    fn history_count(&self, identity: IdentityId) -> Result<u32, ChrysalisError> {
        Ok(self.count_cache.get(&identity).copied().unwrap_or(0))
    }

    fn entry_at(
        &self,
        identity: IdentityId,
        index: u32,
    ) -> Result<Option<TraitRecord>, ChrysalisError> {
        if index == 0 {
            return Ok(None);
        }
        self.read_record(identity, index)
    }

    fn latest_entry(&self, identity: IdentityId) -> Result<Option<TraitRecord>, ChrysalisError> {
        let count = self.history_count(identity)?;
        if count == 0 {
            return Ok(None);
        }
        self.read_record(identity, count)
    }

    fn history_override(&self, identity: IdentityId) -> Result<u32, ChrysalisError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| ChrysalisError::Io(e.to_string()))?;
        let table = read_txn
            .open_table(OVERRIDES)
            .map_err(|e| ChrysalisError::Io(e.to_string()))?;
        let pinned = table
            .get(identity.0)
            .map_err(|e| ChrysalisError::Io(e.to_string()))?
            .map(|v| v.value())
            .unwrap_or(0);
        Ok(pinned)
    }

    fn set_history_override(
        &mut self,
        identity: IdentityId,
        index: u32,
    ) -> Result<(), ChrysalisError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| ChrysalisError::Io(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(OVERRIDES)
                .map_err(|e| ChrysalisError::Io(e.to_string()))?;
            table
                .insert(identity.0, index)
                .map_err(|e| ChrysalisError::Io(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| ChrysalisError::Io(e.to_string()))?;
        Ok(())
    }

    fn identity_count(&self) -> Result<u64, ChrysalisError> {
        Ok(self.count_cache.len() as u64)
    }

    fn entry_total(&self) -> Result<u64, ChrysalisError> {
        Ok(self.count_cache.values().map(|&c| c as u64).sum())
    }

    fn identities(&self) -> Result<Vec<IdentityId>, ChrysalisError> {
        Ok(self.count_cache.keys().copied().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::{StakeAmount, Timestamp};
    use tempfile::tempdir;

    fn record(stake: u128, at: u64) -> TraitRecord {
        TraitRecord {
            gender: 1,
            skin: 4,
            dna: 0xACE0_FBA5E,
            last_recorded_stake: StakeAmount::new(stake),
            last_recorded_at: Timestamp::new(at),
        }
    }

    #[test]
    fn basic_operations() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        let mut ledger = RedbLedger::open(&db_path).expect("open db");

        let first = ledger.append_entry(IdentityId(1), record(250, 10)).expect("append");
        let second = ledger.append_entry(IdentityId(1), record(1250, 20)).expect("append");

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(ledger.history_count(IdentityId(1)).expect("count"), 2);
        assert_eq!(ledger.identity_count().expect("ids"), 1);
    }

    #[test]
    fn entries_round_trip() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        let mut ledger = RedbLedger::open(&db_path).expect("open db");

        ledger.append_entry(IdentityId(1), record(250, 10)).expect("append");

        let stored = ledger
            .entry_at(IdentityId(1), 1)
            .expect("entry")
            .expect("some");
        assert_eq!(stored, record(250, 10));
        assert!(ledger.entry_at(IdentityId(1), 2).expect("entry").is_none());
        assert!(ledger.entry_at(IdentityId(1), 0).expect("entry").is_none());
    }

    #[test]
    fn override_round_trip() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        let mut ledger = RedbLedger::open(&db_path).expect("open db");

        assert_eq!(ledger.history_override(IdentityId(1)).expect("pin"), 0);
        ledger.set_history_override(IdentityId(1), 1).expect("pin");
        assert_eq!(ledger.history_override(IdentityId(1)).expect("pin"), 1);
    }

    #[test]
    fn persistence_across_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        // Phase 1: write history and a pin
        {
            let mut ledger = RedbLedger::open(&db_path).expect("open db");
            ledger.append_entry(IdentityId(1), record(250, 10)).expect("append");
            ledger.append_entry(IdentityId(1), record(1250, 20)).expect("append");
            ledger.append_entry(IdentityId(7), record(500, 30)).expect("append");
            ledger.set_history_override(IdentityId(1), 1).expect("pin");
        }
        // Ledger dropped here, simulating process exit

        // Phase 2: reopen and verify everything survived
        {
            let ledger = RedbLedger::open(&db_path).expect("reopen db");
            assert_eq!(ledger.history_count(IdentityId(1)).expect("count"), 2);
            assert_eq!(ledger.history_count(IdentityId(7)).expect("count"), 1);
            assert_eq!(ledger.history_override(IdentityId(1)).expect("pin"), 1);
            assert_eq!(ledger.entry_total().expect("entries"), 3);

            let latest = ledger
                .latest_entry(IdentityId(1))
                .expect("latest")
                .expect("some");
            assert_eq!(latest.last_recorded_stake.value(), 1250);
        }
    }

    #[test]
    fn append_continues_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let mut ledger = RedbLedger::open(&db_path).expect("open db");
            ledger.append_entry(IdentityId(1), record(250, 10)).expect("append");
        }

        {
            let mut ledger = RedbLedger::open(&db_path).expect("reopen db");
            let index = ledger.append_entry(IdentityId(1), record(1250, 20)).expect("append");
            assert_eq!(index, 2);
        }
    }

    #[test]
    fn identities_are_ordered() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        let mut ledger = RedbLedger::open(&db_path).expect("open db");

        ledger.append_entry(IdentityId(9), record(1, 1)).expect("append");
        ledger.append_entry(IdentityId(2), record(2, 2)).expect("append");

        assert_eq!(
            ledger.identities().expect("list"),
            vec![IdentityId(2), IdentityId(9)]
        );
    }

    #[test]
    fn compact_preserves_data() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        let mut ledger = RedbLedger::open(&db_path).expect("open db");

        for i in 0..20 {
            ledger.append_entry(IdentityId(i), record(i as u128, i)).expect("append");
        }
        ledger.compact().expect("compact");

        assert_eq!(ledger.identity_count().expect("ids"), 20);
    }
}
