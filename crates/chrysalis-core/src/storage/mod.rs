//! # Persistent Storage
//!
//! Disk-backed ledger implementation using redb.

mod redb_ledger;

pub use redb_ledger::RedbLedger;
