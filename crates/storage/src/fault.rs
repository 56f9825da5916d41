//! Fault injection and call statistics for MemoryStore
//!
//! A [`FaultPlan`] makes a table misbehave on demand:
//! - contention: the next `n` writes fail with a transient deadlock error
//! - write failure: every upsert fails with a constraint error
//! - delete failure: every delete fails with a storage error
//!
//! [`StoreStats`] records what the store was asked to do, so callers can
//! assert on batch shapes without wrapping the store.

use std::collections::HashMap;

use coldstore_core::{Error, Result};
use tracing::debug;

/// Message carried by injected contention errors
pub const DEADLOCK_MESSAGE: &str = "Deadlock found when trying to get lock";

/// Per-table fault configuration
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    contention: HashMap<String, usize>,
    write_failures: HashMap<String, String>,
    delete_failures: HashMap<String, String>,
}

impl FaultPlan {
    /// Fail the next `times` writes (upserts or deletes) to `table` with
    /// [`Error::TransientContention`]
    pub fn inject_contention(&mut self, table: &str, times: usize) {
        self.contention.insert(table.to_string(), times);
    }

    /// Fail every upsert to `table` with [`Error::Constraint`]
    pub fn fail_writes(&mut self, table: &str, message: impl Into<String>) {
        self.write_failures
            .insert(table.to_string(), message.into());
    }

    /// Fail every delete from `table` with [`Error::Storage`]
    pub fn fail_deletes(&mut self, table: &str, message: impl Into<String>) {
        self.delete_failures
            .insert(table.to_string(), message.into());
    }

    /// Remove all faults
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn take_contention(&mut self, table: &str) -> Result<()> {
        if let Some(remaining) = self.contention.get_mut(table) {
            if *remaining > 0 {
                *remaining -= 1;
                debug!(target: "coldstore::store", table, remaining = *remaining, "Injected contention");
                return Err(Error::contention(DEADLOCK_MESSAGE));
            }
        }
        Ok(())
    }

    pub(crate) fn check_write(&mut self, table: &str) -> Result<()> {
        self.take_contention(table)?;
        match self.write_failures.get(table) {
            Some(message) => Err(Error::constraint(message.clone())),
            None => Ok(()),
        }
    }

    pub(crate) fn check_delete(&mut self, table: &str) -> Result<()> {
        self.take_contention(table)?;
        match self.delete_failures.get(table) {
            Some(message) => Err(Error::storage(message.clone())),
            None => Ok(()),
        }
    }
}

/// Counters of store activity, keyed by table
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    upserts: HashMap<String, Vec<usize>>,
    deletes: HashMap<String, Vec<usize>>,
    scans: HashMap<String, usize>,
    /// Committed transactions
    pub commits: usize,
    /// Rolled-back transactions
    pub rollbacks: usize,
}

impl StoreStats {
    pub(crate) fn record_upsert(&mut self, table: &str, rows: usize) {
        self.upserts.entry(table.to_string()).or_default().push(rows);
    }

    pub(crate) fn record_delete(&mut self, table: &str, ids: usize) {
        self.deletes.entry(table.to_string()).or_default().push(ids);
    }

    pub(crate) fn record_scan(&mut self, table: &str) {
        *self.scans.entry(table.to_string()).or_default() += 1;
    }

    /// Number of upsert calls against `table`, including failed attempts
    pub fn upsert_calls(&self, table: &str) -> usize {
        self.upserts.get(table).map_or(0, Vec::len)
    }

    /// Row count of each upsert call against `table`, in call order
    pub fn upsert_batches(&self, table: &str) -> Vec<usize> {
        self.upserts.get(table).cloned().unwrap_or_default()
    }

    /// Id count of each delete call against `table`, in call order
    pub fn delete_batches(&self, table: &str) -> Vec<usize> {
        self.deletes.get(table).cloned().unwrap_or_default()
    }

    /// Number of scan calls against `table`
    pub fn scan_calls(&self, table: &str) -> usize {
        self.scans.get(table).copied().unwrap_or(0)
    }
}
