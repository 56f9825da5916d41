//! Core trait for the relational store
//!
//! This module defines the `RecordStore` trait: the narrow slice of a
//! relational database the archiver needs. The walker reads through it, the
//! batch writer and deletion executor write through it.

use crate::error::Result;
use crate::types::{EntityRecord, RowWrite};
use crate::value::{Identity, Value};

/// Per-batch write options
///
/// Passed explicitly with every batch; there is no store-wide switch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertOptions {
    /// Columns overwritten when a row conflicts on its primary key or on a
    /// unique index. Columns outside this set keep their stored value.
    pub update_columns: Vec<String>,
    /// Let the store stamp `created_at` / `updated_at`
    pub touch_timestamps: bool,
}

/// Relational store abstraction
///
/// Thread safety: implementations must be `Send + Sync`. A single archive or
/// unarchive operation drives the store from one thread.
///
/// # Transactions
///
/// `begin` / `commit` / `rollback` bracket a unit of work. Writes outside a
/// transaction apply immediately.
pub trait RecordStore: Send + Sync {
    /// Fetch one row by primary key
    ///
    /// # Errors
    ///
    /// Returns an error if the table does not exist or the read fails.
    fn get(&self, table: &str, id: &Identity) -> Result<Option<EntityRecord>>;

    /// Fetch rows whose `column` equals `value`, ordered by primary key
    ///
    /// Keyset pagination: only rows with a primary key greater than `after`
    /// are returned, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the table does not exist or the read fails.
    fn scan_by(
        &self,
        table: &str,
        column: &str,
        value: &Value,
        after: Option<&Identity>,
        limit: usize,
    ) -> Result<Vec<EntityRecord>>;

    /// Insert-or-update a batch of rows
    ///
    /// Returns the identity of every affected row, in submission order.
    /// A row conflicting on its primary key or on a unique index updates the
    /// existing row's `update_columns` instead of failing.
    ///
    /// # Errors
    ///
    /// Constraint violations, contention and connectivity failures.
    fn upsert_batch(
        &self,
        table: &str,
        rows: &[RowWrite],
        options: &UpsertOptions,
    ) -> Result<Vec<Identity>>;

    /// Delete rows by primary key, returning how many existed
    ///
    /// # Errors
    ///
    /// Returns an error if the table does not exist or the delete fails.
    fn delete_by_ids(&self, table: &str, ids: &[Identity]) -> Result<usize>;

    /// Set a single column on one row, returning whether the row existed
    ///
    /// # Errors
    ///
    /// Returns an error if the table or column does not exist.
    fn update_column(&self, table: &str, id: &Identity, column: &str, value: Value)
        -> Result<bool>;

    /// Begin a transaction
    fn begin(&self) -> Result<()>;

    /// Commit the open transaction
    fn commit(&self) -> Result<()>;

    /// Roll back the open transaction
    fn rollback(&self) -> Result<()>;
}
