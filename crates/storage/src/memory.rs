//! MemoryStore: in-memory relational backend
//!
//! This module implements the RecordStore trait using:
//! - `BTreeMap<Identity, Attributes>` per table, ordered by primary key
//! - `parking_lot::RwLock` for thread-safe access
//! - A per-table auto-increment counter
//! - Unique-index conflict detection for upserts
//!
//! # Design Notes
//!
//! - **Snapshot transactions**: `begin` clones the whole state and `rollback`
//!   swaps it back. O(n) per transaction, which is fine for a reference store.
//! - **Batch atomicity**: every row of a batch is validated before the first
//!   one is applied, so a rejected batch leaves no partial writes.
//! - **Upsert**: a conflict on the primary key or any unique index updates the
//!   existing row's `update_columns` (only those present in the submitted row).
//! - **Fault injection**: see [`crate::fault`]; lets callers rehearse
//!   contention and constraint failures.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use coldstore_core::{
    Attributes, ColumnKind, EntityRecord, Error, Identity, RecordStore, Result, RowWrite,
    SchemaRegistry, TableSchema, UpsertOptions, Value,
};

use crate::fault::{FaultPlan, StoreStats};

/// Column stamped on insert when timestamps are touched
pub const CREATED_AT: &str = "created_at";
/// Column stamped on insert and update when timestamps are touched
pub const UPDATED_AT: &str = "updated_at";

/// One table: schema, rows and auto-increment counter
#[derive(Debug, Clone)]
struct Table {
    schema: Arc<TableSchema>,
    primary_key: String,
    rows: BTreeMap<Identity, Attributes>,
    next_id: i64,
}

impl Table {
    fn new(schema: TableSchema) -> Result<Self> {
        let primary_key = schema
            .primary_key()
            .ok_or_else(|| {
                Error::invalid_input(format!(
                    "table '{}' has no primary key column",
                    schema.table_name
                ))
            })?
            .to_string();
        Ok(Self {
            schema: Arc::new(schema),
            primary_key,
            rows: BTreeMap::new(),
            next_id: 1,
        })
    }

    fn name(&self) -> &str {
        &self.schema.table_name
    }

    fn record(&self, attributes: &Attributes) -> EntityRecord {
        EntityRecord::new(self.schema.type_name.clone(), attributes.clone())
    }

    fn check_columns(&self, attributes: &Attributes) -> Result<()> {
        match attributes.keys().find(|c| !self.schema.has_column(c)) {
            Some(unknown) => Err(Error::storage(format!(
                "unknown column '{}' on table '{}'",
                unknown,
                self.name()
            ))),
            None => Ok(()),
        }
    }

    /// Existing row a submitted row collides with, if any
    fn find_conflict(&self, row: &RowWrite) -> Option<Identity> {
        if let Some(id) = &row.id {
            if self.rows.contains_key(id) {
                return Some(id.clone());
            }
        }

        for index in &self.schema.unique_indexes {
            let key: Option<Vec<&Value>> = index
                .iter()
                .map(|c| row.attributes.get(c).filter(|v| !v.is_null()))
                .collect();
            let Some(key) = key else { continue };

            let hit = self.rows.iter().find(|(_, existing)| {
                index
                    .iter()
                    .zip(key.iter())
                    .all(|(c, v)| existing.get(c) == Some(*v))
            });
            if let Some((id, _)) = hit {
                return Some(id.clone());
            }
        }
        None
    }

    fn allocate_id(&mut self, forced: Option<&Identity>) -> Result<Identity> {
        match forced {
            Some(Identity::Int(n)) => {
                self.next_id = self.next_id.max(n + 1);
                Ok(Identity::Int(*n))
            }
            Some(id) => Ok(id.clone()),
            None => {
                let kind = self
                    .schema
                    .column_def(&self.primary_key)
                    .map(|c| c.kind)
                    .unwrap_or(ColumnKind::Integer);
                if kind != ColumnKind::Integer {
                    return Err(Error::constraint(format!(
                        "table '{}' cannot auto-assign a {:?} primary key",
                        self.name(),
                        kind
                    )));
                }
                let id = self.next_id;
                self.next_id += 1;
                Ok(Identity::Int(id))
            }
        }
    }

    fn upsert(&mut self, row: &RowWrite, options: &UpsertOptions) -> Result<Identity> {
        let now = Value::Timestamp(Utc::now());

        if let Some(target) = self.find_conflict(row) {
            let touch = options.touch_timestamps && self.schema.has_column(UPDATED_AT);
            if let Some(existing) = self.rows.get_mut(&target) {
                for column in &options.update_columns {
                    if let Some(value) = row.attributes.get(column) {
                        existing.insert(column.clone(), value.clone());
                    }
                }
                if touch {
                    existing.insert(UPDATED_AT.to_string(), now);
                }
            }
            return Ok(target);
        }

        let id = self.allocate_id(row.id.as_ref())?;
        let mut attributes = Attributes::new();
        for column in &self.schema.columns {
            if let Some(default) = &column.default {
                attributes.insert(column.name.clone(), default.clone());
            }
        }
        attributes.extend(row.attributes.clone());
        attributes.insert(self.primary_key.clone(), id.to_value());
        if options.touch_timestamps {
            for column in [CREATED_AT, UPDATED_AT] {
                if self.schema.has_column(column) {
                    attributes.insert(column.to_string(), now.clone());
                }
            }
        }
        self.rows.insert(id.clone(), attributes);
        Ok(id)
    }
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    tables: BTreeMap<String, Table>,
}

impl StoreState {
    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::storage(format!("no such table '{}'", name)))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::storage(format!("no such table '{}'", name)))
    }
}

/// In-memory relational store
///
/// Implements [`RecordStore`]. Thread-safe through `parking_lot` locks.
///
/// # Example
///
/// ```
/// use coldstore_core::{attrs, RecordStore, SchemaRegistry, TableSchema, Value, Identity};
/// use coldstore_storage::MemoryStore;
///
/// let schema = SchemaRegistry::new().with(TableSchema::new("Account", "accounts").id());
/// let store = MemoryStore::from_schema(&schema).unwrap();
/// let id = store.insert("accounts", attrs([("id", Value::Int(1))])).unwrap();
/// assert_eq!(id, Identity::Int(1));
/// assert!(store.get("accounts", &id).unwrap().is_some());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    /// State captured by `begin`; restored by `rollback`
    snapshot: Mutex<Option<StoreState>>,
    faults: Mutex<FaultPlan>,
    stats: Mutex<StoreStats>,
}

impl MemoryStore {
    /// Create an empty store with no tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with one table per registered schema
    pub fn from_schema(schema: &SchemaRegistry) -> Result<Self> {
        let store = Self::new();
        for table in schema.tables() {
            store.create_table(table.clone())?;
        }
        Ok(store)
    }

    /// Create (or replace) a table
    pub fn create_table(&self, schema: TableSchema) -> Result<()> {
        let table = Table::new(schema)?;
        debug!(target: "coldstore::store", table = table.name(), "Table created");
        self.state
            .write()
            .tables
            .insert(table.name().to_string(), table);
        Ok(())
    }

    /// Insert one row outside any batch (test and seeding helper)
    ///
    /// Honors a primary key present in `attributes`.
    pub fn insert(&self, table: &str, mut attributes: Attributes) -> Result<Identity> {
        let mut state = self.state.write();
        let t = state.table_mut(table)?;
        t.check_columns(&attributes)?;
        let id = attributes
            .remove(&t.primary_key)
            .and_then(|v| v.as_identity());
        let row = RowWrite {
            id,
            attributes,
        };
        if t.find_conflict(&row).is_some() {
            return Err(Error::constraint(format!(
                "duplicate entry on table '{}'",
                table
            )));
        }
        t.upsert(&row, &UpsertOptions::default())
    }

    /// All rows of a table, ordered by primary key
    pub fn rows(&self, table: &str) -> Result<Vec<EntityRecord>> {
        let state = self.state.read();
        let t = state.table(table)?;
        Ok(t.rows.values().map(|a| t.record(a)).collect())
    }

    /// Number of rows in a table
    pub fn count(&self, table: &str) -> Result<usize> {
        Ok(self.state.read().table(table)?.rows.len())
    }

    /// Fault plan handle
    pub fn faults(&self) -> parking_lot::MutexGuard<'_, FaultPlan> {
        self.faults.lock()
    }

    /// Snapshot of call statistics
    pub fn stats(&self) -> StoreStats {
        self.stats.lock().clone()
    }

    /// Whether a transaction is currently open
    pub fn in_transaction(&self) -> bool {
        self.snapshot.lock().is_some()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, table: &str, id: &Identity) -> Result<Option<EntityRecord>> {
        let state = self.state.read();
        let t = state.table(table)?;
        Ok(t.rows.get(id).map(|a| t.record(a)))
    }

    fn scan_by(
        &self,
        table: &str,
        column: &str,
        value: &Value,
        after: Option<&Identity>,
        limit: usize,
    ) -> Result<Vec<EntityRecord>> {
        let state = self.state.read();
        let t = state.table(table)?;
        if !t.schema.has_column(column) {
            return Err(Error::storage(format!(
                "unknown column '{}' on table '{}'",
                column, table
            )));
        }
        self.stats.lock().record_scan(table);

        Ok(t.rows
            .iter()
            .filter(|(id, _)| after.map_or(true, |a| *id > a))
            .filter(|(_, row)| row.get(column) == Some(value))
            .take(limit)
            .map(|(_, row)| t.record(row))
            .collect())
    }

    fn upsert_batch(
        &self,
        table: &str,
        rows: &[RowWrite],
        options: &UpsertOptions,
    ) -> Result<Vec<Identity>> {
        self.stats.lock().record_upsert(table, rows.len());
        self.faults.lock().check_write(table)?;

        let mut state = self.state.write();
        let t = state.table_mut(table)?;
        for row in rows {
            t.check_columns(&row.attributes)?;
        }

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(t.upsert(row, options)?);
        }
        Ok(ids)
    }

    fn delete_by_ids(&self, table: &str, ids: &[Identity]) -> Result<usize> {
        self.stats.lock().record_delete(table, ids.len());
        self.faults.lock().check_delete(table)?;

        let mut state = self.state.write();
        let t = state.table_mut(table)?;
        let unique: BTreeSet<&Identity> = ids.iter().collect();
        Ok(unique
            .into_iter()
            .filter(|id| t.rows.remove(*id).is_some())
            .count())
    }

    fn update_column(
        &self,
        table: &str,
        id: &Identity,
        column: &str,
        value: Value,
    ) -> Result<bool> {
        let mut state = self.state.write();
        let t = state.table_mut(table)?;
        if !t.schema.has_column(column) {
            return Err(Error::storage(format!(
                "unknown column '{}' on table '{}'",
                column, table
            )));
        }
        match t.rows.get_mut(id) {
            Some(row) => {
                row.insert(column.to_string(), value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn begin(&self) -> Result<()> {
        let mut snapshot = self.snapshot.lock();
        if snapshot.is_some() {
            return Err(Error::Transaction(
                "transaction already in progress".to_string(),
            ));
        }
        *snapshot = Some(self.state.read().clone());
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        match self.snapshot.lock().take() {
            Some(_) => {
                self.stats.lock().commits += 1;
                Ok(())
            }
            None => Err(Error::Transaction("commit without begin".to_string())),
        }
    }

    fn rollback(&self) -> Result<()> {
        match self.snapshot.lock().take() {
            Some(saved) => {
                *self.state.write() = saved;
                self.stats.lock().rollbacks += 1;
                Ok(())
            }
            None => Err(Error::Transaction("rollback without begin".to_string())),
        }
    }
}
