//! Deletion executor
//!
//! Deletes the identities of a [`DeletionPlan`] table by table, in chunks,
//! pausing between chunks so a large purge does not monopolize the store.
//! Deletion is not transactional across tables: a failing table stops the
//! run, earlier tables stay deleted.

use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use coldstore_core::{DeletionPlan, Identity, RecordStore, Result};

/// What a deletion run removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionSummary {
    /// Tables touched, in deletion order
    pub tables: Vec<String>,
    /// Rows the store reported deleted
    pub rows: usize,
    /// Delete statements issued
    pub batches: usize,
}

/// Chunked, throttled deleter
pub struct DeletionExecutor<'a> {
    store: &'a dyn RecordStore,
    batch_size: usize,
    pause: Duration,
}

impl<'a> DeletionExecutor<'a> {
    /// Create an executor deleting `batch_size` ids per statement
    pub fn new(store: &'a dyn RecordStore, batch_size: usize, pause: Duration) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            pause,
        }
    }

    /// Delete `ids` from `table`
    ///
    /// Returns `(rows deleted, batches issued)`. An empty id list touches
    /// nothing.
    ///
    /// # Errors
    ///
    /// The first failing chunk's error; earlier chunks stay deleted.
    pub fn delete(&self, table: &str, ids: &[Identity]) -> Result<(usize, usize)> {
        if ids.is_empty() {
            return Ok((0, 0));
        }

        let mut rows = 0;
        let mut batches = 0;
        for (index, chunk) in ids.chunks(self.batch_size).enumerate() {
            if index > 0 && !self.pause.is_zero() {
                thread::sleep(self.pause);
            }
            rows += self.store.delete_by_ids(table, chunk)?;
            batches += 1;
            debug!(target: "coldstore::delete", table, batch = index, ids = chunk.len(), "Chunk deleted");
        }
        info!(target: "coldstore::delete", table, rows, batches, "Table purged");
        Ok((rows, batches))
    }

    /// Delete every table of `plan`, following `table_order` first
    ///
    /// Tables in the plan but absent from `table_order` go last, in the
    /// plan's own order.
    pub fn execute(&self, plan: DeletionPlan, table_order: &[String]) -> Result<DeletionSummary> {
        let mut remaining: Vec<(String, Vec<Identity>)> = plan
            .into_iter()
            .map(|(table, ids)| (table, ids.into_iter().collect()))
            .collect();
        let mut ordered = Vec::with_capacity(remaining.len());
        for table in table_order {
            if let Some(pos) = remaining.iter().position(|(t, _)| t == table) {
                ordered.push(remaining.remove(pos));
            }
        }
        ordered.extend(remaining);

        let mut summary = DeletionSummary::default();
        for (table, ids) in ordered {
            let (rows, batches) = self.delete(&table, &ids)?;
            summary.rows += rows;
            summary.batches += batches;
            summary.tables.push(table);
        }
        Ok(summary)
    }
}
