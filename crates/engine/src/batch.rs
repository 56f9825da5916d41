//! Batch writer
//!
//! Writes one type's prepared rows in fixed-size upsert batches, each inside
//! the retry wrapper. In new-copy mode the identities the store reports for
//! a batch are paired positionally with the rows' archived identities to
//! build the type's [`IdentityMapping`].
//!
//! A failing batch stops the type. Batches already committed stay
//! committed, and the mapping built from them is kept.

use tracing::{debug, info};

use coldstore_core::{Error, RecordStore, RowWrite, UpsertOptions};

use crate::rehydrate::{IdentityMapping, ImportMode, PreparedRow};
use crate::retry::{with_retry, RetryConfig};

/// Outcome of writing one type
#[derive(Debug, Default)]
pub struct TypeImportResult {
    /// Rows committed
    pub written: usize,
    /// Old → new identities (new-copy mode only)
    pub mapping: IdentityMapping,
    /// Error that stopped the type, if any
    pub failure: Option<Error>,
}

impl TypeImportResult {
    /// Whether every batch committed
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Chunked upsert writer
pub struct BatchWriter<'a> {
    store: &'a dyn RecordStore,
    retry: &'a RetryConfig,
    batch_size: usize,
    touch_timestamps: bool,
}

impl<'a> BatchWriter<'a> {
    /// Create a writer
    pub fn new(
        store: &'a dyn RecordStore,
        retry: &'a RetryConfig,
        batch_size: usize,
        touch_timestamps: bool,
    ) -> Self {
        Self {
            store,
            retry,
            batch_size: batch_size.max(1),
            touch_timestamps,
        }
    }

    /// Write `rows` of `type_name` into `table`
    ///
    /// `update_columns` is the set overwritten on a conflict; callers pass
    /// the table's updatable columns (everything except the primary key and
    /// other unique-index columns).
    pub fn write(
        &self,
        type_name: &str,
        table: &str,
        update_columns: Vec<String>,
        rows: &[PreparedRow],
        mode: ImportMode,
    ) -> TypeImportResult {
        let options = UpsertOptions {
            update_columns,
            touch_timestamps: self.touch_timestamps,
        };
        let mut result = TypeImportResult::default();

        for (index, chunk) in rows.chunks(self.batch_size).enumerate() {
            let writes: Vec<RowWrite> = chunk.iter().map(|p| p.row.clone()).collect();
            let outcome = with_retry(self.store, self.retry, type_name, |store| {
                store.upsert_batch(table, &writes, &options)
            });

            let ids = match outcome {
                Ok(ids) => ids,
                Err(e) => {
                    debug!(target: "coldstore::import", type_name, batch = index, error = %e, "Batch failed");
                    result.failure = Some(e);
                    break;
                }
            };

            if ids.len() != chunk.len() {
                result.failure = Some(Error::IdentityRecovery {
                    type_name: type_name.to_string(),
                    submitted: chunk.len(),
                    returned: ids.len(),
                });
                break;
            }

            result.written += chunk.len();
            if mode == ImportMode::NewCopy {
                for (prepared, new_id) in chunk.iter().zip(ids) {
                    result.mapping.insert(prepared.original.clone(), new_id);
                }
            }
            debug!(target: "coldstore::import", type_name, batch = index, rows = chunk.len(), "Batch committed");
        }

        info!(
            target: "coldstore::import",
            type_name,
            written = result.written,
            total = rows.len(),
            complete = result.is_complete(),
            "Type imported"
        );
        result
    }
}
