//! Archive operation
//!
//! `archive(root)`:
//!
//! 1. walk the cascade-owned subgraph under `root` into a bundle (plus a
//!    deletion plan when deleting)
//! 2. hand the bundle to the transport; a transport failure aborts before
//!    anything is modified
//! 3. flag the root archived, if its table has the flag column
//! 4. delete the walked rows, children before parents
//!
//! The root row itself is never deleted.

use std::time::Duration;

use tracing::{info, warn};

use coldstore_core::{
    ArchiveBundle, EntityRef, Error, RecordStore, Result, SchemaProvider, Value,
};
use coldstore_durability::{BundleTransport, Transport, TransportContext};

use crate::config::ArchiverConfig;
use crate::deletion::{DeletionExecutor, DeletionSummary};
use crate::orderer::DependencyOrderer;
use crate::walker::GraphWalker;

/// Options for one archive call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Delete every walked row except the root once the bundle is stored
    pub delete_records: bool,
}

impl ArchiveOptions {
    /// Archive and delete
    pub fn deleting() -> Self {
        Self {
            delete_records: true,
        }
    }
}

/// Result of a successful archive
#[derive(Debug)]
pub struct ArchiveOutcome {
    /// What was archived
    pub bundle: ArchiveBundle,
    /// Location token returned by the transport
    pub location: String,
    /// Present when deletion was requested
    pub deletions: Option<DeletionSummary>,
}

/// Archives rooted subgraphs
pub struct Archiver<'a> {
    schema: &'a dyn SchemaProvider,
    store: &'a dyn RecordStore,
    config: &'a ArchiverConfig,
}

impl<'a> Archiver<'a> {
    /// Create an archiver
    pub fn new(
        schema: &'a dyn SchemaProvider,
        store: &'a dyn RecordStore,
        config: &'a ArchiverConfig,
    ) -> Self {
        Self {
            schema,
            store,
            config,
        }
    }

    /// Archive the subgraph owned by `root` through `transport`
    ///
    /// # Errors
    ///
    /// Unknown root type, missing root row, store read failures during the
    /// walk, any transport failure, and deletion failures (rows deleted
    /// before the failure stay deleted; the bundle is already stored).
    pub fn archive(
        &self,
        root: &EntityRef,
        options: &ArchiveOptions,
        transport: &mut Transport,
    ) -> Result<ArchiveOutcome> {
        let table = self
            .schema
            .table(&root.type_name)
            .ok_or_else(|| Error::SchemaLookup(root.type_name.clone()))?;
        info!(
            target: "coldstore::walk",
            root = %root,
            delete_records = options.delete_records,
            transport = transport.kind(),
            "Archive started"
        );

        let walker = GraphWalker::new(self.schema, self.store, self.config.fetch_batch_size);
        let walk = walker.walk(root, options.delete_records)?;

        let context = TransportContext {
            owner: root,
            table: &table,
            store: self.store,
        };
        let location = transport.store(&walk.bundle, Some(context))?;
        info!(
            target: "coldstore::transport",
            root = %root,
            location = %location,
            records = walk.bundle.record_count(),
            "Bundle stored"
        );

        let flag = &self.config.archived_flag_column;
        if table.has_column(flag) {
            self.store
                .update_column(&table.table_name, &root.id, flag, Value::Bool(true))?;
        }

        let deletions = if options.delete_records {
            let order = self.deletion_order(&walk.bundle);
            let executor = DeletionExecutor::new(
                self.store,
                self.config.delete_batch_size,
                Duration::from_millis(self.config.delete_pause_ms),
            );
            let summary = executor.execute(walk.plan, &order)?;
            info!(
                target: "coldstore::delete",
                root = %root,
                tables = summary.tables.len(),
                rows = summary.rows,
                batches = summary.batches,
                "Archived rows deleted"
            );
            Some(summary)
        } else {
            None
        };

        Ok(ArchiveOutcome {
            bundle: walk.bundle,
            location,
            deletions,
        })
    }

    /// Tables of the bundle, referencing types before the types they
    /// reference
    fn deletion_order(&self, bundle: &ArchiveBundle) -> Vec<String> {
        let types = bundle.type_names();
        let ordered = match DependencyOrderer::new(self.schema).order(&types) {
            Ok(ordered) => ordered,
            Err(e) => {
                // A cycle only affects which table goes first; the store
                // decides whether that is acceptable
                warn!(target: "coldstore::delete", error = %e, "No dependency order, deleting in bundle order");
                types
            }
        };
        ordered
            .iter()
            .rev()
            .filter_map(|t| self.schema.table_name(t))
            .collect()
    }
}
