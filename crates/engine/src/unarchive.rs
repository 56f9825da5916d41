//! Unarchive operation
//!
//! `unarchive(root | location)`:
//!
//! 1. retrieve the bundle; a transport failure is fatal
//! 2. skip types the schema does not know (listed in the report)
//! 3. order the remaining types so belongs-to targets come first; a cycle
//!    is fatal
//! 4. per type: prepare rows (rehydrator), write them in batches; a failing
//!    type is recorded and the next type proceeds
//! 5. with `crash_on_errors`, any recorded error fails the whole call once
//!    every type has been attempted
//! 6. clear the root's archived flag
//!
//! Rows committed before a failure stay committed.

use std::collections::BTreeMap;

use tracing::{info, warn};

use coldstore_core::{
    ArchiveBundle, EntityRef, Error, Identity, RecordStore, Result, SchemaProvider, Value,
};
use coldstore_durability::{BundleTransport, Transport, TransportContext};

use crate::batch::BatchWriter;
use crate::config::ArchiverConfig;
use crate::orderer::DependencyOrderer;
use crate::rehydrate::{Hooks, ImportMode, Mappings, Rehydrator};

/// Where the bundle comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnarchiveTarget {
    /// The archive root; the transport finds the bundle through it
    Entity(EntityRef),
    /// A location token returned by an earlier archive
    Location(String),
}

impl From<EntityRef> for UnarchiveTarget {
    fn from(root: EntityRef) -> Self {
        UnarchiveTarget::Entity(root)
    }
}

/// Options for one unarchive call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnarchiveOptions {
    /// Create fresh rows instead of restoring the archived identities
    pub new_copy: bool,
    /// Turn accumulated errors into a terminal [`Error::ImportFailed`]
    pub crash_on_errors: bool,
}

impl UnarchiveOptions {
    /// Import mode these options select
    pub fn mode(&self) -> ImportMode {
        if self.new_copy {
            ImportMode::NewCopy
        } else {
            ImportMode::Restore
        }
    }
}

/// What an unarchive did
#[derive(Debug, Default)]
pub struct UnarchiveReport {
    /// Import order used
    pub order: Vec<String>,
    /// Rows written per type
    pub imported: BTreeMap<String, usize>,
    /// Bundle types unknown to the schema
    pub skipped_types: Vec<String>,
    /// Non-fatal errors, one per failed type or record
    pub errors: Vec<String>,
    /// Repaired attribute anomalies
    pub warnings: Vec<String>,
    /// Rows dropped by the veto hook
    pub vetoed: usize,
    /// Old → new identities per type (new-copy only)
    pub mappings: Mappings,
}

impl UnarchiveReport {
    /// Total rows written
    pub fn total_imported(&self) -> usize {
        self.imported.values().sum()
    }

    /// No errors and no skipped types
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.skipped_types.is_empty()
    }

    /// New identity of `type_name#old` (new-copy only)
    pub fn new_identity(&self, type_name: &str, old: &Identity) -> Option<&Identity> {
        self.mappings.get(type_name).and_then(|m| m.get(old))
    }
}

/// Rebuilds archived subgraphs
pub struct Unarchiver<'a> {
    schema: &'a dyn SchemaProvider,
    store: &'a dyn RecordStore,
    config: &'a ArchiverConfig,
    hooks: Hooks,
}

impl<'a> Unarchiver<'a> {
    /// Create an unarchiver without hooks
    pub fn new(
        schema: &'a dyn SchemaProvider,
        store: &'a dyn RecordStore,
        config: &'a ArchiverConfig,
    ) -> Self {
        Self {
            schema,
            store,
            config,
            hooks: Hooks::default(),
        }
    }

    /// Install transform/veto hooks
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Retrieve the bundle for `target` and import it
    ///
    /// # Errors
    ///
    /// Transport failures, an unknown root type, a dependency cycle, and,
    /// with `crash_on_errors`, [`Error::ImportFailed`] aggregating every
    /// per-type error.
    pub fn unarchive(
        &self,
        target: &UnarchiveTarget,
        options: &UnarchiveOptions,
        transport: &mut Transport,
    ) -> Result<UnarchiveReport> {
        let bundle = self.retrieve(target, transport)?;
        info!(
            target: "coldstore::import",
            types = bundle.type_count(),
            records = bundle.record_count(),
            new_copy = options.new_copy,
            "Unarchive started"
        );

        let mode = options.mode();
        let mut report = self.import(bundle, mode)?;

        if options.crash_on_errors && !report.errors.is_empty() {
            return Err(Error::ImportFailed {
                errors: std::mem::take(&mut report.errors),
            });
        }

        if let UnarchiveTarget::Entity(root) = target {
            self.clear_archived_flag(root, mode, &report)?;
        }

        info!(
            target: "coldstore::import",
            imported = report.total_imported(),
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            skipped = report.skipped_types.len(),
            "Unarchive finished"
        );
        Ok(report)
    }

    fn retrieve(&self, target: &UnarchiveTarget, transport: &mut Transport) -> Result<ArchiveBundle> {
        match target {
            UnarchiveTarget::Location(location) => transport.retrieve(Some(location.as_str()), None),
            UnarchiveTarget::Entity(root) => {
                let table = self
                    .schema
                    .table(&root.type_name)
                    .ok_or_else(|| Error::SchemaLookup(root.type_name.clone()))?;
                let context = TransportContext {
                    owner: root,
                    table: &table,
                    store: self.store,
                };
                transport.retrieve(None, Some(context))
            }
        }
    }

    /// Import every known type of `bundle` in dependency order
    fn import(&self, mut bundle: ArchiveBundle, mode: ImportMode) -> Result<UnarchiveReport> {
        let mut report = UnarchiveReport::default();

        let mut known = Vec::new();
        for type_name in bundle.type_names() {
            if let Some(primary_key) = self.schema.primary_key(&type_name) {
                for id in bundle.dedup(&type_name, &primary_key) {
                    let message = format!("{}#{}: duplicate record in bundle, dropped", type_name, id);
                    warn!(target: "coldstore::import", "{}", message);
                    report.warnings.push(message);
                }
                known.push(type_name);
            } else {
                warn!(target: "coldstore::import", type_name = %type_name, "Unknown type in bundle, skipped");
                report.skipped_types.push(type_name);
            }
        }

        let order = DependencyOrderer::new(self.schema).order(&known)?;

        let rehydrator = Rehydrator::new(self.schema, self.store, &self.hooks);
        let writer = BatchWriter::new(
            self.store,
            &self.config.retry,
            self.config.write_batch_size,
            self.config.touch_timestamps,
        );

        for type_name in &order {
            let Some(table) = self.schema.table(type_name) else { continue };

            let prepared = match rehydrator.prepare(
                type_name,
                bundle.records(type_name),
                mode,
                &report.mappings,
            ) {
                Ok(prepared) => prepared,
                Err(e) => {
                    let error = import_error(type_name, &e);
                    warn!(target: "coldstore::import", "{}", error);
                    report.errors.push(error);
                    continue;
                }
            };
            report.warnings.extend(prepared.warnings);
            report.errors.extend(prepared.errors);
            report.vetoed += prepared.vetoed;

            let result = writer.write(
                type_name,
                &table.table_name,
                table.updatable_columns(),
                &prepared.rows,
                mode,
            );
            report.imported.insert(type_name.clone(), result.written);
            if mode == ImportMode::NewCopy {
                report.mappings.insert(type_name.clone(), result.mapping);
            }
            if let Some(e) = result.failure {
                let error = import_error(type_name, &e);
                warn!(target: "coldstore::import", "{}", error);
                report.errors.push(error);
            }
        }
        report.order = order;
        Ok(report)
    }

    /// Reset the flag on the restored root, or on its copy
    fn clear_archived_flag(
        &self,
        root: &EntityRef,
        mode: ImportMode,
        report: &UnarchiveReport,
    ) -> Result<()> {
        let Some(table) = self.schema.table(&root.type_name) else {
            return Ok(());
        };
        let flag = &self.config.archived_flag_column;
        if !table.has_column(flag) {
            return Ok(());
        }
        let id = match mode {
            ImportMode::Restore => Some(&root.id),
            ImportMode::NewCopy => report.new_identity(&root.type_name, &root.id),
        };
        if let Some(id) = id {
            self.store
                .update_column(&table.table_name, id, flag, Value::Bool(false))?;
        }
        Ok(())
    }
}

fn import_error(type_name: &str, error: &Error) -> String {
    match error {
        Error::ImportBatch { .. } => error.to_string(),
        other => Error::ImportBatch {
            type_name: type_name.to_string(),
            message: other.to_string(),
        }
        .to_string(),
    }
}
