//! Rehydrator: archived attribute maps → rows ready for a batch write
//!
//! For each record of one type, in order:
//!
//! 1. pre-instantiation transform hook
//! 2. restrict to columns the schema knows, without the primary key
//! 3. timestamps normalized to UTC
//! 4. invalid enum values replaced by the column default (warning)
//! 5. belongs-to foreign keys rewritten through earlier types' mappings
//! 6. mode policy: restore-in-place forces the archived identity and merges
//!    over the live row; new-copy leaves identity assignment to the store
//! 7. veto hook; a `false` drops the row silently
//!
//! Attribute anomalies never fail the type. They are repaired and reported
//! as warnings.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use coldstore_core::{
    Attributes, ColumnKind, Error, Identity, RecordStore, Result, RowWrite, SchemaProvider,
    TableSchema, Value,
};

/// Old identity → new identity for one type
pub type IdentityMapping = HashMap<Identity, Identity>;

/// Type name → its identity mapping
pub type Mappings = HashMap<String, IdentityMapping>;

/// How archived rows land in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Same identities; existing rows are overwritten
    #[default]
    Restore,
    /// Fresh identities; foreign keys follow the new parents
    NewCopy,
}

/// Pre-instantiation transform: `(type_name, attributes)`
pub type TransformHook = Box<dyn Fn(&str, &mut Attributes) + Send + Sync>;

/// Post-instantiation veto: `(type_name, attributes) -> keep?`
pub type VetoHook = Box<dyn Fn(&str, &Attributes) -> bool + Send + Sync>;

/// The rehydrator's extension points
#[derive(Default)]
pub struct Hooks {
    /// Runs on the raw archived attributes before anything else
    pub transform: Option<TransformHook>,
    /// Runs on the final row; returning `false` drops it
    pub veto: Option<VetoHook>,
}

impl Hooks {
    /// Set the transform hook
    pub fn with_transform(
        mut self,
        hook: impl Fn(&str, &mut Attributes) + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Box::new(hook));
        self
    }

    /// Set the veto hook
    pub fn with_veto(mut self, hook: impl Fn(&str, &Attributes) -> bool + Send + Sync + 'static) -> Self {
        self.veto = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("transform", &self.transform.is_some())
            .field("veto", &self.veto.is_some())
            .finish()
    }
}

/// One row ready to write, remembering the identity it was archived with
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRow {
    /// Identity in the bundle
    pub original: Identity,
    /// What goes to the store
    pub row: RowWrite,
}

/// Output of [`Rehydrator::prepare`] for one type
#[derive(Debug, Default)]
pub struct Prepared {
    /// Rows to write, in bundle order
    pub rows: Vec<PreparedRow>,
    /// Recoverable anomalies that were repaired
    pub warnings: Vec<String>,
    /// Records that could not be instantiated
    pub errors: Vec<String>,
    /// Rows dropped by the veto hook
    pub vetoed: usize,
}

/// Turns archived records into [`PreparedRow`]s
pub struct Rehydrator<'a> {
    schema: &'a dyn SchemaProvider,
    store: &'a dyn RecordStore,
    hooks: &'a Hooks,
}

impl<'a> Rehydrator<'a> {
    /// Create a rehydrator
    pub fn new(schema: &'a dyn SchemaProvider, store: &'a dyn RecordStore, hooks: &'a Hooks) -> Self {
        Self {
            schema,
            store,
            hooks,
        }
    }

    /// Prepare every record of `type_name`
    ///
    /// # Errors
    ///
    /// [`Error::SchemaLookup`] if the type is unknown or has no primary key;
    /// store errors from restore-mode lookups.
    pub fn prepare(
        &self,
        type_name: &str,
        records: &[Attributes],
        mode: ImportMode,
        mappings: &Mappings,
    ) -> Result<Prepared> {
        let table = self
            .schema
            .table(type_name)
            .ok_or_else(|| Error::SchemaLookup(type_name.to_string()))?;
        let primary_key = table
            .primary_key()
            .ok_or_else(|| Error::SchemaLookup(type_name.to_string()))?
            .to_string();

        let mut out = Prepared::default();
        for archived in records {
            let mut attributes = archived.clone();
            if let Some(transform) = &self.hooks.transform {
                transform(type_name, &mut attributes);
            }

            let Some(original) = attributes.get(&primary_key).and_then(Value::as_identity) else {
                out.errors.push(format!(
                    "Error importing {}: record without {} cannot be instantiated",
                    type_name, primary_key
                ));
                continue;
            };

            let mut attributes = restrict(&table, &primary_key, attributes);
            self.normalize_timestamps(&table, &original, &mut attributes, &mut out.warnings);
            self.apply_enum_fallbacks(&table, &original, &mut attributes, &mut out.warnings);
            self.remap_foreign_keys(type_name, &mut attributes, mappings);

            let row = match mode {
                ImportMode::Restore => {
                    let merged = match self.store.get(&table.table_name, &original)? {
                        Some(existing) => {
                            let mut merged = existing.attributes;
                            merged.remove(&primary_key);
                            merged.extend(attributes);
                            merged
                        }
                        None => attributes,
                    };
                    RowWrite::with_id(original.clone(), merged)
                }
                ImportMode::NewCopy => RowWrite::insert(attributes),
            };

            if let Some(veto) = &self.hooks.veto {
                if !veto(type_name, &row.attributes) {
                    debug!(target: "coldstore::import", type_name, id = %original, "Row vetoed");
                    out.vetoed += 1;
                    continue;
                }
            }

            out.rows.push(PreparedRow { original, row });
        }
        Ok(out)
    }

    fn normalize_timestamps(
        &self,
        table: &TableSchema,
        id: &Identity,
        attributes: &mut Attributes,
        warnings: &mut Vec<String>,
    ) {
        for column in table.columns.iter().filter(|c| c.kind == ColumnKind::Timestamp) {
            let Some(value) = attributes.get(&column.name) else { continue };
            if value.is_null() {
                continue;
            }
            match value.to_utc_timestamp() {
                Some(ts) => {
                    attributes.insert(column.name.clone(), Value::Timestamp(ts));
                }
                None => {
                    let message = format!(
                        "{}#{}: unparseable timestamp {} in {}, dropped",
                        table.type_name, id, value, column.name
                    );
                    warn!(target: "coldstore::import", "{}", message);
                    warnings.push(message);
                    attributes.remove(&column.name);
                }
            }
        }
    }

    fn apply_enum_fallbacks(
        &self,
        table: &TableSchema,
        id: &Identity,
        attributes: &mut Attributes,
        warnings: &mut Vec<String>,
    ) {
        for (column, spec) in &table.enums {
            let Some(value) = attributes.get(column) else { continue };
            if value.is_null() {
                continue;
            }
            if let Some(code) = spec.canonical(value) {
                attributes.insert(column.clone(), code);
                continue;
            }

            let default = table.column_def(column).and_then(|c| c.default.clone());
            let message = format!(
                "{}#{}: invalid value {} for enum {}, using default {}",
                table.type_name,
                id,
                value,
                column,
                default.as_ref().map_or_else(|| "null".to_string(), Value::to_string)
            );
            warn!(target: "coldstore::import", "{}", message);
            warnings.push(message);

            attributes.insert(column.clone(), default.unwrap_or(Value::Null));
        }
    }

    fn remap_foreign_keys(&self, type_name: &str, attributes: &mut Attributes, mappings: &Mappings) {
        for relation in self.schema.belongs_to(type_name) {
            let Some(mapping) = mappings.get(&relation.target) else { continue };
            let Some(old) = attributes
                .get(&relation.foreign_key)
                .and_then(Value::as_identity)
            else {
                continue;
            };
            if let Some(new) = mapping.get(&old) {
                attributes.insert(relation.foreign_key.clone(), new.to_value());
            }
        }
    }
}

/// Keep only known columns, minus the primary key
fn restrict(table: &TableSchema, primary_key: &str, attributes: Attributes) -> Attributes {
    attributes
        .into_iter()
        .filter(|(name, _)| name != primary_key && table.has_column(name))
        .collect()
}
