//! Schema description consumed by the walker and the rehydrator
//!
//! The archiver never reflects on a live database. Everything it needs to
//! know about an entity type comes through [`SchemaProvider`]:
//!
//! - columns (with primary-key flag, kind and default)
//! - belongs-to relations (foreign-key column → target type)
//! - has-many / has-one relations, flagged cascade-owned or not
//! - unique indexes
//! - enum members
//!
//! [`SchemaRegistry`] is the in-crate implementation, assembled from
//! [`TableSchema`] builders.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Columns
// =============================================================================

/// Storage kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// 64-bit integer
    Integer,
    /// 64-bit float
    Float,
    /// Text
    Text,
    /// Boolean
    Boolean,
    /// Date-time; normalized to UTC on import
    Timestamp,
    /// Enumerated; validated against [`EnumSpec`] on import
    Enum,
}

/// One column of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Column kind
    pub kind: ColumnKind,
    /// Whether this column is the primary key
    #[serde(default)]
    pub primary_key: bool,
    /// Schema-declared default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ColumnDef {
    /// Create a non-key column without a default
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            primary_key: false,
            default: None,
        }
    }

    /// Mark as primary key
    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Set the schema default
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Members of an enumerated column: label → stored code
///
/// A value is valid when it equals a label or a code. Integer codes also
/// accept their string rendering (`"2"` for `2`). Valid values are stored as
/// their code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumSpec {
    /// Label → code
    pub members: BTreeMap<String, Value>,
}

impl EnumSpec {
    /// Enum with integer codes
    pub fn integer<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Self {
            members: members
                .into_iter()
                .map(|(k, v)| (k.into(), Value::Int(v)))
                .collect(),
        }
    }

    /// Enum whose codes are the labels themselves
    pub fn text<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            members: labels
                .into_iter()
                .map(|l| {
                    let l = l.into();
                    (l.clone(), Value::String(l))
                })
                .collect(),
        }
    }

    /// Whether codes are integers
    pub fn is_integer(&self) -> bool {
        self.members
            .values()
            .next()
            .map(|v| matches!(v, Value::Int(_)))
            .unwrap_or(false)
    }

    /// Stored code for `value`, matching labels first and then codes
    ///
    /// `None` when `value` names no member.
    pub fn canonical(&self, value: &Value) -> Option<Value> {
        if let Value::String(s) = value {
            if let Some(code) = self.members.get(s) {
                return Some(code.clone());
            }
            if self.is_integer() {
                if let Ok(code) = s.trim().parse::<i64>() {
                    let code = Value::Int(code);
                    return self.members.values().any(|v| v == &code).then_some(code);
                }
            }
        }
        self.members.values().any(|v| v == value).then(|| value.clone())
    }

    /// Check `value` against labels and codes
    pub fn is_valid(&self, value: &Value) -> bool {
        self.canonical(value).is_some()
    }
}

// =============================================================================
// Relations
// =============================================================================

/// Belongs-to relation: `foreign_key` on this type points at `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BelongsTo {
    /// Foreign-key column on this type
    pub foreign_key: String,
    /// Referenced entity type
    pub target: String,
}

/// Cardinality of a has-relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    /// has_one
    One,
    /// has_many
    Many,
}

/// Has-many / has-one relation from this type to `target`
///
/// Children are found through `foreign_key` on the target type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasRelation {
    /// Relation name (e.g. `"orders"`)
    pub name: String,
    /// Child entity type
    pub target: String,
    /// Foreign-key column on the child pointing back at this type
    pub foreign_key: String,
    /// has_one or has_many
    pub multiplicity: Multiplicity,
    /// Children are owned by the parent: archived with it, deleted with it
    pub cascade: bool,
}

// =============================================================================
// TableSchema
// =============================================================================

/// Full description of one entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Entity type name (`"LineItem"`)
    pub type_name: String,
    /// Backing table name (`"line_items"`)
    pub table_name: String,
    /// Columns in declaration order; empty when the type is opaque
    pub columns: Vec<ColumnDef>,
    /// Belongs-to relations
    #[serde(default)]
    pub belongs_to: Vec<BelongsTo>,
    /// Has-many / has-one relations
    #[serde(default)]
    pub has: Vec<HasRelation>,
    /// Unique indexes other than the primary key
    #[serde(default)]
    pub unique_indexes: Vec<Vec<String>>,
    /// Enum definitions keyed by column
    #[serde(default)]
    pub enums: BTreeMap<String, EnumSpec>,
}

impl TableSchema {
    /// Start a schema for `type_name` stored in `table_name`
    pub fn new(type_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            table_name: table_name.into(),
            columns: Vec::new(),
            belongs_to: Vec::new(),
            has: Vec::new(),
            unique_indexes: Vec::new(),
            enums: BTreeMap::new(),
        }
    }

    /// Add an integer `id` primary key
    pub fn id(self) -> Self {
        self.column(ColumnDef::new("id", ColumnKind::Integer).primary())
    }

    /// Add a column
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a plain column of `kind`
    pub fn col(self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.column(ColumnDef::new(name, kind))
    }

    /// Add an enum column with its members and default
    pub fn enum_col(mut self, name: &str, spec: EnumSpec, default: Option<Value>) -> Self {
        let mut column = ColumnDef::new(name, ColumnKind::Enum);
        column.default = default;
        self.enums.insert(name.to_string(), spec);
        self.column(column)
    }

    /// Add a belongs-to relation and its integer foreign-key column
    pub fn belongs_to(mut self, foreign_key: &str, target: &str) -> Self {
        if !self.columns.iter().any(|c| c.name == foreign_key) {
            self.columns
                .push(ColumnDef::new(foreign_key, ColumnKind::Integer));
        }
        self.belongs_to.push(BelongsTo {
            foreign_key: foreign_key.to_string(),
            target: target.to_string(),
        });
        self
    }

    /// Add a has-many relation
    pub fn has_many(self, name: &str, target: &str, foreign_key: &str, cascade: bool) -> Self {
        self.has_relation(name, target, foreign_key, Multiplicity::Many, cascade)
    }

    /// Add a has-one relation
    pub fn has_one(self, name: &str, target: &str, foreign_key: &str, cascade: bool) -> Self {
        self.has_relation(name, target, foreign_key, Multiplicity::One, cascade)
    }

    fn has_relation(
        mut self,
        name: &str,
        target: &str,
        foreign_key: &str,
        multiplicity: Multiplicity,
        cascade: bool,
    ) -> Self {
        self.has.push(HasRelation {
            name: name.to_string(),
            target: target.to_string(),
            foreign_key: foreign_key.to_string(),
            multiplicity,
            cascade,
        });
        self
    }

    /// Add a unique index over `columns`
    pub fn unique(mut self, columns: &[&str]) -> Self {
        self.unique_indexes
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Primary-key column name
    pub fn primary_key(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.primary_key)
            .map(|c| c.name.as_str())
    }

    /// Look up a column by name
    pub fn column_def(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check whether the table has `name` as a column
    pub fn has_column(&self, name: &str) -> bool {
        self.column_def(name).is_some()
    }

    /// Columns that may be overwritten on an upsert conflict
    ///
    /// Everything except the primary key and columns covered by other
    /// unique indexes.
    pub fn updatable_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !c.primary_key)
            .filter(|c| !self.unique_indexes.iter().any(|idx| idx.contains(&c.name)))
            .map(|c| c.name.clone())
            .collect()
    }
}

// =============================================================================
// SchemaProvider
// =============================================================================

/// Source of schema metadata
///
/// All traversal and ordering logic depends on this trait only. Thread
/// safety: implementations must be `Send + Sync`.
pub trait SchemaProvider: Send + Sync {
    /// Full description of `type_name`, or `None` if the type is unknown
    fn table(&self, type_name: &str) -> Option<Arc<TableSchema>>;

    /// Entity type stored in `table_name`
    fn type_for_table(&self, table_name: &str) -> Option<String>;

    /// Columns of `type_name` with primary-key flag
    ///
    /// `None` when the type is unknown or exposes no columns.
    fn columns(&self, type_name: &str) -> Option<Vec<ColumnDef>> {
        self.table(type_name)
            .map(|t| t.columns.clone())
            .filter(|c| !c.is_empty())
    }

    /// Primary-key column of `type_name`
    fn primary_key(&self, type_name: &str) -> Option<String> {
        self.table(type_name)
            .and_then(|t| t.primary_key().map(str::to_string))
    }

    /// Backing table of `type_name`
    fn table_name(&self, type_name: &str) -> Option<String> {
        self.table(type_name).map(|t| t.table_name.clone())
    }

    /// Belongs-to relations of `type_name`
    fn belongs_to(&self, type_name: &str) -> Vec<BelongsTo> {
        self.table(type_name)
            .map(|t| t.belongs_to.clone())
            .unwrap_or_default()
    }

    /// Cascade-owned has-many/has-one relations of `type_name`
    fn cascade_children(&self, type_name: &str) -> Vec<HasRelation> {
        self.table(type_name)
            .map(|t| t.has.iter().filter(|h| h.cascade).cloned().collect())
            .unwrap_or_default()
    }

    /// Unique indexes of `type_name` other than the primary key
    fn unique_indexes(&self, type_name: &str) -> Vec<Vec<String>> {
        self.table(type_name)
            .map(|t| t.unique_indexes.clone())
            .unwrap_or_default()
    }

    /// Enum members of `type_name.column`, if it is an enum
    fn enum_values(&self, type_name: &str, column: &str) -> Option<EnumSpec> {
        self.table(type_name)
            .and_then(|t| t.enums.get(column).cloned())
    }
}

/// In-memory [`SchemaProvider`]
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: BTreeMap<String, Arc<TableSchema>>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table (builder style)
    pub fn with(mut self, table: TableSchema) -> Self {
        self.register(table);
        self
    }

    /// Register a table, replacing any previous definition of its type
    pub fn register(&mut self, table: TableSchema) {
        self.tables
            .insert(table.type_name.clone(), Arc::new(table));
    }

    /// All registered tables in type-name order
    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.values().map(|t| t.as_ref())
    }
}

impl SchemaProvider for SchemaRegistry {
    fn table(&self, type_name: &str) -> Option<Arc<TableSchema>> {
        self.tables.get(type_name).cloned()
    }

    fn type_for_table(&self, table_name: &str) -> Option<String> {
        self.tables
            .values()
            .find(|t| t.table_name == table_name)
            .map(|t| t.type_name.clone())
    }
}
