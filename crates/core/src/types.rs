//! Core record types
//!
//! This module defines the foundational record types:
//! - Attributes: ordered attribute-name → value mapping of one row
//! - EntityRecord: a typed row as seen by the walker and rehydrator
//! - EntityRef: a pointer to a row (type + identity), used for roots and owners
//! - RowWrite: a row handed to a store batch write

use crate::value::{Identity, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered attribute map of one row
///
/// Attributes are kept sorted by name so serialized bundles are
/// deterministic.
pub type Attributes = BTreeMap<String, Value>;

/// A typed row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Entity type name (e.g. `"Account"`)
    pub type_name: String,
    /// Attribute values
    pub attributes: Attributes,
}

impl EntityRecord {
    /// Create a record from a type name and attribute map
    pub fn new(type_name: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            type_name: type_name.into(),
            attributes,
        }
    }

    /// Identity of this record under the given primary-key column
    pub fn identity(&self, primary_key: &str) -> Option<Identity> {
        self.attributes.get(primary_key).and_then(Value::as_identity)
    }

    /// Get an attribute value
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.attributes.get(column)
    }

    /// Copy of the attributes with nulls removed
    ///
    /// Keeps bundles sparse: schema defaults are not shipped.
    pub fn non_null_attributes(&self) -> Attributes {
        self.attributes
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Reference to one row: entity type plus identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity type name
    pub type_name: String,
    /// Primary-key identity
    pub id: Identity,
}

impl EntityRef {
    /// Create a new reference
    pub fn new(type_name: impl Into<String>, id: impl Into<Identity>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.type_name, self.id)
    }
}

/// A row submitted to [`RecordStore::upsert_batch`](crate::traits::RecordStore::upsert_batch)
///
/// `id: None` asks the store to assign a fresh identity; `Some` forces the
/// primary key (bypassing auto-assignment).
#[derive(Debug, Clone, PartialEq)]
pub struct RowWrite {
    /// Forced primary key, or `None` for store-assigned
    pub id: Option<Identity>,
    /// Non-key attribute values
    pub attributes: Attributes,
}

impl RowWrite {
    /// Row with a store-assigned identity
    pub fn insert(attributes: Attributes) -> Self {
        Self {
            id: None,
            attributes,
        }
    }

    /// Row with a forced identity
    pub fn with_id(id: Identity, attributes: Attributes) -> Self {
        Self {
            id: Some(id),
            attributes,
        }
    }
}

/// Build an [`Attributes`] map from `(name, value)` pairs
///
/// ```
/// use coldstore_core::{attrs, Value};
/// let a = attrs([("id", Value::Int(1)), ("name", Value::from("acme"))]);
/// assert_eq!(a.len(), 2);
/// ```
pub fn attrs<I, K>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}
