//! ArchiveBundle and DeletionPlan
//!
//! ## ArchiveBundle
//!
//! The deduplicated, type-grouped snapshot of an entity graph. Serialized it
//! is exactly the wire format: a JSON object mapping type name to an array of
//! flat attribute objects.
//!
//! ```text
//! {
//!   "Account":  [{"id": 1}],
//!   "LineItem": [{"id": 100, "order_id": 10}],
//!   "Order":    [{"account_id": 1, "id": 10}, {"account_id": 1, "id": 11}]
//! }
//! ```
//!
//! Within a type, records have set semantics on identity: inserting a record
//! whose primary key is already present is a no-op, and a record without a
//! usable primary key is never stored.
//!
//! ## DeletionPlan
//!
//! Table name → identities to delete, collected during a walk and consumed
//! once by the deletion executor.

use crate::types::Attributes;
use crate::value::Identity;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

// =============================================================================
// ArchiveBundle
// =============================================================================

/// Type-grouped, identity-deduplicated snapshot of an entity graph
#[derive(Debug, Clone, Default)]
pub struct ArchiveBundle {
    records: BTreeMap<String, Vec<Attributes>>,
    /// Identity index per type. Built on insert; rebuilt lazily for bundles
    /// that came off the wire.
    index: HashMap<String, HashSet<Identity>>,
}

impl ArchiveBundle {
    /// Create an empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under `type_name`
    ///
    /// `primary_key` names the identity column. Returns `true` if the record
    /// was stored, `false` if it had no identity or an equal identity was
    /// already present.
    pub fn insert(&mut self, type_name: &str, primary_key: &str, attributes: Attributes) -> bool {
        let identity = match attributes.get(primary_key).and_then(|v| v.as_identity()) {
            Some(id) => id,
            None => return false,
        };

        let records = &self.records;
        let seen = self
            .index
            .entry(type_name.to_string())
            .or_insert_with(|| Self::build_index(records.get(type_name), primary_key));

        if !seen.insert(identity) {
            return false;
        }

        self.records
            .entry(type_name.to_string())
            .or_default()
            .push(attributes);
        true
    }

    fn build_index(records: Option<&Vec<Attributes>>, primary_key: &str) -> HashSet<Identity> {
        records
            .map(|rs| {
                rs.iter()
                    .filter_map(|r| r.get(primary_key).and_then(|v| v.as_identity()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check whether a record with `identity` is present under `type_name`
    pub fn contains(&self, type_name: &str, primary_key: &str, identity: &Identity) -> bool {
        self.records(type_name).iter().any(|r| {
            r.get(primary_key)
                .and_then(|v| v.as_identity())
                .as_ref()
                == Some(identity)
        })
    }

    /// Records stored under `type_name` (empty if none)
    pub fn records(&self, type_name: &str) -> &[Attributes] {
        self.records
            .get(type_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Type names present in the bundle, in stable (sorted) order
    pub fn type_names(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    /// Iterate `(type_name, records)` pairs in stable order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Attributes])> {
        self.records.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of distinct types
    pub fn type_count(&self) -> usize {
        self.records.len()
    }

    /// Total number of records across all types
    pub fn record_count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    /// Check if the bundle holds no records
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Drop repeated identities under `type_name`, keeping the first record
    ///
    /// Restores set semantics for bundles built through [`from_records`]
    /// (custom transports, hand-edited archives). Records without an identity
    /// are kept so the importer can report them. Returns the identities that
    /// had duplicates removed, once per dropped record.
    ///
    /// [`from_records`]: ArchiveBundle::from_records
    pub fn dedup(&mut self, type_name: &str, primary_key: &str) -> Vec<Identity> {
        let Some(records) = self.records.get_mut(type_name) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut dropped = Vec::new();
        records.retain(|r| match r.get(primary_key).and_then(|v| v.as_identity()) {
            Some(id) if !seen.insert(id.clone()) => {
                dropped.push(id);
                false
            }
            _ => true,
        });
        self.index.insert(type_name.to_string(), seen);
        dropped
    }

    /// Build a bundle from its wire form without deduplication
    ///
    /// Used by transports; a bundle written by the walker is already
    /// deduplicated.
    pub fn from_records(records: BTreeMap<String, Vec<Attributes>>) -> Self {
        Self {
            records,
            index: HashMap::new(),
        }
    }

    /// Consume the bundle, returning its wire form
    pub fn into_records(self) -> BTreeMap<String, Vec<Attributes>> {
        self.records
    }
}

impl PartialEq for ArchiveBundle {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl Serialize for ArchiveBundle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.records.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ArchiveBundle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records = BTreeMap::<String, Vec<Attributes>>::deserialize(deserializer)?;
        Ok(Self::from_records(records))
    }
}

// =============================================================================
// DeletionPlan
// =============================================================================

/// Table name → identities to delete
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeletionPlan {
    tables: BTreeMap<String, BTreeSet<Identity>>,
}

impl DeletionPlan {
    /// Create an empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `id` for deletion from `table`
    pub fn add(&mut self, table: &str, id: Identity) {
        self.tables.entry(table.to_string()).or_default().insert(id);
    }

    /// Identities scheduled for `table`
    pub fn ids(&self, table: &str) -> Option<&BTreeSet<Identity>> {
        self.tables.get(table)
    }

    /// Tables with scheduled deletions
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Total number of scheduled identities
    pub fn len(&self) -> usize {
        self.tables.values().map(BTreeSet::len).sum()
    }

    /// Check if nothing is scheduled
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IntoIterator for DeletionPlan {
    type Item = (String, BTreeSet<Identity>);
    type IntoIter = std::collections::btree_map::IntoIter<String, BTreeSet<Identity>>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_iter()
    }
}
