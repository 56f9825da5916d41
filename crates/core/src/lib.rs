//! Core types and traits for coldstore
//!
//! This crate defines the foundational types used throughout the system:
//! - Value / Identity: scalar attribute values and hashable primary keys
//! - Attributes / EntityRecord / EntityRef / RowWrite: row-level types
//! - ArchiveBundle / DeletionPlan: the products of a graph walk
//! - Schema types and the SchemaProvider trait (+ SchemaRegistry)
//! - RecordStore: the relational store abstraction
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bundle;
pub mod error;
pub mod schema;
pub mod traits;
pub mod types;
pub mod value;

pub use bundle::{ArchiveBundle, DeletionPlan};
pub use error::{Error, Result};
pub use schema::{
    BelongsTo, ColumnDef, ColumnKind, EnumSpec, HasRelation, Multiplicity, SchemaProvider,
    SchemaRegistry, TableSchema,
};
pub use traits::{RecordStore, UpsertOptions};
pub use types::{attrs, Attributes, EntityRecord, EntityRef, RowWrite};
pub use value::{Identity, Value};
