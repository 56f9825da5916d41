//! Storage layer for coldstore
//!
//! This crate implements the reference relational backend:
//! - MemoryStore: BTreeMap-per-table storage behind a RwLock
//! - Upsert with primary-key and unique-index conflict handling
//! - Snapshot transactions (begin / commit / rollback)
//! - FaultPlan: injected contention and constraint failures
//! - StoreStats: per-table call shapes for assertions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fault;
pub mod memory;

pub use fault::{FaultPlan, StoreStats, DEADLOCK_MESSAGE};
pub use memory::{MemoryStore, CREATED_AT, UPDATED_AT};
