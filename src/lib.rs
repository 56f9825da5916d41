//! coldstore - cold-archive rooted record trees and bring them back
//!
//! coldstore walks the cascade-owned subgraph under a root entity into a
//! portable bundle, hands it to a transport, and optionally deletes the
//! archived rows. Later it retrieves the bundle and rehydrates it in
//! foreign-key dependency order, either restoring the original identities
//! or producing a copy with fresh identities and remapped foreign keys.
//!
//! # Quick Start
//!
//! ```ignore
//! use coldstore::{
//!     ArchiveOptions, Archiver, ArchiverConfig, EntityRef, MemoryStore, Transport,
//!     UnarchiveOptions, UnarchiveTarget, Unarchiver,
//! };
//!
//! let config = ArchiverConfig::default();
//! let mut transport = Transport::in_memory();
//! let root = EntityRef::new("Account", 42i64);
//!
//! Archiver::new(&schema, &store, &config)
//!     .archive(&root, &ArchiveOptions::deleting(), &mut transport)?;
//!
//! let report = Unarchiver::new(&schema, &store, &config).unarchive(
//!     &UnarchiveTarget::Entity(root),
//!     &UnarchiveOptions::default(),
//!     &mut transport,
//! )?;
//! ```
//!
//! # Architecture
//!
//! - `coldstore-core`: values, records, bundles, schema, the `RecordStore` trait
//! - `coldstore-storage`: `MemoryStore`, a transactional in-memory store
//! - `coldstore-durability`: bundle archive format and transports
//! - `coldstore-engine`: walker, orderer, rehydrator, writers, operations

pub use coldstore_core::*;
pub use coldstore_durability::{
    BundleArchiveReader, BundleArchiveWriter, BundleManifest, BundleTransport, LocalObjectStore,
    MemoryTransport, ObjectStorageTransport, ObjectStore, Transport, TransportContext,
    WriteOptions,
};
pub use coldstore_engine::{
    with_retry, ArchiveOptions, ArchiveOutcome, Archiver, ArchiverConfig, BatchWriter,
    DeletionExecutor, DeletionSummary, DependencyOrderer, GraphWalker, Hooks, IdentityMapping,
    ImportMode, Mappings, Rehydrator, RetryConfig, UnarchiveOptions, UnarchiveReport,
    UnarchiveTarget, Unarchiver, Walk,
};
pub use coldstore_storage::MemoryStore;
