//! Durability layer for coldstore
//!
//! This crate handles everything that moves a bundle out of the process:
//!
//! - Bundle archive format: `.bundle.tar.zst` with an xxh3-checksummed manifest
//! - Transports: the closed `Transport` set (in-memory, object storage, custom)
//! - Object stores: the `ObjectStore` trait and a directory-backed implementation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bundle_archive;
pub mod transport;

pub use bundle_archive::{
    ArchiveFileContents, ArchiveFileError, ArchiveFileInfo, ArchiveFileResult,
    BundleArchiveReader, BundleArchiveWriter, BundleManifest, WriteOptions,
    BUNDLE_ARCHIVE_EXTENSION, BUNDLE_FORMAT_VERSION,
};
pub use transport::{
    BundleTransport, LocalObjectStore, MemoryTransport, ObjectStorageTransport, ObjectStore,
    Transport, TransportContext,
};
