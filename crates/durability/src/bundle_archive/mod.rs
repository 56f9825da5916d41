//! Bundle archive: portable on-disk form of an ArchiveBundle
//!
//! Transports that persist bundles outside the process write them as
//! `.bundle.tar.zst` archives.
//!
//! ## Archive Structure
//!
//! ```text
//! 42_9f2c4e1ab07d3c55.bundle.tar.zst
//! └── coldbundle/
//!     ├── MANIFEST.json   (format version, checksums, counts, owner)
//!     └── BUNDLE.json     (type name → array of attribute objects)
//! ```
//!
//! `BUNDLE.json` is exactly the bundle wire format, so the payload of any
//! archive can be inspected with `tar` and `jq`:
//!
//! ```text
//! zstd -dc 42_9f2c4e1ab07d3c55.bundle.tar.zst | tar -xO coldbundle/BUNDLE.json | jq .
//! ```
//!
//! ## Integrity
//!
//! The manifest records an xxh3 checksum of `BUNDLE.json`. A mismatch on
//! read is an error; a bundle is never rehydrated from a damaged archive.

pub mod error;
pub mod reader;
pub mod types;
pub mod writer;

pub use error::{ArchiveFileError, ArchiveFileResult};
pub use reader::{ArchiveFileContents, BundleArchiveReader};
pub use types::{
    paths, xxh3_hex, ArchiveFileInfo, BundleContents, BundleManifest, BundleVerifyInfo,
    WriteOptions, BUNDLE_ARCHIVE_EXTENSION, BUNDLE_FORMAT_VERSION,
};
pub use writer::BundleArchiveWriter;
