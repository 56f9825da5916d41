//! Bundle archive core types

use coldstore_core::EntityRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Current bundle archive format version
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// File extension for bundle archives
pub const BUNDLE_ARCHIVE_EXTENSION: &str = ".bundle.tar.zst";

/// Archive paths within the bundle
pub mod paths {
    /// Root directory in the archive
    pub const ROOT: &str = "coldbundle";
    /// Manifest file
    pub const MANIFEST: &str = "coldbundle/MANIFEST.json";
    /// Bundle payload file
    pub const BUNDLE: &str = "coldbundle/BUNDLE.json";
}

// =============================================================================
// MANIFEST.json
// =============================================================================

/// Archive manifest: format metadata, checksums and a content summary
///
/// This is the first file read when opening an archive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleManifest {
    /// Format version (currently 1)
    pub format_version: u32,

    /// coldstore version that created this archive
    pub coldstore_version: String,

    /// RFC 3339 timestamp when the archive was created
    pub created_at: String,

    /// Checksum algorithm used (currently "xxh3")
    pub checksum_algorithm: String,

    /// Relative path → hex checksum
    pub checksums: BTreeMap<String, String>,

    /// Summary of bundle contents
    pub contents: BundleContents,

    /// Entity the bundle was archived for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<EntityRef>,
}

impl BundleManifest {
    /// Create a manifest stamped with the current time
    pub fn new(version: impl Into<String>, contents: BundleContents) -> Self {
        Self {
            format_version: BUNDLE_FORMAT_VERSION,
            coldstore_version: version.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            checksum_algorithm: "xxh3".to_string(),
            checksums: BTreeMap::new(),
            contents,
            owner: None,
        }
    }

    /// Record the owning entity
    pub fn with_owner(mut self, owner: Option<EntityRef>) -> Self {
        self.owner = owner;
        self
    }

    /// Add a checksum for a file
    pub fn add_checksum(&mut self, path: impl Into<String>, checksum: impl Into<String>) {
        self.checksums.insert(path.into(), checksum.into());
    }
}

/// Summary of bundle contents
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct BundleContents {
    /// Number of entity types in the bundle
    pub type_count: u64,

    /// Number of records across all types
    pub record_count: u64,

    /// Size of BUNDLE.json in bytes (uncompressed)
    pub payload_size_bytes: u64,
}

// =============================================================================
// Write / verify results
// =============================================================================

/// Information returned after writing an archive
#[derive(Debug, Clone)]
pub struct ArchiveFileInfo {
    /// Path where the archive was written
    pub path: PathBuf,

    /// Number of records in the archive
    pub record_count: u64,

    /// Size of the archive file in bytes
    pub archive_size_bytes: u64,

    /// xxh3 checksum of the whole archive file
    pub checksum: String,
}

/// Options for writing archives
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Zstd compression level (1-22, default: 3)
    pub compression_level: i32,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compression_level: 3,
        }
    }
}

/// Information returned after verifying an archive
#[derive(Debug, Clone)]
pub struct BundleVerifyInfo {
    /// Format version of the archive
    pub format_version: u32,

    /// Record count declared by the manifest
    pub record_count: u64,

    /// Entity the bundle was archived for
    pub owner: Option<EntityRef>,

    /// Whether the payload checksum matches the manifest
    pub checksums_valid: bool,
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Compute xxh3 hash of data and return as hex string
pub fn xxh3_hex(data: &[u8]) -> String {
    use xxhash_rust::xxh3::xxh3_64;
    format!("{:016x}", xxh3_64(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents() -> BundleContents {
        BundleContents {
            type_count: 3,
            record_count: 42,
            payload_size_bytes: 1234,
        }
    }

    #[test]
    fn test_manifest_new() {
        let manifest = BundleManifest::new("0.1.0", contents());

        assert_eq!(manifest.format_version, BUNDLE_FORMAT_VERSION);
        assert_eq!(manifest.coldstore_version, "0.1.0");
        assert_eq!(manifest.checksum_algorithm, "xxh3");
        assert!(manifest.checksums.is_empty());
        assert!(manifest.owner.is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(&manifest.created_at).is_ok());
    }

    #[test]
    fn test_manifest_json_roundtrip() {
        let mut manifest = BundleManifest::new("0.1.0", contents())
            .with_owner(Some(EntityRef::new("Account", 7i64)));
        manifest.add_checksum("BUNDLE.json", "checksum123");

        let json = serde_json::to_string_pretty(&manifest).unwrap();
        let parsed: BundleManifest = serde_json::from_str(&json).unwrap();

        assert_eq!(manifest, parsed);
    }

    #[test]
    fn test_ownerless_manifest_omits_field() {
        let manifest = BundleManifest::new("0.1.0", contents());
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(!json.contains("owner"));
    }

    #[test]
    fn test_xxh3_hex() {
        let hash = xxh3_hex(b"hello world");
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(xxh3_hex(b"hello world"), xxh3_hex(b"hello world"));
        assert_ne!(xxh3_hex(b"hello"), xxh3_hex(b"world"));
    }

    #[test]
    fn test_paths() {
        assert_eq!(paths::MANIFEST, "coldbundle/MANIFEST.json");
        assert_eq!(paths::BUNDLE, "coldbundle/BUNDLE.json");
        assert_eq!(WriteOptions::default().compression_level, 3);
    }
}
