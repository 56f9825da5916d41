//! Bundle archive reader
//!
//! Reads `.bundle.tar.zst` archives and validates their contents.

use crate::bundle_archive::error::{ArchiveFileError, ArchiveFileResult};
use crate::bundle_archive::types::{
    paths, xxh3_hex, BundleManifest, BundleVerifyInfo, BUNDLE_FORMAT_VERSION,
};
use coldstore_core::ArchiveBundle;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tar::Archive;

/// Fully parsed archive
#[derive(Debug, Clone)]
pub struct ArchiveFileContents {
    /// Archive manifest
    pub manifest: BundleManifest,
    /// The bundle itself
    pub bundle: ArchiveBundle,
}

/// Reader for bundle archives
pub struct BundleArchiveReader;

impl BundleArchiveReader {
    /// Check an archive's integrity without deserializing the bundle
    ///
    /// Checks:
    /// - Archive can be decompressed
    /// - MANIFEST.json and BUNDLE.json exist
    /// - Format version is supported
    /// - BUNDLE.json checksum matches the manifest
    pub fn validate(path: &Path) -> ArchiveFileResult<BundleVerifyInfo> {
        let files = Self::extract_all(BufReader::new(File::open(path)?))?;
        let (manifest, payload) = Self::split(&files)?;

        let checksums_valid = match manifest.checksums.get("BUNDLE.json") {
            Some(expected) => expected == &xxh3_hex(payload),
            None => false,
        };

        Ok(BundleVerifyInfo {
            format_version: manifest.format_version,
            record_count: manifest.contents.record_count,
            owner: manifest.owner,
            checksums_valid,
        })
    }

    /// Read the manifest only
    pub fn read_manifest(path: &Path) -> ArchiveFileResult<BundleManifest> {
        let files = Self::extract_all(BufReader::new(File::open(path)?))?;
        Ok(Self::split(&files)?.0)
    }

    /// Read and verify a whole archive from disk
    pub fn read(path: &Path) -> ArchiveFileResult<ArchiveFileContents> {
        Self::read_from(BufReader::new(File::open(path)?))
    }

    /// Read and verify a whole archive held in memory
    pub fn read_from_bytes(data: &[u8]) -> ArchiveFileResult<ArchiveFileContents> {
        Self::read_from(data)
    }

    fn read_from<R: Read>(source: R) -> ArchiveFileResult<ArchiveFileContents> {
        let files = Self::extract_all(source)?;
        let (manifest, payload) = Self::split(&files)?;

        if let Some(expected) = manifest.checksums.get("BUNDLE.json") {
            let actual = xxh3_hex(payload);
            if expected != &actual {
                return Err(ArchiveFileError::ChecksumMismatch {
                    file: "BUNDLE.json".to_string(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        let bundle: ArchiveBundle = serde_json::from_slice(payload)?;
        if bundle.record_count() as u64 != manifest.contents.record_count {
            return Err(ArchiveFileError::invalid_bundle(format!(
                "manifest declares {} records, payload holds {}",
                manifest.contents.record_count,
                bundle.record_count()
            )));
        }

        Ok(ArchiveFileContents { manifest, bundle })
    }

    /// Parse the manifest, check its version, and locate the payload
    fn split(files: &HashMap<String, Vec<u8>>) -> ArchiveFileResult<(BundleManifest, &[u8])> {
        let manifest_data = files
            .get("MANIFEST.json")
            .ok_or_else(|| ArchiveFileError::missing_file("MANIFEST.json"))?;
        let payload = files
            .get("BUNDLE.json")
            .ok_or_else(|| ArchiveFileError::missing_file("BUNDLE.json"))?;

        let manifest: BundleManifest = serde_json::from_slice(manifest_data)?;
        if manifest.format_version != BUNDLE_FORMAT_VERSION {
            return Err(ArchiveFileError::UnsupportedVersion {
                version: manifest.format_version,
            });
        }
        Ok((manifest, payload.as_slice()))
    }

    /// Extract every file under the archive root, keyed by relative name
    fn extract_all<R: Read>(source: R) -> ArchiveFileResult<HashMap<String, Vec<u8>>> {
        let decoder = zstd::Decoder::new(source)
            .map_err(|e| ArchiveFileError::compression(format!("zstd decode: {}", e)))?;

        let mut archive = Archive::new(decoder);
        let mut files = HashMap::new();
        let prefix = format!("{}/", paths::ROOT);

        for entry in archive
            .entries()
            .map_err(|e| ArchiveFileError::archive(e.to_string()))?
        {
            let mut entry = entry.map_err(|e| ArchiveFileError::archive(e.to_string()))?;
            let entry_path = entry
                .path()
                .map_err(|e| ArchiveFileError::archive(e.to_string()))?
                .to_string_lossy()
                .to_string();

            if let Some(name) = entry_path.strip_prefix(&prefix) {
                if !name.is_empty() {
                    let mut data = Vec::new();
                    entry
                        .read_to_end(&mut data)
                        .map_err(|e| ArchiveFileError::archive(format!("read {}: {}", name, e)))?;
                    files.insert(name.to_string(), data);
                }
            }
        }

        Ok(files)
    }
}
