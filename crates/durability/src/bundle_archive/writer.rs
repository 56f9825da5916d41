//! Bundle archive writer
//!
//! Creates `.bundle.tar.zst` archives containing:
//! - MANIFEST.json - format metadata, checksums, owner
//! - BUNDLE.json - the bundle in wire format

use crate::bundle_archive::error::{ArchiveFileError, ArchiveFileResult};
use crate::bundle_archive::types::{
    paths, xxh3_hex, ArchiveFileInfo, BundleContents, BundleManifest, WriteOptions,
};
use coldstore_core::{ArchiveBundle, EntityRef};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tar::{Builder, Header};

/// Writer for bundle archives
///
/// Writes to a temporary sibling and renames, so a reader never sees a
/// half-written archive.
pub struct BundleArchiveWriter {
    compression_level: i32,
}

impl BundleArchiveWriter {
    /// Create a new writer with the given options
    pub fn new(options: &WriteOptions) -> Self {
        Self {
            compression_level: options.compression_level,
        }
    }

    /// Create a new writer with default options
    pub fn with_defaults() -> Self {
        Self::new(&WriteOptions::default())
    }

    /// Write a complete archive to `path`
    pub fn write(
        &self,
        bundle: &ArchiveBundle,
        owner: Option<&EntityRef>,
        path: &Path,
    ) -> ArchiveFileResult<ArchiveFileInfo> {
        let temp_path = path.with_extension("tmp");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let result = File::create(&temp_path)
            .map_err(ArchiveFileError::from)
            .and_then(|file| self.write_archive(bundle, owner, BufWriter::new(file)));

        match result {
            Ok(record_count) => {
                fs::rename(&temp_path, path)?;
                let data = fs::read(path)?;
                Ok(ArchiveFileInfo {
                    path: path.to_path_buf(),
                    record_count,
                    archive_size_bytes: data.len() as u64,
                    checksum: xxh3_hex(&data),
                })
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }

    /// Write a complete archive into memory
    pub fn write_to_vec(
        &self,
        bundle: &ArchiveBundle,
        owner: Option<&EntityRef>,
    ) -> ArchiveFileResult<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_archive(bundle, owner, &mut buffer)?;
        Ok(buffer)
    }

    /// Serialize, checksum and pack; returns the record count
    fn write_archive<W: Write>(
        &self,
        bundle: &ArchiveBundle,
        owner: Option<&EntityRef>,
        sink: W,
    ) -> ArchiveFileResult<u64> {
        let payload = serde_json::to_vec(bundle)?;
        let record_count = bundle.record_count() as u64;

        let mut manifest = BundleManifest::new(
            env!("CARGO_PKG_VERSION"),
            BundleContents {
                type_count: bundle.type_count() as u64,
                record_count,
                payload_size_bytes: payload.len() as u64,
            },
        )
        .with_owner(owner.cloned());
        manifest.add_checksum("BUNDLE.json", xxh3_hex(&payload));
        let manifest_json = serde_json::to_vec_pretty(&manifest)?;

        let encoder = zstd::Encoder::new(sink, self.compression_level)
            .map_err(|e| ArchiveFileError::compression(format!("zstd encoder: {}", e)))?;
        let mut tar_builder = Builder::new(encoder);

        self.add_file(&mut tar_builder, paths::MANIFEST, &manifest_json)?;
        self.add_file(&mut tar_builder, paths::BUNDLE, &payload)?;

        let encoder = tar_builder
            .into_inner()
            .map_err(|e| ArchiveFileError::archive(format!("tar finish: {}", e)))?;
        let mut sink = encoder
            .finish()
            .map_err(|e| ArchiveFileError::compression(format!("zstd finish: {}", e)))?;
        sink.flush()?;

        Ok(record_count)
    }

    fn add_file<W: Write>(
        &self,
        builder: &mut Builder<W>,
        path: &str,
        data: &[u8],
    ) -> ArchiveFileResult<()> {
        let mut header = Header::new_gnu();
        header
            .set_path(path)
            .map_err(|e| ArchiveFileError::archive(format!("set path '{}': {}", path, e)))?;
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_cksum();

        builder
            .append(&header, data)
            .map_err(|e| ArchiveFileError::archive(format!("append '{}': {}", path, e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coldstore_core::{attrs, Value};
    use tempfile::tempdir;

    fn bundle() -> ArchiveBundle {
        let mut bundle = ArchiveBundle::new();
        bundle.insert("Account", "id", attrs([("id", Value::Int(1))]));
        bundle.insert(
            "Order",
            "id",
            attrs([("id", Value::Int(10)), ("account_id", Value::Int(1))]),
        );
        bundle
    }

    #[test]
    fn test_write_to_vec_is_zstd() {
        let data = BundleArchiveWriter::with_defaults()
            .write_to_vec(&bundle(), None)
            .unwrap();
        // zstd frame magic
        assert_eq!(&data[..4], &[0x28, 0xB5, 0x2F, 0xFD]);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/1_abc.bundle.tar.zst");

        let info = BundleArchiveWriter::with_defaults()
            .write(&bundle(), Some(&EntityRef::new("Account", 1i64)), &path)
            .unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
        assert_eq!(info.record_count, 2);
        assert_eq!(info.archive_size_bytes, fs::metadata(&path).unwrap().len());
        assert_eq!(info.checksum.len(), 16);
    }

    #[test]
    fn test_empty_bundle_writes() {
        let data = BundleArchiveWriter::with_defaults()
            .write_to_vec(&ArchiveBundle::new(), None)
            .unwrap();
        assert!(!data.is_empty());
    }
}
