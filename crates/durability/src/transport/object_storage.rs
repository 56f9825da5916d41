//! Object-storage transport
//!
//! Serializes the bundle to a compressed archive in a scratch directory,
//! uploads it under a key derived from the owner's identity plus a random
//! suffix, and records the key on the owner's row when the owner's table has
//! the key column:
//!
//! ```text
//! <base_path>/<owner id>_<16 hex chars>.bundle.tar.zst
//! ```
//!
//! Scratch space is a `tempfile::TempDir`, removed on every exit path.
//!
//! The object store itself is behind [`ObjectStore`]. [`LocalObjectStore`]
//! treats a directory as the bucket.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, info};

use coldstore_core::{ArchiveBundle, Error, Result, Value};

use super::{BundleTransport, TransportContext};
use crate::bundle_archive::{
    BundleArchiveReader, BundleArchiveWriter, WriteOptions, BUNDLE_ARCHIVE_EXTENSION,
};

/// Column the object key is recorded in, unless configured otherwise
pub const DEFAULT_KEY_COLUMN: &str = "archive_key";

/// Scratch file name inside the staging directory
const STAGING_FILE: &str = "staged.bundle.tar.zst";

// =============================================================================
// ObjectStore
// =============================================================================

/// Minimal blob store: upload a file under a key, download a key to a file
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `source` under `key`
    fn put_file(&self, key: &str, source: &Path) -> Result<()>;

    /// Download `key` into `dest`
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not exist.
    fn get_to_file(&self, key: &str, dest: &Path) -> Result<()>;

    /// Check whether `key` exists
    fn exists(&self, key: &str) -> Result<bool>;
}

/// Directory-backed [`ObjectStore`]; keys map to relative paths
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Use `root` as the bucket, creating it if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| Error::transport(format!("create bucket {}: {}", root.display(), e)))?;
        Ok(Self { root })
    }

    /// Filesystem path of `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir));
        if key.is_empty() || escapes {
            return Err(Error::transport(format!("invalid object key '{}'", key)));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for LocalObjectStore {
    fn put_file(&self, key: &str, source: &Path) -> Result<()> {
        let target = self.path_for(key)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::transport(format!("put {}: {}", key, e)))?;
        }
        fs::copy(source, &target).map_err(|e| Error::transport(format!("put {}: {}", key, e)))?;
        Ok(())
    }

    fn get_to_file(&self, key: &str, dest: &Path) -> Result<()> {
        let source = self.path_for(key)?;
        if !source.exists() {
            return Err(Error::transport(format!("no object at key '{}'", key)));
        }
        fs::copy(&source, dest).map_err(|e| Error::transport(format!("get {}: {}", key, e)))?;
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key)?.is_file())
    }
}

// =============================================================================
// ObjectStorageTransport
// =============================================================================

/// Transport that uploads compressed bundle archives to an [`ObjectStore`]
#[derive(Clone)]
pub struct ObjectStorageTransport {
    objects: Arc<dyn ObjectStore>,
    base_path: String,
    options: WriteOptions,
    key_column: String,
}

impl ObjectStorageTransport {
    /// Upload under `base_path` in `objects`
    pub fn new(objects: Arc<dyn ObjectStore>, base_path: impl Into<String>) -> Self {
        Self {
            objects,
            base_path: base_path.into().trim_matches('/').to_string(),
            options: WriteOptions::default(),
            key_column: DEFAULT_KEY_COLUMN.to_string(),
        }
    }

    /// Zstd compression level for uploaded archives
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.options.compression_level = level;
        self
    }

    /// Column on the owner's table that receives the object key
    pub fn with_key_column(mut self, column: impl Into<String>) -> Self {
        self.key_column = column.into();
        self
    }

    /// Configured key column
    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    /// Build a fresh object key for an owner identity
    pub fn object_key(&self, owner_id: &impl fmt::Display) -> String {
        let suffix = format!("{:016x}", rand::random::<u64>());
        let file = format!("{}_{}{}", owner_id, suffix, BUNDLE_ARCHIVE_EXTENSION);
        if self.base_path.is_empty() {
            file
        } else {
            format!("{}/{}", self.base_path, file)
        }
    }

    fn staging_dir() -> Result<TempDir> {
        TempDir::new().map_err(|e| Error::transport(format!("staging directory: {}", e)))
    }

    /// Key recorded on the owner's row, if any
    fn recorded_key(&self, ctx: &TransportContext<'_>) -> Result<String> {
        let row = ctx
            .store
            .get(&ctx.table.table_name, &ctx.owner.id)
            .map_err(|e| Error::transport(format!("read archive key of {}: {}", ctx.owner, e)))?
            .ok_or_else(|| Error::transport(format!("owner {} not found", ctx.owner)))?;

        match row.get(&self.key_column) {
            Some(Value::String(key)) if !key.is_empty() => Ok(key.clone()),
            _ => Err(Error::transport(format!(
                "no archive key recorded for {}",
                ctx.owner
            ))),
        }
    }
}

impl fmt::Debug for ObjectStorageTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStorageTransport")
            .field("base_path", &self.base_path)
            .field("compression_level", &self.options.compression_level)
            .field("key_column", &self.key_column)
            .finish()
    }
}

impl BundleTransport for ObjectStorageTransport {
    fn store(
        &mut self,
        bundle: &ArchiveBundle,
        owner: Option<TransportContext<'_>>,
    ) -> Result<String> {
        let ctx = owner.ok_or_else(|| {
            Error::transport("object-storage transport needs an owning entity to derive a key")
        })?;
        let key = self.object_key(&ctx.owner.id);

        let staging = Self::staging_dir()?;
        let staged = staging.path().join(STAGING_FILE);
        let info = BundleArchiveWriter::new(&self.options).write(bundle, Some(ctx.owner), &staged)?;
        self.objects.put_file(&key, &staged)?;

        info!(
            target: "coldstore::transport",
            key = %key,
            owner = %ctx.owner,
            records = info.record_count,
            bytes = info.archive_size_bytes,
            "Bundle uploaded"
        );

        if ctx.table.has_column(&self.key_column) {
            ctx.store
                .update_column(
                    &ctx.table.table_name,
                    &ctx.owner.id,
                    &self.key_column,
                    Value::String(key.clone()),
                )
                .map_err(|e| Error::transport(format!("record archive key: {}", e)))?;
            debug!(target: "coldstore::transport", column = %self.key_column, "Archive key recorded on owner");
        }

        Ok(key)
    }

    fn retrieve(
        &mut self,
        location: Option<&str>,
        owner: Option<TransportContext<'_>>,
    ) -> Result<ArchiveBundle> {
        let key = match (location, owner) {
            (Some(key), _) => key.to_string(),
            (None, Some(ctx)) => self.recorded_key(&ctx)?,
            (None, None) => {
                return Err(Error::transport(
                    "retrieve needs a location or an owner with a recorded key",
                ))
            }
        };

        let staging = Self::staging_dir()?;
        let staged = staging.path().join(STAGING_FILE);
        self.objects.get_to_file(&key, &staged)?;
        let contents = BundleArchiveReader::read(&staged)?;

        info!(
            target: "coldstore::transport",
            key = %key,
            records = contents.bundle.record_count(),
            "Bundle downloaded"
        );
        Ok(contents.bundle)
    }
}
