//! Archiver configuration via `coldstore.toml`
//!
//! Every knob has a default matching the archiver's production behavior, so
//! an empty file (or no file) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::sync::Arc;

use coldstore_core::{Error, Result};
use coldstore_durability::{ObjectStorageTransport, ObjectStore, Transport};

use crate::retry::RetryConfig;

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "coldstore.toml";

/// Archiver configuration loaded from `coldstore.toml`.
///
/// # Example
///
/// ```toml
/// write_batch_size = 1000
/// delete_pause_ms = 500
///
/// [retry]
/// max_retries = 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiverConfig {
    /// Children fetched per page while walking a cascade relation.
    pub fetch_batch_size: usize,
    /// Rows per upsert batch during import.
    pub write_batch_size: usize,
    /// Identities per delete chunk.
    pub delete_batch_size: usize,
    /// Pause between delete chunks, in milliseconds.
    pub delete_pause_ms: u64,
    /// Let the store stamp created/updated timestamp columns on import.
    pub touch_timestamps: bool,
    /// Zstd level for bundles written by the object-storage transport.
    pub compression_level: i32,
    /// Boolean column flipped on the root when it is archived/unarchived.
    pub archived_flag_column: String,
    /// Text column the object-storage transport records its key in.
    pub archive_key_column: String,
    /// Retry behavior around each batch commit.
    pub retry: RetryConfig,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            fetch_batch_size: 1000,
            write_batch_size: 1000,
            delete_batch_size: 10_000,
            delete_pause_ms: 500,
            touch_timestamps: false,
            compression_level: 3,
            archived_flag_column: "archived".to_string(),
            archive_key_column: "archive_key".to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl ArchiverConfig {
    /// Defaults with every sleep removed (retries and delete throttling).
    pub fn without_delays() -> Self {
        Self {
            delete_pause_ms: 0,
            retry: RetryConfig::immediate(),
            ..Self::default()
        }
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if a batch size is zero, the compression level is
    /// outside 1-22, a column name is empty, or the retry range is inverted.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("fetch_batch_size", self.fetch_batch_size),
            ("write_batch_size", self.write_batch_size),
            ("delete_batch_size", self.delete_batch_size),
        ] {
            if value == 0 {
                return Err(Error::invalid_input(format!("{} must be at least 1", name)));
            }
        }
        if !(1..=22).contains(&self.compression_level) {
            return Err(Error::invalid_input(format!(
                "compression_level must be between 1 and 22, got {}",
                self.compression_level
            )));
        }
        if self.archived_flag_column.is_empty() || self.archive_key_column.is_empty() {
            return Err(Error::invalid_input("column names must not be empty"));
        }
        self.retry.validate()
    }

    /// Object-storage transport using this config's key column and
    /// compression level.
    pub fn object_storage_transport(
        &self,
        objects: Arc<dyn ObjectStore>,
        base_path: impl Into<String>,
    ) -> Transport {
        Transport::ObjectStorage(
            ObjectStorageTransport::new(objects, base_path)
                .with_compression_level(self.compression_level)
                .with_key_column(self.archive_key_column.clone()),
        )
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# coldstore archiver configuration
#
# Children fetched per page while walking a cascade relation
fetch_batch_size = 1000

# Rows per upsert batch during import
write_batch_size = 1000

# Identities per DELETE chunk, and the pause between chunks
delete_batch_size = 10000
delete_pause_ms = 500

# Let the store stamp created_at / updated_at on imported rows
touch_timestamps = false

# Zstd level for bundles uploaded by the object-storage transport (1-22)
compression_level = 3

# Column flipped on the archive root; skipped if the table lacks it
archived_flag_column = "archived"

# Column the object-storage transport records the object key in
archive_key_column = "archive_key"

# Retry on lock-wait timeouts and deadlocks around each batch commit
[retry]
max_retries = 2
min_backoff_ms = 500
max_backoff_ms = 5500
"#
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        let config: ArchiverConfig = toml::from_str(&content).map_err(|e| {
            Error::invalid_input(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Io(io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to write default config file '{}': {}",
                        path.display(),
                        e
                    ),
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Io(io::Error::new(
                e.kind(),
                format!("Failed to write config file '{}': {}", path.display(), e),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_toml_matches_default() {
        let parsed: ArchiverConfig = toml::from_str(ArchiverConfig::default_toml()).unwrap();
        assert_eq!(parsed, ArchiverConfig::default());
    }

    #[test]
    fn empty_file_is_default() {
        let parsed: ArchiverConfig = toml::from_str("").unwrap();
        assert_eq!(parsed, ArchiverConfig::default());
    }

    #[test]
    fn partial_override() {
        let parsed: ArchiverConfig =
            toml::from_str("write_batch_size = 50\n[retry]\nmax_retries = 0\n").unwrap();
        assert_eq!(parsed.write_batch_size, 50);
        assert_eq!(parsed.delete_batch_size, 10_000);
        assert_eq!(parsed.retry.max_retries, 0);
        assert_eq!(parsed.retry.max_backoff_ms, 5500);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = ArchiverConfig::default();
        config.write_batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = ArchiverConfig::default();
        config.compression_level = 40;
        assert!(config.validate().is_err());

        let mut config = ArchiverConfig::default();
        config.archive_key_column.clear();
        assert!(config.validate().is_err());

        assert!(ArchiverConfig::without_delays().validate().is_ok());
    }

    #[test]
    fn write_default_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(!path.exists());

        ArchiverConfig::write_default_if_missing(&path).unwrap();
        assert!(path.exists());
        assert_eq!(
            ArchiverConfig::from_file(&path).unwrap(),
            ArchiverConfig::default()
        );
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "delete_pause_ms = 0\n").unwrap();

        ArchiverConfig::write_default_if_missing(&path).unwrap();
        assert_eq!(ArchiverConfig::from_file(&path).unwrap().delete_pause_ms, 0);
    }

    #[test]
    fn write_to_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut config = ArchiverConfig::without_delays();
        config.touch_timestamps = true;

        config.write_to_file(&path).unwrap();
        assert_eq!(ArchiverConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "write_batch_size = \"lots\"").unwrap();

        let err = ArchiverConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn object_storage_transport_follows_config() {
        let dir = TempDir::new().unwrap();
        let objects = Arc::new(coldstore_durability::LocalObjectStore::new(dir.path()).unwrap());
        let mut config = ArchiverConfig::default();
        config.archive_key_column = "bundle_key".to_string();

        match config.object_storage_transport(objects, "archives") {
            Transport::ObjectStorage(t) => assert_eq!(t.key_column(), "bundle_key"),
            other => panic!("unexpected transport: {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = ArchiverConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
