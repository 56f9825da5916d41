//! Bundle archive error types

use std::io;
use thiserror::Error;

/// Errors that can occur while writing or reading a bundle archive
#[derive(Debug, Error)]
pub enum ArchiveFileError {
    /// Invalid archive format or structure
    #[error("Invalid bundle archive: {0}")]
    InvalidBundle(String),

    /// Required file missing from the archive
    #[error("Missing required file in bundle archive: {0}")]
    MissingFile(String),

    /// Checksum verification failed
    #[error("Checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// File that failed checksum
        file: String,
        /// Expected checksum value
        expected: String,
        /// Actual computed checksum
        actual: String,
    },

    /// Unsupported archive format version
    #[error("Unsupported format version: {version}. Supported: 1")]
    UnsupportedVersion {
        /// The unsupported version number
        version: u32,
    },

    /// Tar operation failed
    #[error("Archive error: {0}")]
    Archive(String),

    /// Compression/decompression failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArchiveFileError {
    /// Create a tar error
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    /// Create a compression error
    pub fn compression(msg: impl Into<String>) -> Self {
        Self::Compression(msg.into())
    }

    /// Create an invalid bundle error
    pub fn invalid_bundle(msg: impl Into<String>) -> Self {
        Self::InvalidBundle(msg.into())
    }

    /// Create a missing file error
    pub fn missing_file(path: impl Into<String>) -> Self {
        Self::MissingFile(path.into())
    }
}

impl From<ArchiveFileError> for coldstore_core::Error {
    fn from(e: ArchiveFileError) -> Self {
        coldstore_core::Error::transport(e.to_string())
    }
}

/// Result type for bundle archive operations
pub type ArchiveFileResult<T> = Result<T, ArchiveFileError>;
