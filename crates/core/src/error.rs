//! Error types for coldstore
//!
//! This module defines all error types shared across the workspace.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! ## Propagation classes
//!
//! - Recoverable attribute anomalies never become errors; they are warnings.
//! - Per-type structural failures (`ImportBatch`, `Constraint`,
//!   `TransientContention` once retries are spent) are aggregated by the
//!   unarchiver and only become terminal as `ImportFailed`.
//! - `Transport` failures abort the operation immediately.

use std::io;
use thiserror::Error;

/// Result type alias for coldstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for coldstore
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations, network, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid argument or configuration
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Type name cannot be resolved to a known schema
    #[error("Unknown entity type: {0}")]
    SchemaLookup(String),

    /// Batch write failed for one type
    #[error("Error importing {type_name}: {message}")]
    ImportBatch {
        /// Entity type being imported
        type_name: String,
        /// Underlying failure
        message: String,
    },

    /// Lock-wait timeout or deadlock; safe to retry
    #[error("Transient contention: {0}")]
    TransientContention(String),

    /// Constraint violation reported by the store
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Bundle store/retrieve failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Transaction misuse (commit without begin, nested begin)
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Belongs-to relations among archived types form a cycle
    #[error("Dependency cycle among archived types: {}", cycle.join(" -> "))]
    DependencyCycle {
        /// Types along the cycle, first type repeated at the end
        cycle: Vec<String>,
    },

    /// Generated identities could not be paired with submitted rows
    #[error("Identity recovery failed for {type_name}: submitted {submitted} rows, store reported {returned} identities")]
    IdentityRecovery {
        /// Entity type being imported
        type_name: String,
        /// Rows in the batch
        submitted: usize,
        /// Identities returned by the store
        returned: usize,
    },

    /// Aggregated per-type failures (crash-on-errors mode)
    #[error("Errors occurred during load:\n{}", errors.join("\n"))]
    ImportFailed {
        /// One message per failed type or record
        errors: Vec<String>,
    },
}

impl Error {
    /// Create an invalid-input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a transient-contention error
    pub fn contention(msg: impl Into<String>) -> Self {
        Self::TransientContention(msg.into())
    }

    /// Create a constraint error
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    /// Whether the failure is worth retrying (lock wait, deadlock)
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientContention(_))
    }

    /// Whether the failure must abort the whole operation
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::DependencyCycle { .. } | Error::Io(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
