//! Archive engine for coldstore
//!
//! This crate runs the two operations end to end:
//! - Archive: graph walk, transport store, archived flag, throttled deletion
//! - Unarchive: transport retrieve, dependency ordering, rehydration and
//!   batched upserts with identity remapping
//!
//! Building blocks are public so hosts can compose their own flows:
//! `GraphWalker`, `DependencyOrderer`, `Rehydrator`, `BatchWriter`,
//! `DeletionExecutor` and the `with_retry` transaction wrapper.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archive;
pub mod batch;
pub mod config;
pub mod deletion;
pub mod orderer;
pub mod rehydrate;
pub mod retry;
pub mod unarchive;
pub mod walker;

pub use archive::{ArchiveOptions, ArchiveOutcome, Archiver};
pub use batch::{BatchWriter, TypeImportResult};
pub use config::{ArchiverConfig, CONFIG_FILE_NAME};
pub use deletion::{DeletionExecutor, DeletionSummary};
pub use orderer::{order, DependencyOrderer};
pub use rehydrate::{
    Hooks, IdentityMapping, ImportMode, Mappings, Prepared, PreparedRow, Rehydrator,
    TransformHook, VetoHook,
};
pub use retry::{with_retry, RetryConfig};
pub use unarchive::{UnarchiveOptions, UnarchiveReport, UnarchiveTarget, Unarchiver};
pub use walker::{GraphWalker, Walk};
