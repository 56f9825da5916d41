//! Bundle transports
//!
//! A transport moves an [`ArchiveBundle`] to durable storage and back:
//!
//! - `store(bundle, owner) -> location`
//! - `retrieve(location?, owner) -> bundle`
//!
//! The set of transports is closed and resolved once at construction
//! ([`Transport`]); anything else plugs in through [`Transport::Custom`].
//!
//! Every transport failure is fatal to the calling operation: without a
//! bundle there is no meaningful partial progress.

pub mod memory;
pub mod object_storage;

pub use memory::MemoryTransport;
pub use object_storage::{LocalObjectStore, ObjectStorageTransport, ObjectStore};

use coldstore_core::{ArchiveBundle, EntityRef, RecordStore, Result, TableSchema};

/// The entity a bundle belongs to, plus the means to annotate it
///
/// Transports that record where a bundle went (an object key) write it onto
/// the owner's row through `store`.
#[derive(Clone, Copy)]
pub struct TransportContext<'a> {
    /// Owning entity (the archive root)
    pub owner: &'a EntityRef,
    /// Schema of the owner's table
    pub table: &'a TableSchema,
    /// Store holding the owner's row
    pub store: &'a dyn RecordStore,
}

impl std::fmt::Debug for TransportContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportContext")
            .field("owner", self.owner)
            .field("table", &self.table.table_name)
            .finish()
    }
}

/// Storage backend for bundles
pub trait BundleTransport: Send {
    /// Persist `bundle`, returning a location token
    ///
    /// # Errors
    ///
    /// Any failure is reported as [`coldstore_core::Error::Transport`].
    fn store(&mut self, bundle: &ArchiveBundle, owner: Option<TransportContext<'_>>)
        -> Result<String>;

    /// Fetch a bundle by location, or by whatever the owner recorded
    ///
    /// # Errors
    ///
    /// Any failure is reported as [`coldstore_core::Error::Transport`].
    fn retrieve(
        &mut self,
        location: Option<&str>,
        owner: Option<TransportContext<'_>>,
    ) -> Result<ArchiveBundle>;
}

/// Closed set of transports
pub enum Transport {
    /// Keep the bundle resident in memory
    InMemory(MemoryTransport),
    /// Compressed archive file uploaded to an object store
    ObjectStorage(ObjectStorageTransport),
    /// Caller-supplied implementation
    Custom(Box<dyn BundleTransport>),
}

impl Transport {
    /// Fresh in-memory transport
    pub fn in_memory() -> Self {
        Transport::InMemory(MemoryTransport::new())
    }

    /// Wrap a caller-supplied transport
    pub fn custom(transport: impl BundleTransport + 'static) -> Self {
        Transport::Custom(Box::new(transport))
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Transport::InMemory(_) => "in_memory",
            Transport::ObjectStorage(_) => "object_storage",
            Transport::Custom(_) => "custom",
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Transport").field(&self.kind()).finish()
    }
}

impl BundleTransport for Transport {
    fn store(
        &mut self,
        bundle: &ArchiveBundle,
        owner: Option<TransportContext<'_>>,
    ) -> Result<String> {
        match self {
            Transport::InMemory(t) => t.store(bundle, owner),
            Transport::ObjectStorage(t) => t.store(bundle, owner),
            Transport::Custom(t) => t.store(bundle, owner),
        }
    }

    fn retrieve(
        &mut self,
        location: Option<&str>,
        owner: Option<TransportContext<'_>>,
    ) -> Result<ArchiveBundle> {
        match self {
            Transport::InMemory(t) => t.retrieve(location, owner),
            Transport::ObjectStorage(t) => t.retrieve(location, owner),
            Transport::Custom(t) => t.retrieve(location, owner),
        }
    }
}

impl From<MemoryTransport> for Transport {
    fn from(t: MemoryTransport) -> Self {
        Transport::InMemory(t)
    }
}

impl From<ObjectStorageTransport> for Transport {
    fn from(t: ObjectStorageTransport) -> Self {
        Transport::ObjectStorage(t)
    }
}
