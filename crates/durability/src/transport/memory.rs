//! In-memory transport
//!
//! Keeps the most recently stored bundle resident. Clones share the slot, so
//! a caller can keep a handle and inspect what an archive operation stored.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use coldstore_core::{ArchiveBundle, Error, Result};

use super::{BundleTransport, TransportContext};

/// Location token returned by [`MemoryTransport::store`]
pub const MEMORY_LOCATION: &str = "memory://bundle";

/// Transport holding one bundle in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    slot: Arc<Mutex<Option<ArchiveBundle>>>,
}

impl MemoryTransport {
    /// Create an empty transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport pre-loaded with `bundle`, ready for an unarchive
    pub fn with_bundle(bundle: ArchiveBundle) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(bundle))),
        }
    }

    /// Copy of the resident bundle
    pub fn bundle(&self) -> Option<ArchiveBundle> {
        self.slot.lock().clone()
    }
}

impl BundleTransport for MemoryTransport {
    fn store(
        &mut self,
        bundle: &ArchiveBundle,
        _owner: Option<TransportContext<'_>>,
    ) -> Result<String> {
        debug!(target: "coldstore::transport", records = bundle.record_count(), "Bundle held in memory");
        *self.slot.lock() = Some(bundle.clone());
        Ok(MEMORY_LOCATION.to_string())
    }

    fn retrieve(
        &mut self,
        _location: Option<&str>,
        _owner: Option<TransportContext<'_>>,
    ) -> Result<ArchiveBundle> {
        self.slot
            .lock()
            .clone()
            .ok_or_else(|| Error::transport("no bundle held in memory"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coldstore_core::{attrs, Value};

    #[test]
    fn test_retrieve_before_store_fails() {
        let mut t = MemoryTransport::new();
        assert!(matches!(t.retrieve(None, None), Err(Error::Transport(_))));
    }

    #[test]
    fn test_clones_share_slot() {
        let handle = MemoryTransport::new();
        let mut t = handle.clone();

        let mut bundle = ArchiveBundle::new();
        bundle.insert("Order", "id", attrs([("id", Value::Int(10))]));
        assert_eq!(t.store(&bundle, None).unwrap(), MEMORY_LOCATION);

        assert_eq!(handle.bundle(), Some(bundle));
    }

    #[test]
    fn test_with_bundle() {
        let mut bundle = ArchiveBundle::new();
        bundle.insert("Order", "id", attrs([("id", Value::Int(10))]));
        let mut t = MemoryTransport::with_bundle(bundle.clone());
        assert_eq!(t.retrieve(None, None).unwrap(), bundle);
    }
}
