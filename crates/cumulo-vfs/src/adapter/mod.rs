//! Adapter trait and registry.
//!
//! An adapter is a pluggable storage backend: it implements primitive I/O
//! against paths relative to its own root and publishes an
//! [`AdapterCapabilities`] descriptor. Adapters speak `io::Result`; the
//! manager wraps their errors into the `VfsError` taxonomy at its boundary.

mod local;
mod memory;

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use cumulo_types::{AdapterCapabilities, PermissionsPatch, VfsNode, WatchEvent};

pub use local::LocalAdapter;
pub use memory::MemoryAdapter;

/// Abstract storage backend.
///
/// All paths are adapter-relative virtual paths: normalized, `/`-separated,
/// rooted at `/` (the adapter's own root, not the host's). A `LocalAdapter`
/// rooted at `/home/amy/project` reads `read("/src/main.rs")` from
/// `/home/amy/project/src/main.rs`.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Type tag for diagnostics and mount listings (e.g. `"memory"`).
    fn kind(&self) -> &'static str;

    /// Capability descriptor, checked by the manager before dispatch.
    fn capabilities(&self) -> AdapterCapabilities;

    /// Lifecycle hook invoked when the adapter is bound to a mount point.
    async fn on_mount(&self, options: &HashMap<String, serde_json::Value>) -> io::Result<()> {
        let _ = options;
        Ok(())
    }

    /// Lifecycle hook invoked when the mount is torn down.
    async fn on_unmount(&self) -> io::Result<()> {
        Ok(())
    }

    /// Read the entire contents of a file.
    async fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Write data to a file, creating it if it doesn't exist.
    async fn write(&self, path: &str, data: &[u8]) -> io::Result<()>;

    /// List entries in a directory. Entry paths are adapter-relative.
    async fn list(&self, path: &str) -> io::Result<Vec<VfsNode>>;

    /// Get metadata for a file or directory.
    async fn stat(&self, path: &str) -> io::Result<VfsNode>;

    /// Create a single directory. Parent must exist.
    async fn mkdir(&self, path: &str) -> io::Result<()>;

    /// Remove a file or empty directory.
    async fn remove(&self, path: &str) -> io::Result<()>;

    /// Rename (move) within this adapter. Atomic where the backend allows.
    async fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    /// Apply a partial permissions update.
    ///
    /// Only called when `capabilities().permissions` is true.
    async fn set_permissions(&self, path: &str, patch: &PermissionsPatch) -> io::Result<()> {
        let _ = (path, patch);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "permissions not supported by this adapter",
        ))
    }

    /// Subscribe to change notifications for this adapter.
    ///
    /// Push-based: the adapter fires an event on every mutation it observes
    /// and the stream carries adapter-relative paths. Only called when
    /// `capabilities().realtime_watch` is true.
    fn watch(&self) -> io::Result<broadcast::Receiver<WatchEvent>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "watch not supported by this adapter",
        ))
    }

    /// Returns true if this adapter refuses writes.
    fn read_only(&self) -> bool {
        false
    }
}

/// Registry of adapters, keyed by unique name.
///
/// Re-registering an existing name overwrites silently; that is documented
/// behavior, not an error — desktop sessions re-register adapters on
/// reload.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under a name, overwriting any previous one.
    pub fn register(&mut self, name: impl Into<String>, adapter: Arc<dyn Adapter>) {
        self.adapters.insert(name.into(), adapter);
    }

    /// Remove an adapter. Returns the removed instance, if any.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.remove(name)
    }

    /// Look up an adapter by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_get() {
        let mut registry = AdapterRegistry::new();
        registry.register("mem", Arc::new(MemoryAdapter::new()));

        assert!(registry.contains("mem"));
        assert!(registry.get("mem").is_some());
        assert!(!registry.contains("nope"));
    }

    #[test]
    fn reregister_overwrites_silently() {
        let mut registry = AdapterRegistry::new();
        registry.register("mem", Arc::new(MemoryAdapter::new()));
        registry.register("mem", Arc::new(MemoryAdapter::new()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn names_sorted() {
        let mut registry = AdapterRegistry::new();
        registry.register("zzz", Arc::new(MemoryAdapter::new()));
        registry.register("aaa", Arc::new(MemoryAdapter::new()));
        assert_eq!(registry.names(), vec!["aaa", "zzz"]);
    }
}
