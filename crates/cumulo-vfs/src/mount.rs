//! Mount table: virtual path prefix → adapter binding.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

use cumulo_types::MountId;

use crate::adapter::Adapter;
use crate::path;

/// A live binding of a virtual path prefix to one adapter instance.
pub struct Mount {
    pub id: MountId,
    /// Normalized mount path; unique within the table.
    pub path: String,
    /// Registry name the adapter was mounted under.
    pub adapter_name: String,
    pub adapter: Arc<dyn Adapter>,
    pub options: HashMap<String, serde_json::Value>,
    pub mounted_at: SystemTime,
}

impl std::fmt::Debug for Mount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mount")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("adapter", &self.adapter_name)
            .finish()
    }
}

/// Serializable mount summary for callers (UIs, protocol servers).
#[derive(Debug, Clone, Serialize)]
pub struct MountInfo {
    pub id: MountId,
    pub path: String,
    pub adapter: String,
    pub adapter_kind: String,
    pub read_only: bool,
    pub options: HashMap<String, serde_json::Value>,
    pub mounted_at: SystemTime,
}

impl From<&Mount> for MountInfo {
    fn from(mount: &Mount) -> Self {
        Self {
            id: mount.id,
            path: mount.path.clone(),
            adapter: mount.adapter_name.clone(),
            adapter_kind: mount.adapter.kind().to_string(),
            read_only: mount.adapter.read_only(),
            options: mount.options.clone(),
            mounted_at: mount.mounted_at,
        }
    }
}

/// Owned collection of mounts keyed by canonicalized path.
///
/// Mount paths form a prefix lattice; resolution picks the longest matching
/// prefix, so `/data/x` belongs to a mount at `/data` even when `/` is also
/// mounted.
#[derive(Debug, Default)]
pub struct MountTable {
    mounts: HashMap<String, Arc<Mount>>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mount. Returns `false` when the path is already taken.
    pub fn insert(&mut self, mount: Mount) -> bool {
        if self.mounts.contains_key(&mount.path) {
            return false;
        }
        self.mounts.insert(mount.path.clone(), Arc::new(mount));
        true
    }

    pub fn contains(&self, mount_path: &str) -> bool {
        self.mounts.contains_key(mount_path)
    }

    /// Remove the mount at exactly this path.
    pub fn remove(&mut self, mount_path: &str) -> Option<Arc<Mount>> {
        self.mounts.remove(mount_path)
    }

    pub fn get(&self, mount_path: &str) -> Option<Arc<Mount>> {
        self.mounts.get(mount_path).cloned()
    }

    /// All mounts, sorted by path for deterministic listings.
    pub fn list(&self) -> Vec<Arc<Mount>> {
        let mut mounts: Vec<_> = self.mounts.values().cloned().collect();
        mounts.sort_by(|a, b| a.path.cmp(&b.path));
        mounts
    }

    /// Mounts bound to the given adapter name.
    pub fn using_adapter(&self, adapter_name: &str) -> Vec<Arc<Mount>> {
        let mut mounts: Vec<_> = self
            .mounts
            .values()
            .filter(|m| m.adapter_name == adapter_name)
            .cloned()
            .collect();
        mounts.sort_by(|a, b| a.path.cmp(&b.path));
        mounts
    }

    /// Resolve a normalized virtual path to its owning mount and the
    /// adapter-relative remainder, by longest-prefix match.
    pub fn resolve(&self, vpath: &str) -> Option<(Arc<Mount>, String)> {
        let mut best: Option<&Arc<Mount>> = None;
        for mount in self.mounts.values() {
            if path::is_under(vpath, &mount.path)
                && best.is_none_or(|b| mount.path.len() > b.path.len())
            {
                best = Some(mount);
            }
        }
        best.map(|mount| {
            let rel = path::strip_prefix(vpath, &mount.path).to_string();
            (mount.clone(), rel)
        })
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}
