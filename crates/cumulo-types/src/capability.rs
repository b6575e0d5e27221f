//! Adapter capability descriptor.
//!
//! Each adapter publishes one of these; the manager validates it *before*
//! dispatch so unsupported operations fail fast with `VfsError::Unsupported`
//! instead of failing somewhere deep inside adapter code.

use serde::{Deserialize, Serialize};

/// What an adapter can do, declared up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterCapabilities {
    /// Adapter pushes change notifications; `watch()` works on its mounts.
    pub realtime_watch: bool,
    /// Adapter persists permissions and honors `set_permissions`.
    pub permissions: bool,
    /// Adapter can represent symlink nodes.
    pub symlinks: bool,
    /// Largest accepted write, if bounded.
    pub max_file_size: Option<u64>,
    /// Protocol tags this adapter serves (e.g. `"memory"`, `"file"`).
    pub protocols: Vec<String>,
}

impl Default for AdapterCapabilities {
    fn default() -> Self {
        Self {
            realtime_watch: false,
            permissions: false,
            symlinks: false,
            max_file_size: None,
            protocols: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_minimal() {
        let caps = AdapterCapabilities::default();
        assert!(!caps.realtime_watch);
        assert!(!caps.permissions);
        assert!(caps.max_file_size.is_none());
    }
}
