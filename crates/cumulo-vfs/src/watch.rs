//! Watch registry: bookkeeping for active watchers, grouped by mount.
//!
//! The manager spawns one forwarding task per watcher (adapter stream →
//! caller callback); this registry owns the task handles so `unwatch` and
//! `unmount` can tear them down. Closing every watcher under a mount
//! *before* the adapter's unmount hook runs prevents callbacks into a
//! detached adapter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::task::JoinHandle;

use cumulo_types::WatcherId;

/// One active watcher.
#[derive(Debug)]
struct Watcher {
    /// Virtual path being watched.
    path: String,
    /// Mount point the watcher belongs to, for bulk teardown.
    mount_path: String,
    task: JoinHandle<()>,
}

/// Owns all active watchers.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    watchers: Mutex<HashMap<WatcherId, Watcher>>,
    next_id: AtomicU64,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a watcher's forwarding task, returning its handle id.
    pub fn insert(
        &self,
        path: impl Into<String>,
        mount_path: impl Into<String>,
        task: JoinHandle<()>,
    ) -> WatcherId {
        let id = WatcherId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(
            id,
            Watcher {
                path: path.into(),
                mount_path: mount_path.into(),
                task,
            },
        );
        id
    }

    /// Stop and forget one watcher. Returns `false` if the id is unknown.
    pub fn remove(&self, id: WatcherId) -> bool {
        match self.lock().remove(&id) {
            Some(watcher) => {
                watcher.task.abort();
                true
            }
            None => false,
        }
    }

    /// Stop and forget every watcher registered under a mount path.
    /// Returns how many were closed.
    pub fn close_mount(&self, mount_path: &str) -> usize {
        let mut watchers = self.lock();
        let ids: Vec<WatcherId> = watchers
            .iter()
            .filter(|(_, w)| w.mount_path == mount_path)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            if let Some(watcher) = watchers.remove(id) {
                tracing::debug!(path = %watcher.path, mount = %mount_path, "closing watcher");
                watcher.task.abort();
            }
        }
        ids.len()
    }

    /// Watched virtual paths, sorted. Diagnostics only.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.lock().values().map(|w| w.path.clone()).collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<WatcherId, Watcher>> {
        match self.watchers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_task() -> JoinHandle<()> {
        tokio::spawn(async {
            std::future::pending::<()>().await;
        })
    }

    #[tokio::test]
    async fn insert_and_remove() {
        let registry = WatchRegistry::new();
        let id = registry.insert("/mem/a", "/mem", idle_task());
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(id));
        assert!(registry.is_empty());
        assert!(!registry.remove(id));
    }

    #[tokio::test]
    async fn close_mount_only_touches_its_watchers() {
        let registry = WatchRegistry::new();
        registry.insert("/mem/a", "/mem", idle_task());
        registry.insert("/mem/b", "/mem", idle_task());
        registry.insert("/disk/c", "/disk", idle_task());

        let closed = registry.close_mount("/mem");
        assert_eq!(closed, 2);
        assert_eq!(registry.paths(), vec!["/disk/c"]);
    }
}
