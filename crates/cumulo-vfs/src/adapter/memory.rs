//! In-memory adapter.
//!
//! A flat map of normalized path → entry. All data is ephemeral and lost on
//! drop. Used for scratch mounts and tests; this is also the reference
//! adapter for realtime watch, since every mutation goes through one place.

use std::collections::HashMap;
use std::io;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use cumulo_types::{
    AdapterCapabilities, Permissions, PermissionsPatch, VfsNode, WatchEvent, WatchEventKind,
};

use super::Adapter;
use crate::path;

const WATCH_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
enum MemKind {
    File(Vec<u8>),
    Directory,
}

#[derive(Debug, Clone)]
struct MemEntry {
    kind: MemKind,
    created: SystemTime,
    modified: SystemTime,
    permissions: Permissions,
}

impl MemEntry {
    fn file(data: Vec<u8>) -> Self {
        let now = SystemTime::now();
        Self {
            kind: MemKind::File(data),
            created: now,
            modified: now,
            permissions: Permissions::default_file(),
        }
    }

    fn directory() -> Self {
        let now = SystemTime::now();
        Self {
            kind: MemKind::Directory,
            created: now,
            modified: now,
            permissions: Permissions::default_dir(),
        }
    }

    fn node(&self, rel_path: &str) -> VfsNode {
        let mut node = match &self.kind {
            MemKind::File(data) => {
                VfsNode::file(rel_path, path::file_name(rel_path), data.len() as u64)
            }
            MemKind::Directory => VfsNode::directory(rel_path, path::file_name(rel_path)),
        };
        node.created = Some(self.created);
        node.modified = Some(self.modified);
        node.permissions = self.permissions.clone();
        node
    }
}

/// In-memory adapter.
///
/// Thread-safe via internal `RwLock`. The root directory `/` always exists.
#[derive(Debug)]
pub struct MemoryAdapter {
    entries: RwLock<HashMap<String, MemEntry>>,
    watch_tx: broadcast::Sender<WatchEvent>,
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAdapter {
    /// Create a new empty in-memory adapter.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert("/".to_string(), MemEntry::directory());
        let (watch_tx, _) = broadcast::channel(WATCH_CHANNEL_CAPACITY);
        Self {
            entries: RwLock::new(entries),
            watch_tx,
        }
    }

    /// Fire a watch event. No subscribers is fine.
    fn notify(&self, rel_path: &str, kind: WatchEventKind) {
        let _ = self.watch_tx.send(WatchEvent {
            path: rel_path.to_string(),
            kind,
        });
    }

    fn not_found(rel_path: &str) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, format!("not found: {rel_path}"))
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities {
            realtime_watch: true,
            permissions: true,
            symlinks: false,
            max_file_size: None,
            protocols: vec!["memory".to_string()],
        }
    }

    async fn read(&self, rel_path: &str) -> io::Result<Vec<u8>> {
        let rel_path = path::normalize(rel_path);
        let entries = self.entries.read().await;
        match entries.get(&rel_path) {
            Some(MemEntry {
                kind: MemKind::File(data),
                ..
            }) => Ok(data.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {rel_path}"),
            )),
            None => Err(Self::not_found(&rel_path)),
        }
    }

    async fn write(&self, rel_path: &str, data: &[u8]) -> io::Result<()> {
        let rel_path = path::normalize(rel_path);
        let mut entries = self.entries.write().await;

        if let Some(MemEntry {
            kind: MemKind::Directory,
            ..
        }) = entries.get(&rel_path)
        {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {rel_path}"),
            ));
        }

        // Writes create missing ancestors, matching how flat key-value
        // backends behave.
        let mut ancestor = rel_path.as_str();
        while let Some(p) = path::parent(ancestor) {
            entries
                .entry(p.to_string())
                .or_insert_with(MemEntry::directory);
            ancestor = p;
        }

        let kind = match entries.get_mut(&rel_path) {
            Some(entry) => {
                entry.kind = MemKind::File(data.to_vec());
                entry.modified = SystemTime::now();
                WatchEventKind::Modified
            }
            None => {
                entries.insert(rel_path.clone(), MemEntry::file(data.to_vec()));
                WatchEventKind::Created
            }
        };
        drop(entries);

        self.notify(&rel_path, kind);
        Ok(())
    }

    async fn list(&self, rel_path: &str) -> io::Result<Vec<VfsNode>> {
        let rel_path = path::normalize(rel_path);
        let entries = self.entries.read().await;

        match entries.get(&rel_path) {
            Some(MemEntry {
                kind: MemKind::Directory,
                ..
            }) => {}
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("not a directory: {rel_path}"),
                ));
            }
            None => return Err(Self::not_found(&rel_path)),
        }

        let mut result: Vec<VfsNode> = entries
            .iter()
            .filter(|(k, _)| path::parent(k) == Some(rel_path.as_str()))
            .map(|(k, entry)| entry.node(k))
            .collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    async fn stat(&self, rel_path: &str) -> io::Result<VfsNode> {
        let rel_path = path::normalize(rel_path);
        let entries = self.entries.read().await;
        entries
            .get(&rel_path)
            .map(|entry| entry.node(&rel_path))
            .ok_or_else(|| Self::not_found(&rel_path))
    }

    async fn mkdir(&self, rel_path: &str) -> io::Result<()> {
        let rel_path = path::normalize(rel_path);
        let mut entries = self.entries.write().await;

        if let Some(existing) = entries.get(&rel_path) {
            return match existing.kind {
                // Already a directory: fine.
                MemKind::Directory => Ok(()),
                MemKind::File(_) => Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("file exists: {rel_path}"),
                )),
            };
        }

        // Single-level: the parent must already exist.
        if let Some(parent) = path::parent(&rel_path) {
            match entries.get(parent) {
                Some(MemEntry {
                    kind: MemKind::Directory,
                    ..
                }) => {}
                Some(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::NotADirectory,
                        format!("not a directory: {parent}"),
                    ));
                }
                None => return Err(Self::not_found(parent)),
            }
        }

        entries.insert(rel_path.clone(), MemEntry::directory());
        drop(entries);

        self.notify(&rel_path, WatchEventKind::Created);
        Ok(())
    }

    async fn remove(&self, rel_path: &str) -> io::Result<()> {
        let rel_path = path::normalize(rel_path);
        if rel_path == "/" {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot remove root directory",
            ));
        }

        let mut entries = self.entries.write().await;

        if let Some(MemEntry {
            kind: MemKind::Directory,
            ..
        }) = entries.get(&rel_path)
        {
            let has_children = entries
                .keys()
                .any(|k| path::parent(k) == Some(rel_path.as_str()));
            if has_children {
                return Err(io::Error::new(
                    io::ErrorKind::DirectoryNotEmpty,
                    format!("directory not empty: {rel_path}"),
                ));
            }
        }

        entries
            .remove(&rel_path)
            .ok_or_else(|| Self::not_found(&rel_path))?;
        drop(entries);

        self.notify(&rel_path, WatchEventKind::Removed);
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let from = path::normalize(from);
        let to = path::normalize(to);
        if from == "/" {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cannot rename root directory",
            ));
        }

        let mut entries = self.entries.write().await;

        let entry = entries
            .remove(&from)
            .ok_or_else(|| Self::not_found(&from))?;

        // Refuse to replace a directory with a file or vice versa.
        if let Some(existing) = entries.get(&to) {
            match (&entry.kind, &existing.kind) {
                (MemKind::File(_), MemKind::Directory) => {
                    entries.insert(from, entry);
                    return Err(io::Error::new(
                        io::ErrorKind::IsADirectory,
                        format!("destination is a directory: {to}"),
                    ));
                }
                (MemKind::Directory, MemKind::File(_)) => {
                    entries.insert(from, entry);
                    return Err(io::Error::new(
                        io::ErrorKind::NotADirectory,
                        format!("destination is not a directory: {to}"),
                    ));
                }
                _ => {}
            }
        }

        // Directories carry their whole subtree to the new key.
        if matches!(entry.kind, MemKind::Directory) {
            let children: Vec<(String, MemEntry)> = entries
                .iter()
                .filter(|(k, _)| path::is_under(k, &from) && *k != &from)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            for (old_key, child) in children {
                entries.remove(&old_key);
                let rel = path::strip_prefix(&old_key, &from);
                let new_key = if rel == "/" {
                    to.clone()
                } else {
                    format!("{to}{rel}")
                };
                entries.insert(new_key, child);
            }
        }

        entries.insert(to.clone(), entry);
        drop(entries);

        self.notify(&from, WatchEventKind::Renamed);
        self.notify(&to, WatchEventKind::Created);
        Ok(())
    }

    async fn set_permissions(&self, rel_path: &str, patch: &PermissionsPatch) -> io::Result<()> {
        let rel_path = path::normalize(rel_path);
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&rel_path)
            .ok_or_else(|| Self::not_found(&rel_path))?;
        entry.permissions.apply(patch);
        entry.modified = SystemTime::now();
        drop(entries);

        self.notify(&rel_path, WatchEventKind::Modified);
        Ok(())
    }

    fn watch(&self) -> io::Result<broadcast::Receiver<WatchEvent>> {
        Ok(self.watch_tx.subscribe())
    }
}
