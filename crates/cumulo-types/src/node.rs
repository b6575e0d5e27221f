//! Node metadata — the unified file/directory record.

use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Kind of VFS node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
    Symlink,
}

/// Which access a permission check asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    Read,
    Write,
    Execute,
}

/// Permission bits plus ownership, in the shape desktop UIs display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
    pub owner: String,
    pub group: String,
    /// Unix-style mode bits (e.g. `0o644`).
    pub mode: u32,
}

impl Permissions {
    /// Default permissions for a regular file (`rw-r--r--`).
    pub fn default_file() -> Self {
        Self {
            readable: true,
            writable: true,
            executable: false,
            owner: "user".to_string(),
            group: "user".to_string(),
            mode: 0o644,
        }
    }

    /// Default permissions for a directory (`rwxr-xr-x`).
    pub fn default_dir() -> Self {
        Self {
            readable: true,
            writable: true,
            executable: true,
            owner: "user".to_string(),
            group: "user".to_string(),
            mode: 0o755,
        }
    }

    /// Derive the boolean flags from mode bits (owner triplet).
    pub fn from_mode(mode: u32) -> Self {
        Self {
            readable: mode & 0o400 != 0,
            writable: mode & 0o200 != 0,
            executable: mode & 0o100 != 0,
            owner: "user".to_string(),
            group: "user".to_string(),
            mode,
        }
    }

    /// `rwxr-xr-x` style rendering of the mode bits.
    pub fn mode_string(&self) -> String {
        let mut s = String::with_capacity(9);
        for shift in [6u32, 3, 0] {
            let bits = (self.mode >> shift) & 0o7;
            s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            s.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }
        s
    }

    /// Check a single access kind against the owner flags.
    pub fn allows(&self, kind: PermissionKind) -> bool {
        match kind {
            PermissionKind::Read => self.readable,
            PermissionKind::Write => self.writable,
            PermissionKind::Execute => self.executable,
        }
    }

    /// Apply a partial update, keeping unset fields as-is.
    ///
    /// When `mode` is patched the boolean flags are re-derived from it, so
    /// the two representations cannot drift apart.
    pub fn apply(&mut self, patch: &PermissionsPatch) {
        if let Some(mode) = patch.mode {
            *self = Self::from_mode(mode);
        }
        if let Some(readable) = patch.readable {
            self.readable = readable;
            self.mode = set_bit(self.mode, 0o400, readable);
        }
        if let Some(writable) = patch.writable {
            self.writable = writable;
            self.mode = set_bit(self.mode, 0o200, writable);
        }
        if let Some(executable) = patch.executable {
            self.executable = executable;
            self.mode = set_bit(self.mode, 0o100, executable);
        }
        if let Some(owner) = &patch.owner {
            self.owner = owner.clone();
        }
        if let Some(group) = &patch.group {
            self.group = group.clone();
        }
    }
}

fn set_bit(mode: u32, bit: u32, on: bool) -> u32 {
    if on {
        mode | bit
    } else {
        mode & !bit
    }
}

/// Partial permissions update for `set_permissions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionsPatch {
    pub readable: Option<bool>,
    pub writable: Option<bool>,
    pub executable: Option<bool>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub mode: Option<u32>,
}

/// A file, directory, or symlink as seen through the VFS.
///
/// Produced by adapters (with adapter-relative paths); the manager rewrites
/// `path` to the full virtual path before handing nodes to callers. Never
/// mutated outside an adapter call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VfsNode {
    /// Virtual path, rooted at `/`.
    pub path: String,
    /// Entry name (not the full path); `/` for a root.
    pub name: String,
    pub kind: NodeKind,
    /// Size in bytes (0 for directories).
    pub size: u64,
    pub created: Option<SystemTime>,
    pub modified: Option<SystemTime>,
    pub permissions: Permissions,
    /// Adapter-specific extras (symlink target, content type, ...).
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl VfsNode {
    /// Create a file node with default permissions.
    pub fn file(path: impl Into<String>, name: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            kind: NodeKind::File,
            size,
            created: None,
            modified: None,
            permissions: Permissions::default_file(),
            metadata: HashMap::new(),
        }
    }

    /// Create a directory node with default permissions.
    pub fn directory(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            kind: NodeKind::Directory,
            size: 0,
            created: None,
            modified: None,
            permissions: Permissions::default_dir(),
            metadata: HashMap::new(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == NodeKind::Symlink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_string_renders_triplets() {
        assert_eq!(Permissions::from_mode(0o644).mode_string(), "rw-r--r--");
        assert_eq!(Permissions::from_mode(0o755).mode_string(), "rwxr-xr-x");
        assert_eq!(Permissions::from_mode(0o000).mode_string(), "---------");
    }

    #[test]
    fn patch_updates_flags_and_mode_together() {
        let mut perms = Permissions::default_file();
        perms.apply(&PermissionsPatch {
            writable: Some(false),
            ..Default::default()
        });
        assert!(!perms.writable);
        assert_eq!(perms.mode & 0o200, 0);
        assert!(perms.readable);
    }

    #[test]
    fn patch_mode_rederives_flags() {
        let mut perms = Permissions::default_file();
        perms.apply(&PermissionsPatch {
            mode: Some(0o400),
            ..Default::default()
        });
        assert!(perms.readable);
        assert!(!perms.writable);
        assert!(!perms.executable);
    }

    #[test]
    fn node_constructors() {
        let f = VfsNode::file("/docs/a.txt", "a.txt", 12);
        assert!(f.is_file());
        assert_eq!(f.size, 12);

        let d = VfsNode::directory("/docs", "docs");
        assert!(d.is_dir());
        assert!(d.permissions.executable);
    }
}
