//! Local filesystem adapter.
//!
//! Binds a mount to a real directory on the host, with optional read-only
//! mode. Paths never escape the root: `..` components are clamped during
//! virtual-path normalization, and resolution canonicalizes the host path
//! and re-checks containment so symlinks cannot smuggle I/O outside.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use cumulo_types::{
    AdapterCapabilities, NodeKind, Permissions, PermissionsPatch, VfsNode,
};

use super::Adapter;
use crate::path as vpath;

/// Adapter backed by a directory on the host filesystem.
#[derive(Debug, Clone)]
pub struct LocalAdapter {
    root: PathBuf,
    read_only: bool,
}

impl LocalAdapter {
    /// Create an adapter rooted at the given host directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_only: false,
        }
    }

    /// Create a read-only adapter rooted at the given host directory.
    pub fn read_only(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_only: true,
        }
    }

    /// The host root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an adapter-relative virtual path onto a host path.
    ///
    /// Canonicalizes before the containment check so a symlink inside the
    /// root pointing outside it is refused rather than followed. Paths that
    /// don't exist yet canonicalize through their deepest existing
    /// ancestor.
    fn resolve(&self, rel_path: &str) -> io::Result<PathBuf> {
        let mut full = self.root.clone();
        for component in vpath::components(&vpath::normalize(rel_path)) {
            full.push(component);
        }

        let canonical = if full.exists() {
            full.canonicalize()?
        } else {
            match full.parent() {
                Some(parent) if parent.exists() => {
                    let name = full.file_name().ok_or_else(|| {
                        io::Error::new(io::ErrorKind::InvalidInput, "invalid path")
                    })?;
                    parent.canonicalize()?.join(name)
                }
                // No existing ancestor to anchor on; the actual I/O call
                // will surface the error.
                _ => full,
            }
        };

        let canonical_root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        if !canonical.starts_with(&canonical_root) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "path escapes adapter root",
            ));
        }
        Ok(canonical)
    }

    fn check_writable(&self) -> io::Result<()> {
        if self.read_only {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "mount is read-only",
            ))
        } else {
            Ok(())
        }
    }

    #[cfg(unix)]
    fn permissions_of(meta: &std::fs::Metadata) -> Permissions {
        use std::os::unix::fs::MetadataExt;
        use std::os::unix::fs::PermissionsExt;
        let mut perms = Permissions::from_mode(meta.permissions().mode() & 0o777);
        perms.owner = meta.uid().to_string();
        perms.group = meta.gid().to_string();
        perms
    }

    #[cfg(not(unix))]
    fn permissions_of(meta: &std::fs::Metadata) -> Permissions {
        let mut perms = Permissions::default_file();
        perms.writable = !meta.permissions().readonly();
        perms
    }

    async fn node_from_meta(
        &self,
        rel_path: &str,
        host_path: &Path,
        meta: &std::fs::Metadata,
    ) -> VfsNode {
        let file_type = meta.file_type();
        let kind = if file_type.is_symlink() {
            NodeKind::Symlink
        } else if meta.is_dir() {
            NodeKind::Directory
        } else {
            // Special files (sockets, pipes, devices) are treated as files;
            // the desktop never operates on them directly.
            NodeKind::File
        };

        let mut node = VfsNode {
            path: rel_path.to_string(),
            name: vpath::file_name(rel_path).to_string(),
            kind,
            size: meta.len(),
            created: meta.created().ok(),
            modified: meta.modified().ok(),
            permissions: Self::permissions_of(meta),
            metadata: Default::default(),
        };

        if file_type.is_symlink() {
            if let Ok(target) = fs::read_link(host_path).await {
                node.metadata.insert(
                    "symlink_target".to_string(),
                    serde_json::Value::String(target.to_string_lossy().into_owned()),
                );
            }
        }
        node
    }
}

#[async_trait]
impl Adapter for LocalAdapter {
    fn kind(&self) -> &'static str {
        "local"
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities {
            // No inotify wiring; watch on a local mount fails fast.
            realtime_watch: false,
            permissions: cfg!(unix),
            symlinks: true,
            max_file_size: None,
            protocols: vec!["file".to_string()],
        }
    }

    async fn read(&self, rel_path: &str) -> io::Result<Vec<u8>> {
        let host = self.resolve(rel_path)?;
        fs::read(&host).await
    }

    async fn write(&self, rel_path: &str, data: &[u8]) -> io::Result<()> {
        self.check_writable()?;
        let host = self.resolve(rel_path)?;
        if let Some(parent) = host.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&host, data).await
    }

    async fn list(&self, rel_path: &str) -> io::Result<Vec<VfsNode>> {
        let rel_path = vpath::normalize(rel_path);
        let host = self.resolve(&rel_path)?;
        let mut dir = fs::read_dir(&host).await?;
        let mut entries = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            // symlink_metadata so symlinks show as symlinks, not targets
            let meta = fs::symlink_metadata(entry.path()).await?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let child_rel = vpath::join(&rel_path, &name);
            entries
                .push(self.node_from_meta(&child_rel, &entry.path(), &meta).await);
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn stat(&self, rel_path: &str) -> io::Result<VfsNode> {
        let rel_path = vpath::normalize(rel_path);
        let host = self.resolve(&rel_path)?;
        // follows symlinks, like stat(2)
        let meta = fs::metadata(&host).await?;
        Ok(self.node_from_meta(&rel_path, &host, &meta).await)
    }

    async fn mkdir(&self, rel_path: &str) -> io::Result<()> {
        self.check_writable()?;
        let host = self.resolve(rel_path)?;
        fs::create_dir(&host).await
    }

    async fn remove(&self, rel_path: &str) -> io::Result<()> {
        self.check_writable()?;
        let host = self.resolve(rel_path)?;
        let meta = fs::metadata(&host).await?;
        if meta.is_dir() {
            fs::remove_dir(&host).await
        } else {
            fs::remove_file(&host).await
        }
    }

    async fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        self.check_writable()?;
        let from_host = self.resolve(from)?;
        let to_host = self.resolve(to)?;
        if let Some(parent) = to_host.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&from_host, &to_host).await
    }

    #[cfg(unix)]
    async fn set_permissions(&self, rel_path: &str, patch: &PermissionsPatch) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        self.check_writable()?;
        let host = self.resolve(rel_path)?;
        let meta = fs::metadata(&host).await?;

        let mut perms = Permissions::from_mode(meta.permissions().mode() & 0o777);
        perms.apply(patch);
        fs::set_permissions(&host, std::fs::Permissions::from_mode(perms.mode)).await
    }

    fn read_only(&self) -> bool {
        self.read_only
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn setup() -> (LocalAdapter, TempDir) {
        let dir = TempDir::new().unwrap();
        let adapter = LocalAdapter::new(dir.path());
        (adapter, dir)
    }

    #[tokio::test]
    async fn write_and_read() {
        let (fs, _dir) = setup();
        fs.write("/test.txt", b"hello").await.unwrap();
        assert_eq!(fs.read("/test.txt").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn nested_write_creates_parents() {
        let (fs, _dir) = setup();
        fs.write("/a/b/c.txt", b"nested").await.unwrap();
        assert_eq!(fs.read("/a/b/c.txt").await.unwrap(), b"nested");
    }

    #[tokio::test]
    async fn read_only_rejects_writes() {
        let dir = TempDir::new().unwrap();
        let fs = LocalAdapter::read_only(dir.path());

        let err = fs.write("/test.txt", b"data").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn list_is_sorted() {
        let (fs, _dir) = setup();
        fs.write("/b.txt", b"b").await.unwrap();
        fs.write("/a.txt", b"a").await.unwrap();
        fs.mkdir("/sub").await.unwrap();

        let entries = fs.list("/").await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
    }

    #[tokio::test]
    async fn stat_reports_kind_and_size() {
        let (fs, _dir) = setup();
        fs.write("/file.txt", b"content").await.unwrap();
        fs.mkdir("/dir").await.unwrap();

        let file = fs.stat("/file.txt").await.unwrap();
        assert!(file.is_file());
        assert_eq!(file.size, 7);

        let dir = fs.stat("/dir").await.unwrap();
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn remove_file_and_dir() {
        let (fs, _dir) = setup();
        fs.write("/file.txt", b"x").await.unwrap();
        fs.mkdir("/empty").await.unwrap();

        fs.remove("/file.txt").await.unwrap();
        fs.remove("/empty").await.unwrap();
        assert!(fs.stat("/file.txt").await.is_err());
        assert!(fs.stat("/empty").await.is_err());
    }

    #[tokio::test]
    async fn remove_non_empty_dir_fails() {
        let (fs, _dir) = setup();
        fs.write("/dir/inner.txt", b"x").await.unwrap();
        assert!(fs.remove("/dir").await.is_err());
    }

    #[tokio::test]
    async fn rename_moves_file() {
        let (fs, _dir) = setup();
        fs.write("/old.txt", b"content").await.unwrap();
        fs.rename("/old.txt", "/new.txt").await.unwrap();

        assert_eq!(fs.read("/new.txt").await.unwrap(), b"content");
        assert!(fs.stat("/old.txt").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_escaping_root_is_blocked() {
        use std::os::unix::fs::symlink;

        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), b"outside-data").unwrap();

        let (fs, dir) = setup();
        symlink(
            outside.path().join("secret.txt"),
            dir.path().join("escape_link"),
        )
        .unwrap();

        let err = fs.read("/escape_link").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        let err = fs.stat("/escape_link").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_within_root_is_followed() {
        use std::os::unix::fs::symlink;

        let (fs, dir) = setup();
        fs.write("/target.txt", b"content").await.unwrap();
        symlink(dir.path().join("target.txt"), dir.path().join("rel_link")).unwrap();

        assert_eq!(fs.read("/rel_link").await.unwrap(), b"content");
    }

    #[tokio::test]
    async fn path_escape_blocked() {
        let (fs, _dir) = setup();
        // `..` is clamped at the virtual root, so this resolves inside the
        // sandbox and simply doesn't exist.
        let result = fs.read("/../../etc/passwd").await;
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn set_permissions_changes_mode() {
        use std::os::unix::fs::PermissionsExt;

        let (fs, dir) = setup();
        fs.write("/file.txt", b"x").await.unwrap();

        fs.set_permissions(
            "/file.txt",
            &PermissionsPatch {
                mode: Some(0o600),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let meta = std::fs::metadata(dir.path().join("file.txt")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[tokio::test]
    async fn watch_is_unsupported() {
        let (fs, _dir) = setup();
        let err = fs.watch().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
