//! Error taxonomy for the VFS.
//!
//! Adapters speak `std::io::Result` (like any filesystem backend); the
//! manager re-wraps every adapter error into one of these kinds at its
//! boundary, attaching the virtual path and the attempted operation name
//! so callers get actionable diagnostics without digging into the adapter.

use std::io;

use thiserror::Error;

use crate::id::{TransactionId, WatcherId};

/// Result alias used throughout the manager's public surface.
pub type VfsResult<T> = Result<T, VfsError>;

/// Every failure the VFS manager can surface.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Path does not resolve to an entry (or to any mount at all).
    #[error("not found: {path} (during {op})")]
    NotFound {
        op: &'static str,
        path: String,
        #[source]
        source: Option<io::Error>,
    },

    /// The adapter or a read-only mount refused the operation.
    #[error("permission denied: {path} (during {op})")]
    PermissionDenied {
        op: &'static str,
        path: String,
        #[source]
        source: Option<io::Error>,
    },

    /// `mount()` on a path that is already a mount point.
    #[error("mount point already exists: {path}")]
    MountPointExists { path: String },

    /// Adapter name is not in the registry.
    #[error("adapter not registered: {name}")]
    AdapterNotFound { name: String },

    /// Adapter I/O failed for a reason other than the kinds above.
    #[error("{op} failed on {path}")]
    Network {
        op: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },

    /// The adapter's capability descriptor rules out this operation.
    #[error("{op} not supported on {path}")]
    Unsupported { op: &'static str, path: String },

    /// Commit/rollback on a transaction id that is not live.
    #[error("transaction not found: {id}")]
    TransactionNotFound { id: TransactionId },

    /// `unwatch()` on a watcher id that is not live.
    #[error("watcher not found: {id}")]
    WatcherNotFound { id: WatcherId },
}

impl VfsError {
    /// Wrap an adapter-level `io::Error` into the taxonomy.
    ///
    /// `NotFound`, `PermissionDenied`, and `Unsupported` io kinds map onto
    /// their named variants; everything else is adapter I/O failure.
    pub fn from_io(op: &'static str, path: impl Into<String>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound {
                op,
                path,
                source: Some(err),
            },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                op,
                path,
                source: Some(err),
            },
            io::ErrorKind::Unsupported => Self::Unsupported { op, path },
            _ => Self::Network {
                op,
                path,
                source: err,
            },
        }
    }

    /// Shorthand for a not-found failure with no underlying io error.
    pub fn not_found(op: &'static str, path: impl Into<String>) -> Self {
        Self::NotFound {
            op,
            path: path.into(),
            source: None,
        }
    }

    /// The virtual path this error refers to, when it has one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::NotFound { path, .. }
            | Self::PermissionDenied { path, .. }
            | Self::MountPointExists { path }
            | Self::Network { path, .. }
            | Self::Unsupported { path, .. } => Some(path),
            _ => None,
        }
    }
}
