//! Event types for the manager bus and adapter watch streams.

use serde::{Deserialize, Serialize};

use crate::id::OperationId;

/// Events emitted on the manager's typed bus.
///
/// Fire-and-forget: emission never blocks the emitting operation, and a
/// missing subscriber is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VfsEvent {
    AdapterRegistered { name: String },
    AdapterUnregistered { name: String },
    MountAdded { path: String },
    MountRemoved { path: String },
    FileModified { path: String },
    FileDeleted { path: String },
    FileRenamed { from: String, to: String },
    DirectoryCreated { path: String },
    DirectoryDeleted { path: String },
    OperationStarted { id: OperationId },
    OperationCompleted { id: OperationId },
    OperationFailed { id: OperationId, message: String },
}

/// Kind of change an adapter observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchEventKind {
    Created,
    Modified,
    Removed,
    Renamed,
}

/// A change notification pushed by an adapter.
///
/// `path` is adapter-relative when it leaves the adapter; the watch
/// registry rewrites it to the full virtual path before invoking the
/// caller's callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub path: String,
    pub kind: WatchEventKind,
}
