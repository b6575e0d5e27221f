//! cumulo-types: Pure data types shared across cumulo crates.
//!
//! This crate holds everything that describes the VFS without implementing
//! it:
//!
//! - **Error taxonomy**: [`VfsError`] / [`VfsResult`] — every adapter-level
//!   failure is re-wrapped into one of these kinds at the manager boundary
//! - **Node metadata**: [`VfsNode`], [`NodeKind`], [`Permissions`]
//! - **Capabilities**: [`AdapterCapabilities`] — the descriptor each
//!   adapter publishes so the manager can fail fast on unsupported ops
//! - **Events**: [`VfsEvent`] for the manager bus, [`WatchEvent`] for
//!   adapter push notifications
//! - **Ids**: newtyped counters for mounts, operations, transactions,
//!   and watchers

mod capability;
mod error;
mod event;
mod id;
mod node;

pub use capability::AdapterCapabilities;
pub use error::{VfsError, VfsResult};
pub use event::{VfsEvent, WatchEvent, WatchEventKind};
pub use id::{MountId, OperationId, TransactionId, WatcherId};
pub use node::{NodeKind, PermissionKind, Permissions, PermissionsPatch, VfsNode};
