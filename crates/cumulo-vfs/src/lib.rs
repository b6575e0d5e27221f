//! cumulo-vfs: the virtual filesystem behind the cumulo desktop.
//!
//! The VFS unifies heterogeneous storage backends — local disk, in-memory
//! scratch space, and future network backends — under one path-addressable
//! API with mount points:
//!
//! ```text
//! /                       # virtual root
//! ├── /mem/               # MemoryAdapter (scratch, tests)
//! ├── /home/              # LocalAdapter (host directory, rw)
//! └── /media/archive/     # LocalAdapter (host directory, ro)
//! ```
//!
//! # Design
//!
//! - [`VfsManager`] is the single entry point. It normalizes virtual
//!   paths, resolves the owning mount by longest-prefix match, and wraps
//!   adapter errors into the [`VfsError`](cumulo_types::VfsError) taxonomy.
//! - [`Adapter`] implementations do primitive I/O and publish an explicit
//!   capability descriptor; the manager validates capabilities before
//!   dispatch.
//! - Reads go through a TTL [`cache`]; writes invalidate it and publish
//!   typed events on a broadcast bus.
//! - Copy/move run as tracked [`FileOperation`]s; batches run as
//!   transactions with compensating rollback.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cumulo_vfs::{MemoryAdapter, VfsManager};
//!
//! # async fn demo() -> cumulo_types::VfsResult<()> {
//! let vfs = VfsManager::new();
//! vfs.register_adapter("mem", Arc::new(MemoryAdapter::new())).await;
//! vfs.mount("/mem", "mem", Default::default()).await?;
//!
//! vfs.write_file("/mem/a.txt", b"hi").await?;
//! assert_eq!(vfs.read_file("/mem/a.txt").await?, b"hi");
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod cache;
pub mod events;
pub mod mount;
pub mod ops;
pub mod path;
pub mod txn;
pub mod watch;

mod manager;

pub use adapter::{Adapter, AdapterRegistry, LocalAdapter, MemoryAdapter};
pub use cache::{CacheStats, CONTENT_TTL, LISTING_TTL, STAT_TTL};
pub use events::EventBus;
pub use manager::VfsManager;
pub use mount::{Mount, MountInfo, MountTable};
pub use ops::{FileOperation, OperationKind, OperationStatus};
pub use txn::{TransactionStatus, TxOperation, VfsTransaction};

// Re-export the shared types so most callers need only this crate.
pub use cumulo_types::{
    AdapterCapabilities, NodeKind, PermissionKind, Permissions, PermissionsPatch, VfsError,
    VfsEvent, VfsNode, VfsResult, WatchEvent, WatchEventKind,
};
