//! The VFS manager — the single entry point collaborators talk to.
//!
//! Every public operation takes a virtual path, normalizes it, resolves the
//! owning mount by longest-prefix match, consults the TTL cache for reads,
//! delegates primitive I/O to the adapter, and re-wraps adapter errors into
//! the `VfsError` taxonomy. Writes invalidate the cache for the affected
//! path and publish typed events on the bus.
//!
//! The manager holds no long-lived locks across adapter I/O; consistency
//! under concurrent callers comes from the adapters themselves plus
//! transactions for best-effort sequencing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tokio::sync::{broadcast, RwLock};

use cumulo_types::{
    MountId, OperationId, PermissionKind, PermissionsPatch, TransactionId, VfsError, VfsEvent,
    VfsNode, VfsResult, WatchEvent, WatcherId,
};

use crate::adapter::{Adapter, AdapterRegistry};
use crate::cache::{Cache, CacheKind, CacheStats, CacheValue, CONTENT_TTL, LISTING_TTL, STAT_TTL};
use crate::events::EventBus;
use crate::mount::{Mount, MountInfo, MountTable};
use crate::ops::{FileOperation, OperationKind};
use crate::path;
use crate::txn::{TransactionStatus, TxOperation, VfsTransaction};
use crate::watch::WatchRegistry;

/// The VFS manager.
///
/// Cheap to share: wrap it in an `Arc` and clone handles freely.
pub struct VfsManager {
    adapters: RwLock<AdapterRegistry>,
    mounts: RwLock<MountTable>,
    cache: Cache,
    bus: EventBus,
    operations: Mutex<HashMap<OperationId, FileOperation>>,
    transactions: Mutex<HashMap<TransactionId, VfsTransaction>>,
    watchers: WatchRegistry,
    next_mount_id: AtomicU64,
    next_operation_id: AtomicU64,
    next_transaction_id: AtomicU64,
}

impl Default for VfsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VfsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VfsManager").finish_non_exhaustive()
    }
}

impl VfsManager {
    pub fn new() -> Self {
        Self {
            adapters: RwLock::new(AdapterRegistry::new()),
            mounts: RwLock::new(MountTable::new()),
            cache: Cache::new(),
            bus: EventBus::new(),
            operations: Mutex::new(HashMap::new()),
            transactions: Mutex::new(HashMap::new()),
            watchers: WatchRegistry::new(),
            next_mount_id: AtomicU64::new(1),
            next_operation_id: AtomicU64::new(1),
            next_transaction_id: AtomicU64::new(1),
        }
    }

    /// Subscribe to the event bus. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<VfsEvent> {
        self.bus.subscribe()
    }

    // ------------------------------------------------------------------
    // Adapters
    // ------------------------------------------------------------------

    /// Register an adapter under a unique name.
    ///
    /// Re-registering an existing name overwrites silently.
    pub async fn register_adapter(&self, name: &str, adapter: Arc<dyn Adapter>) {
        self.adapters.write().await.register(name, adapter);
        self.bus.emit(VfsEvent::AdapterRegistered {
            name: name.to_string(),
        });
    }

    /// Unregister an adapter, unmounting every mount that uses it first.
    pub async fn unregister_adapter(&self, name: &str) -> VfsResult<()> {
        if !self.adapters.read().await.contains(name) {
            return Err(VfsError::AdapterNotFound {
                name: name.to_string(),
            });
        }

        let mount_paths: Vec<String> = {
            let mounts = self.mounts.read().await;
            mounts
                .using_adapter(name)
                .iter()
                .map(|m| m.path.clone())
                .collect()
        };
        for mount_path in mount_paths {
            self.unmount(&mount_path).await?;
        }

        self.adapters.write().await.unregister(name);
        self.bus.emit(VfsEvent::AdapterUnregistered {
            name: name.to_string(),
        });
        Ok(())
    }

    /// Registered adapter names, sorted.
    pub async fn adapter_names(&self) -> Vec<String> {
        self.adapters.read().await.names()
    }

    // ------------------------------------------------------------------
    // Mounts
    // ------------------------------------------------------------------

    /// Bind an adapter to a virtual path prefix.
    pub async fn mount(
        &self,
        mount_path: &str,
        adapter_name: &str,
        options: HashMap<String, serde_json::Value>,
    ) -> VfsResult<MountInfo> {
        let mount_path = path::normalize(mount_path);

        let adapter = self.adapters.read().await.get(adapter_name).ok_or_else(|| {
            VfsError::AdapterNotFound {
                name: adapter_name.to_string(),
            }
        })?;

        if self.mounts.read().await.contains(&mount_path) {
            return Err(VfsError::MountPointExists { path: mount_path });
        }

        // Lifecycle hook may fail (e.g. a network adapter's handshake);
        // surface that as adapter I/O failure. It runs outside the table
        // lock so a slow handshake cannot stall unrelated operations.
        adapter
            .on_mount(&options)
            .await
            .map_err(|err| VfsError::Network {
                op: "mount",
                path: mount_path.clone(),
                source: err,
            })?;

        let mount = Mount {
            id: MountId(self.next_mount_id.fetch_add(1, Ordering::Relaxed)),
            path: mount_path.clone(),
            adapter_name: adapter_name.to_string(),
            adapter,
            options,
            mounted_at: SystemTime::now(),
        };
        let info = MountInfo::from(&mount);
        // A concurrent mount may have claimed the path while the hook ran.
        if !self.mounts.write().await.insert(mount) {
            return Err(VfsError::MountPointExists { path: mount_path });
        }

        tracing::debug!(path = %mount_path, adapter = %adapter_name, "mounted");
        self.bus.emit(VfsEvent::MountAdded { path: mount_path });
        Ok(info)
    }

    /// Tear down the mount at exactly this path.
    ///
    /// Watchers under the mount are closed before the adapter's unmount
    /// hook runs, so no callback can fire into a detached adapter.
    pub async fn unmount(&self, mount_path: &str) -> VfsResult<()> {
        let mount_path = path::normalize(mount_path);

        let mount = self
            .mounts
            .read()
            .await
            .get(&mount_path)
            .ok_or_else(|| VfsError::not_found("unmount", &mount_path))?;

        self.watchers.close_mount(&mount_path);

        // Like `on_mount`, the hook runs without the table lock held.
        mount
            .adapter
            .on_unmount()
            .await
            .map_err(|err| VfsError::Network {
                op: "unmount",
                path: mount_path.clone(),
                source: err,
            })?;

        self.mounts.write().await.remove(&mount_path);
        self.cache.clear(Some(&mount_path));
        tracing::debug!(path = %mount_path, "unmounted");
        self.bus.emit(VfsEvent::MountRemoved { path: mount_path });
        Ok(())
    }

    /// All mounts, sorted by path.
    pub async fn list_mounts(&self) -> Vec<MountInfo> {
        self.mounts
            .read()
            .await
            .list()
            .iter()
            .map(|m| MountInfo::from(m.as_ref()))
            .collect()
    }

    /// Resolve a normalized virtual path to its mount and relative path.
    async fn resolve(&self, op: &'static str, vpath: &str) -> VfsResult<(Arc<Mount>, String)> {
        self.mounts
            .read()
            .await
            .resolve(vpath)
            .ok_or_else(|| VfsError::not_found(op, vpath))
    }

    // ------------------------------------------------------------------
    // Primitive operations
    // ------------------------------------------------------------------

    /// Read the entire contents of a file, cache-first.
    pub async fn read_file(&self, p: &str) -> VfsResult<Vec<u8>> {
        let vpath = path::normalize(p);
        if let Some(CacheValue::Content(data)) = self.cache.get(CacheKind::Content, &vpath) {
            return Ok(data);
        }

        let (mount, rel) = self.resolve("read", &vpath).await?;
        let data = mount
            .adapter
            .read(&rel)
            .await
            .map_err(|e| VfsError::from_io("read", &vpath, e))?;

        self.cache.set(
            CacheKind::Content,
            &vpath,
            CacheValue::Content(data.clone()),
            CONTENT_TTL,
        );
        Ok(data)
    }

    /// Write a file, invalidating cached state under the path.
    pub async fn write_file(&self, p: &str, data: &[u8]) -> VfsResult<()> {
        let vpath = path::normalize(p);
        let (mount, rel) = self.resolve("write", &vpath).await?;
        self.check_write_size(&mount, &vpath, data.len() as u64)?;

        mount
            .adapter
            .write(&rel, data)
            .await
            .map_err(|e| VfsError::from_io("write", &vpath, e))?;

        self.cache.invalidate(&vpath);
        self.bus.emit(VfsEvent::FileModified { path: vpath });
        Ok(())
    }

    /// Check a write against the adapter's declared size bound.
    fn check_write_size(&self, mount: &Mount, vpath: &str, len: u64) -> VfsResult<()> {
        if let Some(max) = mount.adapter.capabilities().max_file_size {
            if len > max {
                return Err(VfsError::Unsupported {
                    op: "write",
                    path: vpath.to_string(),
                });
            }
        }
        Ok(())
    }

    /// True when the path resolves and the adapter can stat it.
    ///
    /// Never errors: resolution and adapter failures both mean `false`.
    pub async fn exists(&self, p: &str) -> bool {
        self.stat(p).await.is_ok()
    }

    /// Get metadata for a file or directory, cache-first.
    pub async fn stat(&self, p: &str) -> VfsResult<VfsNode> {
        let vpath = path::normalize(p);
        if let Some(CacheValue::Stat(node)) = self.cache.get(CacheKind::Stat, &vpath) {
            return Ok(node);
        }

        let (mount, rel) = self.resolve("stat", &vpath).await?;
        let mut node = mount
            .adapter
            .stat(&rel)
            .await
            .map_err(|e| VfsError::from_io("stat", &vpath, e))?;
        node.path = vpath.clone();
        node.name = path::file_name(&vpath).to_string();

        self.cache.set(
            CacheKind::Stat,
            &vpath,
            CacheValue::Stat(node.clone()),
            STAT_TTL,
        );
        Ok(node)
    }

    /// List a directory, cache-first. Entry paths are full virtual paths.
    pub async fn read_dir(&self, p: &str) -> VfsResult<Vec<VfsNode>> {
        let vpath = path::normalize(p);
        if let Some(CacheValue::Listing(nodes)) = self.cache.get(CacheKind::Listing, &vpath) {
            return Ok(nodes);
        }

        let (mount, rel) = self.resolve("readdir", &vpath).await?;
        let mut nodes = mount
            .adapter
            .list(&rel)
            .await
            .map_err(|e| VfsError::from_io("readdir", &vpath, e))?;
        for node in &mut nodes {
            node.path = path::join(&vpath, &node.name);
        }

        self.cache.set(
            CacheKind::Listing,
            &vpath,
            CacheValue::Listing(nodes.clone()),
            LISTING_TTL,
        );
        Ok(nodes)
    }

    /// Create a directory.
    ///
    /// With `recursive`, walks the path component by component and creates
    /// each missing ancestor; components that already exist are skipped.
    pub async fn mkdir(&self, p: &str, recursive: bool) -> VfsResult<()> {
        let vpath = path::normalize(p);
        if recursive {
            let components: Vec<String> =
                path::components(&vpath).map(str::to_string).collect();
            let mut current = String::from("/");
            for component in components {
                current = path::join(&current, &component);
                if self.exists(&current).await {
                    continue;
                }
                self.mkdir_single(&current).await?;
            }
            Ok(())
        } else {
            self.mkdir_single(&vpath).await
        }
    }

    async fn mkdir_single(&self, vpath: &str) -> VfsResult<()> {
        let (mount, rel) = self.resolve("mkdir", vpath).await?;
        mount
            .adapter
            .mkdir(&rel)
            .await
            .map_err(|e| VfsError::from_io("mkdir", vpath, e))?;

        self.cache.invalidate(vpath);
        self.bus.emit(VfsEvent::DirectoryCreated {
            path: vpath.to_string(),
        });
        Ok(())
    }

    /// Remove a file or directory.
    ///
    /// With `recursive`, directory contents go depth-first before the
    /// directory itself, walked iteratively with an explicit stack so deep
    /// trees cannot blow the call stack. Non-recursive removal of a
    /// non-empty directory surfaces the adapter's own error.
    pub async fn remove(&self, p: &str, recursive: bool) -> VfsResult<()> {
        let vpath = path::normalize(p);
        let (mount, rel) = self.resolve("remove", &vpath).await?;
        let target = mount
            .adapter
            .stat(&rel)
            .await
            .map_err(|e| VfsError::from_io("remove", &vpath, e))?;

        if recursive && target.is_dir() {
            // Phase 1: collect the subtree top-down.
            let mut stack: Vec<(String, bool)> = vec![(vpath.clone(), true)];
            let mut discovered: Vec<String> = Vec::new();
            while let Some((current, is_dir)) = stack.pop() {
                if is_dir {
                    let (m, r) = self.resolve("remove", &current).await?;
                    let children = m
                        .adapter
                        .list(&r)
                        .await
                        .map_err(|e| VfsError::from_io("readdir", &current, e))?;
                    for child in children {
                        stack.push((path::join(&current, &child.name), child.is_dir()));
                    }
                }
                discovered.push(current);
            }
            // Phase 2: delete bottom-up.
            for current in discovered.iter().rev() {
                let (m, r) = self.resolve("remove", current).await?;
                m.adapter
                    .remove(&r)
                    .await
                    .map_err(|e| VfsError::from_io("remove", current, e))?;
            }
        } else {
            mount
                .adapter
                .remove(&rel)
                .await
                .map_err(|e| VfsError::from_io("remove", &vpath, e))?;
        }

        self.cache.invalidate(&vpath);
        self.bus.emit(if target.is_dir() {
            VfsEvent::DirectoryDeleted { path: vpath }
        } else {
            VfsEvent::FileDeleted { path: vpath }
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Copy / move orchestration
    // ------------------------------------------------------------------

    /// Copy a file, tracked as a [`FileOperation`].
    ///
    /// Source and destination mounts are resolved independently and may
    /// differ. The payload is read whole; byte-accurate streaming progress
    /// is an extension point, not required for correctness.
    pub async fn copy(&self, src: &str, dest: &str) -> VfsResult<FileOperation> {
        let src = path::normalize(src);
        let dest = path::normalize(dest);
        let op = self.begin_operation(OperationKind::Copy, &src, Some(dest.clone()));

        let result = self.copy_payload(op.id, &src, &dest).await;
        self.finish_operation(op, result)
    }

    async fn copy_payload(&self, id: OperationId, src: &str, dest: &str) -> VfsResult<()> {
        self.update_operation(id, FileOperation::mark_running);

        let (src_mount, src_rel) = self.resolve("copy", src).await?;
        let (dest_mount, dest_rel) = self.resolve("copy", dest).await?;

        let data = src_mount
            .adapter
            .read(&src_rel)
            .await
            .map_err(|e| VfsError::from_io("read", src, e))?;
        let total = data.len() as u64;
        self.update_operation(id, |op| op.record_progress(total, total));

        self.check_write_size(&dest_mount, dest, total)?;
        dest_mount
            .adapter
            .write(&dest_rel, &data)
            .await
            .map_err(|e| VfsError::from_io("write", dest, e))?;

        self.cache.invalidate(dest);
        self.bus.emit(VfsEvent::FileModified {
            path: dest.to_string(),
        });
        Ok(())
    }

    /// Move a file, tracked as a [`FileOperation`].
    ///
    /// Within one mount this is the adapter's native rename, atomic as far
    /// as the backend allows. Across mounts it degrades to copy-then-remove,
    /// which is not atomic: a crash between the two steps leaves the file
    /// duplicated, never lost.
    pub async fn move_entry(&self, src: &str, dest: &str) -> VfsResult<FileOperation> {
        let src = path::normalize(src);
        let dest = path::normalize(dest);
        let op = self.begin_operation(OperationKind::Move, &src, Some(dest.clone()));

        let result = self.move_payload(op.id, &src, &dest).await;
        self.finish_operation(op, result)
    }

    async fn move_payload(&self, id: OperationId, src: &str, dest: &str) -> VfsResult<()> {
        self.update_operation(id, FileOperation::mark_running);

        let (src_mount, src_rel) = self.resolve("move", src).await?;
        let (dest_mount, dest_rel) = self.resolve("move", dest).await?;

        if src_mount.id == dest_mount.id {
            src_mount
                .adapter
                .rename(&src_rel, &dest_rel)
                .await
                .map_err(|e| VfsError::from_io("rename", src, e))?;
            self.update_operation(id, |op| op.record_progress(0, 0));
        } else {
            let data = src_mount
                .adapter
                .read(&src_rel)
                .await
                .map_err(|e| VfsError::from_io("read", src, e))?;
            let total = data.len() as u64;
            self.update_operation(id, |op| op.record_progress(total, total));

            self.check_write_size(&dest_mount, dest, total)?;
            dest_mount
                .adapter
                .write(&dest_rel, &data)
                .await
                .map_err(|e| VfsError::from_io("write", dest, e))?;
            src_mount
                .adapter
                .remove(&src_rel)
                .await
                .map_err(|e| VfsError::from_io("remove", src, e))?;
        }

        self.cache.invalidate(src);
        self.cache.invalidate(dest);
        self.bus.emit(VfsEvent::FileRenamed {
            from: src.to_string(),
            to: dest.to_string(),
        });
        Ok(())
    }

    fn begin_operation(
        &self,
        kind: OperationKind,
        source: &str,
        destination: Option<String>,
    ) -> FileOperation {
        let id = OperationId(self.next_operation_id.fetch_add(1, Ordering::Relaxed));
        let op = FileOperation::new(id, kind, source, destination);
        self.bus.emit(VfsEvent::OperationStarted { id });
        self.lock_operations().insert(id, op.clone());
        op
    }

    fn update_operation(&self, id: OperationId, f: impl FnOnce(&mut FileOperation)) {
        if let Some(op) = self.lock_operations().get_mut(&id) {
            f(op);
        }
    }

    /// Settle an operation: the record leaves the live registry whatever
    /// the outcome.
    ///
    /// `started` is the record handed out by [`Self::begin_operation`]; it
    /// stands in if the registry entry has vanished, so the returned record
    /// always carries the real kind and paths.
    fn finish_operation(
        &self,
        started: FileOperation,
        result: VfsResult<()>,
    ) -> VfsResult<FileOperation> {
        let id = started.id;
        let mut record = self.lock_operations().remove(&id).unwrap_or_else(|| {
            tracing::debug!(op = %id, "operation record missing from registry");
            started
        });
        match result {
            Ok(()) => {
                record.mark_completed();
                self.bus.emit(VfsEvent::OperationCompleted { id });
                Ok(record)
            }
            Err(err) => {
                record.mark_failed(err.to_string());
                self.bus.emit(VfsEvent::OperationFailed {
                    id,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Snapshot of operations still in flight.
    pub fn active_operations(&self) -> Vec<FileOperation> {
        let mut ops: Vec<_> = self.lock_operations().values().cloned().collect();
        ops.sort_by_key(|op| op.id);
        ops
    }

    fn lock_operations(&self) -> std::sync::MutexGuard<'_, HashMap<OperationId, FileOperation>> {
        match self.operations.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Allocate an empty pending transaction.
    pub fn create_transaction(&self) -> TransactionId {
        let id = TransactionId(self.next_transaction_id.fetch_add(1, Ordering::Relaxed));
        self.lock_transactions().insert(id, VfsTransaction::new(id));
        id
    }

    /// Queue an operation and its compensating rollback on a pending
    /// transaction.
    pub fn transaction_push(
        &self,
        id: TransactionId,
        op: TxOperation,
        rollback: TxOperation,
    ) -> VfsResult<()> {
        let mut txns = self.lock_transactions();
        let txn = txns
            .get_mut(&id)
            .ok_or(VfsError::TransactionNotFound { id })?;
        txn.push(op, rollback);
        Ok(())
    }

    /// Execute a transaction's operations strictly in order.
    ///
    /// On the first failure the already-executed steps are compensated in
    /// reverse order, the transaction ends in `Error`, and the original
    /// failure is re-raised. A failed rollback step leaves the transaction
    /// terminally broken; that is logged, and the caller reconciles
    /// manually.
    pub async fn commit_transaction(&self, id: TransactionId) -> VfsResult<()> {
        let mut txn = self.take_transaction(id)?;
        txn.status = TransactionStatus::Running;

        let operations = txn.operations.clone();
        for (index, op) in operations.iter().enumerate() {
            if let Err(err) = self.apply_tx_op(op).await {
                if let Err(rollback_err) = self.run_rollback(&mut txn, index).await {
                    tracing::warn!(
                        txn = %id,
                        error = %rollback_err,
                        "rollback failed; manual reconciliation required"
                    );
                }
                txn.status = TransactionStatus::Error;
                txn.completed_at = Some(SystemTime::now());
                return Err(err);
            }
        }

        txn.status = TransactionStatus::Committed;
        txn.completed_at = Some(SystemTime::now());
        Ok(())
    }

    /// Roll back a transaction explicitly, replaying every recorded
    /// compensating operation in reverse order.
    pub async fn rollback_transaction(&self, id: TransactionId) -> VfsResult<()> {
        let mut txn = self.take_transaction(id)?;
        let executed = txn.rollback_operations.len();
        let result = self.run_rollback(&mut txn, executed).await;
        txn.completed_at = Some(SystemTime::now());
        result
    }

    /// Replay the first `executed` rollback entries, last-to-first.
    async fn run_rollback(&self, txn: &mut VfsTransaction, executed: usize) -> VfsResult<()> {
        txn.status = TransactionStatus::RollingBack;
        for op in txn.rollback_operations[..executed].iter().rev() {
            if let Err(err) = self.apply_tx_op(op).await {
                txn.status = TransactionStatus::Error;
                return Err(err);
            }
        }
        txn.status = TransactionStatus::RolledBack;
        Ok(())
    }

    async fn apply_tx_op(&self, op: &TxOperation) -> VfsResult<()> {
        match op {
            TxOperation::Write { path, data } => self.write_file(path, data).await,
            TxOperation::Mkdir { path, recursive } => self.mkdir(path, *recursive).await,
            TxOperation::Remove { path, recursive } => self.remove(path, *recursive).await,
            TxOperation::Copy {
                source,
                destination,
            } => self.copy(source, destination).await.map(drop),
            TxOperation::Move {
                source,
                destination,
            } => self.move_entry(source, destination).await.map(drop),
        }
    }

    /// Remove a transaction from the live registry; it is discarded once
    /// terminal whatever the outcome.
    fn take_transaction(&self, id: TransactionId) -> VfsResult<VfsTransaction> {
        self.lock_transactions()
            .remove(&id)
            .ok_or(VfsError::TransactionNotFound { id })
    }

    fn lock_transactions(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<TransactionId, VfsTransaction>> {
        match self.transactions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // ------------------------------------------------------------------
    // Watchers
    // ------------------------------------------------------------------

    /// Watch a path for changes, invoking `callback` for every event under
    /// it.
    ///
    /// Push-based: the adapter's own notification stream drives the
    /// callback; the manager never polls. Requires the `realtime_watch`
    /// capability.
    pub async fn watch(
        &self,
        p: &str,
        callback: impl Fn(WatchEvent) + Send + Sync + 'static,
    ) -> VfsResult<WatcherId> {
        let vpath = path::normalize(p);
        let (mount, rel) = self.resolve("watch", &vpath).await?;

        if !mount.adapter.capabilities().realtime_watch {
            return Err(VfsError::Unsupported {
                op: "watch",
                path: vpath,
            });
        }

        let mut rx = mount
            .adapter
            .watch()
            .map_err(|e| VfsError::from_io("watch", &vpath, e))?;

        let mount_path = mount.path.clone();
        let watched_rel = rel.clone();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) if path::is_under(&event.path, &watched_rel) => {
                        let full = if event.path == "/" {
                            mount_path.clone()
                        } else if mount_path == "/" {
                            event.path.clone()
                        } else {
                            format!("{mount_path}{}", event.path)
                        };
                        callback(WatchEvent {
                            path: full,
                            kind: event.kind,
                        });
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "watch stream lagged; events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(self.watchers.insert(vpath, mount.path.clone(), task))
    }

    /// Stop a watcher.
    pub fn unwatch(&self, id: WatcherId) -> VfsResult<()> {
        if self.watchers.remove(id) {
            Ok(())
        } else {
            Err(VfsError::WatcherNotFound { id })
        }
    }

    /// Number of active watchers.
    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    /// Best-effort recursive name search.
    ///
    /// Walks one mount (when `base` is given) or every mount, matching
    /// names case-insensitively. Unreadable branches are logged and
    /// skipped; one inaccessible subtree never aborts the query.
    pub async fn search(&self, query: &str, base: Option<&str>) -> VfsResult<Vec<VfsNode>> {
        let needle = query.to_lowercase();
        let mut stack: Vec<String> = match base {
            Some(base) => vec![path::normalize(base)],
            None => self
                .mounts
                .read()
                .await
                .list()
                .iter()
                .map(|m| m.path.clone())
                .collect(),
        };

        let mut results = Vec::new();
        while let Some(dir) = stack.pop() {
            let listing = match self.read_dir(&dir).await {
                Ok(listing) => listing,
                Err(err) => {
                    tracing::warn!(path = %dir, error = %err, "search skipping unreadable branch");
                    continue;
                }
            };
            for node in listing {
                if node.name.to_lowercase().contains(&needle) {
                    results.push(node.clone());
                }
                if node.is_dir() {
                    stack.push(node.path.clone());
                }
            }
        }

        results.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(results)
    }

    // ------------------------------------------------------------------
    // Permissions
    // ------------------------------------------------------------------

    /// Check one access kind against a node's permissions.
    ///
    /// Never errors: unresolvable paths and adapter failures are `false`.
    pub async fn check_permission(&self, p: &str, kind: PermissionKind) -> bool {
        match self.stat(p).await {
            Ok(node) => node.permissions.allows(kind),
            Err(_) => false,
        }
    }

    /// Apply a partial permissions update.
    ///
    /// Requires the adapter's `permissions` capability; checked before
    /// dispatch so unsupported backends fail fast.
    pub async fn set_permissions(&self, p: &str, patch: &PermissionsPatch) -> VfsResult<()> {
        let vpath = path::normalize(p);
        let (mount, rel) = self.resolve("set_permissions", &vpath).await?;

        if !mount.adapter.capabilities().permissions {
            return Err(VfsError::Unsupported {
                op: "set_permissions",
                path: vpath,
            });
        }

        mount
            .adapter
            .set_permissions(&rel, patch)
            .await
            .map_err(|e| VfsError::from_io("set_permissions", &vpath, e))?;

        self.cache.invalidate(&vpath);
        self.bus.emit(VfsEvent::FileModified { path: vpath });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cache surface
    // ------------------------------------------------------------------

    /// Evict cached results under a prefix, or everything.
    pub fn clear_cache(&self, prefix: Option<&str>) {
        match prefix {
            Some(prefix) => self.cache.clear(Some(&path::normalize(prefix))),
            None => self.cache.clear(None),
        }
    }

    /// Cache hit/miss counters and current size.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
