//! Newtyped ids for VFS bookkeeping.
//!
//! Ids are plain `u64` wrappers; the owning registry allocates them from an
//! atomic counter. They exist so a `TransactionId` can never be passed where
//! an `OperationId` is expected.

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Identifies a mount in the mount table.
    MountId,
    "mount"
);
id_type!(
    /// Identifies a tracked file operation (copy/move/delete).
    OperationId,
    "op"
);
id_type!(
    /// Identifies a transaction in the coordinator.
    TransactionId,
    "txn"
);
id_type!(
    /// Identifies a registered watcher.
    WatcherId,
    "watch"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_prefix() {
        assert_eq!(MountId(3).to_string(), "mount-3");
        assert_eq!(OperationId(1).to_string(), "op-1");
        assert_eq!(TransactionId(7).to_string(), "txn-7");
        assert_eq!(WatcherId(0).to_string(), "watch-0");
    }
}
