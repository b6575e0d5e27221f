//! Transaction types: ordered operations plus compensating rollbacks.
//!
//! A transaction guarantees *ordering* and *compensation*, not isolation:
//! concurrent external writers can still interleave. Cross-adapter
//! transactions are best-effort by design — there is no two-phase commit.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use cumulo_types::TransactionId;

/// One replayable step in a transaction, or its compensating inverse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TxOperation {
    Write { path: String, data: Vec<u8> },
    Mkdir { path: String, recursive: bool },
    Remove { path: String, recursive: bool },
    Copy { source: String, destination: String },
    Move { source: String, destination: String },
}

/// Transaction lifecycle.
///
/// `pending → running → committed`, or
/// `running → rolling back → rolledback | error`. `Error` after a failed
/// rollback step is terminal and unrecoverable; the caller reconciles
/// manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Running,
    Committed,
    RollingBack,
    RolledBack,
    Error,
}

/// An ordered batch of operations with recorded compensating actions.
#[derive(Debug, Clone)]
pub struct VfsTransaction {
    pub id: TransactionId,
    /// Executed first-to-last on commit.
    pub operations: Vec<TxOperation>,
    /// Replayed last-to-first on rollback.
    pub rollback_operations: Vec<TxOperation>,
    pub status: TransactionStatus,
    pub created_at: SystemTime,
    pub completed_at: Option<SystemTime>,
}

impl VfsTransaction {
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            operations: Vec::new(),
            rollback_operations: Vec::new(),
            status: TransactionStatus::Pending,
            created_at: SystemTime::now(),
            completed_at: None,
        }
    }

    /// Queue an operation together with its compensating inverse.
    pub fn push(&mut self, op: TxOperation, rollback: TxOperation) {
        self.operations.push(op);
        self.rollback_operations.push(rollback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transaction_is_pending_and_empty() {
        let txn = VfsTransaction::new(TransactionId(1));
        assert_eq!(txn.status, TransactionStatus::Pending);
        assert!(txn.operations.is_empty());
        assert!(txn.rollback_operations.is_empty());
    }

    #[test]
    fn push_keeps_op_and_rollback_paired() {
        let mut txn = VfsTransaction::new(TransactionId(1));
        txn.push(
            TxOperation::Write {
                path: "/a".to_string(),
                data: b"new".to_vec(),
            },
            TxOperation::Remove {
                path: "/a".to_string(),
                recursive: false,
            },
        );
        assert_eq!(txn.operations.len(), 1);
        assert_eq!(txn.rollback_operations.len(), 1);
    }
}
