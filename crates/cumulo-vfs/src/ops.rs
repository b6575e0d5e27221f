//! Tracked file operations (copy/move/delete) with progress and status.

use std::time::SystemTime;

use serde::Serialize;

use cumulo_types::OperationId;

/// What a tracked operation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Copy,
    Move,
    Delete,
}

/// Lifecycle of a tracked operation.
///
/// `Running` is instantaneous for whole-payload copies but modeled
/// explicitly so a streaming implementation can report partial progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Running,
    Completed,
    Error,
}

/// A tracked, possibly multi-step action with progress counters.
///
/// Lives in the manager's operation registry only while in flight; the
/// record is removed once it reaches a terminal status, whatever the
/// outcome.
#[derive(Debug, Clone, Serialize)]
pub struct FileOperation {
    pub id: OperationId,
    pub kind: OperationKind,
    pub source: String,
    pub destination: Option<String>,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    pub percent: u8,
    pub status: OperationStatus,
    pub started_at: SystemTime,
    pub finished_at: Option<SystemTime>,
    pub error: Option<String>,
}

impl FileOperation {
    pub fn new(
        id: OperationId,
        kind: OperationKind,
        source: impl Into<String>,
        destination: Option<String>,
    ) -> Self {
        Self {
            id,
            kind,
            source: source.into(),
            destination,
            total_bytes: 0,
            transferred_bytes: 0,
            percent: 0,
            status: OperationStatus::Pending,
            started_at: SystemTime::now(),
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = OperationStatus::Running;
    }

    /// Record transferred bytes and recompute the percentage.
    pub fn record_progress(&mut self, transferred: u64, total: u64) {
        self.total_bytes = total;
        self.transferred_bytes = transferred;
        self.percent = if total == 0 {
            100
        } else {
            ((transferred.saturating_mul(100)) / total).min(100) as u8
        };
    }

    pub fn mark_completed(&mut self) {
        self.status = OperationStatus::Completed;
        self.percent = 100;
        self.finished_at = Some(SystemTime::now());
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = OperationStatus::Error;
        self.error = Some(message.into());
        self.finished_at = Some(SystemTime::now());
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            OperationStatus::Completed | OperationStatus::Error
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_percentage() {
        let mut op = FileOperation::new(OperationId(1), OperationKind::Copy, "/a", None);
        op.record_progress(50, 200);
        assert_eq!(op.percent, 25);

        op.record_progress(200, 200);
        assert_eq!(op.percent, 100);
    }

    #[test]
    fn zero_byte_payload_is_complete() {
        let mut op = FileOperation::new(OperationId(1), OperationKind::Copy, "/a", None);
        op.record_progress(0, 0);
        assert_eq!(op.percent, 100);
    }

    #[test]
    fn lifecycle_transitions() {
        let mut op = FileOperation::new(
            OperationId(2),
            OperationKind::Move,
            "/a",
            Some("/b".to_string()),
        );
        assert_eq!(op.status, OperationStatus::Pending);
        assert!(!op.is_terminal());

        op.mark_running();
        assert_eq!(op.status, OperationStatus::Running);

        op.mark_completed();
        assert!(op.is_terminal());
        assert!(op.finished_at.is_some());
    }

    #[test]
    fn failure_captures_message() {
        let mut op = FileOperation::new(OperationId(3), OperationKind::Delete, "/a", None);
        op.mark_failed("adapter I/O failed");
        assert_eq!(op.status, OperationStatus::Error);
        assert_eq!(op.error.as_deref(), Some("adapter I/O failed"));
    }
}
