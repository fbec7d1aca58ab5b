use std::sync::Arc;
use std::time::Duration;

use crate::owner::ChildKind;

/// How a reconcile pass ended, for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStatus {
    /// Children match the Runner.
    Converged,
    /// Runner no longer exists.
    Absent,
    /// Write conflict; retried shortly.
    Requeued,
    /// Reconcile failed and goes through error backoff.
    Error,
}

impl ReconcileStatus {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            ReconcileStatus::Converged => "converged",
            ReconcileStatus::Absent => "absent",
            ReconcileStatus::Requeued => "requeued",
            ReconcileStatus::Error => "error",
        }
    }
}

/// Write issued against a child object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Create,
    Update,
    Delete,
}

impl WriteAction {
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            WriteAction::Create => "create",
            WriteAction::Update => "update",
            WriteAction::Delete => "delete",
        }
    }
}

/// Backend metrics collection interface.
pub trait ReconcileMetrics: Send + Sync + 'static {
    /// Record the end of one reconcile pass.
    ///
    /// # Arguments
    /// - `status`: How the pass ended
    /// - `elapsed`: Wall time of the pass
    fn record_reconcile(&self, status: ReconcileStatus, elapsed: Duration);

    /// Record one successful write against a child object.
    fn record_child_write(&self, kind: ChildKind, action: WriteAction);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn ReconcileMetrics>;
