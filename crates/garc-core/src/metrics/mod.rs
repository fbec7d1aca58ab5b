//! Reconcile instrumentation.
//!
//! The reconciler only sees [`ReconcileMetrics`]; the manager injects the
//! Prometheus backend, tests and embedders can pass [`noop_metrics`].
mod backend;
pub use backend::{MetricsHandle, ReconcileMetrics, ReconcileStatus, WriteAction};

use std::sync::Arc;
use std::time::Duration;

use crate::owner::ChildKind;

/// Discards every observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl ReconcileMetrics for NoOpMetrics {
    fn record_reconcile(&self, _status: ReconcileStatus, _elapsed: Duration) {}

    fn record_child_write(&self, _kind: ChildKind, _action: WriteAction) {}
}

pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
