use std::sync::Arc;
use std::time::Duration;

use prometheus::{
    CounterVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder, proto::MetricFamily,
};

use garc_core::metrics::{ReconcileMetrics, ReconcileStatus, WriteAction};
use garc_core::owner::ChildKind;

/// Prometheus metrics backend for the controller.
///
/// ## Metrics
/// - `garc_reconcile_total{outcome}` - Counter of finished reconcile passes
/// - `garc_reconcile_duration_seconds{outcome}` - Histogram of reconcile wall time
/// - `garc_child_writes_total{kind, action}` - Counter of writes against child objects
///
/// ## Label cardinality
/// All labels are bounded:
/// - `outcome`: "converged", "absent", "requeued", "error"
/// - `kind`: "configmap", "deployment"
/// - `action`: "create", "update", "delete"
#[derive(Clone)]
pub struct PrometheusMetrics {
    reconciles: CounterVec,
    reconcile_duration: HistogramVec,
    child_writes: CounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create a new prometheus metrics backend with custom registry.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let reconciles = CounterVec::new(
            Opts::new("reconcile_total", "Total number of finished reconcile passes")
                .namespace("garc"),
            &["outcome"],
        )?;
        registry.register(Box::new(reconciles.clone()))?;

        let reconcile_duration = HistogramVec::new(
            HistogramOpts::new(
                "reconcile_duration_seconds",
                "Reconcile pass duration in seconds",
            )
            .namespace("garc")
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(reconcile_duration.clone()))?;

        let child_writes = CounterVec::new(
            Opts::new("child_writes_total", "Total writes against child objects")
                .namespace("garc"),
            &["kind", "action"],
        )?;
        registry.register(Box::new(child_writes.clone()))?;

        Ok(Self {
            reconciles,
            reconcile_duration,
            child_writes,
            registry,
        })
    }

    /// Create a new prometheus metrics backend with default registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Gather all metrics for exposition.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render all metrics in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.gather())
    }
}

impl ReconcileMetrics for PrometheusMetrics {
    fn record_reconcile(&self, status: ReconcileStatus, elapsed: Duration) {
        self.reconciles
            .with_label_values(&[status.as_label()])
            .inc();
        self.reconcile_duration
            .with_label_values(&[status.as_label()])
            .observe(elapsed.as_secs_f64());
    }

    fn record_child_write(&self, kind: ChildKind, action: WriteAction) {
        self.child_writes
            .with_label_values(&[kind.as_label(), action.as_label()])
            .inc();
    }
}
