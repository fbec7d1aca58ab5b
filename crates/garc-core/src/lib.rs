pub mod backoff;
pub mod client;
pub mod desired;
pub mod error;
pub mod leader;
pub mod metrics;
pub mod owner;
pub mod reconcile;
pub mod settings;

pub use reconcile::{CONFLICT_REQUEUE, ReconcileOutcome, Reconciler};

pub mod prelude {
    pub use crate::backoff::ErrorBackoff;
    pub use crate::client::{ClientError, ClusterClient, KubeClusterClient};
    pub use crate::error::ReconcileError;
    pub use crate::metrics::{MetricsHandle, ReconcileMetrics, noop_metrics};
    pub use crate::owner::{ChildKind, runner_ref_of};
    pub use crate::reconcile::{ReconcileOutcome, Reconciler};
    pub use crate::settings::ControllerSettings;
}
