//! Cluster access seam used by the reconciler.
//!
//! [`ClusterClient`] is constructed once in the manager and handed to the
//! reconciler; tests substitute an in-memory implementation.
mod kubernetes;
pub use kubernetes::KubeClusterClient;

#[cfg(test)]
pub(crate) mod fake;

use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::ConfigMap};
use thiserror::Error;

use garc_model::Runner;

use crate::owner::ChildKind;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The write raced another writer (HTTP 409).
    #[error("conflict writing {kind} {name}")]
    Conflict { kind: ChildKind, name: String },

    #[error("api error {code}: {message}")]
    Api { code: u16, message: String },

    #[error("client error: {0}")]
    Other(String),
}

impl ClientError {
    #[inline]
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Conflict { .. })
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Reason recorded on a Normal event attached to the Runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventReason {
    SuccessfulCreated,
    SuccessfulUpdated,
    SuccessfulDeleted,
}

impl EventReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventReason::SuccessfulCreated => "SuccessfulCreated",
            EventReason::SuccessfulUpdated => "SuccessfulUpdated",
            EventReason::SuccessfulDeleted => "SuccessfulDeleted",
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            EventReason::SuccessfulCreated => "Created",
            EventReason::SuccessfulUpdated => "Updated",
            EventReason::SuccessfulDeleted => "Deleted",
        }
    }
}

impl fmt::Display for EventReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle event about one child of a Runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerEvent {
    pub reason: EventReason,
    pub kind: ChildKind,
    pub child: String,
}

impl RunnerEvent {
    pub fn new(reason: EventReason, kind: ChildKind, child: impl Into<String>) -> Self {
        Self {
            reason,
            kind,
            child: child.into(),
        }
    }

    /// Human-readable note, e.g. `Created deployment: "x-runner"`.
    pub fn note(&self) -> String {
        let what = match self.kind {
            ChildKind::ConfigMap => "config map",
            ChildKind::Deployment => "deployment",
        };
        format!("{} {what}: {:?}", self.reason.verb(), self.child)
    }
}

/// Typed operations the reconciler performs against the cluster.
///
/// Reads return `Ok(None)` for a missing object. Writes take fully built
/// objects; namespace and name come from their metadata.
#[async_trait]
pub trait ClusterClient: Send + Sync + 'static {
    async fn get_runner(&self, namespace: &str, name: &str) -> ClientResult<Option<Runner>>;

    async fn get_config_map(&self, namespace: &str, name: &str)
    -> ClientResult<Option<ConfigMap>>;
    async fn list_config_maps(&self, namespace: &str) -> ClientResult<Vec<ConfigMap>>;
    async fn create_config_map(&self, cm: &ConfigMap) -> ClientResult<ConfigMap>;
    async fn replace_config_map(&self, cm: &ConfigMap) -> ClientResult<ConfigMap>;
    async fn delete_config_map(&self, namespace: &str, name: &str) -> ClientResult<()>;

    async fn get_deployment(&self, namespace: &str, name: &str)
    -> ClientResult<Option<Deployment>>;
    async fn list_deployments(&self, namespace: &str) -> ClientResult<Vec<Deployment>>;
    async fn create_deployment(&self, d: &Deployment) -> ClientResult<Deployment>;
    async fn replace_deployment(&self, d: &Deployment) -> ClientResult<Deployment>;
    async fn delete_deployment(&self, namespace: &str, name: &str) -> ClientResult<()>;

    /// Best-effort: failures are logged by the implementation, never returned.
    async fn publish_event(&self, runner: &Runner, event: RunnerEvent);
}
