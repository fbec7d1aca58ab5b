//! One reconcile pass for one Runner.
//!
//! Each pass is a pure function of the cluster state it reads: it fetches the
//! Runner, deletes stale children, then converges the config map and the
//! deployment. A Runner that already matches its children produces no writes.
use std::sync::Arc;
use std::time::{Duration, Instant};

use k8s_openapi::api::{apps::v1::Deployment, core::v1::ConfigMap};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use tracing::{debug, info, instrument};

use garc_model::{Runner, deployment_name, workspace_name};

use crate::client::{ClusterClient, EventReason, RunnerEvent};
use crate::desired::DesiredState;
use crate::error::ReconcileError;
use crate::metrics::{MetricsHandle, ReconcileStatus, WriteAction};
use crate::owner::{ChildKind, owner_reference, relation_of};
use crate::settings::ControllerSettings;

/// Delay before retrying a deployment update that lost a write race.
pub const CONFLICT_REQUEUE: Duration = Duration::from_secs(1);

/// Result of a successful reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The Runner does not exist; nothing to do.
    Absent,
    /// Children match the Runner.
    Converged,
    /// Try again after the given delay.
    RetryAfter(Duration),
}

pub struct Reconciler {
    client: Arc<dyn ClusterClient>,
    settings: Arc<ControllerSettings>,
    metrics: MetricsHandle,
}

impl Reconciler {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        settings: Arc<ControllerSettings>,
        metrics: MetricsHandle,
    ) -> Self {
        Self {
            client,
            settings,
            metrics,
        }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    #[instrument(skip(self))]
    pub async fn reconcile(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let started = Instant::now();
        let result = self.converge(namespace, name).await;

        let status = match &result {
            Ok(ReconcileOutcome::Absent) => ReconcileStatus::Absent,
            Ok(ReconcileOutcome::Converged) => ReconcileStatus::Converged,
            Ok(ReconcileOutcome::RetryAfter(_)) => ReconcileStatus::Requeued,
            Err(_) => ReconcileStatus::Error,
        };
        self.metrics.record_reconcile(status, started.elapsed());
        result
    }

    async fn converge(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(runner) = self.client.get_runner(namespace, name).await? else {
            debug!("runner not found");
            return Ok(ReconcileOutcome::Absent);
        };

        let desired = DesiredState::build(&runner, &self.settings)?;
        let owner = owner_reference(&runner)?;

        self.cleanup(&runner, namespace, name).await?;
        self.sync_config_map(&runner, desired.config_map, &owner)
            .await?;

        match self
            .sync_deployment(&runner, desired.deployment, &owner)
            .await
        {
            Err(e) if e.is_conflict() => {
                info!(error = %e, "deployment update conflicted; requeueing");
                Ok(ReconcileOutcome::RetryAfter(CONFLICT_REQUEUE))
            }
            Err(e) => Err(e),
            Ok(()) => Ok(ReconcileOutcome::Converged),
        }
    }

    /// Deletes every child controlled by this Runner whose name is not the
    /// expected one.
    async fn cleanup(
        &self,
        runner: &Runner,
        namespace: &str,
        name: &str,
    ) -> Result<(), ReconcileError> {
        let keep = workspace_name(name);
        let stale: Vec<String> = self
            .client
            .list_config_maps(namespace)
            .await?
            .into_iter()
            .filter(|cm| is_stale(ChildKind::ConfigMap, &cm.metadata, name, &keep))
            .filter_map(|cm| cm.metadata.name)
            .collect();
        for child in stale {
            self.client
                .delete_config_map(namespace, &child)
                .await
                .map_err(ReconcileError::child("delete", ChildKind::ConfigMap, &child))?;
            self.written(runner, EventReason::SuccessfulDeleted, ChildKind::ConfigMap, child)
                .await;
        }

        let keep = deployment_name(name);
        let stale: Vec<String> = self
            .client
            .list_deployments(namespace)
            .await?
            .into_iter()
            .filter(|d| is_stale(ChildKind::Deployment, &d.metadata, name, &keep))
            .filter_map(|d| d.metadata.name)
            .collect();
        for child in stale {
            self.client
                .delete_deployment(namespace, &child)
                .await
                .map_err(ReconcileError::child("delete", ChildKind::Deployment, &child))?;
            self.written(runner, EventReason::SuccessfulDeleted, ChildKind::Deployment, child)
                .await;
        }
        Ok(())
    }

    async fn sync_config_map(
        &self,
        runner: &Runner,
        mut desired: ConfigMap,
        owner: &OwnerReference,
    ) -> Result<(), ReconcileError> {
        let namespace = desired.metadata.namespace.clone().unwrap_or_default();
        let child = desired.metadata.name.clone().unwrap_or_default();

        match self.client.get_config_map(&namespace, &child).await? {
            None => {
                desired.metadata.owner_references = Some(vec![owner.clone()]);
                self.client
                    .create_config_map(&desired)
                    .await
                    .map_err(ReconcileError::child("create", ChildKind::ConfigMap, &child))?;
                self.written(runner, EventReason::SuccessfulCreated, ChildKind::ConfigMap, child)
                    .await;
            }
            Some(mut current) => {
                if current.data == desired.data && current.binary_data == desired.binary_data {
                    debug!(child = %child, "config map up to date");
                    return Ok(());
                }
                current.data = desired.data;
                current.binary_data = desired.binary_data;
                self.client
                    .replace_config_map(&current)
                    .await
                    .map_err(ReconcileError::child("update", ChildKind::ConfigMap, &child))?;
                self.written(runner, EventReason::SuccessfulUpdated, ChildKind::ConfigMap, child)
                    .await;
            }
        }
        Ok(())
    }

    async fn sync_deployment(
        &self,
        runner: &Runner,
        mut desired: Deployment,
        owner: &OwnerReference,
    ) -> Result<(), ReconcileError> {
        let namespace = desired.metadata.namespace.clone().unwrap_or_default();
        let child = desired.metadata.name.clone().unwrap_or_default();

        match self.client.get_deployment(&namespace, &child).await? {
            None => {
                desired.metadata.owner_references = Some(vec![owner.clone()]);
                self.client
                    .create_deployment(&desired)
                    .await
                    .map_err(ReconcileError::child("create", ChildKind::Deployment, &child))?;
                self.written(runner, EventReason::SuccessfulCreated, ChildKind::Deployment, child)
                    .await;
            }
            Some(mut current) => {
                let Some(wanted) = desired.spec else {
                    return Ok(());
                };
                match current.spec.as_mut() {
                    Some(spec) if spec.template == wanted.template => {
                        debug!(child = %child, "deployment up to date");
                        return Ok(());
                    }
                    Some(spec) => spec.template = wanted.template,
                    None => current.spec = Some(wanted),
                }
                self.client
                    .replace_deployment(&current)
                    .await
                    .map_err(ReconcileError::child("update", ChildKind::Deployment, &child))?;
                self.written(runner, EventReason::SuccessfulUpdated, ChildKind::Deployment, child)
                    .await;
            }
        }
        Ok(())
    }

    async fn written(&self, runner: &Runner, reason: EventReason, kind: ChildKind, child: String) {
        let action = match reason {
            EventReason::SuccessfulCreated => WriteAction::Create,
            EventReason::SuccessfulUpdated => WriteAction::Update,
            EventReason::SuccessfulDeleted => WriteAction::Delete,
        };
        info!(kind = %kind, child = %child, action = action.as_label(), "child written");
        self.metrics.record_child_write(kind, action);
        self.client
            .publish_event(runner, RunnerEvent::new(reason, kind, child))
            .await;
    }
}

fn is_stale(kind: ChildKind, meta: &ObjectMeta, runner: &str, keep: &str) -> bool {
    let owned = relation_of(kind, meta).is_some_and(|rel| rel.is_owned_by_runner(runner));
    owned && meta.name.as_deref() != Some(keep)
}
