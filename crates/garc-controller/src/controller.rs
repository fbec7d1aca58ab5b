//! Watch loop driving the [`Reconciler`] for every Runner.
//!
//! Runners are watched directly; ConfigMaps and Deployments are mapped back to
//! the Runner that controls them, so edits to a child trigger a reconcile of
//! its owner.
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::ConfigMap};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::{Api, Client, ResourceExt};
use tracing::{debug, warn};

use garc_core::prelude::*;
use garc_model::Runner;

/// State shared by every reconcile.
pub struct Context {
    pub reconciler: Reconciler,
    pub backoff: ErrorBackoff,
    pub resync: Duration,
}

fn key_of(runner: &Runner) -> String {
    format!("{}/{}", runner.namespace().unwrap_or_default(), runner.name_any())
}

/// Maps a reconcile outcome to the controller's next action.
pub fn action_for(outcome: ReconcileOutcome, resync: Duration) -> Action {
    match outcome {
        ReconcileOutcome::Absent => Action::await_change(),
        ReconcileOutcome::Converged => Action::requeue(resync),
        ReconcileOutcome::RetryAfter(delay) => Action::requeue(delay),
    }
}

async fn reconcile(runner: Arc<Runner>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let namespace = runner.namespace().unwrap_or_default();
    let name = runner.name_any();
    let outcome = ctx.reconciler.reconcile(&namespace, &name).await?;
    if !matches!(outcome, ReconcileOutcome::RetryAfter(_)) {
        ctx.backoff.reset(&key_of(&runner));
    }
    Ok(action_for(outcome, ctx.resync))
}

fn error_policy(runner: Arc<Runner>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
    let key = key_of(&runner);
    let delay = ctx.backoff.next_delay(&key);
    warn!(runner = %key, error = %err, retry_in = ?delay, "reconcile failed");
    Action::requeue(delay)
}

/// Runs the control loop until SIGTERM or SIGINT.
pub async fn run(client: Client, ctx: Arc<Context>) {
    let runners = Api::<Runner>::all(client.clone());
    let config_maps = Api::<ConfigMap>::all(client.clone());
    let deployments = Api::<Deployment>::all(client);

    Controller::new(runners, watcher::Config::default())
        .watches(config_maps, watcher::Config::default(), |cm| {
            runner_ref_of(ChildKind::ConfigMap, &cm)
        })
        .watches(deployments, watcher::Config::default(), |d| {
            runner_ref_of(ChildKind::Deployment, &d)
        })
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, action)) => debug!(runner = %obj, ?action, "reconciled"),
                Err(e) => debug!(error = %e, "reconcile loop error"),
            }
        })
        .await;
}
