//! Lease-based leader election.
//!
//! Only the holder of the `coordination.k8s.io/v1` Lease runs the control loop.
//! A candidate takes the lease when it is free or expired, renews it every
//! retry period, and steps down when it cannot renew within the renew
//! deadline.
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{MicroTime, ObjectMeta};
use kube::{Api, Client, api::PostParams};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default lease name.
pub const LEASE_NAME: &str = "github-actions-runner-controller";

#[derive(Debug, Error)]
pub enum LeaderError {
    #[error("lost leadership: lease not renewed within {0:?}")]
    Lost(Duration),

    #[error("lease api error: {0}")]
    Api(#[from] kube::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseConfig {
    pub name: String,
    pub namespace: String,
    pub identity: String,
    pub lease_duration: Duration,
    pub renew_deadline: Duration,
    pub retry_period: Duration,
}

impl LeaseConfig {
    pub fn new(namespace: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            name: LEASE_NAME.into(),
            namespace: namespace.into(),
            identity: identity.into(),
            lease_duration: Duration::from_secs(15),
            renew_deadline: Duration::from_secs(10),
            retry_period: Duration::from_secs(2),
        }
    }
}

/// What a candidate may do with the lease as currently observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseDecision {
    /// Take over a free or expired lease.
    Acquire,
    /// Already held by us; refresh the renew time.
    Renew,
    /// Held by someone else and still valid.
    Wait,
}

/// Decides from the observed lease spec. Pure; `now` is injected.
pub fn decide(
    spec: Option<&LeaseSpec>,
    identity: &str,
    now: DateTime<Utc>,
    default_duration: Duration,
) -> LeaseDecision {
    let Some(spec) = spec else {
        return LeaseDecision::Acquire;
    };
    match spec.holder_identity.as_deref() {
        None | Some("") => return LeaseDecision::Acquire,
        Some(holder) if holder == identity => return LeaseDecision::Renew,
        Some(_) => {}
    }

    let duration = spec
        .lease_duration_seconds
        .and_then(|s| u64::try_from(s).ok())
        .map(Duration::from_secs)
        .unwrap_or(default_duration);
    let Some(MicroTime(renewed)) = spec.renew_time.as_ref().or(spec.acquire_time.as_ref()) else {
        return LeaseDecision::Acquire;
    };
    let expires = chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| renewed.checked_add_signed(d));
    match expires {
        Some(at) if at > now => LeaseDecision::Wait,
        _ => LeaseDecision::Acquire,
    }
}

/// Builds the spec written when acquiring or renewing.
pub fn next_spec(
    current: Option<&LeaseSpec>,
    decision: LeaseDecision,
    config: &LeaseConfig,
    now: DateTime<Utc>,
) -> LeaseSpec {
    let mut spec = current.cloned().unwrap_or_default();
    let duration = i32::try_from(config.lease_duration.as_secs()).unwrap_or(i32::MAX);
    if decision == LeaseDecision::Acquire {
        let taking_over = spec
            .holder_identity
            .as_deref()
            .is_some_and(|h| !h.is_empty() && h != config.identity);
        if taking_over {
            spec.lease_transitions = Some(spec.lease_transitions.unwrap_or(0) + 1);
        }
        spec.acquire_time = Some(MicroTime(now));
    }
    spec.holder_identity = Some(config.identity.clone());
    spec.lease_duration_seconds = Some(duration);
    spec.renew_time = Some(MicroTime(now));
    spec
}

pub struct LeaderElector {
    api: Api<Lease>,
    config: LeaseConfig,
}

impl LeaderElector {
    pub fn new(client: Client, config: LeaseConfig) -> Self {
        Self {
            api: Api::namespaced(client, &config.namespace),
            config,
        }
    }

    /// Waits for leadership, then drives `leading` while renewing the lease.
    ///
    /// Returns when `leading` completes, or with [`LeaderError::Lost`] when the
    /// lease could not be renewed in time.
    pub async fn run<F>(&self, leading: F) -> Result<F::Output, LeaderError>
    where
        F: Future,
    {
        self.acquire().await;
        info!(identity = %self.config.identity, lease = %self.config.name, "became leader");

        tokio::select! {
            out = leading => Ok(out),
            err = self.hold() => Err(err),
        }
    }

    async fn acquire(&self) {
        loop {
            match self.try_step().await {
                Ok(true) => return,
                Ok(false) => debug!(lease = %self.config.name, "lease held elsewhere"),
                Err(e) => warn!(error = %e, "lease acquisition attempt failed"),
            }
            tokio::time::sleep(self.config.retry_period).await;
        }
    }

    async fn hold(&self) -> LeaderError {
        let mut last_renew = tokio::time::Instant::now();
        loop {
            tokio::time::sleep(self.config.retry_period).await;
            match self.try_step().await {
                Ok(true) => last_renew = tokio::time::Instant::now(),
                Ok(false) => return LeaderError::Lost(self.config.renew_deadline),
                Err(e) => warn!(error = %e, "lease renewal failed"),
            }
            if last_renew.elapsed() > self.config.renew_deadline {
                return LeaderError::Lost(self.config.renew_deadline);
            }
        }
    }

    /// One acquire-or-renew attempt; `Ok(true)` when we hold the lease afterwards.
    async fn try_step(&self) -> Result<bool, kube::Error> {
        let now = Utc::now();
        let current = self.api.get_opt(&self.config.name).await?;
        let spec = current.as_ref().and_then(|l| l.spec.as_ref());

        let decision = decide(spec, &self.config.identity, now, self.config.lease_duration);
        if decision == LeaseDecision::Wait {
            return Ok(false);
        }
        let next = next_spec(spec, decision, &self.config, now);

        let written = match current {
            Some(mut lease) => {
                lease.spec = Some(next);
                self.api
                    .replace(&self.config.name, &PostParams::default(), &lease)
                    .await
            }
            None => {
                let lease = Lease {
                    metadata: ObjectMeta {
                        name: Some(self.config.name.clone()),
                        namespace: Some(self.config.namespace.clone()),
                        ..Default::default()
                    },
                    spec: Some(next),
                };
                self.api.create(&PostParams::default(), &lease).await
            }
        };
        match written {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(false),
            Err(e) => Err(e),
        }
    }
}
