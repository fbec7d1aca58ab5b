use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use garc_core::settings::ControllerSettings;

/// Controller manager for `Runner` resources.
#[derive(Parser, Debug, Clone)]
#[command(name = "manager", version, about)]
pub struct Cli {
    /// The address the metric endpoint binds to.
    #[arg(long, env = "GARC_METRICS_ADDR", default_value = "0.0.0.0:8080")]
    pub metrics_addr: SocketAddr,

    /// The address the probe endpoint binds to.
    #[arg(long, env = "GARC_HEALTH_PROBE_BIND_ADDRESS", default_value = "0.0.0.0:8081")]
    pub health_probe_bind_address: SocketAddr,

    /// Run the control loop only while holding the leader lease.
    #[arg(long, env = "GARC_ENABLE_LEADER_ELECTION")]
    pub enable_leader_election: bool,

    #[arg(long, env = "GARC_LEADER_ELECTION_NAMESPACE", default_value = "default")]
    pub leader_election_namespace: String,

    /// Registry the builder pushes runner images to.
    #[arg(long, env = "GARC_PUSH_REGISTRY_HOST", default_value = "ghcr.io/kaidotdev/github-actions-runner-controller")]
    pub push_registry_host: String,

    /// Registry runner pods pull their image from.
    #[arg(long, env = "GARC_PULL_REGISTRY_HOST", default_value = "ghcr.io/kaidotdev/github-actions-runner-controller")]
    pub pull_registry_host: String,

    /// Add the prometheus exporter sidecar to runner pods.
    #[arg(long, env = "GARC_ENABLE_RUNNER_METRICS")]
    pub enable_runner_metrics: bool,

    #[arg(long, env = "GARC_EXPORTER_IMAGE", default_value = "ghcr.io/kaidotdev/github-actions-exporter/github-actions-exporter:v0.1.1")]
    pub exporter_image: String,

    #[arg(long, env = "GARC_KANIKO_IMAGE", default_value = "gcr.io/kaniko-project/executor:v1.23.0")]
    pub kaniko_image: String,

    /// Version of the runner agent binary baked into runner images.
    #[arg(long, env = "GARC_BINARY_VERSION", default_value = "0.4.1")]
    pub binary_version: String,

    /// Version of the GitHub Actions runner distribution.
    #[arg(long, env = "GARC_RUNNER_VERSION", default_value = "2.321.0")]
    pub runner_version: String,

    /// Keep runners from updating themselves.
    #[arg(long, env = "GARC_DISABLEUPDATE")]
    pub disableupdate: bool,

    /// Requeue interval for converged Runners.
    #[arg(long, env = "GARC_RESYNC_PERIOD_SECS", default_value_t = 36_000)]
    pub resync_period_secs: u64,

    #[arg(long, env = "GARC_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "GARC_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Print the Runner CRD as YAML and exit.
    #[arg(long)]
    pub print_crd: bool,
}

impl Cli {
    pub fn settings(&self) -> ControllerSettings {
        ControllerSettings {
            push_registry_host: self.push_registry_host.clone(),
            pull_registry_host: self.pull_registry_host.clone(),
            enable_runner_metrics: self.enable_runner_metrics,
            exporter_image: self.exporter_image.clone(),
            kaniko_image: self.kaniko_image.clone(),
            binary_version: self.binary_version.clone(),
            runner_version: self.runner_version.clone(),
            disable_update: self.disableupdate,
            ..ControllerSettings::default()
        }
    }

    pub fn resync_period(&self) -> Duration {
        Duration::from_secs(self.resync_period_secs)
    }
}
