use serde::{Deserialize, Serialize};

/// Controller-wide inputs to the desired-state builder.
///
/// Constructed once at startup from command-line flags and shared by every
/// reconcile; two reconciles with the same settings and the same Runner always
/// build the same children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControllerSettings {
    /// Registry prefix the builder pushes the runner image to.
    pub push_registry_host: String,
    /// Registry prefix the runner container pulls its image from.
    pub pull_registry_host: String,
    /// Add the metrics exporter sidecar to every runner pod.
    pub enable_runner_metrics: bool,
    /// Image of the metrics exporter sidecar.
    pub exporter_image: String,
    /// Image of the layer-caching image builder.
    pub kaniko_image: String,
    /// Version of the runner agent binary baked into the image.
    pub binary_version: String,
    /// Version of the GitHub Actions runner distribution.
    pub runner_version: String,
    /// Pass `--disableupdate` to the runner so it never self-updates.
    pub disable_update: bool,
    /// Release download prefix of the runner agent binary.
    pub binary_release_base: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            push_registry_host: "ghcr.io/kaidotdev/github-actions-runner-controller".into(),
            pull_registry_host: "ghcr.io/kaidotdev/github-actions-runner-controller".into(),
            enable_runner_metrics: false,
            exporter_image:
                "ghcr.io/kaidotdev/github-actions-exporter/github-actions-exporter:v0.1.1".into(),
            kaniko_image: "gcr.io/kaniko-project/executor:v1.23.0".into(),
            binary_version: "0.4.1".into(),
            runner_version: "2.321.0".into(),
            disable_update: false,
            binary_release_base:
                "https://github.com/kaidotdev/github-actions-runner-controller/releases/download"
                    .into(),
        }
    }
}
