//! `Runner` custom resource.
//!
//! A Runner describes one self-hosted GitHub Actions runner workload: the base image to
//! build it from, the repository to register against and the credentials to use.
use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    EnvFromSource, EnvVar, ResourceRequirements, SecretEnvSource, SecretKeySelector, Volume,
    VolumeMount,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of a self-hosted runner.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "garc.kaidotdev.github.io",
    version = "v1",
    kind = "Runner",
    plural = "runners",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct RunnerSpec {
    /// Base image the runner image is built `FROM`.
    pub image: String,

    /// Repository the runner registers against, as `owner/name`.
    pub repository: String,

    /// Secret key holding a static GitHub token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_secret_key_ref: Option<SecretKeySelector>,

    /// Secret holding `github_app_id`, `github_app_installation_id` and `github_app_private_key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_secret_ref: Option<SecretEnvSource>,

    /// Overrides for the image builder init container.
    #[serde(default)]
    pub builder_container_spec: ContainerOverrides,

    /// Overrides for the runner container.
    #[serde(default)]
    pub runner_container_spec: ContainerOverrides,

    /// Pod template fragment merged into the generated pod.
    #[serde(default)]
    pub template: PodTemplateFragment,
}

/// User-controlled parts of a generated container.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContainerOverrides {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_from: Vec<EnvFromSource>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

/// Partial pod template: only the fields the controller merges.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PodTemplateFragment {
    #[serde(default)]
    pub metadata: FragmentMetadata,

    #[serde(default)]
    pub spec: FragmentPodSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FragmentMetadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FragmentPodSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

/// How the runner container authenticates against GitHub.
///
/// Exactly one variant is ever selected, so exactly one set of credential
/// flags ends up on the container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Credentials<'a> {
    /// GitHub App credentials loaded from a whole secret.
    App(&'a SecretEnvSource),
    /// Static token loaded from a single secret key.
    Token(&'a SecretKeySelector),
    /// No credentials configured; the agent falls back to its own defaults.
    None,
}

impl RunnerSpec {
    /// Select the credential source.
    ///
    /// App credentials take precedence when both sources are set.
    pub fn credentials(&self) -> Credentials<'_> {
        match (&self.app_secret_ref, &self.token_secret_key_ref) {
            (Some(app), _) => Credentials::App(app),
            (None, Some(token)) => Credentials::Token(token),
            (None, None) => Credentials::None,
        }
    }
}
