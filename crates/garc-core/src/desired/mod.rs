//! Desired-state builder.
//!
//! Pure functions from a Runner and the controller settings to the child objects
//! the Runner implies. Nothing here talks to the cluster.
mod deployment;
pub use deployment::build_deployment;

mod image;
pub use image::{ImageRefError, normalize_repository};

mod recipe;
pub use recipe::build_workspace_recipe;

mod tag;
pub use tag::repository_tag;

use std::collections::BTreeMap;

use k8s_openapi::api::{apps::v1::Deployment, core::v1::ConfigMap};
use kube::ResourceExt;

use garc_model::{ModelError, ModelResult, RECIPE_KEY, Runner, workspace_name};

use crate::settings::ControllerSettings;

/// Builds the workspace config map holding the image recipe.
pub fn build_workspace_config_map(
    name: &str,
    namespace: &str,
    image: &str,
    settings: &ControllerSettings,
) -> ConfigMap {
    ConfigMap {
        metadata: kube::api::ObjectMeta {
            name: Some(workspace_name(name)),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            RECIPE_KEY.to_string(),
            build_workspace_recipe(image, settings),
        )])),
        ..Default::default()
    }
}

/// Both children of one Runner, without owner references.
#[derive(Debug, Clone)]
pub struct DesiredState {
    pub config_map: ConfigMap,
    pub deployment: Deployment,
}

impl DesiredState {
    pub fn build(runner: &Runner, settings: &ControllerSettings) -> ModelResult<Self> {
        let name = runner
            .metadata
            .name
            .as_deref()
            .ok_or(ModelError::MissingMetadata("name"))?;
        let namespace = runner
            .namespace()
            .ok_or(ModelError::MissingMetadata("namespace"))?;
        if runner.spec.image.trim().is_empty() {
            return Err(ModelError::Invalid("image must not be empty".into()));
        }

        Ok(Self {
            config_map: build_workspace_config_map(name, &namespace, &runner.spec.image, settings),
            deployment: build_deployment(name, &namespace, &runner.spec, settings),
        })
    }
}
