mod constants;
pub use constants::{
    ANNOTATION_IMAGE, DEPLOYMENT_SUFFIX, LABEL_APP, RECIPE_KEY, RUNNER_KIND, WORKSPACE_SUFFIX,
};

mod error;
pub use error::{ModelError, ModelResult};

mod naming;
pub use naming::{deployment_name, workspace_name};

mod runner;
pub use runner::{
    ContainerOverrides, Credentials, FragmentMetadata, FragmentPodSpec, PodTemplateFragment,
    Runner, RunnerSpec,
};
