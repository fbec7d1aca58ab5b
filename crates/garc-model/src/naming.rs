use crate::{DEPLOYMENT_SUFFIX, WORKSPACE_SUFFIX};

/// Name of the config map holding the build recipe of the given Runner.
pub fn workspace_name(runner: &str) -> String {
    format!("{runner}{WORKSPACE_SUFFIX}")
}

/// Name of the deployment running the built image of the given Runner.
pub fn deployment_name(runner: &str) -> String {
    format!("{runner}{DEPLOYMENT_SUFFIX}")
}
