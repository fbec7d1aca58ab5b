//! Well-known names shared by the controller and the objects it generates.
//!
//! Keeping them here avoids scattering magic strings across the builder and the reconciler.

/// Kind of the custom resource that owns generated children.
pub const RUNNER_KIND: &str = "Runner";

/// Suffix appended to the Runner name to get its workspace config map name.
pub const WORKSPACE_SUFFIX: &str = "-workspace";

/// Suffix appended to the Runner name to get its deployment name.
pub const DEPLOYMENT_SUFFIX: &str = "-runner";

/// Config map key holding the image build recipe.
pub const RECIPE_KEY: &str = "Dockerfile";

/// Pod label used for the deployment selector and anti-affinity.
///
/// Generated value always wins over a user-supplied label with the same key.
pub const LABEL_APP: &str = "app";

/// Pod annotation recording the base image the runner was built from.
pub const ANNOTATION_IMAGE: &str = "image";
