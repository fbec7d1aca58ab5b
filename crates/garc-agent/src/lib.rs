//! Runner agent: the entrypoint of every runner container.
pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod install;
pub mod jwt;
pub mod lifecycle;

pub use cli::Cli;
pub use config::{AgentConfig, AuthMode, InstallMode};
pub use error::AgentError;
pub use github::GithubClient;
pub use lifecycle::{Agent, BashRunnerHost, RunnerHost, spawn_signal_listener};

/// Fails unless `bash` is on `PATH`.
pub fn check_dependencies() -> Result<(), AgentError> {
    which::which("bash")
        .map(|_| ())
        .map_err(|source| AgentError::MissingDependency {
            program: "bash",
            source,
        })
}
