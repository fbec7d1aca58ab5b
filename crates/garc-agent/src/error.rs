use thiserror::Error;

use garc_exec::ExecError;

/// Fatal agent failures; each one ends the process with a non-zero exit.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("required program `{program}` not found on PATH: {source}")]
    MissingDependency {
        program: &'static str,
        #[source]
        source: which::Error,
    },

    #[error("failed to install runner: {0}")]
    Install(String),

    #[error("invalid GitHub App private key: {0}")]
    PrivateKey(#[source] jsonwebtoken::errors::Error),

    #[error("failed to sign GitHub App token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    #[error("failed to get {what}: unexpected status {status}")]
    Status { what: &'static str, status: u16 },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
