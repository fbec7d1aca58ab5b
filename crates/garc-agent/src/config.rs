use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;
use crate::error::AgentError;

/// How the agent obtains the token it registers with.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Exchange a signed GitHub App assertion for an installation token.
    App {
        app_id: String,
        installation_id: String,
        private_key: String,
    },
    /// Use the given token as is.
    Static { token: String },
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::App {
                app_id,
                installation_id,
                ..
            } => f
                .debug_struct("App")
                .field("app_id", app_id)
                .field("installation_id", installation_id)
                .field("private_key", &"<redacted>")
                .finish(),
            AuthMode::Static { .. } => f
                .debug_struct("Static")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// Whether to install the runner distribution before running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    Install,
    OnlyInstall,
    Skip,
}

/// Resolved agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub auth: AuthMode,
    pub repository: String,
    pub hostname: String,
    pub labels: String,
    pub disable_update: bool,
    pub github_api_url: String,
    pub github_url: String,
    pub configure_timeout: Duration,
    pub install: InstallMode,
    pub runner_version: String,
    pub runner_download_base: String,
    pub workdir: PathBuf,
}

impl AgentConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, AgentError> {
        let app = !cli.github_app_id.is_empty()
            && !cli.github_app_installation_id.is_empty()
            && !cli.github_app_private_key.is_empty();
        let auth = if app {
            AuthMode::App {
                app_id: cli.github_app_id.clone(),
                installation_id: cli.github_app_installation_id.clone(),
                private_key: cli.github_app_private_key.clone(),
            }
        } else {
            AuthMode::Static {
                token: cli.token.clone(),
            }
        };

        let install = match (cli.without_install, cli.only_install) {
            (true, _) => InstallMode::Skip,
            (false, true) => InstallMode::OnlyInstall,
            (false, false) => InstallMode::Install,
        };

        let cfg = Self {
            auth,
            repository: cli.repository.clone(),
            hostname: cli.hostname.clone(),
            labels: cli.labels.clone(),
            disable_update: cli.disableupdate,
            github_api_url: cli.github_api_url.trim_end_matches('/').to_string(),
            github_url: cli.github_url.trim_end_matches('/').to_string(),
            configure_timeout: Duration::from_secs(cli.configure_timeout_secs),
            install,
            runner_version: cli.runner_version.clone(),
            runner_download_base: cli.runner_download_base.trim_end_matches('/').to_string(),
            workdir: std::env::current_dir()?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rules:
    /// - `repository` is `owner/name`.
    /// - `runner_version` is not empty.
    /// - `hostname` is not empty.
    /// - the configure timeout is not zero.
    pub fn validate(&self) -> Result<(), AgentError> {
        let parts: Vec<&str> = self.repository.split('/').collect();
        if parts.len() != 2 || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(AgentError::Config(format!(
                "repository must be owner/name, got {:?}",
                self.repository
            )));
        }
        if self.runner_version.trim().is_empty() {
            return Err(AgentError::Config("runner version is empty".into()));
        }
        if self.hostname.trim().is_empty() {
            return Err(AgentError::Config("hostname is empty".into()));
        }
        if self.configure_timeout.is_zero() {
            return Err(AgentError::Config("configure timeout must be positive".into()));
        }
        Ok(())
    }
}
