use clap::Parser;

/// Runner agent: installs, registers and runs a GitHub Actions self-hosted runner.
#[derive(Parser, Debug, Clone)]
#[command(name = "runner", version, about)]
pub struct Cli {
    /// Version of the GitHub Actions runner distribution.
    #[arg(long, default_value = "2.321.0")]
    pub runner_version: String,

    /// Repository to register against, as `owner/name`.
    #[arg(long, default_value = "kaidotdev/github-actions-runner-controller")]
    pub repository: String,

    /// Static GitHub token.
    #[arg(long, default_value = "")]
    pub token: String,

    /// Name the runner registers under.
    #[arg(long, default_value = "runner")]
    pub hostname: String,

    #[arg(long, default_value = "")]
    pub github_app_id: String,

    #[arg(long, default_value = "")]
    pub github_app_installation_id: String,

    /// PEM-encoded RSA private key of the GitHub App.
    #[arg(long, default_value = "")]
    pub github_app_private_key: String,

    /// Install the runner distribution and exit.
    #[arg(long)]
    pub only_install: bool,

    /// Skip installing the runner distribution.
    #[arg(long)]
    pub without_install: bool,

    /// Keep the runner from updating itself.
    #[arg(long, alias = "disable-auto-update")]
    pub disableupdate: bool,

    /// Base URL of the GitHub REST API.
    #[arg(long, default_value = "https://api.github.com")]
    pub github_api_url: String,

    /// Base URL of GitHub, used for the runner's `--url`.
    #[arg(long, default_value = "https://github.com")]
    pub github_url: String,

    /// Comma-separated labels passed to `config.sh`.
    #[arg(long, default_value = "kaidotdev/github-actions-runner-controller")]
    pub labels: String,

    /// Seconds to wait for each prompt of `config.sh`.
    #[arg(long, default_value_t = 300)]
    pub configure_timeout_secs: u64,

    /// Release download prefix of the runner distribution.
    #[arg(long, default_value = "https://github.com/actions/runner/releases/download", hide = true)]
    pub runner_download_base: String,

    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// `text` or `json`.
    #[arg(long, default_value = "text")]
    pub log_format: String,
}
