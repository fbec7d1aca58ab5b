use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use garc_agent::{
    Agent, AgentConfig, BashRunnerHost, Cli, GithubClient, InstallMode, check_dependencies,
    install::install_runner, spawn_signal_listener,
};
use garc_observe::{LoggerConfig, init_logger};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1) logger
    init_logger(&LoggerConfig::from_flags(&cli.log_level, &cli.log_format)?)?;

    // 2) config + dependency check
    let cfg = AgentConfig::from_cli(&cli)?;
    check_dependencies()?;

    // 3) install
    let http = reqwest::Client::new();
    if cfg.install != InstallMode::Skip {
        install_runner(&http, &cfg.runner_download_base, &cfg.runner_version, &cfg.workdir).await?;
        if cfg.install == InstallMode::OnlyInstall {
            info!(version = %cfg.runner_version, "runner installed");
            return Ok(());
        }
    }

    // 4) signals, before any registration happens
    let (tx, rx) = mpsc::channel(1);
    let _signals = spawn_signal_listener(tx)?;

    // 5) lifecycle
    let github = GithubClient::with_client(http, cfg.github_api_url.clone());
    let host = Arc::new(BashRunnerHost::from_config(&cfg));
    Agent::new(&cfg, github, host).run(rx).await?;

    info!(hostname = %cfg.hostname, "runner agent finished");
    Ok(())
}
