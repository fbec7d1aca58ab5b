mod cli;
mod controller;
mod crd;
mod server;

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use garc_core::leader::{LeaderElector, LeaseConfig};
use garc_core::prelude::*;
use garc_observe::{LoggerConfig, init_logger};
use garc_prometheus::PrometheusMetrics;

use crate::cli::Cli;
use crate::controller::Context;
use crate::server::{MetricsApi, ProbeApi, Readiness, serve};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.print_crd {
        print!("{}", crd::runner_crd_yaml()?);
        return Ok(());
    }

    // 1) logger
    init_logger(&LoggerConfig::from_flags(&cli.log_level, &cli.log_format)?)?;

    // 2) cluster + reconciler
    let client = kube::Client::try_default().await?;
    let metrics = Arc::new(PrometheusMetrics::new()?);
    let settings = Arc::new(cli.settings());
    let cluster: Arc<dyn ClusterClient> = Arc::new(KubeClusterClient::new(client.clone()));
    let reconciler = Reconciler::new(cluster, settings, metrics.clone());
    let ctx = Arc::new(Context {
        reconciler,
        backoff: ErrorBackoff::default(),
        resync: cli.resync_period(),
    });

    // 3) metrics and probe servers
    let cancel = CancellationToken::new();
    let readiness = Readiness::default();
    let servers = [
        tokio::spawn(serve(
            "metrics",
            cli.metrics_addr,
            MetricsApi::new(metrics).router(),
            cancel.clone(),
        )),
        tokio::spawn(serve(
            "probes",
            cli.health_probe_bind_address,
            ProbeApi::new(readiness.clone()).router(),
            cancel.clone(),
        )),
    ];

    // 4) control loop, behind the lease when enabled
    let leading = {
        let readiness = readiness.clone();
        let client = client.clone();
        async move {
            readiness.mark_ready();
            info!("starting runner controller");
            controller::run(client, ctx).await;
        }
    };
    let result = if cli.enable_leader_election {
        let identity = std::env::var("HOSTNAME").unwrap_or_else(|_| "garc-manager".into());
        let lease = LeaseConfig::new(cli.leader_election_namespace.clone(), identity);
        LeaderElector::new(client, lease).run(leading).await
    } else {
        leading.await;
        Ok(())
    };

    cancel.cancel();
    for server in servers {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "server failed"),
            Err(e) => error!(error = %e, "server task panicked"),
        }
    }
    result?;

    info!("runner controller stopped");
    Ok(())
}
