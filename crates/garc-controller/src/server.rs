use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use garc_prometheus::PrometheusMetrics;

/// Process readiness shared between the control loop and the probe server.
#[derive(Debug, Clone, Default)]
pub struct Readiness(Arc<AtomicBool>);

impl Readiness {
    pub fn mark_ready(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Metrics endpoint builder.
pub struct MetricsApi {
    metrics: Arc<PrometheusMetrics>,
}

impl MetricsApi {
    pub fn new(metrics: Arc<PrometheusMetrics>) -> Self {
        Self { metrics }
    }

    /// Routes:
    /// - GET /metrics - Prometheus text exposition
    pub fn router(self) -> Router {
        Router::new()
            .route("/metrics", get(metrics))
            .with_state(self.metrics)
    }
}

/// Liveness and readiness probe builder.
pub struct ProbeApi {
    readiness: Readiness,
}

impl ProbeApi {
    pub fn new(readiness: Readiness) -> Self {
        Self { readiness }
    }

    /// Routes:
    /// - GET /healthz - always 200 while the process serves
    /// - GET /readyz - 200 once the control loop runs, 503 before
    pub fn router(self) -> Router {
        Router::new()
            .route("/healthz", get(healthz))
            .route("/readyz", get(readyz))
            .with_state(self.readiness)
    }
}

/// Serves `router` on `addr` until `cancel` fires.
pub async fn serve(
    name: &'static str,
    addr: SocketAddr,
    router: Router,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(server = name, addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}

/// GET /metrics
async fn metrics(State(metrics): State<Arc<PrometheusMetrics>>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /healthz
async fn healthz() -> &'static str {
    "ok"
}

/// GET /readyz
async fn readyz(State(readiness): State<Readiness>) -> impl IntoResponse {
    if readiness.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

#[cfg(test)]
mod tests {
    use garc_core::metrics::{ReconcileMetrics, ReconcileStatus};

    use super::*;

    async fn spawn(router: Router) -> (String, CancellationToken) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await
                .unwrap();
        });
        (format!("http://{addr}"), cancel)
    }

    #[tokio::test]
    async fn readyz_flips_once_marked() {
        let readiness = Readiness::default();
        let (base, cancel) = spawn(ProbeApi::new(readiness.clone()).router()).await;

        let health = reqwest::get(format!("{base}/healthz")).await.unwrap();
        assert_eq!(health.status(), 200);

        let before = reqwest::get(format!("{base}/readyz")).await.unwrap();
        assert_eq!(before.status(), 503);

        readiness.mark_ready();
        let after = reqwest::get(format!("{base}/readyz")).await.unwrap();
        assert_eq!(after.status(), 200);
        cancel.cancel();
    }

    #[tokio::test]
    async fn metrics_exposes_reconcile_counters() {
        let registry = Arc::new(prometheus::Registry::new());
        let metrics = Arc::new(PrometheusMetrics::new_with_registry(registry).unwrap());
        metrics.record_reconcile(ReconcileStatus::Converged, std::time::Duration::from_millis(3));

        let (base, cancel) = spawn(MetricsApi::new(metrics).router()).await;
        let resp = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body = resp.text().await.unwrap();
        assert!(body.contains("garc_reconcile_total"));
        assert!(body.contains("converged"));
        cancel.cancel();
    }
}
