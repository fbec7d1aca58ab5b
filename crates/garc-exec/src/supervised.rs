use std::process::ExitStatus;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::ExecError;
use crate::command::{CommandSpec, forward_output};
use crate::log::LogConfig;

/// Runs a long-lived process until it exits or `cancel` fires.
///
/// Output is streamed to the log. On cancellation the process is killed and
/// [`ExecError::Canceled`] is returned.
pub async fn supervise(
    spec: &CommandSpec,
    cfg: LogConfig,
    cancel: CancellationToken,
) -> Result<ExitStatus, ExecError> {
    let mut child = spec.spawn(false)?;
    let pumps = forward_output(&mut child, cfg, spec.program(), true);

    let result = tokio::select! {
        res = child.wait() => res.map_err(ExecError::from),
        _ = cancel.cancelled() => {
            debug!(command = %spec, "cancellation requested; killing process");
            if let Err(e) = child.kill().await {
                debug!("failed to kill process: {e}");
            }
            Err(ExecError::Canceled)
        }
    };
    // Descendants of a killed process may still hold the pipes open.
    for pump in pumps {
        if result.is_err() {
            pump.abort();
        } else {
            let _ = pump.await;
        }
    }
    result
}
