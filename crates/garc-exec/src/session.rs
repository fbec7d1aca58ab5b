use std::time::Duration;

use regex::bytes::Regex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};

use crate::ExecError;
use crate::command::{CommandSpec, forward_output};
use crate::log::{LogConfig, OutputStream, pump_lines};

/// One expected prompt and the text typed in reply.
#[derive(Debug, Clone)]
pub struct Step {
    pattern: Regex,
    response: String,
}

impl Step {
    /// Step matching a regular expression.
    pub fn new(pattern: &str, response: impl Into<String>) -> Result<Self, ExecError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| ExecError::InvalidSpec(format!("bad prompt pattern `{pattern}`: {e}")))?;
        Ok(Self {
            pattern,
            response: response.into(),
        })
    }

    /// Step matching `text` verbatim.
    pub fn literal(text: &str, response: impl Into<String>) -> Result<Self, ExecError> {
        Self::new(&regex::escape(text), response)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Ordered prompt/response script for an interactive program.
///
/// Steps are matched strictly in order against the program's output; output
/// consumed by one step is never seen by the next. Each step has its own
/// bounded wait.
///
/// The program talks over plain pipes, not a terminal. Patterns are matched
/// against raw partial output, so a prompt without a trailing newline still
/// matches, but only once the program flushes it; a program that block-buffers
/// stdout when it is not a TTY stalls until the step times out.
#[derive(Debug, Clone)]
pub struct ScriptedSession {
    steps: Vec<Step>,
    step_timeout: Duration,
}

impl ScriptedSession {
    pub fn new(step_timeout: Duration) -> Self {
        Self {
            steps: Vec::new(),
            step_timeout,
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Plays the script against `reader` (program output) and `writer` (program input).
    pub async fn drive<R, W>(&self, mut reader: R, mut writer: W) -> Result<(), ExecError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut seen: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 4096];

        for (idx, step) in self.steps.iter().enumerate() {
            let deadline = Instant::now() + self.step_timeout;
            loop {
                if let Some(m) = step.pattern.find(&seen) {
                    let end = m.end();
                    seen.drain(..end);
                    break;
                }
                let n = match timeout_at(deadline, reader.read(&mut chunk)).await {
                    Err(_) => {
                        return Err(ExecError::Timeout {
                            step: idx,
                            pattern: step.pattern().to_string(),
                            waited: self.step_timeout,
                        });
                    }
                    Ok(read) => read?,
                };
                if n == 0 {
                    return Err(ExecError::SessionEnded {
                        step: idx,
                        pattern: step.pattern().to_string(),
                    });
                }
                for line in String::from_utf8_lossy(&chunk[..n]).lines() {
                    if !line.trim().is_empty() {
                        info!(source = "session", "{line}");
                    }
                }
                seen.extend_from_slice(&chunk[..n]);
            }

            writer.write_all(step.response.as_bytes()).await?;
            writer.flush().await?;
            debug!(step = idx, pattern = step.pattern(), "prompt answered");
        }
        Ok(())
    }

    /// Spawns `spec`, plays the script, then closes its input and waits for it to exit.
    ///
    /// A script failure kills the program. A non-zero exit after the whole
    /// script matched is only logged.
    pub async fn run(&self, spec: &CommandSpec, cfg: LogConfig) -> Result<(), ExecError> {
        let mut child = spec.spawn(true)?;
        let pumps = forward_output(&mut child, cfg, spec.program(), false);
        let (Some(stdin), Some(mut stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill().await;
            return Err(ExecError::InvalidSpec("session stdio not piped".into()));
        };

        if let Err(e) = self.drive(&mut stdout, stdin).await {
            let _ = child.kill().await;
            for pump in pumps {
                pump.abort();
            }
            return Err(e);
        }

        let source = spec.program().to_string();
        let tail = tokio::spawn(async move {
            pump_lines(stdout, OutputStream::Stdout, cfg, &source).await
        });

        match timeout(self.step_timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => debug!(command = %spec, "session finished"),
            Ok(Ok(status)) => warn!(command = %spec, ?status, "session exited unsuccessfully"),
            Ok(Err(e)) => warn!(command = %spec, error = %e, "failed to wait for session"),
            Err(_) => {
                warn!(command = %spec, "session did not exit; killing");
                let _ = child.kill().await;
            }
        }
        tail.abort();
        for pump in pumps {
            pump.abort();
        }
        Ok(())
    }
}
