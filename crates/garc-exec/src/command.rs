use std::{fmt, path::PathBuf, process::ExitStatus, process::Stdio};

use tokio::process::{Child, Command};
use tracing::{debug, trace};

use crate::ExecError;
use crate::log::{LogConfig, OutputStream, pump_lines};

/// One external command: program, arguments, working directory and extra env.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Validate the spec before spawning.
    ///
    /// Rules:
    /// - `program` is not empty or whitespace-only.
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.program.trim().is_empty() {
            return Err(ExecError::InvalidSpec("command program is empty".into()));
        }
        Ok(())
    }

    pub(crate) fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        cmd.kill_on_drop(true);
        cmd
    }

    /// Spawns with piped stdio as requested; stdin is null unless `stdin` is set.
    pub(crate) fn spawn(&self, stdin: bool) -> Result<Child, ExecError> {
        self.validate()?;
        trace!(command = %self, "spawning");

        let mut cmd = self.to_command();
        cmd.stdin(if stdin { Stdio::piped() } else { Stdio::null() });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.spawn().map_err(|source| ExecError::Spawn {
            command: self.to_string(),
            source,
        })
    }
}

// Arguments may carry credentials, so only their count is shown.
impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CommandSpec(cmd='{}', args={}, cwd={:?})",
            self.program,
            self.args.len(),
            self.cwd,
        )
    }
}

/// Forwards the child's stdout and stderr to the log in background tasks.
pub(crate) fn forward_output(
    child: &mut Child,
    cfg: LogConfig,
    source: &str,
    stdout: bool,
) -> Vec<tokio::task::JoinHandle<usize>> {
    let mut pumps = Vec::with_capacity(2);
    if stdout {
        if let Some(out) = child.stdout.take() {
            let source = source.to_string();
            pumps.push(tokio::spawn(async move {
                pump_lines(out, OutputStream::Stdout, cfg, &source).await
            }));
        }
    }
    if let Some(err) = child.stderr.take() {
        let source = source.to_string();
        pumps.push(tokio::spawn(async move {
            pump_lines(err, OutputStream::Stderr, cfg, &source).await
        }));
    }
    pumps
}

/// Runs `spec` to completion, streaming its output to the log.
pub async fn run_to_completion(spec: &CommandSpec, cfg: LogConfig) -> Result<ExitStatus, ExecError> {
    let mut child = spec.spawn(false)?;
    let pumps = forward_output(&mut child, cfg, spec.program(), true);

    let status = child.wait().await?;
    for pump in pumps {
        let _ = pump.await;
    }
    debug!(command = %spec, ?status, "command finished");
    Ok(status)
}

/// Like [`run_to_completion`], but a non-zero exit is an error.
pub async fn run_checked(spec: &CommandSpec, cfg: LogConfig) -> Result<(), ExecError> {
    let status = run_to_completion(spec, cfg).await?;
    if status.success() {
        Ok(())
    } else {
        Err(ExecError::Exit {
            command: spec.to_string(),
            code: status.code(),
        })
    }
}
