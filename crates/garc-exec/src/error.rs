use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid specification: {0}")]
    InvalidSpec(String),

    #[error("spawn {command} failed: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {}", describe_exit(.code))]
    Exit { command: String, code: Option<i32> },

    #[error("step {step}: no output matching `{pattern}` within {waited:?}")]
    Timeout {
        step: usize,
        pattern: String,
        waited: Duration,
    },

    #[error("step {step}: session ended before output matched `{pattern}`")]
    SessionEnded { step: usize, pattern: String },

    #[error("process canceled")]
    Canceled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "signal".into(),
    }
}
