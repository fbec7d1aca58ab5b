use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::LoggerError;

/// Transport crates that flood `debug` with connection chatter from the
/// Kubernetes and GitHub clients.
const NOISY_TARGETS: [&str; 4] = ["hyper", "h2", "tower", "rustls"];

/// Validated `EnvFilter` directive string, e.g. `garc_core=debug,info`.
///
/// Transport crates stay at `warn` unless the directive names them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoggerLevel {
    directives: String,
}

impl LoggerLevel {
    pub fn as_str(&self) -> &str {
        &self.directives
    }

    /// Directives handed to the subscriber, with transport crates capped.
    pub fn effective(&self) -> String {
        let mut out = self.directives.clone();
        for target in NOISY_TARGETS {
            if !self.directives.split(',').any(|d| d.trim().starts_with(target)) {
                out.push_str(&format!(",{target}=warn"));
            }
        }
        out
    }

    pub(crate) fn env_filter(&self) -> EnvFilter {
        EnvFilter::builder().parse_lossy(self.effective())
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self {
            directives: "info".into(),
        }
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EnvFilter::builder()
            .parse(s)
            .map_err(|e| LoggerError::InvalidLevel(format!("{s}: {e}")))?;
        Ok(Self {
            directives: s.to_string(),
        })
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<LoggerLevel> for String {
    fn from(level: LoggerLevel) -> Self {
        level.directives
    }
}
