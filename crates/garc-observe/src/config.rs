use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::{LoggerFormat, LoggerLevel, LoggerResult};

/// What [`init_logger`](crate::init_logger) installs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: LoggerLevel,
    /// Print the module path of each event.
    pub with_targets: bool,
    /// ANSI colors for text output on a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: LoggerLevel::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// From the `--log-level` and `--log-format` flags of either binary.
    pub fn from_flags(level: &str, format: &str) -> LoggerResult<Self> {
        Ok(Self {
            level: level.parse()?,
            format: format.parse()?,
            ..Self::default()
        })
    }

    pub fn should_use_color(&self) -> bool {
        self.use_color && self.format == LoggerFormat::Text && std::io::stdout().is_terminal()
    }
}
