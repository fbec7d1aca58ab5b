use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::LoggerError;

/// How log events are rendered on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggerFormat {
    #[default]
    Text,
    /// One JSON object per line, for cluster log collectors.
    Json,
}

impl LoggerFormat {
    const ALL: [(&'static str, LoggerFormat); 2] =
        [("text", LoggerFormat::Text), ("json", LoggerFormat::Json)];

    pub fn as_str(self) -> &'static str {
        match self {
            LoggerFormat::Text => "text",
            LoggerFormat::Json => "json",
        }
    }
}

impl FromStr for LoggerFormat {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, format)| *format)
            .ok_or_else(|| LoggerError::InvalidFormat(s.to_string()))
    }
}

impl fmt::Display for LoggerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
