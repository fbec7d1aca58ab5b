use std::fmt;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};
use tracing_subscriber::{Layer, layer::SubscriberExt, registry, util::SubscriberInitExt};

use crate::{LoggerConfig, LoggerError, LoggerFormat, LoggerResult};

/// Timestamps every event in RFC 3339 UTC; pods seldom carry a local zone.
#[derive(Debug, Clone, Copy)]
struct UtcTimer;

impl FormatTime for UtcTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let now = OffsetDateTime::now_utc();
        match now.format(&Rfc3339) {
            Ok(ts) => write!(w, "{ts} "),
            Err(_) => write!(w, "{} ", now.unix_timestamp()),
        }
    }
}

pub(crate) fn install(cfg: &LoggerConfig) -> LoggerResult<()> {
    let base = tracing_subscriber::fmt::layer()
        .with_timer(UtcTimer)
        .with_target(cfg.with_targets);
    let output = match cfg.format {
        LoggerFormat::Text => base.with_ansi(cfg.should_use_color()).boxed(),
        LoggerFormat::Json => base.json().with_ansi(false).boxed(),
    };

    registry()
        .with(output)
        .with(cfg.level.env_filter())
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}
