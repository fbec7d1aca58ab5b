use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

/// Configuration for subprocess output logging.
#[derive(Debug, Clone, Copy)]
pub struct LogConfig {
    /// Max line length before truncation.
    pub max_line_length: usize,
    /// Log stdout at INFO level (false = DEBUG).
    pub stdout_info: bool,
    /// Log stderr at WARN level (false = DEBUG).
    pub stderr_warn: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_line_length: 4096,
            stdout_info: true,
            stderr_warn: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

/// Forwards every line of `reader` to the log until EOF.
///
/// Lines are read as raw bytes and decoded lossily, so output that is not
/// UTF-8 never stops the drain and the child keeps a reader on its pipe.
/// Returns the number of lines forwarded.
pub async fn pump_lines<R>(reader: R, stream: OutputStream, cfg: LogConfig, source: &str) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut count = 0;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                count += 1;
                let text = String::from_utf8_lossy(&buf);
                let line = truncate(text.trim_end_matches(['\n', '\r']), cfg.max_line_length);
                match stream {
                    OutputStream::Stdout if cfg.stdout_info => {
                        info!(source, stream = stream.as_str(), "{line}")
                    }
                    OutputStream::Stderr if cfg.stderr_warn => {
                        warn!(source, stream = stream.as_str(), "{line}")
                    }
                    _ => debug!(source, stream = stream.as_str(), "{line}"),
                }
            }
            Err(e) => {
                debug!(source, stream = stream.as_str(), error = %e, "output read failed");
                break;
            }
        }
    }
    count
}

fn truncate(line: &str, max: usize) -> &str {
    if line.len() <= max {
        return line;
    }
    let mut end = max;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}
