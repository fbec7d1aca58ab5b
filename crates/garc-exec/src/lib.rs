//! Process plumbing for the runner agent.
//!
//! - [`CommandSpec`]: validated description of one external command.
//! - [`run_to_completion`] / [`run_checked`]: one-shot commands with streamed output.
//! - [`supervise`]: long-running process bound to a cancellation token.
//! - [`ScriptedSession`]: ordered prompt/response automation of an interactive program.
mod error;
pub use error::ExecError;

mod log;
pub use log::{LogConfig, OutputStream, pump_lines};

mod command;
pub use command::{CommandSpec, run_checked, run_to_completion};

mod supervised;
pub use supervised::supervise;

mod session;
pub use session::{ScriptedSession, Step};
