pub mod system;
pub mod types;

use std::time::Duration;
use thiserror::Error;

pub use system::SystemRunner;
pub use types::{CommandSpec, ProcessOutput};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` timed out after {}s", .timeout.as_secs())]
    TimedOut {
        command: String,
        timeout: Duration,
        stderr: String,
    },

    #[error("i/o error while running `{command}`: {message}")]
    Io { command: String, message: String },
}

/// Runs external tools. A non-zero exit is a normal `Ok` result; only
/// failing to start, timing out, or losing the pipes is an error.
pub trait ProcessRunner {
    fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ExecError>;
}

impl<T: ProcessRunner + ?Sized> ProcessRunner for &T {
    fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ExecError> {
        (**self).run(spec)
    }
}
