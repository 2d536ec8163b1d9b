use crate::exec::{ExecError, ProcessOutput};
use crate::util::tail_chars;
use serde::{Deserialize, Serialize};

/// Why a stage did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    Clone,
    Compile,
    /// No runnable entry point (main method or conventional entry file).
    RunMissingEntry,
    /// Entry point ran and exited non-zero.
    RunExit,
    TimedOut,
    /// The tool could not be started at all.
    Spawn,
    TestBuild,
    TestFailures,
    TestUnparsed,
    ValidationUnreachable,
    ValidationStatus,
    ValidationErrors,
}

/// Uniform result of a clone, compile, run, test, or validate stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub succeeded: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl StageOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            message: message.into(),
            failure: None,
        }
    }

    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            message: message.into(),
            failure: Some(kind),
        }
    }

    pub fn not_applicable() -> Self {
        Self::ok(NOT_APPLICABLE)
    }

    pub fn is_kind(&self, kind: FailureKind) -> bool {
        self.failure == Some(kind)
    }

    /// Converts a finished process into an outcome for `stage`
    /// ("Compilation", "Run", ...). Non-zero exits keep the tail of the tool's
    /// diagnostic output so the report cell is enough to debug from.
    pub fn from_process(
        stage: &str,
        kind: FailureKind,
        success_message: &str,
        out: &ProcessOutput,
        max_output: usize,
    ) -> Self {
        if out.success() {
            return Self::ok(success_message);
        }
        let detail = tail_chars(out.diagnostic(), max_output);
        let msg = if detail.is_empty() {
            format!("{stage} failed: {}", out.exit_label())
        } else {
            format!("{stage} failed: {} ({})", detail, out.exit_label())
        };
        Self::failed(kind, msg)
    }

    pub fn from_exec_error(stage: &str, err: &ExecError, max_output: usize) -> Self {
        match err {
            ExecError::TimedOut { stderr, .. } => {
                let tail = tail_chars(stderr, max_output);
                let msg = if tail.is_empty() {
                    format!("{stage} failed: {err}")
                } else {
                    format!("{stage} failed: {err}: {tail}")
                };
                Self::failed(FailureKind::TimedOut, msg)
            }
            ExecError::Spawn { .. } | ExecError::Io { .. } => {
                Self::failed(FailureKind::Spawn, format!("{stage} failed: {err}"))
            }
        }
    }
}

pub const NOT_APPLICABLE: &str = "N/A";
