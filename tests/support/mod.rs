//! Fakes for the process, fetch and validation seams so pipeline tests run
//! without git, compilers or network.

#![allow(dead_code)]

use repo_audit::exec::{CommandSpec, ExecError, ProcessOutput, ProcessRunner};
use repo_audit::fetch::Fetcher;
use repo_audit::stage::{FailureKind, StageOutcome};
use repo_audit::validate::MarkupValidator;
use std::cell::RefCell;
use std::path::Path;

pub fn exited(code: i32, stdout: &str, stderr: &str) -> ProcessOutput {
    ProcessOutput {
        code: Some(code),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}

type Responder = Box<dyn Fn(&CommandSpec) -> Result<ProcessOutput, ExecError>>;

/// Answers every command through a closure and records what was asked.
pub struct ScriptedRunner {
    calls: RefCell<Vec<CommandSpec>>,
    respond: Responder,
}

impl ScriptedRunner {
    pub fn new(respond: impl Fn(&CommandSpec) -> Result<ProcessOutput, ExecError> + 'static) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    /// Every command exits 0 with no output.
    pub fn succeeding() -> Self {
        Self::new(|_| Ok(exited(0, "", "")))
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.program.clone()).collect()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, ExecError> {
        self.calls.borrow_mut().push(spec.clone());
        (self.respond)(spec)
    }
}

/// "Clones" by writing a fixed set of files into the destination.
pub struct TreeFetcher {
    files: Vec<(&'static str, &'static str)>,
}

impl TreeFetcher {
    pub fn new(files: &[(&'static str, &'static str)]) -> Self {
        Self {
            files: files.to_vec(),
        }
    }
}

impl Fetcher for TreeFetcher {
    fn fetch(&self, _url: &str, dest: &Path) -> StageOutcome {
        for (rel, content) in &self.files {
            let path = dest.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&path, content).unwrap();
        }
        std::fs::create_dir_all(dest).unwrap();
        StageOutcome::ok("Cloned successfully")
    }
}

/// Returns the same verdict for every document.
pub struct FixedValidator {
    pub html: StageOutcome,
    pub css: StageOutcome,
}

impl MarkupValidator for FixedValidator {
    fn validate_html(&self, _content: &str) -> StageOutcome {
        self.html.clone()
    }

    fn validate_css(&self, _content: &str) -> StageOutcome {
        self.css.clone()
    }
}

pub fn css_error(message: &str) -> StageOutcome {
    StageOutcome::failed(
        FailureKind::ValidationErrors,
        format!("CSS validation issues found: {message}"),
    )
}
