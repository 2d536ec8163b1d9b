//! Per-language build / run / validate strategies.
//!
//! Every strategy returns a [`BuildReport`]; nothing here returns an error or
//! panics on a misbehaving repository, so one bad checkout never stops the
//! batch.

pub mod java;
pub mod script;
pub mod sql;
pub mod web;

use crate::browser::BrowserOpener;
use crate::config::Config;
use crate::detect::{DetectionResult, Language};
use crate::exec::ProcessRunner;
use crate::stage::StageOutcome;
use crate::validate::MarkupValidator;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub const NO_COMPILATION: &str = "No compilation needed";
pub const NO_RUN: &str = "No run needed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub compile: StageOutcome,
    pub run: StageOutcome,
    pub sql_summary: Option<String>,
    pub html_summary: Option<String>,
    pub css_summary: Option<String>,
}

impl BuildReport {
    pub fn new(compile: StageOutcome, run: StageOutcome) -> Self {
        Self {
            compile,
            run,
            sql_summary: None,
            html_summary: None,
            css_summary: None,
        }
    }

    pub fn not_applicable() -> Self {
        Self::new(StageOutcome::not_applicable(), StageOutcome::not_applicable())
    }
}

/// Paths one repository's strategies work with.
#[derive(Debug, Clone, Copy)]
pub struct RepoDirs<'a> {
    /// The checkout.
    pub repo: &'a Path,
    /// Private scratch space outside the checkout (compiler output etc.).
    pub scratch: &'a Path,
}

pub struct Dispatcher<'a, R: ProcessRunner> {
    cfg: &'a Config,
    runner: &'a R,
    validator: Option<&'a dyn MarkupValidator>,
    opener: Option<&'a dyn BrowserOpener>,
}

impl<'a, R: ProcessRunner> Dispatcher<'a, R> {
    pub fn new(cfg: &'a Config, runner: &'a R) -> Self {
        Self {
            cfg,
            runner,
            validator: None,
            opener: None,
        }
    }

    pub fn with_validator(mut self, validator: &'a dyn MarkupValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_opener(mut self, opener: &'a dyn BrowserOpener) -> Self {
        self.opener = Some(opener);
        self
    }

    pub fn dispatch(&self, dirs: RepoDirs<'_>, detection: &DetectionResult) -> BuildReport {
        info!(
            "dispatching {} ({:?}) for {}",
            detection.language,
            detection.build_system,
            dirs.repo.display()
        );
        match detection.language {
            Language::Java => java::build_and_run(self.cfg, self.runner, dirs),
            Language::Python => script::run_entry(
                self.cfg,
                self.runner,
                dirs.repo,
                &self.cfg.tools.python,
                &self.cfg.entry.python_candidates,
            ),
            Language::JavaScript => script::run_entry(
                self.cfg,
                self.runner,
                dirs.repo,
                &self.cfg.tools.node,
                &self.cfg.entry.javascript_candidates,
            ),
            Language::HtmlCss => web::validate_site(dirs.repo, self.validator, self.opener),
            Language::Sql => sql::check_repo(dirs.repo),
            Language::Unknown => BuildReport::not_applicable(),
        }
    }
}
