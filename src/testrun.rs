//! Runs a repository's own test suite and scrapes the tool's summary line.
//!
//! Parsing is best-effort: when the expected summary is missing the result
//! says so instead of guessing counts.

use crate::config::Config;
use crate::detect::{DetectionResult, Language};
use crate::exec::{CommandSpec, ProcessRunner};
use crate::stage::{FailureKind, NOT_APPLICABLE, StageOutcome};
use crate::walk::repo_walk;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;

static SUREFIRE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Tests run:\s*(\d+),\s*Failures:\s*(\d+)(?:,\s*Errors:\s*(\d+))?(?:,\s*Skipped:\s*(\d+))?",
    )
    .expect("static regex")
});

static UNITTEST_RAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Ran (\d+) tests? in").expect("static regex"));

static UNITTEST_FAILED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^FAILED \(([^)]*)\)").expect("static regex"));

static UNITTEST_OK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^OK(?:\s*\(([^)]*)\))?\s*$").expect("static regex"));

pub const NO_TESTS: &str = "No tests available";
pub const SUMMARY_NOT_RECOGNIZED: &str = "Summary not recognized";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    pub total: u32,
    pub failures: u32,
    pub errors: u32,
    pub skipped: u32,
}

impl TestSummary {
    pub fn passed(&self) -> u32 {
        self.total
            .saturating_sub(self.failures)
            .saturating_sub(self.errors)
            .saturating_sub(self.skipped)
    }

    pub fn render(&self) -> String {
        let mut s = format!("{} out of {} tests passed", self.passed(), self.total);
        if self.skipped > 0 {
            s.push_str(&format!(" ({} skipped)", self.skipped));
        }
        s
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub status: StageOutcome,
    pub summary: Option<TestSummary>,
    /// Report cell text: rendered counts, "Summary not recognized", or "N/A".
    pub summary_text: String,
}

impl TestOutcome {
    pub fn no_tests() -> Self {
        Self {
            status: StageOutcome::ok(NO_TESTS),
            summary: None,
            summary_text: NOT_APPLICABLE.to_string(),
        }
    }

    pub fn skipped(reason: &str) -> Self {
        Self {
            status: StageOutcome::ok(format!("Tests skipped: {reason}")),
            summary: None,
            summary_text: NOT_APPLICABLE.to_string(),
        }
    }

    fn errored(status: StageOutcome) -> Self {
        Self {
            status,
            summary: None,
            summary_text: NOT_APPLICABLE.to_string(),
        }
    }
}

/// Last surefire `Tests run:` line; Maven prints per-class lines first and
/// the aggregate under `Results:` last.
pub fn parse_maven_summary(output: &str) -> Option<TestSummary> {
    let caps = SUREFIRE_LINE.captures_iter(output).last()?;
    let num = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0)
    };
    Some(TestSummary {
        total: num(1),
        failures: num(2),
        errors: num(3),
        skipped: num(4),
    })
}

/// `Ran N tests in ...` plus the trailing `OK` / `FAILED (failures=F, errors=E)`.
pub fn parse_unittest_summary(output: &str) -> Option<TestSummary> {
    let total = UNITTEST_RAN.captures(output)?[1].parse::<u32>().ok()?;
    let mut summary = TestSummary {
        total,
        failures: 0,
        errors: 0,
        skipped: 0,
    };
    let detail = if let Some(c) = UNITTEST_FAILED.captures(output) {
        c.get(1).map(|m| m.as_str().to_string())
    } else if let Some(c) = UNITTEST_OK.captures(output) {
        c.get(1).map(|m| m.as_str().to_string())
    } else {
        return None;
    };
    for part in detail.iter().flat_map(|d| d.split(',')) {
        let Some((key, val)) = part.trim().split_once('=') else {
            continue;
        };
        let n = val.trim().parse::<u32>().unwrap_or(0);
        match key.trim() {
            "failures" => summary.failures = n,
            "errors" => summary.errors = n,
            "skipped" => summary.skipped = n,
            _ => {}
        }
    }
    Some(summary)
}

/// True when the tree holds files unittest's default discovery would pick up.
pub fn has_python_tests(repo: &Path) -> bool {
    repo_walk(repo).any(|e| {
        if !e.file_type().is_file() {
            return false;
        }
        let name = e.file_name().to_string_lossy();
        name.ends_with(".py") && (name.starts_with("test") || name.ends_with("_test.py"))
    })
}

pub struct TestRunner<'a, R: ProcessRunner> {
    cfg: &'a Config,
    runner: &'a R,
}

impl<'a, R: ProcessRunner> TestRunner<'a, R> {
    pub fn new(cfg: &'a Config, runner: &'a R) -> Self {
        Self { cfg, runner }
    }

    pub fn run(&self, repo: &Path, detection: &DetectionResult) -> TestOutcome {
        match detection.language {
            Language::Java if detection.is_maven() => self.maven(repo),
            Language::Python if has_python_tests(repo) => self.unittest(repo),
            _ => TestOutcome::no_tests(),
        }
    }

    fn maven(&self, repo: &Path) -> TestOutcome {
        let spec = CommandSpec::new(&self.cfg.tools.mvn)
            .args(["-B", "test"])
            .cwd(repo)
            .timeout_secs(self.cfg.limits.stage_timeout_seconds);
        info!("running tests: {}", spec.display());
        let out = match self.runner.run(&spec) {
            Ok(o) => o,
            Err(err) => {
                return TestOutcome::errored(StageOutcome::from_exec_error(
                    "Test execution",
                    &err,
                    self.cfg.limits.max_output_bytes,
                ));
            }
        };
        let text = out.combined();
        let build_ok = out.success() && text.contains("BUILD SUCCESS");
        let summary = parse_maven_summary(&text);
        self.classify(build_ok, summary, &text)
    }

    fn unittest(&self, repo: &Path) -> TestOutcome {
        let spec = CommandSpec::new(&self.cfg.tools.python)
            .args(["-m", "unittest", "discover"])
            .cwd(repo)
            .timeout_secs(self.cfg.limits.stage_timeout_seconds);
        info!("running tests: {}", spec.display());
        let out = match self.runner.run(&spec) {
            Ok(o) => o,
            Err(err) => {
                return TestOutcome::errored(StageOutcome::from_exec_error(
                    "Test execution",
                    &err,
                    self.cfg.limits.max_output_bytes,
                ));
            }
        };
        let text = out.combined();
        let summary = parse_unittest_summary(&text);
        if text.contains("NO TESTS RAN") || summary.is_some_and(|s| s.total == 0) {
            return TestOutcome::no_tests();
        }
        self.classify(out.success(), summary, &text)
    }

    fn classify(&self, ok: bool, summary: Option<TestSummary>, text: &str) -> TestOutcome {
        let summary_text = summary
            .map(|s| s.render())
            .unwrap_or_else(|| SUMMARY_NOT_RECOGNIZED.to_string());
        let status = match (ok, summary) {
            (true, Some(_)) => StageOutcome::ok("Tests ran successfully"),
            (true, None) => StageOutcome::failed(
                FailureKind::TestUnparsed,
                "Tests finished; summary not recognized",
            ),
            (false, Some(_)) => StageOutcome::failed(FailureKind::TestFailures, "Tests failed"),
            (false, None) => StageOutcome::failed(
                FailureKind::TestBuild,
                format!(
                    "Test build failed: {}",
                    crate::util::tail_chars(text, self.cfg.limits.max_output_bytes)
                ),
            ),
        };
        TestOutcome {
            status,
            summary,
            summary_text,
        }
    }
}
