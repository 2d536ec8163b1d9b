use super::{BuildReport, NO_COMPILATION, NO_RUN};
use crate::browser::BrowserOpener;
use crate::stage::StageOutcome;
use crate::util::display_rel;
use crate::validate::MarkupValidator;
use crate::walk::files_with_ext;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const HTML_EXTS: &[&str] = &["html", "htm"];
pub const CSS_EXTS: &[&str] = &["css"];

/// Validates every markup and stylesheet file, one line per file in the
/// summary cells. Browser preview only happens when an opener is supplied.
pub fn validate_site(
    repo: &Path,
    validator: Option<&dyn MarkupValidator>,
    opener: Option<&dyn BrowserOpener>,
) -> BuildReport {
    let html_files = files_with_ext(repo, HTML_EXTS);
    let css_files = files_with_ext(repo, CSS_EXTS);
    info!(
        html = html_files.len(),
        css = css_files.len(),
        "validating markup in {}",
        repo.display()
    );

    let (html_summary, css_summary) = match validator {
        Some(v) => (
            summarize(repo, &html_files, "HTML", |c| v.validate_html(c)),
            summarize(repo, &css_files, "CSS", |c| v.validate_css(c)),
        ),
        None => ("Validation disabled".to_string(), "Validation disabled".to_string()),
    };

    let run = match opener {
        Some(o) => preview(repo, &html_files, o),
        None => StageOutcome::ok(NO_RUN),
    };

    BuildReport {
        html_summary: Some(html_summary),
        css_summary: Some(css_summary),
        ..BuildReport::new(StageOutcome::ok(NO_COMPILATION), run)
    }
}

fn summarize(
    repo: &Path,
    files: &[PathBuf],
    kind: &str,
    check: impl Fn(&str) -> StageOutcome,
) -> String {
    if files.is_empty() {
        return format!("No {kind} files found");
    }
    let lines: Vec<String> = files
        .iter()
        .map(|path| {
            let name = display_rel(path, repo);
            let message = match std::fs::read(path) {
                Ok(bytes) => {
                    let outcome = check(&String::from_utf8_lossy(&bytes));
                    if !outcome.succeeded {
                        warn!("{} {}", name, outcome.message);
                    }
                    outcome.message
                }
                Err(err) => format!("Failed to read {kind} file: {err}"),
            };
            format!("{name} {message}")
        })
        .collect();
    lines.join("\n")
}

/// Fire-and-forget: outcome only reflects whether the opener could be launched.
fn preview(repo: &Path, html_files: &[PathBuf], opener: &dyn BrowserOpener) -> StageOutcome {
    if html_files.is_empty() {
        return StageOutcome::ok("No HTML file found to open");
    }
    let mut opened = 0usize;
    let mut failures = Vec::new();
    for path in html_files {
        match opener.open(path) {
            Ok(()) => opened += 1,
            Err(err) => failures.push(format!("Failed to open {}: {err:#}", display_rel(path, repo))),
        }
    }
    if failures.is_empty() {
        StageOutcome::ok(format!("Opened {opened} HTML file(s) in browser"))
    } else {
        StageOutcome::ok(format!(
            "Opened {opened} HTML file(s) in browser; {}",
            failures.join("; ")
        ))
    }
}
