use crate::config::Output;
use crate::dispatch::BuildReport;
use crate::detect::Language;
use crate::repo_list::RepoTask;
use crate::stage::NOT_APPLICABLE;
use crate::testrun::TestOutcome;
use crate::util::ensure_dir;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const COLUMNS: [&str; 11] = [
    "Repository",
    "Folder Name",
    "Clone Status",
    "Language",
    "Compilation Status",
    "Run Status",
    "Test Status",
    "Test Summary",
    "SQL Validation Summary",
    "HTML Validation Summary",
    "CSS Validation Summary",
];

/// One report row. Field order is column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    #[serde(rename = "Repository")]
    pub repository: String,
    #[serde(rename = "Folder Name")]
    pub folder_name: String,
    #[serde(rename = "Clone Status")]
    pub clone_status: String,
    #[serde(rename = "Language")]
    pub language: String,
    #[serde(rename = "Compilation Status")]
    pub compilation_status: String,
    #[serde(rename = "Run Status")]
    pub run_status: String,
    #[serde(rename = "Test Status")]
    pub test_status: String,
    #[serde(rename = "Test Summary")]
    pub test_summary: String,
    #[serde(rename = "SQL Validation Summary")]
    pub sql_validation: String,
    #[serde(rename = "HTML Validation Summary")]
    pub html_validation: String,
    #[serde(rename = "CSS Validation Summary")]
    pub css_validation: String,
}

impl ReportRecord {
    fn blank(task: &RepoTask, clone_status: String, language: Language) -> Self {
        let na = || NOT_APPLICABLE.to_string();
        Self {
            repository: task.url.clone(),
            folder_name: task.folder_name.clone(),
            clone_status,
            language: language.to_string(),
            compilation_status: na(),
            run_status: na(),
            test_status: na(),
            test_summary: na(),
            sql_validation: na(),
            html_validation: na(),
            css_validation: na(),
        }
    }

    pub fn clone_failed(task: &RepoTask, message: &str) -> Self {
        Self::blank(task, format!("Failed: {message}"), Language::Unknown)
    }

    pub fn unknown_language(task: &RepoTask) -> Self {
        Self::blank(task, "Success".to_string(), Language::Unknown)
    }

    pub fn completed(
        task: &RepoTask,
        language: Language,
        build: &BuildReport,
        tests: &TestOutcome,
    ) -> Self {
        let or_na = |s: &Option<String>| s.clone().unwrap_or_else(|| NOT_APPLICABLE.to_string());
        Self {
            compilation_status: build.compile.message.clone(),
            run_status: build.run.message.clone(),
            test_status: tests.status.message.clone(),
            test_summary: tests.summary_text.clone(),
            sql_validation: or_na(&build.sql_summary),
            html_validation: or_na(&build.html_summary),
            css_validation: or_na(&build.css_summary),
            ..Self::blank(task, "Success".to_string(), language)
        }
    }
}

/// Writes the accumulated rows. Called after every repository so an
/// interrupted run still leaves a report behind.
pub struct ReportWriter {
    csv_path: Option<PathBuf>,
    json_path: Option<PathBuf>,
}

impl ReportWriter {
    pub fn new(dir: &Path, cfg: &Output) -> Self {
        Self {
            csv_path: cfg.write_csv.then(|| dir.join(&cfg.csv_filename)),
            json_path: cfg.write_json.then(|| dir.join(&cfg.json_filename)),
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.csv_path.iter().chain(self.json_path.iter()).map(PathBuf::as_path)
    }

    pub fn write(&self, records: &[ReportRecord]) -> Result<()> {
        if let Some(path) = &self.csv_path {
            write_csv(path, records)?;
        }
        if let Some(path) = &self.json_path {
            write_json(path, records)?;
        }
        Ok(())
    }
}

pub fn write_csv(path: &Path, records: &[ReportRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let tmp = path.with_extension("csv.tmp");
    {
        let mut w = csv::Writer::from_path(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        // Explicit header so an empty run still produces the column row.
        w.write_record(COLUMNS)?;
        for r in records {
            w.write_record([
                &r.repository,
                &r.folder_name,
                &r.clone_status,
                &r.language,
                &r.compilation_status,
                &r.run_status,
                &r.test_status,
                &r.test_summary,
                &r.sql_validation,
                &r.html_validation,
                &r.css_validation,
            ])?;
        }
        w.flush().with_context(|| format!("flushing {}", tmp.display()))?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("writing {}", path.display()))
}

pub fn write_json(path: &Path, records: &[ReportRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_string_pretty(records)?)
        .with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("writing {}", path.display()))
}
