use super::{BuildReport, NO_COMPILATION, NO_RUN};
use crate::stage::StageOutcome;
use crate::util::display_rel;
use crate::walk::files_with_ext;
use anyhow::{Context, Result};
use rusqlite::{Batch, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

pub const ALL_PASSED: &str = "All SQL files passed syntax check";
pub const NO_SQL_FILES: &str = "No SQL files found";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlFileCheck {
    pub file: String,
    pub passed: bool,
    /// SQLite's error text when the file did not execute.
    pub error: Option<String>,
}

pub fn check_repo(repo: &Path) -> BuildReport {
    let summary = match check_sql_files(repo) {
        Ok(checks) => summarize(&checks),
        Err(err) => format!("SQL check failed: {err:#}"),
    };
    BuildReport {
        sql_summary: Some(summary),
        ..BuildReport::new(StageOutcome::ok(NO_COMPILATION), StageOutcome::ok(NO_RUN))
    }
}

/// Runs every `.sql` file, in walk order, against one throwaway in-memory
/// SQLite database so later files can use tables earlier ones created.
pub fn check_sql_files(repo: &Path) -> Result<Vec<SqlFileCheck>> {
    let files = files_with_ext(repo, &["sql"]);
    info!("checking {} SQL file(s) in {}", files.len(), repo.display());
    let conn = Connection::open_in_memory().context("opening in-memory SQLite")?;

    let mut checks = Vec::with_capacity(files.len());
    for path in &files {
        let file = display_rel(path, repo);
        let result = std::fs::read(path)
            .map_err(|e| format!("unreadable: {e}"))
            .and_then(|bytes| {
                let sql = reformat_sql(&String::from_utf8_lossy(&bytes));
                run_script(&conn, &sql).map_err(|e| e.to_string())
            });
        match result {
            Ok(()) => {
                debug!("{file}: ok");
                checks.push(SqlFileCheck {
                    file,
                    passed: true,
                    error: None,
                });
            }
            Err(err) => {
                warn!("{file}: {err}");
                checks.push(SqlFileCheck {
                    file,
                    passed: false,
                    error: Some(err),
                });
            }
        }
    }
    Ok(checks)
}

/// Steps every statement to completion; a `SELECT` in a seed script is
/// valid and its rows are discarded.
fn run_script(conn: &Connection, sql: &str) -> rusqlite::Result<()> {
    let mut batch = Batch::new(conn, sql);
    while let Some(mut stmt) = batch.next()? {
        let mut rows = stmt.query([])?;
        while rows.next()?.is_some() {}
    }
    Ok(())
}

pub fn summarize(checks: &[SqlFileCheck]) -> String {
    if checks.is_empty() {
        return NO_SQL_FILES.to_string();
    }
    let failed = checks.iter().filter(|c| !c.passed).count();
    if failed == 0 {
        return ALL_PASSED.to_string();
    }
    let per_file: Vec<String> = checks
        .iter()
        .map(|c| match &c.error {
            None => format!("{}: passed", c.file),
            Some(e) => format!("{}: failed: {}", c.file, e),
        })
        .collect();
    format!(
        "SQL syntax check failed for {} of {} file(s): {}",
        failed,
        checks.len(),
        per_file.join("; ")
    )
}

/// Normalizes a script before execution: BOM, line endings, Unicode (NFC),
/// trailing whitespace, and runs of blank lines.
pub fn reformat_sql(raw: &str) -> String {
    let text = raw.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let text: String = text.nfc().collect();

    let mut out = Vec::new();
    let mut blank_run = 0usize;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push(line);
    }
    out.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reformat_collapses_noise() {
        let raw = "\u{feff}CREATE TABLE t (id INT);   \r\n\r\n\r\n\r\nINSERT INTO t VALUES (1);\r\n";
        assert_eq!(
            reformat_sql(raw),
            "CREATE TABLE t (id INT);\n\nINSERT INTO t VALUES (1);"
        );
    }

    #[test]
    fn summary_lists_every_file_on_failure() {
        let checks = vec![
            SqlFileCheck {
                file: "a.sql".into(),
                passed: true,
                error: None,
            },
            SqlFileCheck {
                file: "b.sql".into(),
                passed: false,
                error: Some("near \"SELEC\": syntax error".into()),
            },
        ];
        assert_eq!(
            summarize(&checks),
            "SQL syntax check failed for 1 of 2 file(s): a.sql: passed; b.sql: failed: near \"SELEC\": syntax error"
        );
    }
}
