mod support;

use repo_audit::config::Config;
use repo_audit::dispatch::java::{RUN_SKIPPED_COMPILE, RUN_SKIPPED_NO_MAIN};
use repo_audit::dispatch::sql::ALL_PASSED;
use repo_audit::dispatch::{NO_COMPILATION, NO_RUN};
use repo_audit::fetch::GitFetcher;
use repo_audit::pipeline::{Auditor, Workspace};
use repo_audit::report::{COLUMNS, ReportRecord, ReportWriter};
use repo_audit::repo_list::RepoTask;
use repo_audit::stage::{NOT_APPLICABLE, StageOutcome};
use repo_audit::testrun::NO_TESTS;
use support::{FixedValidator, ScriptedRunner, TreeFetcher, css_error, exited};

fn task(folder: &str) -> RepoTask {
    RepoTask {
        url: format!("https://example.invalid/{folder}.git"),
        folder_name: folder.to_string(),
    }
}

fn audit_one(cfg: &Config, runner: &ScriptedRunner, fetcher: &TreeFetcher) -> ReportRecord {
    let work = tempfile::tempdir().unwrap();
    let ws = Workspace::new(work.path()).unwrap();
    Auditor::new(cfg, runner, fetcher).audit(&task("demo"), &ws)
}

fn assert_na_after_language(r: &ReportRecord) {
    for cell in [
        &r.compilation_status,
        &r.run_status,
        &r.test_status,
        &r.test_summary,
        &r.sql_validation,
        &r.html_validation,
        &r.css_validation,
    ] {
        assert_eq!(cell, NOT_APPLICABLE);
    }
}

#[test]
fn clone_failure_yields_single_na_row() {
    let cfg = Config::default();
    let runner = ScriptedRunner::new(|_| {
        Ok(exited(
            128,
            "",
            "fatal: unable to access 'https://example.invalid/missing.git/': Could not resolve host",
        ))
    });
    let fetcher = GitFetcher::new(&cfg, &runner);
    let work = tempfile::tempdir().unwrap();
    let ws = Workspace::new(work.path()).unwrap();

    let record = Auditor::new(&cfg, &runner, &fetcher).audit(&task("missing"), &ws);

    assert!(record.clone_status.starts_with("Failed:"), "{}", record.clone_status);
    assert!(record.clone_status.contains("Could not resolve host"));
    assert_eq!(record.language, "Unknown");
    assert_na_after_language(&record);

    let calls = runner.calls();
    assert_eq!(calls.len(), 1, "nothing runs after a failed clone");
    assert_eq!(calls[0].program, "git");
    assert_eq!(&calls[0].args[..2], ["clone", "--"]);
    assert!(
        calls[0]
            .env
            .contains(&("GIT_TERMINAL_PROMPT".to_string(), "0".to_string()))
    );
}

#[test]
fn unknown_language_is_all_na_and_removed() {
    let cfg = Config::default();
    let runner = ScriptedRunner::succeeding();
    let fetcher = TreeFetcher::new(&[("README.md", "# notes"), ("data/raw.bin", "xx")]);
    let work = tempfile::tempdir().unwrap();
    let ws = Workspace::new(work.path()).unwrap();

    let record = Auditor::new(&cfg, &runner, &fetcher).audit(&task("notes"), &ws);

    assert_eq!(record.clone_status, "Success");
    assert_eq!(record.language, "Unknown");
    assert_na_after_language(&record);
    assert!(runner.calls().is_empty());
    assert!(!ws.clones.join("notes").exists());
}

#[test]
fn java_compile_failure_skips_run_and_tests() {
    let cfg = Config::default();
    let runner = ScriptedRunner::new(|spec| {
        if spec.program == "javac" {
            Ok(exited(1, "", "App.java:3: error: ';' expected\n1 error\n"))
        } else {
            Ok(exited(0, "", ""))
        }
    });
    let fetcher = TreeFetcher::new(&[(
        "App.java",
        "public class App {\n  public static void main(String[] args) {\n    int x = 1\n  }\n}\n",
    )]);

    let record = audit_one(&cfg, &runner, &fetcher);

    assert_eq!(record.language, "Java");
    assert!(
        record.compilation_status.starts_with("Compilation failed for App.java"),
        "{}",
        record.compilation_status
    );
    assert!(record.compilation_status.contains("';' expected"));
    assert_eq!(record.run_status, RUN_SKIPPED_COMPILE);
    assert_eq!(record.test_status, "Tests skipped: build failed");
    assert_eq!(runner.programs(), vec!["javac".to_string()]);
}

#[test]
fn java_entry_point_compiles_then_runs_qualified_class() {
    let cfg = Config::default();
    let runner = ScriptedRunner::succeeding();
    let fetcher = TreeFetcher::new(&[(
        "src/com/acme/Main.java",
        "package com.acme;\n\npublic class Main {\n  public static void main(final String... args) {}\n}\n",
    )]);

    let record = audit_one(&cfg, &runner, &fetcher);

    assert_eq!(record.compilation_status, "Compiled successfully");
    assert_eq!(record.run_status, "Main method ran successfully");
    assert_eq!(record.test_status, NO_TESTS);
    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].program, "javac");
    assert!(calls[0].args.iter().any(|a| a.starts_with('@')), "sources go through an argfile");
    assert_eq!(calls[1].program, "java");
    assert_eq!(calls[1].args.last().map(String::as_str), Some("com.acme.Main"));
}

#[test]
fn maven_project_without_main_compiles_and_tests() {
    let cfg = Config::default();
    let runner = ScriptedRunner::new(|spec| match spec.args.get(1).map(String::as_str) {
        Some("compile") => Ok(exited(0, "[INFO] BUILD SUCCESS\n", "")),
        Some("test") => Ok(exited(
            0,
            "[INFO] Tests run: 3, Failures: 0, Errors: 0, Skipped: 0\n[INFO] BUILD SUCCESS\n",
            "",
        )),
        _ => Ok(exited(2, "", "unexpected")),
    });
    let fetcher = TreeFetcher::new(&[
        ("pom.xml", "<project/>"),
        ("src/main/java/app/Service.java", "package app;\nclass Service {}\n"),
        ("src/test/java/app/ServiceTest.java", "package app;\nclass ServiceTest {}\n"),
    ]);

    let record = audit_one(&cfg, &runner, &fetcher);

    assert_eq!(record.language, "Java");
    assert_eq!(record.compilation_status, "Compiled successfully");
    assert_eq!(record.run_status, RUN_SKIPPED_NO_MAIN);
    assert_eq!(record.test_status, "Tests ran successfully");
    assert_eq!(record.test_summary, "3 out of 3 tests passed");
    assert_eq!(runner.programs(), vec!["mvn".to_string(), "mvn".to_string()]);
}

#[test]
fn python_entry_runs_without_compilation() {
    let cfg = Config::default();
    let runner = ScriptedRunner::succeeding();
    let fetcher = TreeFetcher::new(&[("main.py", "print('hi')\n")]);

    let record = audit_one(&cfg, &runner, &fetcher);

    assert_eq!(record.language, "Python");
    assert_eq!(record.compilation_status, NO_COMPILATION);
    assert_eq!(record.run_status, "Ran successfully");
    assert_eq!(record.test_status, NO_TESTS);
    assert_eq!(record.test_summary, NOT_APPLICABLE);
    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args, vec!["main.py".to_string()]);
}

#[test]
fn python_unittest_failures_are_summarized() {
    let cfg = Config::default();
    let runner = ScriptedRunner::new(|spec| {
        if spec.args.first().map(String::as_str) == Some("-m") {
            Ok(exited(1, "", "F.\nRan 2 tests in 0.001s\n\nFAILED (failures=1)\n"))
        } else {
            Ok(exited(0, "", ""))
        }
    });
    let fetcher = TreeFetcher::new(&[("app.py", "x = 1\n"), ("test_app.py", "import unittest\n")]);

    let record = audit_one(&cfg, &runner, &fetcher);

    assert_eq!(record.run_status, "Ran successfully");
    assert_eq!(record.test_status, "Tests failed");
    assert_eq!(record.test_summary, "1 out of 2 tests passed");
}

#[test]
fn javascript_without_entry_reports_missing_entry() {
    let cfg = Config::default();
    let runner = ScriptedRunner::succeeding();
    let fetcher = TreeFetcher::new(&[("lib/util.js", "module.exports = {};\n")]);

    let record = audit_one(&cfg, &runner, &fetcher);

    assert_eq!(record.language, "JavaScript");
    assert!(record.run_status.starts_with("Run failed: no entry file found"));
    assert!(runner.calls().is_empty());
}

#[test]
fn markup_validation_lists_each_file() {
    let cfg = Config::default();
    let runner = ScriptedRunner::succeeding();
    let fetcher = TreeFetcher::new(&[
        ("index.html", "<!DOCTYPE html><title>x</title>"),
        ("css/site.css", "body { colr: red }"),
    ]);
    let validator = FixedValidator {
        html: StageOutcome::ok("HTML validation passed successfully"),
        css: css_error("Line 1, Column 8: Property colr doesn't exist"),
    };
    let work = tempfile::tempdir().unwrap();
    let ws = Workspace::new(work.path()).unwrap();

    let record = Auditor::new(&cfg, &runner, &fetcher)
        .with_validator(&validator)
        .audit(&task("site"), &ws);

    assert_eq!(record.language, "HTML/CSS");
    assert_eq!(record.compilation_status, NO_COMPILATION);
    assert_eq!(record.run_status, NO_RUN);
    assert_eq!(record.html_validation, "index.html HTML validation passed successfully");
    assert_eq!(
        record.css_validation,
        "css/site.css CSS validation issues found: Line 1, Column 8: Property colr doesn't exist"
    );
    assert_eq!(record.sql_validation, NOT_APPLICABLE);
}

#[test]
fn sql_files_share_one_database() {
    let cfg = Config::default();
    let runner = ScriptedRunner::succeeding();
    let fetcher = TreeFetcher::new(&[
        ("01_schema.sql", "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);\n"),
        ("02_data.sql", "INSERT INTO t (name) VALUES ('a');\nSELECT * FROM t;\n"),
    ]);

    let record = audit_one(&cfg, &runner, &fetcher);

    assert_eq!(record.language, "SQL");
    assert_eq!(record.sql_validation, ALL_PASSED);
    assert_eq!(record.html_validation, NOT_APPLICABLE);
}

#[test]
fn sql_syntax_error_names_the_file() {
    let cfg = Config::default();
    let runner = ScriptedRunner::succeeding();
    let fetcher = TreeFetcher::new(&[
        ("a.sql", "CREATE TABLE t (id INTEGER);\n"),
        ("b.sql", "SELEC * FROM t;\n"),
    ]);

    let record = audit_one(&cfg, &runner, &fetcher);

    assert!(
        record
            .sql_validation
            .starts_with("SQL syntax check failed for 1 of 2 file(s)"),
        "{}",
        record.sql_validation
    );
    assert!(record.sql_validation.contains("a.sql: passed"));
    assert!(record.sql_validation.contains("b.sql: failed:"));
}

#[test]
fn run_all_keeps_order_and_writes_report() {
    let cfg = Config::default();
    let runner = ScriptedRunner::succeeding();
    let fetcher = TreeFetcher::new(&[("main.py", "print('hi')\n")]);
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let ws = Workspace::new(work.path()).unwrap();
    let writer = ReportWriter::new(out.path(), &cfg.output);
    let tasks = vec![task("zeta"), task("alpha")];

    let records = Auditor::new(&cfg, &runner, &fetcher)
        .run_all(&tasks, &ws, Some(&writer))
        .unwrap();
    assert_eq!(records.len(), 2);

    let mut rdr = csv::Reader::from_path(out.path().join("report.csv")).unwrap();
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, COLUMNS);
    let folders: Vec<String> = rdr
        .records()
        .map(|r| r.unwrap()[1].to_string())
        .collect();
    assert_eq!(folders, vec!["zeta", "alpha"]);

    let json = std::fs::read_to_string(out.path().join("report.json")).unwrap();
    let parsed: Vec<ReportRecord> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, records);
}
