mod support;

use repo_audit::config::Config;
use repo_audit::exec::ExecError;
use repo_audit::fetch::{Fetcher, GitFetcher};
use repo_audit::stage::FailureKind;
use support::{ScriptedRunner, exited};
use std::time::Duration;

#[test]
fn existing_checkout_is_pulled() {
    let cfg = Config::default();
    let runner = ScriptedRunner::succeeding();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("proj");
    std::fs::create_dir_all(dest.join(".git")).unwrap();

    let outcome = GitFetcher::new(&cfg, &runner).fetch("https://example.invalid/proj.git", &dest);

    assert!(outcome.succeeded);
    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(&calls[0].args[2..], ["pull", "--ff-only"]);
}

#[test]
fn foreign_directory_is_not_clobbered() {
    let cfg = Config::default();
    let runner = ScriptedRunner::succeeding();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("proj");
    std::fs::create_dir_all(&dest).unwrap();
    std::fs::write(dest.join("notes.txt"), "mine").unwrap();

    let outcome = GitFetcher::new(&cfg, &runner).fetch("https://example.invalid/proj.git", &dest);

    assert!(outcome.is_kind(FailureKind::Clone));
    assert!(outcome.message.contains("not a git checkout"));
    assert!(runner.calls().is_empty());
}

#[test]
fn clone_timeout_is_a_clone_failure() {
    let cfg = Config::default();
    let runner = ScriptedRunner::new(|spec| {
        Err(ExecError::TimedOut {
            command: spec.display(),
            timeout: Duration::from_secs(600),
            stderr: String::new(),
        })
    });
    let dir = tempfile::tempdir().unwrap();

    let outcome =
        GitFetcher::new(&cfg, &runner).fetch("https://example.invalid/slow.git", &dir.path().join("slow"));

    assert!(!outcome.succeeded);
    assert!(outcome.message.contains("timed out after 600s"), "{}", outcome.message);
    assert_eq!(runner.calls()[0].timeout, Some(Duration::from_secs(600)));
}

#[test]
fn git_stderr_becomes_the_message() {
    let cfg = Config::default();
    let runner = ScriptedRunner::new(|_| Ok(exited(128, "", "fatal: repository 'x' not found\n")));
    let dir = tempfile::tempdir().unwrap();

    let outcome = GitFetcher::new(&cfg, &runner).fetch("x", &dir.path().join("x"));

    assert_eq!(outcome.message.trim(), "fatal: repository 'x' not found");
}
