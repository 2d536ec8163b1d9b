use super::{BuildReport, RepoDirs};
use crate::config::Config;
use crate::entry::{EntryPoint, find_main_class};
use crate::exec::{CommandSpec, ProcessRunner};
use crate::stage::{FailureKind, StageOutcome};
use crate::util::{display_rel, ensure_dir, remove_tree, tail_chars};
use crate::walk::files_with_ext;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const RUN_SKIPPED_COMPILE: &str = "Run skipped: compilation failed";
pub const RUN_SKIPPED_NO_MAIN: &str = "Run skipped: no main method found";

pub fn build_and_run<R: ProcessRunner>(cfg: &Config, runner: &R, dirs: RepoDirs<'_>) -> BuildReport {
    match find_main_class(dirs.repo) {
        Some(entry) => compile_and_run_entry(cfg, runner, dirs, &entry),
        None => {
            info!("no main method in {}; falling back to Maven", dirs.repo.display());
            maven_compile(cfg, runner, dirs.repo)
        }
    }
}

/// Every `.java` file except those under `src/test`.
pub fn main_sources(repo: &Path) -> Vec<PathBuf> {
    let test_root = repo.join("src").join("test");
    files_with_ext(repo, &["java"])
        .into_iter()
        .filter(|p| !p.starts_with(&test_root))
        .collect()
}

fn compile_and_run_entry<R: ProcessRunner>(
    cfg: &Config,
    runner: &R,
    dirs: RepoDirs<'_>,
    entry: &EntryPoint,
) -> BuildReport {
    let max = cfg.limits.max_output_bytes;
    let entry_rel = display_rel(&entry.path, dirs.repo);
    let classes = dirs.scratch.join("classes");

    let compile = match compile_sources(cfg, runner, dirs, &classes) {
        Ok(outcome) => outcome,
        Err(err) => StageOutcome::failed(FailureKind::Compile, format!("Compilation failed: {err:#}")),
    };
    if !compile.succeeded {
        let detail = compile
            .message
            .strip_prefix("Compilation failed: ")
            .unwrap_or(&compile.message);
        let compile = StageOutcome::failed(
            FailureKind::Compile,
            format!("Compilation failed for {entry_rel}: {detail}"),
        );
        return BuildReport::new(
            compile,
            StageOutcome::failed(FailureKind::Compile, RUN_SKIPPED_COMPILE),
        );
    }

    let class_path = classes.display().to_string();
    let qualified = entry.qualified_name();
    let spec = CommandSpec::new(&cfg.tools.java)
        .args(["-cp", class_path.as_str(), qualified.as_str()])
        .cwd(dirs.repo)
        .timeout_secs(cfg.limits.stage_timeout_seconds);
    info!("running {}", spec.display());
    let run = match runner.run(&spec) {
        Ok(out) => StageOutcome::from_process(
            "Run",
            FailureKind::RunExit,
            "Main method ran successfully",
            &out,
            max,
        ),
        Err(err) => StageOutcome::from_exec_error("Run", &err, max),
    };
    BuildReport::new(compile, run)
}

fn compile_sources<R: ProcessRunner>(
    cfg: &Config,
    runner: &R,
    dirs: RepoDirs<'_>,
    classes: &Path,
) -> anyhow::Result<StageOutcome> {
    let sources = main_sources(dirs.repo);
    if sources.is_empty() {
        return Ok(StageOutcome::failed(
            FailureKind::Compile,
            "Compilation failed: no main source files outside src/test",
        ));
    }

    // Fresh output directory so stale classes from an earlier pull can't mask errors.
    remove_tree(classes)?;
    ensure_dir(classes)?;

    // javac reads the file list from an argfile; a big repository would blow
    // past the platform's argv limit otherwise.
    let argfile = dirs.scratch.join("sources.txt");
    let listing: Vec<String> = sources.iter().map(|p| argfile_quote(p)).collect();
    std::fs::write(&argfile, listing.join("\n"))?;

    let spec = CommandSpec::new(&cfg.tools.javac)
        .arg("-d")
        .arg(classes.display().to_string())
        .arg(format!("@{}", argfile.display()))
        .cwd(dirs.repo)
        .timeout_secs(cfg.limits.stage_timeout_seconds);
    info!("compiling {} source file(s): {}", sources.len(), spec.display());

    let max = cfg.limits.max_output_bytes;
    Ok(match runner.run(&spec) {
        Ok(out) => {
            if !out.success() {
                warn!("javac failed for {}", dirs.repo.display());
            }
            StageOutcome::from_process("Compilation", FailureKind::Compile, "Compiled successfully", &out, max)
        }
        Err(err) => StageOutcome::from_exec_error("Compilation", &err, max),
    })
}

fn maven_compile<R: ProcessRunner>(cfg: &Config, runner: &R, repo: &Path) -> BuildReport {
    let max = cfg.limits.max_output_bytes;
    let spec = CommandSpec::new(&cfg.tools.mvn)
        .args(["-B", "compile"])
        .cwd(repo)
        .timeout_secs(cfg.limits.stage_timeout_seconds);
    info!("compiling with {}", spec.display());
    let compile = match runner.run(&spec) {
        Ok(out) if out.success() => StageOutcome::ok("Compiled successfully"),
        // Maven reports errors on stdout with `[ERROR]` prefixes, stderr is usually empty.
        Ok(out) => StageOutcome::failed(
            FailureKind::Compile,
            format!(
                "Compilation failed: {} ({})",
                tail_chars(&error_lines(&out.stdout, out.diagnostic()), max),
                out.exit_label()
            ),
        ),
        Err(err) => StageOutcome::from_exec_error("Compilation", &err, max),
    };
    BuildReport::new(
        compile,
        StageOutcome::failed(FailureKind::RunMissingEntry, RUN_SKIPPED_NO_MAIN),
    )
}

/// `[ERROR]` lines from Maven output, or the fallback text if there are none.
fn error_lines(stdout: &str, fallback: &str) -> String {
    let errors: Vec<&str> = stdout
        .lines()
        .filter(|l| l.starts_with("[ERROR]"))
        .collect();
    if errors.is_empty() {
        fallback.to_string()
    } else {
        errors.join("\n")
    }
}

fn argfile_quote(path: &Path) -> String {
    let s = path.display().to_string();
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
