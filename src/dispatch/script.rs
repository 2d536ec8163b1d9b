use super::{BuildReport, NO_COMPILATION};
use crate::config::Config;
use crate::exec::{CommandSpec, ProcessRunner};
use crate::stage::{FailureKind, StageOutcome};
use std::path::Path;
use tracing::info;

/// Interpreted languages: no compile stage, run the first conventional entry file.
pub fn run_entry<R: ProcessRunner>(
    cfg: &Config,
    runner: &R,
    repo: &Path,
    interpreter: &str,
    candidates: &[String],
) -> BuildReport {
    let compile = StageOutcome::ok(NO_COMPILATION);

    let Some(entry) = candidates.iter().find(|c| repo.join(c.as_str()).is_file()) else {
        return BuildReport::new(
            compile,
            StageOutcome::failed(
                FailureKind::RunMissingEntry,
                format!("Run failed: no entry file found ({})", candidates.join(", ")),
            ),
        );
    };

    let spec = CommandSpec::new(interpreter)
        .arg(entry.as_str())
        .cwd(repo)
        .timeout_secs(cfg.limits.stage_timeout_seconds);
    info!("running {}", spec.display());
    let max = cfg.limits.max_output_bytes;
    let run = match runner.run(&spec) {
        Ok(out) => StageOutcome::from_process("Run", FailureKind::RunExit, "Ran successfully", &out, max),
        Err(err) => StageOutcome::from_exec_error("Run", &err, max),
    };
    BuildReport::new(compile, run)
}
