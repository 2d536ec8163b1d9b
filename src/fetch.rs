use crate::config::Config;
use crate::exec::{CommandSpec, ProcessRunner};
use crate::stage::{FailureKind, StageOutcome};
use crate::util::tail_chars;
use std::path::Path;
use tracing::info;

pub trait Fetcher {
    /// Clone `url` into `dest`, or update it if `dest` is already a checkout.
    fn fetch(&self, url: &str, dest: &Path) -> StageOutcome;
}

pub struct GitFetcher<R: ProcessRunner> {
    runner: R,
    git: String,
    timeout_seconds: u64,
    max_output: usize,
}

impl<R: ProcessRunner> GitFetcher<R> {
    pub fn new(cfg: &Config, runner: R) -> Self {
        Self {
            runner,
            git: cfg.tools.git.clone(),
            timeout_seconds: cfg.limits.clone_timeout_seconds,
            max_output: cfg.limits.max_output_bytes,
        }
    }

    fn run(&self, spec: CommandSpec, success: &str) -> StageOutcome {
        // Never block on a credential prompt for a private or mistyped URL.
        let spec = spec
            .env("GIT_TERMINAL_PROMPT", "0")
            .timeout_secs(self.timeout_seconds);
        match self.runner.run(&spec) {
            Ok(out) if out.success() => StageOutcome::ok(success),
            Ok(out) => {
                let detail = tail_chars(out.diagnostic(), self.max_output);
                let detail = if detail.is_empty() { out.exit_label() } else { detail };
                StageOutcome::failed(FailureKind::Clone, detail)
            }
            Err(err) => StageOutcome::failed(FailureKind::Clone, err.to_string()),
        }
    }
}

impl<R: ProcessRunner> Fetcher for GitFetcher<R> {
    fn fetch(&self, url: &str, dest: &Path) -> StageOutcome {
        let dest_str = dest.display().to_string();
        if dest.join(".git").exists() {
            info!("pulling {} in {}", url, dest_str);
            let spec = CommandSpec::new(&self.git)
                .args(["-C", dest_str.as_str(), "pull", "--ff-only"]);
            return self.run(spec, "Pulled successfully");
        }

        let non_empty_dir = std::fs::read_dir(dest)
            .map(|mut it| it.next().is_some())
            .unwrap_or(false);
        if non_empty_dir {
            return StageOutcome::failed(
                FailureKind::Clone,
                format!("destination exists and is not a git checkout: {dest_str}"),
            );
        }

        info!("cloning {} into {}", url, dest_str);
        // `--` keeps a URL that starts with `-` from being read as an option.
        let spec = CommandSpec::new(&self.git).args(["clone", "--", url, dest_str.as_str()]);
        self.run(spec, "Cloned successfully")
    }
}
