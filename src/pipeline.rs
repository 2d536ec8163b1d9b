use crate::{
    browser::BrowserOpener,
    config::{CleanupPolicy, Config},
    detect::{DetectionResult, Language, detect_language},
    dispatch::{Dispatcher, RepoDirs},
    exec::ProcessRunner,
    fetch::Fetcher,
    report::{ReportRecord, ReportWriter},
    repo_list::RepoTask,
    testrun::{TestOutcome, TestRunner},
    util::{ensure_dir, remove_tree},
    validate::MarkupValidator,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, info_span, warn};

/// Where one run keeps its checkouts and per-repository scratch space.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub clones: PathBuf,
    pub scratch: PathBuf,
}

impl Workspace {
    /// `root` is made absolute: tools run with the checkout as their working
    /// directory, so every path handed to them must not depend on ours.
    pub fn new(root: &Path) -> Result<Self> {
        let root = std::path::absolute(root)
            .with_context(|| format!("resolving workspace root: {}", root.display()))?;
        let ws = Self {
            clones: root.join("repos"),
            scratch: root.join("scratch"),
        };
        ensure_dir(&ws.clones)?;
        ensure_dir(&ws.scratch)?;
        Ok(ws)
    }
}

pub struct Auditor<'a, R: ProcessRunner, F: Fetcher> {
    cfg: &'a Config,
    runner: &'a R,
    fetcher: &'a F,
    validator: Option<&'a dyn MarkupValidator>,
    opener: Option<&'a dyn BrowserOpener>,
}

impl<'a, R: ProcessRunner, F: Fetcher> Auditor<'a, R, F> {
    pub fn new(cfg: &'a Config, runner: &'a R, fetcher: &'a F) -> Self {
        Self {
            cfg,
            runner,
            fetcher,
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

    /// Audits every task in order. The report is rewritten after each
    /// repository; only a failure to write it aborts the batch.
    pub fn run_all(
        &self,
        tasks: &[RepoTask],
        ws: &Workspace,
        writer: Option<&ReportWriter>,
    ) -> Result<Vec<ReportRecord>> {
        let mut records = Vec::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            info!("[{}/{}] {}", i + 1, tasks.len(), task.url);
            records.push(self.audit(task, ws));
            if let Some(w) = writer {
                w.write(&records)?;
            }
        }
        Ok(records)
    }

    pub fn audit(&self, task: &RepoTask, ws: &Workspace) -> ReportRecord {
        let _span = info_span!("repo", folder = %task.folder_name).entered();
        let started = Instant::now();
        let dest = ws.clones.join(&task.folder_name);

        let fetched = self.fetcher.fetch(&task.url, &dest);
        if !fetched.succeeded {
            warn!("fetch failed: {}", fetched.message);
            return ReportRecord::clone_failed(task, &fetched.message);
        }

        let detection = match detect_language(&dest, &self.cfg.tools) {
            Ok(d) => d,
            Err(err) => {
                warn!("detection failed: {err:#}");
                DetectionResult::unknown()
            }
        };
        info!("language: {} ({:?})", detection.language, detection.build_system);

        if detection.language == Language::Unknown {
            if matches!(
                self.cfg.cleanup.policy,
                CleanupPolicy::RemoveUnknown | CleanupPolicy::RemoveAll
            ) {
                discard(&dest);
            }
            return ReportRecord::unknown_language(task);
        }

        let scratch = ws.scratch.join(&task.folder_name);
        let mut dispatcher = Dispatcher::new(self.cfg, self.runner);
        if let Some(v) = self.validator {
            dispatcher = dispatcher.with_validator(v);
        }
        if let Some(o) = self.opener {
            dispatcher = dispatcher.with_opener(o);
        }
        let build = dispatcher.dispatch(
            RepoDirs {
                repo: &dest,
                scratch: &scratch,
            },
            &detection,
        );

        let tests = if build.compile.succeeded {
            TestRunner::new(self.cfg, self.runner).run(&dest, &detection)
        } else {
            TestOutcome::skipped("build failed")
        };

        let record = ReportRecord::completed(task, detection.language, &build, &tests);
        info!(
            compile = %record.compilation_status,
            run = %record.run_status,
            tests = %record.test_status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "repository done"
        );

        if self.cfg.cleanup.policy == CleanupPolicy::RemoveAll {
            discard(&dest);
            discard(&scratch);
        }
        record
    }
}

fn discard(path: &Path) {
    if let Err(err) = remove_tree(path) {
        warn!("error removing {}: {err:#}", path.display());
    }
}
