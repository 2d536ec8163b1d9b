use crate::{
    browser::SystemOpener,
    config::Config,
    detect::{Language, detect_language},
    entry::find_main_class,
    exec::{CommandSpec, ProcessRunner, SystemRunner},
    fetch::GitFetcher,
    pipeline::{Auditor, Workspace},
    repo_list::parse_repo_list,
    report::ReportWriter,
    util::{ensure_dir, now_rfc3339, run_id, sha256_hex},
    validate::W3cValidator,
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "repo-audit")]
#[command(about = "Batch repository auditor (clone, detect, build, run, test, report)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./repo-audit.toml if present, else defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check which external tools are available.
    Doctor {},
    /// Print the detection result for a local checkout.
    Detect {
        #[arg(long)]
        repo: PathBuf,
    },
    /// Clone, build, run and test every repository in a list.
    Audit {
        /// Text file with one `<url> <folder>` pair per line.
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long)]
        work_dir: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    match &args.cmd {
        Command::Doctor {} => {
            let _guard = init_logging(&args, &cfg, None)?;
            doctor(&cfg)
        }
        Command::Detect { repo } => {
            let _guard = init_logging(&args, &cfg, None)?;
            detect(&cfg, repo)
        }
        Command::Audit {
            input,
            out_dir,
            work_dir,
        } => audit(&args, &cfg, input, out_dir.as_deref(), work_dir.as_deref()),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("repo-audit.toml");
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr; stdout is reserved for the JSON the subcommands print.
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

#[derive(Debug, Serialize)]
struct ToolStatus {
    tool: &'static str,
    program: String,
    ok: bool,
    version: Option<String>,
    error: Option<String>,
}

fn doctor(cfg: &Config) -> Result<()> {
    let runner = SystemRunner::new();
    let t = &cfg.tools;
    let probes: [(&'static str, &str, &str); 6] = [
        ("git", &t.git, "--version"),
        ("javac", &t.javac, "-version"),
        ("java", &t.java, "-version"),
        ("mvn", &t.mvn, "-v"),
        ("python", &t.python, "--version"),
        ("node", &t.node, "--version"),
    ];

    let statuses: Vec<ToolStatus> = probes
        .into_iter()
        .map(|(tool, program, flag)| {
            let spec = CommandSpec::new(program).arg(flag).timeout_secs(30);
            match runner.run(&spec) {
                Ok(out) => ToolStatus {
                    tool,
                    program: program.to_string(),
                    ok: out.success(),
                    // `java -version` prints to stderr.
                    version: out
                        .combined()
                        .lines()
                        .map(str::trim)
                        .find(|l| !l.is_empty())
                        .map(String::from),
                    error: (!out.success()).then(|| out.exit_label()),
                },
                Err(err) => ToolStatus {
                    tool,
                    program: program.to_string(),
                    ok: false,
                    version: None,
                    error: Some(err.to_string()),
                },
            }
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&statuses)?);
    Ok(())
}

fn detect(cfg: &Config, repo: &Path) -> Result<()> {
    let detection = detect_language(repo, &cfg.tools)?;
    let entry = match detection.language {
        Language::Java => find_main_class(repo),
        _ => None,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "repo": repo,
            "detection": detection,
            "entry_point": entry.as_ref().map(|e| serde_json::json!({
                "path": e.path,
                "class": e.qualified_name(),
            })),
        }))?
    );
    Ok(())
}

fn audit(
    args: &Args,
    cfg: &Config,
    input: &Path,
    out_override: Option<&Path>,
    work_override: Option<&Path>,
) -> Result<()> {
    let raw = std::fs::read(input)
        .with_context(|| format!("reading repository list: {}", input.display()))?;
    let tasks = parse_repo_list(&String::from_utf8_lossy(&raw))
        .with_context(|| format!("parsing repository list: {}", input.display()))?;

    let run_id = run_id(&raw);
    let out_root = out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.out_dir));
    let run_dir = out_root.join(&run_id);
    ensure_dir(&run_dir)?;

    let log_path = resolve_log_path(cfg, &run_dir);
    let _guard = init_logging(args, cfg, log_path.as_deref())?;

    let work_root = work_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.work_dir));
    let work_root = if cfg.global.isolate_runs {
        work_root.join(&run_id)
    } else {
        work_root
    };
    let ws = Workspace::new(&work_root)?;

    info!(
        "run_id={run_id} repositories={} out={} work={}",
        tasks.len(),
        run_dir.display(),
        work_root.display()
    );

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        std::fs::write(run_dir.join("effective-config.toml"), raw)?;
    }

    let runner = SystemRunner::new();
    let fetcher = GitFetcher::new(cfg, &runner);
    let validator = if cfg.validation.enabled {
        Some(W3cValidator::new(&cfg.validation)?)
    } else {
        None
    };
    let opener = cfg
        .preview
        .open_in_browser
        .then(|| SystemOpener::new(&cfg.tools.browser));

    let mut auditor = Auditor::new(cfg, &runner, &fetcher);
    if let Some(v) = &validator {
        auditor = auditor.with_validator(v);
    }
    if let Some(o) = &opener {
        auditor = auditor.with_opener(o);
    }

    let writer = ReportWriter::new(&run_dir, &cfg.output);
    let started = now_rfc3339();
    // Header-only report up front, so even a run that dies on the first
    // repository leaves the columns behind.
    writer.write(&[])?;
    let records = auditor.run_all(&tasks, &ws, Some(&writer))?;

    let reports: Vec<String> = writer.paths().map(|p| p.display().to_string()).collect();
    let index = serde_json::json!({
        "run_id": run_id,
        "started": started,
        "finished": now_rfc3339(),
        "input": input,
        "config_sha256": sha256_hex(cfg.normalized_for_hash().as_bytes()),
        "workspace": work_root,
        "repositories": records.len(),
        "clone_failures": records.iter().filter(|r| r.clone_status.starts_with("Failed")).count(),
        "reports": reports,
    });
    std::fs::write(run_dir.join("index.json"), serde_json::to_string_pretty(&index)?)?;

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "run_id": run_id,
                "run_dir": run_dir,
                "repositories": records.len(),
                "reports": reports,
                "status": "ok"
            }))?
        );
    }

    Ok(())
}

fn resolve_log_path(cfg: &Config, run_dir: &Path) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    Some(run_dir.join("repo-audit.log"))
}
