use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub tools: Tools,
    #[serde(default)]
    pub entry: Entry,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub validation: Validation,
    #[serde(default)]
    pub preview: Preview,
    #[serde(default)]
    pub cleanup: Cleanup,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// A stable, normalization-friendly string for hashing.
    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    /// Give every run its own timestamped workspace instead of reusing `work_dir`.
    pub isolate_runs: bool,
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            isolate_runs: true,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub work_dir: String,
    pub out_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            work_dir: ".repo-audit-work".into(),
            out_dir: "out".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tools {
    pub git: String,
    pub javac: String,
    pub java: String,
    pub mvn: String,
    pub python: String,
    pub node: String,
    /// Empty selects the platform opener (`xdg-open`, `open`, `cmd /C start`).
    pub browser: String,
}
impl Default for Tools {
    fn default() -> Self {
        Self {
            git: "git".into(),
            javac: "javac".into(),
            java: "java".into(),
            mvn: "mvn".into(),
            python: "python3".into(),
            node: "node".into(),
            browser: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Entry {
    pub python_candidates: Vec<String>,
    pub javascript_candidates: Vec<String>,
}
impl Default for Entry {
    fn default() -> Self {
        Self {
            python_candidates: vec!["main.py".into(), "app.py".into(), "__main__.py".into()],
            javascript_candidates: vec!["main.js".into(), "index.js".into(), "app.js".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// 0 disables the timeout.
    pub stage_timeout_seconds: u64,
    pub clone_timeout_seconds: u64,
    /// Captured stderr is cut to this many bytes before landing in a report cell.
    pub max_output_bytes: usize,
}
impl Default for Limits {
    fn default() -> Self {
        Self {
            stage_timeout_seconds: 300,
            clone_timeout_seconds: 600,
            max_output_bytes: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Validation {
    pub enabled: bool,
    pub html_endpoint: String,
    pub css_endpoint: String,
    pub http_timeout_seconds: u64,
    pub user_agent: String,
}
impl Default for Validation {
    fn default() -> Self {
        Self {
            enabled: true,
            html_endpoint: "https://validator.w3.org/nu/".into(),
            css_endpoint: "https://jigsaw.w3.org/css-validator/validator".into(),
            http_timeout_seconds: 60,
            user_agent: concat!("repo-audit/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preview {
    pub open_in_browser: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    Keep,
    RemoveUnknown,
    RemoveAll,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Cleanup {
    pub policy: CleanupPolicy,
}
impl Default for Cleanup {
    fn default() -> Self {
        Self {
            policy: CleanupPolicy::RemoveUnknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub write_csv: bool,
    pub write_json: bool,
    pub csv_filename: String,
    pub json_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_csv: true,
            write_json: true,
            csv_filename: "report.csv".into(),
            json_filename: "report.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            dump_effective_config: true,
        }
    }
}
