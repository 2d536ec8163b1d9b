//! Language detection for a freshly cloned repository.
//!
//! A root `pom.xml` wins outright. Otherwise the tree is walked in sorted
//! order and the shallowest depth holding any recognized source file decides;
//! ties inside that depth go by [`Language::PRIORITY`]. The fixed order makes
//! mixed-language repositories (a Java service with an HTML front end, say)
//! classify the same way on every filesystem.

use crate::config::Tools;
use crate::walk::{has_ext, repo_walk};
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

pub const MAVEN_MANIFEST: &str = "pom.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Java,
    Python,
    JavaScript,
    #[serde(rename = "HTML/CSS")]
    HtmlCss,
    #[serde(rename = "SQL")]
    Sql,
    Unknown,
}

impl Language {
    /// Tie-break order for files found at the same depth.
    pub const PRIORITY: [Language; 5] = [
        Language::Java,
        Language::Python,
        Language::HtmlCss,
        Language::JavaScript,
        Language::Sql,
    ];

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Language::Java => &["java"],
            Language::Python => &["py"],
            Language::JavaScript => &["js", "mjs", "cjs"],
            Language::HtmlCss => &["html", "htm", "css"],
            Language::Sql => &["sql"],
            Language::Unknown => &[],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Java => "Java",
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::HtmlCss => "HTML/CSS",
            Language::Sql => "SQL",
            Language::Unknown => "Unknown",
        }
    }

    fn of_path(path: &Path) -> Option<Language> {
        Self::PRIORITY
            .into_iter()
            .find(|lang| has_ext(path, lang.extensions()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildSystem {
    Maven,
    Javac,
    None,
}

/// Program plus argument vector; no shell syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandTemplate {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for a in &self.args {
            write!(f, " {a}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub language: Language,
    pub build_system: BuildSystem,
    pub compile_command: Option<CommandTemplate>,
    pub run_command: Option<CommandTemplate>,
}

impl DetectionResult {
    pub fn unknown() -> Self {
        Self {
            language: Language::Unknown,
            build_system: BuildSystem::None,
            compile_command: None,
            run_command: None,
        }
    }

    pub fn is_maven(&self) -> bool {
        self.build_system == BuildSystem::Maven
    }

    fn for_language(language: Language, tools: &Tools) -> Self {
        let (build_system, compile_command, run_command) = match language {
            Language::Java => (
                BuildSystem::Javac,
                Some(CommandTemplate::new(&tools.javac, &["-d", "<out>", "<sources>"])),
                Some(CommandTemplate::new(&tools.java, &["-cp", ".", "Main"])),
            ),
            Language::Python => (
                BuildSystem::None,
                None,
                Some(CommandTemplate::new(&tools.python, &["main.py"])),
            ),
            Language::JavaScript => (
                BuildSystem::None,
                None,
                Some(CommandTemplate::new(&tools.node, &["main.js"])),
            ),
            Language::HtmlCss | Language::Sql | Language::Unknown => (BuildSystem::None, None, None),
        };
        Self {
            language,
            build_system,
            compile_command,
            run_command,
        }
    }

    fn maven(tools: &Tools) -> Self {
        Self {
            language: Language::Java,
            build_system: BuildSystem::Maven,
            compile_command: Some(CommandTemplate::new(&tools.mvn, &["compile"])),
            run_command: Some(CommandTemplate::new(&tools.mvn, &["test"])),
        }
    }
}

pub fn detect_language(repo: &Path, tools: &Tools) -> Result<DetectionResult> {
    if !repo.is_dir() {
        bail!("repository path is not a directory: {}", repo.display());
    }

    if repo.join(MAVEN_MANIFEST).is_file() {
        debug!(repo = %repo.display(), "found {MAVEN_MANIFEST}");
        return Ok(DetectionResult::maven(tools));
    }

    // Shallowest depth with a hit, and which languages showed up there.
    let mut best: Option<(usize, Vec<Language>)> = None;
    for entry in repo_walk(repo) {
        if !entry.file_type().is_file() {
            continue;
        }
        let depth = entry.depth();
        if let Some((d, _)) = &best {
            if depth > *d {
                continue;
            }
        }
        let Some(lang) = Language::of_path(entry.path()) else {
            continue;
        };
        match best.as_mut() {
            Some((d, langs)) if *d == depth => {
                if !langs.contains(&lang) {
                    langs.push(lang);
                }
            }
            _ => best = Some((depth, vec![lang])),
        }
    }

    let result = match best {
        Some((depth, langs)) => {
            let lang = Language::PRIORITY
                .into_iter()
                .find(|l| langs.contains(l))
                .unwrap_or(Language::Unknown);
            debug!(repo = %repo.display(), depth, found = ?langs, chosen = %lang, "extension scan");
            DetectionResult::for_language(lang, tools)
        }
        None => DetectionResult::unknown(),
    };
    Ok(result)
}
