use crate::walk::files_with_ext;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static MAIN_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"public\s+static\s+void\s+main\s*\(\s*(?:final\s+)?String\s*(?:\[\s*\]\s*[A-Za-z_$][\w$]*|\.\.\.\s*[A-Za-z_$][\w$]*|[A-Za-z_$][\w$]*\s*\[\s*\])\s*\)",
    )
    .expect("static regex")
});

static PACKAGE_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*package\s+([\w.]+)\s*;").expect("static regex"));

/// A Java source file declaring `public static void main(String[] args)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub path: PathBuf,
    pub package: Option<String>,
    pub class_name: String,
}

impl EntryPoint {
    /// `com.acme.App` or bare `App` in the default package.
    pub fn qualified_name(&self) -> String {
        match &self.package {
            Some(pkg) => format!("{pkg}.{}", self.class_name),
            None => self.class_name.clone(),
        }
    }
}

/// First `.java` file (in sorted walk order) with a main method.
pub fn find_main_class(repo: &Path) -> Option<EntryPoint> {
    for path in files_with_ext(repo, &["java"]) {
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(err) => {
                debug!(file = %path.display(), error = %err, "skipping unreadable source");
                continue;
            }
        };
        if let Some(entry) = parse_entry(&path, &content) {
            debug!(file = %path.display(), class = %entry.qualified_name(), "found main method");
            return Some(entry);
        }
    }
    None
}

pub fn parse_entry(path: &Path, content: &str) -> Option<EntryPoint> {
    if !MAIN_SIGNATURE.is_match(content) {
        return None;
    }
    let class_name = path.file_stem()?.to_str()?.to_string();
    let package = PACKAGE_DECL
        .captures(content)
        .map(|c| c[1].to_string());
    Some(EntryPoint {
        path: path.to_path_buf(),
        package,
        class_name,
    })
}
