use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Directories that never hold a project's own sources.
pub const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "build",
    "dist",
    "venv",
    "__pycache__",
];

/// Deterministic walk over a checkout: entries sorted by file name, VCS,
/// hidden and vendored directories skipped.
pub fn repo_walk(root: &Path) -> impl Iterator<Item = DirEntry> {
    let root_buf = root.to_path_buf();
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |e| !is_excluded(e, &root_buf))
        .filter_map(|res| match res {
            Ok(e) => Some(e),
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
}

/// All regular files whose extension (case-insensitive) is in `exts`, in walk order.
pub fn files_with_ext(root: &Path, exts: &[&str]) -> Vec<PathBuf> {
    repo_walk(root)
        .filter(|e| e.file_type().is_file() && has_ext(e.path(), exts))
        .map(DirEntry::into_path)
        .collect()
}

pub fn has_ext(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| exts.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

fn is_excluded(entry: &DirEntry, root: &Path) -> bool {
    if entry.path() == root || !entry.file_type().is_dir() {
        return false;
    }
    match entry.file_name().to_str() {
        Some(name) => {
            (name.starts_with('.') && name.len() > 1) || EXCLUDED_DIRS.contains(&name)
        }
        None => false,
    }
}
