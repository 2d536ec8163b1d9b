use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTask {
    pub url: String,
    pub folder_name: String,
}

/// Parses `<url> [folder]` lines. Later duplicates of a URL replace the
/// folder name but keep the first position. A folder may belong to only
/// one URL.
pub fn parse_repo_list(raw: &str) -> Result<Vec<RepoTask>> {
    let mut tasks: Vec<RepoTask> = Vec::new();

    for (idx, line) in raw.lines().enumerate() {
        let lineno = idx + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        let (url, folder) = match fields.as_slice() {
            [url] => (*url, folder_from_url(url)),
            [url, folder] => (*url, folder.to_string()),
            _ => bail!(
                "line {lineno}: expected `<url> <folder>`, got {} fields",
                fields.len()
            ),
        };

        validate_folder(&folder).with_context(|| format!("line {lineno}"))?;

        // Two repositories in one checkout directory would audit the wrong code.
        if let Some(other) = tasks.iter().find(|t| t.folder_name == folder && t.url != url) {
            bail!(
                "line {lineno}: folder {folder:?} is already used by {}",
                other.url
            );
        }

        match tasks.iter_mut().find(|t| t.url == url) {
            Some(existing) => existing.folder_name = folder,
            None => tasks.push(RepoTask {
                url: url.to_string(),
                folder_name: folder,
            }),
        }
    }

    Ok(tasks)
}

/// `https://host/org/name.git` -> `name`
pub fn folder_from_url(url: &str) -> String {
    let last = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(url);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

fn validate_folder(folder: &str) -> Result<()> {
    if folder.is_empty() {
        bail!("empty folder name");
    }
    let mut comps = Path::new(folder).components();
    match (comps.next(), comps.next()) {
        (Some(Component::Normal(_)), None) if !folder.contains(['/', '\\']) => Ok(()),
        _ => bail!("folder name must be a single plain path segment: {folder:?}"),
    }
}
