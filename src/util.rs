use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// `20261015T083012Z-1a2b3c4d`: sortable UTC stamp plus a short digest of the input list.
pub fn run_id(input_list: &[u8]) -> String {
    let stamp = time::OffsetDateTime::now_utc()
        .format(format_description!(
            "[year][month][day]T[hour][minute][second]Z"
        ))
        .unwrap_or_else(|_| "19700101T000000Z".to_string());
    let digest = sha256_hex(input_list);
    format!("{}-{}", stamp, &digest[..8])
}

/// Cut tool output down to `max` bytes on a char boundary, keeping the tail
/// where compilers and build tools put the interesting part.
pub fn tail_chars(s: &str, max: usize) -> String {
    let s = s.trim();
    if max == 0 || s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &s[start..])
}

/// Remove a directory tree, clearing read-only bits first. Git object files
/// are read-only on some platforms, which makes a plain `remove_dir_all` fail.
pub fn remove_tree(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    if let Err(first) = std::fs::remove_dir_all(path) {
        for entry in walkdir::WalkDir::new(path).into_iter().flatten() {
            if let Ok(meta) = entry.metadata() {
                let mut perms = meta.permissions();
                if perms.readonly() {
                    #[allow(clippy::permissions_set_readonly_false)]
                    perms.set_readonly(false);
                    let _ = std::fs::set_permissions(entry.path(), perms);
                }
            }
        }
        std::fs::remove_dir_all(path).with_context(|| {
            format!("removing {} (first attempt: {first})", path.display())
        })?;
    }
    Ok(())
}

/// Path relative to `base` for display, falling back to the full path.
pub fn display_rel(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}
