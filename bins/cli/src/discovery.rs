//! Directory scanning for batch uploads.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use walkdir::WalkDir;

/// Compile a shell wildcard (`*`, `?`) into an anchored regex.
pub fn wildcard_to_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 2);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');

    Regex::new(&expr).with_context(|| format!("invalid file pattern '{pattern}'"))
}

/// Regular files under `dir` whose file name matches `pattern`, sorted by path.
pub fn find_files(dir: &Path, pattern: &Regex, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut walker = WalkDir::new(dir).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("failed to scan {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if pattern.is_match(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File or directory name.
    pub name: String,
    /// Size in bytes; `None` for directories.
    pub size: Option<u64>,
}

/// Direct children of `dir` whose name matches `pattern`, sorted by name.
pub fn list_dir(dir: &Path, pattern: &Regex) -> Result<Vec<DirEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !pattern.is_match(&name) {
            continue;
        }
        let size = if entry.file_type().is_dir() {
            None
        } else {
            Some(entry.metadata().map(|m| m.len()).unwrap_or(0))
        };
        entries.push(DirEntry { name, size });
    }
    Ok(entries)
}
