//! Export file discovery and loading.
//!
//! Finds the files of one category inside its folder and reads them into
//! memory for the parsers.

use std::path::{Path, PathBuf};

use health_core::error::{HealthError, Result};
use regex::Regex;
use tracing::{debug, warn};

// ── Public API ────────────────────────────────────────────────────────────────

/// Find the files directly inside `dir` whose name matches the glob
/// `pattern`, sorted by path.
///
/// A missing directory yields an empty list: the category simply has no
/// data.
pub fn find_matching_files(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        debug!("Category folder does not exist: {}", dir.display());
        return Vec::new();
    }

    let Some(matcher) = glob_to_regex(pattern) else {
        warn!("Unusable file pattern: {}", pattern);
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .map(|name| matcher.is_match(name))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Read a whole file as UTF-8 text.
pub fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| HealthError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Translate a file-name glob (`*` and `?` wildcards) into an anchored regex.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');
    Regex::new(&expr).ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
