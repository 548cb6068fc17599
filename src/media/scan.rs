//! Expansion of command-line inputs into an ordered file list.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::InputConfig;
use crate::error::InputError;

/// Expands files, directories and glob patterns into the list of files to
/// convert.
///
/// Files keep their command-line order. Directory contents are filtered by
/// the configured patterns and sorted by path; glob matches are sorted too.
/// Duplicates keep their first position.
pub fn collect_inputs(inputs: &[PathBuf], config: &InputConfig) -> Result<Vec<PathBuf>, InputError> {
    let patterns = compile_patterns(&config.file_patterns)?;
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for input in inputs {
        if input.is_file() {
            push_unique(&mut files, &mut seen, input.clone());
        } else if input.is_dir() {
            for path in scan_directory(input, config.recursive, &patterns) {
                push_unique(&mut files, &mut seen, path);
            }
        } else if is_glob(input) {
            for path in expand_glob(input)? {
                push_unique(&mut files, &mut seen, path);
            }
        } else {
            return Err(InputError::NotFound(input.clone()));
        }
    }

    if files.is_empty() {
        return Err(InputError::Empty);
    }

    info!(count = files.len(), "Collected input files");
    Ok(files)
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<glob::Pattern>, InputError> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|e| InputError::InvalidPattern {
                pattern: p.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

fn is_glob(input: &Path) -> bool {
    input.to_string_lossy().contains(&['*', '?', '['][..])
}

/// Expands a shell-style pattern the shell left unexpanded.
fn expand_glob(input: &Path) -> Result<Vec<PathBuf>, InputError> {
    let pattern = input.to_string_lossy();
    let entries = glob::glob(&pattern).map_err(|e| InputError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    debug!(pattern = %pattern, count = files.len(), "Expanded pattern");
    Ok(files)
}

/// Scans one directory for matching files.
fn scan_directory(dir: &Path, recursive: bool, patterns: &[glob::Pattern]) -> Vec<PathBuf> {
    let walker = if recursive {
        walkdir::WalkDir::new(dir)
    } else {
        walkdir::WalkDir::new(dir).max_depth(1)
    };

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && matches_patterns(e.path(), patterns))
        .map(|e| e.into_path())
        .collect();
    files.sort();

    debug!(path = ?dir, count = files.len(), "Scanned directory");
    files
}

/// Checks if a file name matches any pattern, ignoring case.
fn matches_patterns(path: &Path, patterns: &[glob::Pattern]) -> bool {
    let filename = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };

    let options = glob::MatchOptions {
        case_sensitive: false,
        ..Default::default()
    };
    patterns.iter().any(|p| p.matches_with(filename, options))
}

fn push_unique(files: &mut Vec<PathBuf>, seen: &mut HashSet<PathBuf>, path: PathBuf) {
    if seen.insert(path.clone()) {
        files.push(path);
    }
}
