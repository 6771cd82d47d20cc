//! Source extraction.
//!
//! Walks a repository working tree, applies the path filter, reads surviving
//! files in parallel and returns their decoded contents sorted by relative
//! path. Unreadable and binary files are skipped with a warning rather than
//! failing the whole extraction.

use crate::error::ExtractError;
use crate::filter::FilterConfig;
use crate::types::SourceFile;
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Extract all analyzable source files under `root`.
///
/// The walk is exhaustive: gitignore rules are deliberately not honored, so
/// the inclusion decision is exactly [`FilterConfig::should_exclude`] and
/// nothing else. Relative paths always use `/` separators.
pub fn extract_sources(root: &Path, filter: &FilterConfig) -> Result<Vec<SourceFile>, ExtractError> {
    if !root.exists() {
        return Err(ExtractError::RootNotFound {
            path: root.display().to_string(),
        });
    }
    let root = root
        .canonicalize()
        .map_err(|_| ExtractError::RootNotFound {
            path: root.display().to_string(),
        })?;

    let mut candidates: Vec<(PathBuf, String)> = Vec::new();
    let walker = WalkBuilder::new(&root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .follow_links(false)
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!("walk error under {}: {}", root.display(), err);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let rel = match entry.path().strip_prefix(&root) {
            Ok(r) => r.to_path_buf(),
            Err(_) => continue,
        };
        if filter.should_exclude(&rel) {
            continue;
        }
        let rel_str = rel.to_string_lossy().replace('\\', "/");
        candidates.push((entry.into_path(), rel_str));
    }

    debug!(
        "extracting {} candidate files from {}",
        candidates.len(),
        root.display()
    );

    let results: Mutex<Vec<SourceFile>> = Mutex::new(Vec::with_capacity(candidates.len()));
    candidates.par_iter().for_each(|(path, rel)| {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(err) => {
                warn!("skipping unreadable file {}: {}", rel, err);
                return;
            }
        };
        let content = String::from_utf8_lossy(&bytes).into_owned();
        if looks_binary(&content) {
            warn!("skipping binary file {}", rel);
            return;
        }
        let file = SourceFile::new(rel.clone(), content);
        results.lock().unwrap_or_else(|p| p.into_inner()).push(file);
    });

    let mut files = results.into_inner().unwrap_or_default();
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

/// Heuristic binary detection on decoded text.
///
/// A NUL byte anywhere marks the file binary. Otherwise the first 1024
/// characters are sampled and the file is binary when more than 30% of them
/// are control characters other than newline, carriage return and tab.
fn looks_binary(content: &str) -> bool {
    if content.contains('\0') {
        return true;
    }
    let mut total = 0usize;
    let mut control = 0usize;
    for c in content.chars().take(1024) {
        total += 1;
        if (c as u32) < 32 && c != '\n' && c != '\r' && c != '\t' {
            control += 1;
        }
    }
    total > 0 && control * 100 > total * 30
}
