//! File Resolver: find exactly one input file per role.
//!
//! Matching is done on file names only, one directory deep. Matches are
//! returned sorted so error messages are deterministic.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};

use crate::config::FilePatterns;
use crate::domain::ResolvedInputs;
use crate::error::ResolveError;

/// Return the single file in `dir` whose name matches `pattern`.
pub fn resolve_one(dir: &Path, pattern: &str) -> Result<PathBuf, ResolveError> {
    let mut matches = resolve_all(dir, pattern)?;
    match matches.len() {
        0 => Err(ResolveError::NotFound {
            pattern: pattern.to_string(),
            dir: dir.to_path_buf(),
        }),
        1 => Ok(matches.remove(0)),
        _ => Err(ResolveError::Ambiguous {
            pattern: pattern.to_string(),
            dir: dir.to_path_buf(),
            matches,
        }),
    }
}

/// Return every file in `dir` whose name matches `pattern`, sorted.
pub fn resolve_all(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, ResolveError> {
    if !dir.is_dir() {
        return Err(ResolveError::MissingDirectory { dir: dir.to_path_buf() });
    }
    let matcher = compile(pattern)?;

    let entries = std::fs::read_dir(dir).map_err(|source| ResolveError::Io {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ResolveError::Io {
            dir: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if matcher.is_match(entry.file_name()) {
            matches.push(path);
        }
    }
    matches.sort();
    Ok(matches)
}

/// Resolve every input role of a Target directory.
///
/// Roles are checked in a fixed order (spectrum, response, background,
/// ancillary) and the first failure is reported.
pub fn resolve_inputs(dir: &Path, patterns: &FilePatterns) -> Result<ResolvedInputs, ResolveError> {
    let spectrum = resolve_one(dir, &patterns.spectrum)?;
    let response = resolve_one(dir, &patterns.response)?;
    let background = resolve_one(dir, &patterns.background)?;
    let ancillary = match &patterns.ancillary {
        Some(pattern) => Some(resolve_one(dir, pattern)?),
        None => None,
    };

    Ok(ResolvedInputs {
        spectrum,
        response,
        background,
        ancillary,
    })
}

fn compile(pattern: &str) -> Result<GlobMatcher, ResolveError> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|source| ResolveError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}
