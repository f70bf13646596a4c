//! Batch input: a single Target directory or a text file listing them.

use std::path::{Path, PathBuf};

use crate::domain::Target;
use crate::error::AppError;

/// What the positional CLI argument turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchInput {
    Directory(PathBuf),
    List(PathBuf),
}

impl BatchInput {
    /// Classify `path`. Anything that is neither a directory nor a regular
    /// file is a usage error (exit code 1).
    pub fn classify(path: &Path) -> Result<Self, AppError> {
        if path.is_dir() {
            Ok(BatchInput::Directory(path.to_path_buf()))
        } else if path.is_file() {
            Ok(BatchInput::List(path.to_path_buf()))
        } else {
            Err(AppError::new(
                1,
                format!(
                    "'{}' is neither a valid directory nor a file containing paths.",
                    path.display()
                ),
            ))
        }
    }

    /// Expand into Targets, in input order.
    pub fn targets(&self) -> Result<Vec<Target>, AppError> {
        match self {
            BatchInput::Directory(dir) => Ok(vec![Target::new(dir.clone())]),
            BatchInput::List(file) => {
                let text = std::fs::read_to_string(file).map_err(|e| {
                    AppError::new(2, format!("Failed to read target list '{}': {e}", file.display()))
                })?;
                Ok(parse_target_list(&text).into_iter().map(Target::new).collect())
            }
        }
    }
}

/// One path per line; blank lines and `#` comments are skipped.
pub fn parse_target_list(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect()
}
