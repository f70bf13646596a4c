//! Append-only log of failed Targets.
//!
//! One line per failed Target: `- <target path>: <reason>`. The file is
//! opened in append mode for every write and never truncated, so several
//! runs accumulate in the same file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
    header: bool,
    header_written: bool,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            header: false,
            header_written: false,
        }
    }

    /// Precede the first failure of this run with a timestamp line.
    pub fn with_run_header(mut self, enabled: bool) -> Self {
        self.header = enabled;
        self
    }

    /// Append one failure line.
    pub fn record(&mut self, target: &Path, reason: &str) -> Result<(), AppError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                AppError::new(2, format!("Failed to open failure log '{}': {e}", self.path.display()))
            })?;

        let mut text = String::new();
        if self.header && !self.header_written {
            text.push_str(&format!("# run {}\n", Local::now().format("%Y-%m-%dT%H:%M:%S")));
            self.header_written = true;
        }
        // Reasons are single-line by contract; fold anything else.
        let reason = reason.replace(['\r', '\n'], " ");
        text.push_str(&format!("- {}: {}\n", target.display(), reason));

        file.write_all(text.as_bytes()).map_err(|e| {
            AppError::new(2, format!("Failed to write failure log '{}': {e}", self.path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn appends_without_truncating() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed_obs.txt");
        std::fs::write(&path, "- /old/run: NotFound: earlier\n").unwrap();

        let mut log = FailureLog::new(&path);
        log.record(Path::new("/data/obs2"), "EngineFailure: logpar fit failed").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "- /old/run: NotFound: earlier\n- /data/obs2: EngineFailure: logpar fit failed\n"
        );
    }

    #[test]
    fn header_is_written_once_per_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("failed_obs.txt");

        let mut log = FailureLog::new(&path).with_run_header(true);
        log.record(Path::new("/a"), "x").unwrap();
        log.record(Path::new("/b"), "multi\nline").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("# run "));
        assert_eq!(lines[2], "- /b: multi line");
    }
}
