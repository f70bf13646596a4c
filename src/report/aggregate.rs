//! Result Aggregator: the fit logs of one Target become one `ResultSet`.
//!
//! Parsing is pure, so the logs are read and parsed in parallel; the result
//! keeps the input order. Any mismatch between the logs and the configured
//! models is an `IncompleteBatch`: the fitting run upstream was
//! misconfigured and partial aggregation is not attempted.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::domain::{ModelKind, ModelRecord, ResultSet};
use crate::error::{ParseIssue, TargetError};
use crate::parse::LogParser;

/// Parser output for one log file.
#[derive(Debug, Clone)]
pub struct ParsedLog {
    pub path: PathBuf,
    pub outcome: Result<ModelRecord, ParseIssue>,
}

/// Read and parse every log. Unreadable files fail the Target; content
/// problems are carried in `ParsedLog::outcome`.
pub fn parse_logs(paths: &[PathBuf], parser: &LogParser<'_>) -> Result<Vec<ParsedLog>, TargetError> {
    paths
        .par_iter()
        .map(|path| {
            let bytes = std::fs::read(path).map_err(|source| TargetError::Io {
                path: path.clone(),
                source,
            })?;
            let text = String::from_utf8_lossy(&bytes);
            Ok(ParsedLog {
                path: path.clone(),
                outcome: parser.parse(&text),
            })
        })
        .collect()
}

/// Combine parsed logs into a `ResultSet` holding exactly `expected` models.
pub fn aggregate(parsed: Vec<ParsedLog>, expected: &[ModelKind]) -> Result<ResultSet, TargetError> {
    if parsed.len() != expected.len() {
        return Err(TargetError::IncompleteBatch(format!(
            "expected {} fit logs, found {}",
            expected.len(),
            parsed.len()
        )));
    }

    let mut set = ResultSet::new();
    for log in parsed {
        let record = log.outcome.map_err(|issue| {
            TargetError::IncompleteBatch(format!("{}: {issue}", file_label(&log.path)))
        })?;

        if !expected.contains(&record.model) {
            return Err(TargetError::IncompleteBatch(format!(
                "{}: model '{}' is not configured",
                file_label(&log.path),
                record.model
            )));
        }

        for issue in &record.issues {
            tracing::warn!(log = %log.path.display(), model = %record.model, "{issue}");
        }

        set.insert(record).map_err(|dup| {
            TargetError::IncompleteBatch(format!(
                "{}: model '{}' was already reported by another log",
                file_label(&log.path),
                dup.model
            ))
        })?;
    }

    Ok(set)
}

/// Parse and aggregate in one step.
pub fn aggregate_logs(paths: &[PathBuf], expected: &[ModelKind], flux: bool) -> Result<ResultSet, TargetError> {
    let parser = LogParser::new(expected).with_flux(flux);
    let parsed = parse_logs(paths, &parser)?;
    aggregate(parsed, expected)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
