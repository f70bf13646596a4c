//! Combined JSON report of a batch run.
//!
//! The report mirrors what was persisted per Target plus the run metadata:
//! - tool name and version, and when the run finished
//! - the models fitted and the canonical row order
//! - one entry per Target with its status and (if persisted) its results

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::config::RunConfig;
use crate::domain::{ModelKind, TargetOutcome};
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub tool: &'static str,
    pub version: &'static str,
    pub finished_at: DateTime<Local>,
    pub parse_only: bool,
    pub models: &'a [ModelKind],
    pub canonical_order: &'a [ModelKind],
    pub targets: &'a [TargetOutcome],
}

impl<'a> RunReport<'a> {
    pub fn new(config: &'a RunConfig, outcomes: &'a [TargetOutcome], parse_only: bool) -> Self {
        Self {
            tool: "xsb",
            version: env!("CARGO_PKG_VERSION"),
            finished_at: Local::now(),
            parse_only,
            models: &config.models,
            canonical_order: &config.canonical_order,
            targets: outcomes,
        }
    }
}

/// Write the report as pretty-printed JSON.
pub fn write_run_report(path: &Path, report: &RunReport<'_>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))?;
    Ok(())
}
