//! CSV persistence of result tables and the batch summary.
//!
//! Every table is written with its header row, even when it has no data
//! rows, so downstream readers can rely on the columns being present.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::OutputConfig;
use crate::domain::TargetOutcome;
use crate::error::{AppError, TargetError};
use crate::report::tables::{FLUX_HEADER, PARAMETER_HEADER, ResultTables, STATISTIC_HEADER};

/// Files written for one Target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePaths {
    pub parameters: PathBuf,
    pub statistics: PathBuf,
    pub fluxes: PathBuf,
}

impl TablePaths {
    pub fn in_dir(dir: &Path, outputs: &OutputConfig) -> Self {
        Self {
            parameters: dir.join(&outputs.parameter_table),
            statistics: dir.join(&outputs.statistic_table),
            fluxes: dir.join(&outputs.flux_table),
        }
    }
}

/// Write `rows` under `header`, replacing any existing file.
pub fn write_table<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<(), TargetError> {
    let csv_err = |source| TargetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(csv_err)?;
    writer.write_record(header).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| TargetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a table written by [`write_table`].
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, TargetError> {
    let csv_err = |source| TargetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_err)
}

/// Persist the three tables of one Target into its directory.
///
/// Tables are staged under `<name>.partial` and only renamed into place once
/// all three were written, so a failed write leaves no new tables behind.
pub fn write_target_tables(
    dir: &Path,
    tables: &ResultTables,
    outputs: &OutputConfig,
) -> Result<TablePaths, TargetError> {
    let paths = TablePaths::in_dir(dir, outputs);
    let staged = [
        partial_path(&paths.parameters),
        partial_path(&paths.statistics),
        partial_path(&paths.fluxes),
    ];

    let written = write_table(&staged[0], &PARAMETER_HEADER, &tables.parameters)
        .and_then(|()| write_table(&staged[1], &STATISTIC_HEADER, &tables.statistics))
        .and_then(|()| write_table(&staged[2], &FLUX_HEADER, &tables.fluxes));
    if let Err(e) = written {
        for path in &staged {
            let _ = fs::remove_file(path);
        }
        return Err(e);
    }

    for (from, to) in staged.iter().zip([&paths.parameters, &paths.statistics, &paths.fluxes]) {
        fs::rename(from, to).map_err(|source| TargetError::Io {
            path: to.clone(),
            source,
        })?;
    }
    Ok(paths)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    target: String,
    status: &'a str,
    detail: String,
}

/// Write `target,status,detail` for every Target of the batch.
pub fn write_summary_csv(path: &Path, outcomes: &[TargetOutcome]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary '{}': {e}", path.display())))?;

    for outcome in outcomes {
        writer
            .serialize(SummaryRow {
                target: outcome.path.display().to_string(),
                status: outcome.status.label(),
                detail: outcome.status.detail(),
            })
            .map_err(|e| AppError::new(2, format!("Failed to write summary row: {e}")))?;
    }
    if outcomes.is_empty() {
        writer
            .write_record(["target", "status", "detail"])
            .map_err(|e| AppError::new(2, format!("Failed to write summary header: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write summary '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::domain::{ModelKind, ResultSet};
    use crate::report::tables::{FluxRow, ParameterRow, StatisticRow};

    fn sample_tables() -> ResultTables {
        ResultTables {
            parameters: vec![
                ParameterRow {
                    model: ModelKind::PowerLaw,
                    parameter: "PhoIndex".to_string(),
                    value: 1.8734,
                    error: Some(0.0213),
                },
                ParameterRow {
                    model: ModelKind::LogPar,
                    parameter: "pivotE".to_string(),
                    value: 1.0,
                    error: None,
                },
            ],
            statistics: vec![StatisticRow {
                model: ModelKind::PowerLaw,
                chi_squared: 98.12,
                dof: 97.0,
                reduced_chi_squared: 1.0115,
            }],
            fluxes: Vec::new(),
        }
    }

    #[test]
    fn tables_read_back_equal() {
        let dir = TempDir::new().unwrap();
        let tables = sample_tables();
        let paths = write_target_tables(dir.path(), &tables, &OutputConfig::default()).unwrap();

        let params: Vec<ParameterRow> = read_table(&paths.parameters).unwrap();
        assert_eq!(params.len(), 2);
        assert!((params[0].value - 1.8734).abs() < 1e-6);
        assert_eq!(params[1].error, None);

        let stats: Vec<StatisticRow> = read_table(&paths.statistics).unwrap();
        assert_eq!(stats, tables.statistics);
    }

    #[test]
    fn empty_table_still_has_header() {
        let dir = TempDir::new().unwrap();
        let paths = write_target_tables(dir.path(), &sample_tables(), &OutputConfig::default()).unwrap();

        let text = std::fs::read_to_string(&paths.fluxes).unwrap();
        assert_eq!(text.trim_end(), "Model,Flux,ErrorLow,ErrorHigh");
        let fluxes: Vec<FluxRow> = read_table(&paths.fluxes).unwrap();
        assert!(fluxes.is_empty());
    }

    #[test]
    fn frozen_error_is_an_empty_field() {
        let dir = TempDir::new().unwrap();
        let paths = write_target_tables(dir.path(), &sample_tables(), &OutputConfig::default()).unwrap();

        let text = std::fs::read_to_string(&paths.parameters).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Model,Parameter,Value,Error");
        assert_eq!(lines[2], "logpar,pivotE,1.0,");
    }

    #[test]
    fn failed_write_leaves_no_tables_behind() {
        let dir = TempDir::new().unwrap();
        // A directory where the flux table is staged makes the third write fail.
        std::fs::create_dir(dir.path().join("model_fx.csv.partial")).unwrap();

        let err = write_target_tables(dir.path(), &sample_tables(), &OutputConfig::default()).unwrap_err();
        assert!(matches!(err, TargetError::Csv { .. }));
        for name in ["model_pm.csv", "model_ts.csv", "model_fx.csv", "model_pm.csv.partial", "model_ts.csv.partial"] {
            assert!(!dir.path().join(name).exists(), "{name} was left behind");
        }
    }

    #[test]
    fn summary_has_one_row_per_target() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("batch_summary.csv");
        let outcomes = vec![
            TargetOutcome::persisted(PathBuf::from("/obs/1"), ResultSet::new()),
            TargetOutcome::failed(PathBuf::from("/obs/2"), "NotFound: no rmf".to_string()),
        ];

        write_summary_csv(&path, &outcomes).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["target,status,detail", "/obs/1,ok,", "/obs/2,failed,NotFound: no rmf"]);
    }
}
