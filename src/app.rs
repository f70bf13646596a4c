//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - builds the run configuration (defaults, TOML, environment, flags)
//! - expands the batch input into Targets
//! - runs the batch and writes the summary and optional report

use clap::Parser;

use crate::cli::Cli;
use crate::config::{FluxBand, RunConfig};
use crate::engine::CommandEngine;
use crate::error::AppError;
use crate::io::{BatchInput, FailureLog, RunReport, write_run_report, write_summary_csv};

pub mod pipeline;

pub use pipeline::BatchRunner;

/// Entry point for the `xsb` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    let input = BatchInput::classify(&cli.input)?;
    let config = run_config_from_args(&cli)?;
    let targets = input.targets()?;
    tracing::info!(targets = targets.len(), parse_only = cli.parse_only, "starting batch");

    let engine = (!cli.parse_only).then(|| CommandEngine::new(config.engine.clone()));
    let failure_log =
        FailureLog::new(&config.outputs.failure_log).with_run_header(config.outputs.failure_log_header);
    let mut runner = BatchRunner::new(&config, engine, failure_log);
    let outcomes = runner.run(targets)?;

    println!("{}", crate::report::format_batch_summary(&outcomes));
    write_summary_csv(&config.outputs.summary, &outcomes)?;
    if let Some(path) = &cli.report {
        write_run_report(path, &RunReport::new(&config, &outcomes, cli.parse_only))?;
    }

    Ok(())
}

/// Layer CLI flags over the loaded configuration and validate the result.
pub fn run_config_from_args(cli: &Cli) -> Result<RunConfig, AppError> {
    let mut config = RunConfig::load(cli.config.as_deref())?;
    apply_cli_overrides(&mut config, cli)?;
    config.validate()?;
    Ok(config)
}

pub fn apply_cli_overrides(config: &mut RunConfig, cli: &Cli) -> Result<(), AppError> {
    if let Some(models) = &cli.models {
        config.models = models.clone();
    }
    if let Some(program) = &cli.engine_program {
        config.engine.program = program.clone();
    }
    if let Some(secs) = cli.timeout {
        config.engine.timeout_secs = Some(secs);
    }
    if let Some(band) = &cli.flux_band {
        let [energy_min, energy_max] = band.as_slice() else {
            return Err(AppError::new(1, "--flux-band takes exactly two values: EMIN EMAX"));
        };
        config.flux = Some(FluxBand {
            energy_min: *energy_min,
            energy_max: *energy_max,
        });
    }
    if let Some(path) = &cli.failure_log {
        config.outputs.failure_log = path.clone();
    }
    if let Some(path) = &cli.summary {
        config.outputs.summary = path.clone();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::domain::ModelKind;

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "xsb",
            "obs",
            "--models",
            "bknpower",
            "--engine-program",
            "/usr/local/bin/fit",
            "--timeout",
            "120",
            "--flux-band",
            "0.5",
            "2",
            "--failure-log",
            "/tmp/failed.txt",
        ])
        .unwrap();

        let mut config = RunConfig::default();
        apply_cli_overrides(&mut config, &cli).unwrap();

        assert_eq!(config.models, vec![ModelKind::BknPower]);
        assert_eq!(config.engine.program, "/usr/local/bin/fit");
        assert_eq!(config.engine.timeout_secs, Some(120));
        assert_eq!(
            config.flux,
            Some(FluxBand {
                energy_min: 0.5,
                energy_max: 2.0
            })
        );
        assert_eq!(config.outputs.failure_log, PathBuf::from("/tmp/failed.txt"));
        assert_eq!(config.outputs.summary, PathBuf::from("batch_summary.csv"));
    }

    #[test]
    fn inverted_flux_band_fails_validation() {
        let cli = Cli::try_parse_from(["xsb", "obs", "--flux-band", "2", "0.5"]).unwrap();
        let mut config = RunConfig::default();
        apply_cli_overrides(&mut config, &cli).unwrap();
        assert_eq!(config.validate().unwrap_err().exit_code(), 2);
    }
}
