//! Batch Orchestrator.
//!
//! Drives each Target through
//! `Resolving → Fitting → Parsing → Aggregating → Persisted`, one Target and
//! one model at a time. Anything that goes wrong inside a Target is caught at
//! the Target boundary: it is written to the failure log and the batch moves
//! on to the next Target.

use crate::config::RunConfig;
use crate::domain::{ModelKind, ResultSet, Target, TargetOutcome, TargetState};
use crate::engine::{FitEngine, FitRequest, run_model};
use crate::error::{AppError, TargetError};
use crate::io::{FailureLog, resolve_all, resolve_inputs, write_target_tables};
use crate::parse::LogParser;
use crate::report::{ResultTables, aggregate, format_tables, parse_logs};

/// Runs a batch of Targets.
///
/// Without an engine the Fitting state is skipped and each Target's existing
/// fit logs are parsed instead.
pub struct BatchRunner<'c, E> {
    config: &'c RunConfig,
    engine: Option<E>,
    failure_log: FailureLog,
    echo_tables: bool,
}

impl<'c, E: FitEngine> BatchRunner<'c, E> {
    pub fn new(config: &'c RunConfig, engine: Option<E>, failure_log: FailureLog) -> Self {
        Self {
            config,
            engine,
            failure_log,
            echo_tables: true,
        }
    }

    /// Print each persisted Target's tables to stdout (on by default).
    pub fn echo_tables(mut self, enabled: bool) -> Self {
        self.echo_tables = enabled;
        self
    }

    pub fn is_parse_only(&self) -> bool {
        self.engine.is_none()
    }

    /// Process every Target in order.
    ///
    /// Only a failure-log write error stops the batch early.
    pub fn run(&mut self, targets: Vec<Target>) -> Result<Vec<TargetOutcome>, AppError> {
        let total = targets.len();
        let mut outcomes = Vec::with_capacity(total);

        for (idx, mut target) in targets.into_iter().enumerate() {
            println!(">>> [{}/{}] {}", idx + 1, total, target.path().display());

            let outcome = match self.process(&mut target) {
                Ok((results, tables)) => {
                    if self.echo_tables {
                        println!("{}", format_tables(&tables));
                    }
                    TargetOutcome::persisted(target.path().to_path_buf(), results)
                }
                Err(err) => {
                    let reason = err.reason();
                    target.advance(TargetState::Failed(reason.clone()));
                    tracing::error!(target_path = %target.path().display(), "{reason}");
                    println!("!!! {reason}");
                    self.failure_log.record(target.path(), &reason)?;
                    TargetOutcome::failed(target.path().to_path_buf(), reason)
                }
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    fn process(&mut self, target: &mut Target) -> Result<(ResultSet, ResultTables), TargetError> {
        let config = self.config;
        let dir = target.path().to_path_buf();

        target.advance(TargetState::Resolving);
        match self.engine.as_mut() {
            Some(engine) => {
                let inputs = resolve_inputs(&dir, &config.files)?;
                target.inputs = Some(inputs.clone());

                target.advance(TargetState::Fitting);
                for &model in &config.models {
                    println!("    fitting {} ({})", model.display_name(), model.expression());
                    let request = FitRequest {
                        inputs: inputs.clone(),
                        outdir: dir.clone(),
                        model,
                        fit: config.fit.clone(),
                        flux: config.flux,
                    };
                    let artifacts =
                        run_model(engine, &request).map_err(|source| TargetError::Engine { model, source })?;
                    target.logs.push(artifacts.log);
                }
            }
            None => {
                target.logs = resolve_all(&dir, &config.files.log)?;
            }
        }

        target.advance(TargetState::Parsing);
        let parser = LogParser::new(&config.models).with_flux(config.flux.is_some());
        let parsed = parse_logs(&target.logs, &parser)?;

        target.advance(TargetState::Aggregating);
        let results = aggregate(parsed, &config.models)?;
        warn_incomplete(target, &results.incomplete_models());
        let tables = ResultTables::build([&results], &config.canonical_order)?;
        write_target_tables(&dir, &tables, &config.outputs)?;

        target.advance(TargetState::Persisted);
        Ok((results, tables))
    }
}

fn warn_incomplete(target: &Target, models: &[ModelKind]) {
    for model in models {
        tracing::warn!(
            target_path = %target.path().display(),
            model = %model,
            "persisting incomplete record"
        );
    }
}
