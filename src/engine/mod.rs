//! Fit engine collaborator.
//!
//! The engine is stateful and non-reentrant, so every (Target, model) pair
//! gets its own explicit session with the lifecycle
//! `open → load → fit → export → close`. [`SessionGuard`] makes `close`
//! happen on every exit path, including early returns through `?`.

use std::path::{Path, PathBuf};

use crate::config::{FitSettings, FluxBand};
use crate::domain::{ModelKind, ResolvedInputs};
use crate::error::EngineError;

pub mod command;

pub use command::*;

/// Everything the engine needs for one model fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitRequest {
    pub inputs: ResolvedInputs,
    /// Where the log and plot tables are written (the Target directory).
    pub outdir: PathBuf,
    pub model: ModelKind,
    pub fit: FitSettings,
    pub flux: Option<FluxBand>,
}

/// Files a successful fit leaves in the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FitArtifacts {
    pub log: PathBuf,
    pub spectrum_csv: PathBuf,
    pub ratio_csv: PathBuf,
}

impl FitArtifacts {
    pub fn expected(outdir: &Path, model: ModelKind) -> Self {
        Self {
            log: outdir.join(model.log_file_name()),
            spectrum_csv: outdir.join(model.spectrum_csv_name()),
            ratio_csv: outdir.join(model.ratio_csv_name()),
        }
    }
}

/// One open engine session.
pub trait FitSession {
    /// Load spectrum, response and background.
    fn load(&mut self) -> Result<(), EngineError>;
    /// Define the model and run the fit.
    fn fit(&mut self) -> Result<(), EngineError>;
    /// Write (or verify) the log and plot tables.
    fn export(&mut self) -> Result<FitArtifacts, EngineError>;
    /// Release engine state. Must be safe to call in any stage.
    fn close(&mut self);
}

pub trait FitEngine {
    type Session: FitSession;

    fn open(&mut self, request: &FitRequest) -> Result<Self::Session, EngineError>;
}

/// Owns an open session and closes it when dropped.
pub struct SessionGuard<S: FitSession> {
    session: S,
    closed: bool,
}

impl<S: FitSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            closed: false,
        }
    }

    pub fn session(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn close(mut self) {
        self.close_once();
    }

    fn close_once(&mut self) {
        if !self.closed {
            self.closed = true;
            self.session.close();
        }
    }
}

impl<S: FitSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.close_once();
    }
}

/// Run one full session for `request`.
pub fn run_model<E: FitEngine>(engine: &mut E, request: &FitRequest) -> Result<FitArtifacts, EngineError> {
    let mut guard = SessionGuard::new(engine.open(request)?);
    guard.session().load()?;
    guard.session().fit()?;
    let artifacts = guard.session().export()?;
    guard.close();
    Ok(artifacts)
}
