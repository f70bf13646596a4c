//! Error types.
//!
//! Two layers:
//!
//! - domain errors (`ResolveError`, `ParseIssue`, `EngineError`, `TargetError`)
//!   that the batch pipeline inspects, records and recovers from
//! - `AppError`, which carries a process exit code and is only produced at the
//!   application boundary (bad CLI input, unreadable config, unwritable outputs)

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::ModelKind;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failure to locate exactly one input file.
///
/// `NotFound` and `Ambiguous` are kept apart: a missing file and a directory
/// holding duplicates call for different fixes.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("directory does not exist: {}", .dir.display())]
    MissingDirectory { dir: PathBuf },

    #[error("invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("no file matching '{pattern}' in {}", .dir.display())]
    NotFound { pattern: String, dir: PathBuf },

    #[error(
        "{} files match '{pattern}' in {} (expected exactly one)",
        .matches.len(),
        .dir.display()
    )]
    Ambiguous {
        pattern: String,
        dir: PathBuf,
        matches: Vec<PathBuf>,
    },

    #[error("failed to list {}: {source}", .dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A recoverable problem found while parsing one fit log.
///
/// Issues degrade the completeness of a record; they never abort parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIssue {
    #[error("no fit report section with a known model was found")]
    MissingSection,

    #[error("parameter '{name}' not found")]
    MissingParameter { name: String },

    #[error("test statistic incomplete: {detail}")]
    MissingStatistic { detail: String },

    #[error("flux not found: {detail}")]
    MissingFlux { detail: String },
}

/// Failure reported by the fitting engine for one model invocation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("input file missing: {}", .path.display())]
    MissingInput { path: PathBuf },

    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine exited with {status}")]
    Exit { status: String },

    #[error("engine timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("engine did not produce {}", .path.display())]
    MissingArtifact { path: PathBuf },

    #[error("unexpected columns in {}: expected '{expected}', found '{found}'", .path.display())]
    BadArtifact {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("session is not in the right stage for {stage}")]
    Stage { stage: &'static str },

    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that fails a single Target.
///
/// The orchestrator catches these at the Target boundary, records them in the
/// failure log and moves on.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("{model} fit failed: {source}")]
    Engine {
        model: ModelKind,
        #[source]
        source: EngineError,
    },

    #[error("{0}")]
    IncompleteBatch(String),

    #[error("reduced chi-squared undefined for {model}: zero degrees of freedom")]
    DivisionUndefined { model: ModelKind },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl TargetError {
    /// Taxonomy name used as the prefix of failure-log reasons.
    pub fn kind(&self) -> &'static str {
        match self {
            TargetError::Resolve(ResolveError::MissingDirectory { .. })
            | TargetError::Resolve(ResolveError::NotFound { .. }) => "NotFound",
            TargetError::Resolve(ResolveError::Ambiguous { .. }) => "Ambiguous",
            TargetError::Resolve(ResolveError::InvalidPattern { .. }) => "InvalidPattern",
            TargetError::Resolve(ResolveError::Io { .. }) => "Io",
            TargetError::Engine { .. } => "EngineFailure",
            TargetError::IncompleteBatch(_) => "IncompleteBatch",
            TargetError::DivisionUndefined { .. } => "DivisionUndefined",
            TargetError::Io { .. } | TargetError::Csv { .. } => "Io",
        }
    }

    /// One-line reason as written to the failure log.
    pub fn reason(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}
