//! Targets and their lifecycle.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::{ModelKind, ResultSet};

/// Processing state of one Target.
///
/// `Pending → Resolving → Fitting → Parsing → Aggregating → Persisted`, or
/// `Failed` from any state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetState {
    Pending,
    Resolving,
    Fitting,
    Parsing,
    Aggregating,
    Persisted,
    Failed(String),
}

impl TargetState {
    pub fn label(&self) -> &'static str {
        match self {
            TargetState::Pending => "pending",
            TargetState::Resolving => "resolving",
            TargetState::Fitting => "fitting",
            TargetState::Parsing => "parsing",
            TargetState::Aggregating => "aggregating",
            TargetState::Persisted => "persisted",
            TargetState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TargetState::Persisted | TargetState::Failed(_))
    }
}

/// Input files located for one Target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInputs {
    pub spectrum: PathBuf,
    pub response: PathBuf,
    pub background: PathBuf,
    /// Ancillary response, only when an ARF pattern is configured.
    pub ancillary: Option<PathBuf>,
}

/// One observation directory under analysis.
#[derive(Debug, Clone)]
pub struct Target {
    path: PathBuf,
    pub inputs: Option<ResolvedInputs>,
    /// Fit logs produced (or discovered) for this Target.
    pub logs: Vec<PathBuf>,
    state: TargetState,
}

impl Target {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inputs: None,
            logs: Vec::new(),
            state: TargetState::Pending,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &TargetState {
        &self.state
    }

    /// Move to the next state. Terminal states are sticky.
    pub fn advance(&mut self, next: TargetState) {
        if self.state.is_terminal() {
            tracing::debug!(
                target_path = %self.path.display(),
                from = self.state.label(),
                to = next.label(),
                "ignoring transition out of terminal state"
            );
            return;
        }
        tracing::info!(
            target_path = %self.path.display(),
            from = self.state.label(),
            to = next.label(),
            "target state change"
        );
        self.state = next;
    }
}

/// How a Target ended, as reported in the batch summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OutcomeStatus {
    Ok,
    /// Persisted, but these models lack parameters or a statistic.
    Incomplete { models: Vec<ModelKind> },
    Failed { reason: String },
}

impl OutcomeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeStatus::Ok => "ok",
            OutcomeStatus::Incomplete { .. } => "incomplete",
            OutcomeStatus::Failed { .. } => "failed",
        }
    }

    pub fn detail(&self) -> String {
        match self {
            OutcomeStatus::Ok => String::new(),
            OutcomeStatus::Incomplete { models } => {
                let names: Vec<&str> = models.iter().map(|m| m.name()).collect();
                format!("incomplete models: {}", names.join(" "))
            }
            OutcomeStatus::Failed { reason } => reason.clone(),
        }
    }
}

/// Final result of one Target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetOutcome {
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ResultSet>,
}

impl TargetOutcome {
    pub fn persisted(path: PathBuf, results: ResultSet) -> Self {
        let incomplete = results.incomplete_models();
        let status = if incomplete.is_empty() {
            OutcomeStatus::Ok
        } else {
            OutcomeStatus::Incomplete { models: incomplete }
        };
        Self {
            path,
            status,
            results: Some(results),
        }
    }

    pub fn failed(path: PathBuf, reason: String) -> Self {
        Self {
            path,
            status: OutcomeStatus::Failed { reason },
            results: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}
