//! Spectral model table.
//!
//! Each supported model is a row of static data: the token the fit engine
//! prints in its logs, the engine model expression, and the ordered list of
//! free parameters we expect to read back. Everything downstream (engine
//! invocation, log parsing, table building) is driven by this table rather
//! than by per-model branches.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One expected parameter of a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Name as printed by the engine (also the table `Parameter` value).
    pub name: &'static str,
    /// Starting value handed to the engine; `None` keeps the engine default.
    pub initial: Option<f64>,
}

const LOGPAR_PARAMS: [ParamSpec; 4] = [
    ParamSpec { name: "alpha", initial: Some(1.0) },
    ParamSpec { name: "beta", initial: Some(1.0) },
    ParamSpec { name: "pivotE", initial: None },
    ParamSpec { name: "norm", initial: None },
];

const POWERLAW_PARAMS: [ParamSpec; 2] = [
    ParamSpec { name: "PhoIndex", initial: Some(1.0) },
    ParamSpec { name: "norm", initial: None },
];

const BKNPOWER_PARAMS: [ParamSpec; 4] = [
    ParamSpec { name: "PhoIndx1", initial: Some(1.0) },
    ParamSpec { name: "BreakE", initial: None },
    ParamSpec { name: "PhoIndx2", initial: Some(1.0) },
    ParamSpec { name: "norm", initial: None },
];

/// Supported spectral models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Log-parabola.
    #[value(name = "logpar")]
    LogPar,
    /// Simple power law.
    #[value(name = "powerlaw")]
    PowerLaw,
    /// Broken power law.
    #[value(name = "bknpower")]
    BknPower,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::LogPar, ModelKind::PowerLaw, ModelKind::BknPower];

    /// Short name; doubles as the token searched for in fit logs and as the
    /// prefix of every per-model output file.
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::LogPar => "logpar",
            ModelKind::PowerLaw => "powerlaw",
            ModelKind::BknPower => "bknpower",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::LogPar => "log-parabola",
            ModelKind::PowerLaw => "power-law",
            ModelKind::BknPower => "broken power-law",
        }
    }

    /// Engine model expression (absorbed by a frozen Galactic column).
    pub fn expression(self) -> &'static str {
        match self {
            ModelKind::LogPar => "tbabs*logpar",
            ModelKind::PowerLaw => "tbabs*powerlaw",
            ModelKind::BknPower => "tbabs*bknpower",
        }
    }

    /// Expected parameters, in declaration order.
    pub fn parameters(self) -> &'static [ParamSpec] {
        match self {
            ModelKind::LogPar => &LOGPAR_PARAMS,
            ModelKind::PowerLaw => &POWERLAW_PARAMS,
            ModelKind::BknPower => &BKNPOWER_PARAMS,
        }
    }

    pub fn log_file_name(self) -> String {
        format!("{}_xspec.log", self.name())
    }

    pub fn spectrum_csv_name(self) -> String {
        format!("{}_spec.csv", self.name())
    }

    pub fn ratio_csv_name(self) -> String {
        format!("{}_ratio.csv", self.name())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
