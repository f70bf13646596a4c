//! Run configuration.
//!
//! Precedence, lowest first:
//!
//! 1. built-in defaults (the reference NICER three-model pipeline)
//! 2. a TOML file passed with `--config`
//! 3. environment variables (a `.env` file is honoured via `dotenvy`)
//! 4. CLI flags, applied by `app`
//!
//! ```toml
//! models = ["logpar", "powerlaw", "bknpower"]
//! canonical_order = ["powerlaw", "bknpower", "logpar"]
//!
//! [files]
//! spectrum = "*src.pha"
//! response = "*.rmf"
//! background = "*bkg.xcm"
//! ancillary = "*.arf"
//!
//! [engine]
//! program = "python3"
//! args = ["fit_model.py", "--model", "{model}", "--outdir", "{outdir}"]
//! timeout_secs = 900
//!
//! [flux]
//! energy_min = 0.3
//! energy_max = 10.0
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::ModelKind;
use crate::error::AppError;

pub const ENV_ENGINE_PROGRAM: &str = "XSB_ENGINE_PROGRAM";
pub const ENV_ENGINE_TIMEOUT: &str = "XSB_ENGINE_TIMEOUT_SECS";

/// File-name glob patterns for each input role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilePatterns {
    pub spectrum: String,
    pub response: String,
    pub background: String,
    /// Ancillary response; not resolved unless set.
    pub ancillary: Option<String>,
    /// Fit logs, used when parsing existing results.
    pub log: String,
}

impl Default for FilePatterns {
    fn default() -> Self {
        Self {
            spectrum: "*src.pha".to_string(),
            response: "*.rmf".to_string(),
            background: "*bkg.xcm".to_string(),
            ancillary: None,
            log: "*_xspec.log".to_string(),
        }
    }
}

/// Settings forwarded to the fit engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitSettings {
    /// Frozen Galactic absorption column (10^22 cm^-2).
    pub nh: f64,
    /// Energy band kept for the fit (keV).
    pub energy_min: f64,
    pub energy_max: f64,
    pub iterations: u32,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            nh: 0.0131,
            energy_min: 0.3,
            energy_max: 10.0,
            iterations: 100,
        }
    }
}

/// Energy band over which the engine integrates model flux (keV).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FluxBand {
    pub energy_min: f64,
    pub energy_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Helper program run once per (Target, model).
    pub program: String,
    /// Arguments; `{placeholder}`s are substituted per invocation.
    pub args: Vec<String>,
    /// Kill the helper after this many seconds. `None` waits forever.
    pub timeout_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let args = [
            "xspec_fit.py",
            "--spectrum",
            "{spectrum}",
            "--response",
            "{response}",
            "--background",
            "{background}",
            "--outdir",
            "{outdir}",
            "--model",
            "{model}",
            "--expression",
            "{expression}",
            "--nh",
            "{nh}",
            "--band",
            "{emin}",
            "{emax}",
            "--iterations",
            "{iterations}",
            "--initial",
            "{initial}",
        ];
        Self {
            program: "python3".to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Append-only failure log, relative to the working directory.
    pub failure_log: PathBuf,
    /// Write a `# run <timestamp>` line before the first failure of a run.
    pub failure_log_header: bool,
    /// Batch summary table, relative to the working directory.
    pub summary: PathBuf,
    pub parameter_table: String,
    pub statistic_table: String,
    pub flux_table: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            failure_log: PathBuf::from("failed_obs.txt"),
            failure_log_header: false,
            summary: PathBuf::from("batch_summary.csv"),
            parameter_table: "model_pm.csv".to_string(),
            statistic_table: "model_ts.csv".to_string(),
            flux_table: "model_fx.csv".to_string(),
        }
    }
}

/// A full run's configuration as understood by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub files: FilePatterns,
    /// Models fitted per Target, in invocation order.
    pub models: Vec<ModelKind>,
    /// Row order of every output table. Models not listed sort last.
    pub canonical_order: Vec<ModelKind>,
    pub fit: FitSettings,
    /// Parse (and ask the engine for) model flux when set.
    pub flux: Option<FluxBand>,
    pub engine: EngineConfig,
    pub outputs: OutputConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            files: FilePatterns::default(),
            models: ModelKind::ALL.to_vec(),
            canonical_order: vec![ModelKind::PowerLaw, ModelKind::BknPower, ModelKind::LogPar],
            fit: FitSettings::default(),
            flux: None,
            engine: EngineConfig::default(),
            outputs: OutputConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load defaults, then the optional TOML file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        dotenvy::dotenv().ok();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::new(2, format!("Failed to read config '{}': {e}", path.display())))?;
        Self::from_toml(&text)
            .map_err(|e| AppError::new(2, format!("Invalid config '{}': {e}", path.display())))
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), AppError> {
        if let Some(program) = lookup(ENV_ENGINE_PROGRAM).filter(|s| !s.trim().is_empty()) {
            self.engine.program = program.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_ENGINE_TIMEOUT) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                AppError::new(2, format!("{ENV_ENGINE_TIMEOUT} must be a whole number of seconds, got '{raw}'"))
            })?;
            self.engine.timeout_secs = Some(secs);
        }
        Ok(())
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.models.is_empty() {
            return Err(AppError::new(2, "Config: at least one model is required."));
        }
        let mut seen = HashSet::new();
        for model in &self.models {
            if !seen.insert(*model) {
                return Err(AppError::new(2, format!("Config: model '{model}' is listed twice.")));
            }
        }
        if !(self.fit.energy_min < self.fit.energy_max) {
            return Err(AppError::new(2, "Config: fit energy_min must be below energy_max."));
        }
        if let Some(band) = &self.flux {
            if !(band.energy_min < band.energy_max) {
                return Err(AppError::new(2, "Config: flux energy_min must be below energy_max."));
            }
        }
        if self.engine.timeout_secs == Some(0) {
            return Err(AppError::new(2, "Config: engine timeout must be positive."));
        }
        for (role, pattern) in [
            ("spectrum", &self.files.spectrum),
            ("response", &self.files.response),
            ("background", &self.files.background),
            ("log", &self.files.log),
        ] {
            if pattern.trim().is_empty() {
                return Err(AppError::new(2, format!("Config: empty file pattern for {role}.")));
            }
        }
        Ok(())
    }
}
