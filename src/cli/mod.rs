//! Command-line parsing for the spectral fitting batch driver.
//!
//! Parsing stays here; `app` merges the flags into the run configuration.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::domain::ModelKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "xsb",
    version,
    about = "Batch spectral fitting over observation directories"
)]
pub struct Cli {
    /// A Target directory, or a text file listing one Target directory per line.
    pub input: PathBuf,

    /// TOML run configuration.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Skip fitting and parse the fit logs already present in each Target.
    #[arg(long)]
    pub parse_only: bool,

    /// Models to fit (comma separated), overriding the configuration.
    #[arg(short, long, value_enum, value_delimiter = ',')]
    pub models: Option<Vec<ModelKind>>,

    /// Helper program run once per model.
    #[arg(long)]
    pub engine_program: Option<String>,

    /// Kill a helper invocation after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Parse model flux over this band (keV).
    #[arg(long, num_args = 2, value_names = ["EMIN", "EMAX"])]
    pub flux_band: Option<Vec<f64>>,

    /// Append-only failure log.
    #[arg(long)]
    pub failure_log: Option<PathBuf>,

    /// Batch summary CSV.
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Also write a combined JSON report of the run.
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// More diagnostics on stderr (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        let cli = Cli::try_parse_from([
            "xsb",
            "targets.txt",
            "--models",
            "powerlaw,logpar",
            "--flux-band",
            "0.5",
            "2.0",
            "--timeout",
            "600",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.input, PathBuf::from("targets.txt"));
        assert_eq!(cli.models, Some(vec![ModelKind::PowerLaw, ModelKind::LogPar]));
        assert_eq!(cli.flux_band, Some(vec![0.5, 2.0]));
        assert_eq!(cli.timeout, Some(600));
        assert_eq!(cli.verbose, 2);
        assert!(!cli.parse_only);
    }

    #[test]
    fn input_is_required() {
        assert!(Cli::try_parse_from(["xsb"]).is_err());
    }

    #[test]
    fn unknown_model_is_rejected() {
        assert!(Cli::try_parse_from(["xsb", "obs", "--models", "cutoffpl"]).is_err());
    }
}
