//! Log Parser: one fit log in, at most one `ModelRecord` out.
//!
//! Log-format contract (`xspec-show-v1`):
//!
//! - iterations are separated by runs of ten or more `=`; only the text after
//!   the last separator (the converged report) is read
//! - the section names its model by token (`logpar`, `powerlaw`, `bknpower`)
//! - each parameter line carries the parameter name as a word, its value as
//!   the first decimal number and its 1-sigma error as the second; no second
//!   number means the parameter was frozen
//! - `Test statistic : Chi-Squared <chi2> ...` and
//!   `Null hypothesis probability of <p> with <dof> degrees of freedom`
//! - optionally `Model Flux <ph> photons (<flux> ergs/cm^2/s) ...` followed by
//!   `Error range <lo> - <hi> (<flux_lo> - <flux_hi>) ...`
//!
//! Anything missing is recorded on the record as a `ParseIssue`; only a
//! section with no recognisable model yields no record at all.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{Flux, ModelKind, ModelRecord, ParamValue, TestStatistic};
use crate::error::ParseIssue;
use crate::parse::scan::{LineScanner, decimals, last_integer_token, numbers};

static SECTION_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"={10,}").expect("valid regex"));

static DOF_PINNED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)with\s+(\d+)\s+degrees\s+of\s+freedom").expect("valid regex"));

static ENERGY_FLUX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([-+]?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)\s*ergs").expect("valid regex")
});

static BOUND_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*([-+]?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)\s*-\s*([-+]?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)\s*\)")
        .expect("valid regex")
});

/// Parser configured with the candidate models and whether flux is expected.
#[derive(Debug, Clone)]
pub struct LogParser<'m> {
    models: &'m [ModelKind],
    flux: bool,
}

impl<'m> LogParser<'m> {
    pub fn new(models: &'m [ModelKind]) -> Self {
        Self { models, flux: false }
    }

    /// Also extract model flux.
    pub fn with_flux(mut self, flux: bool) -> Self {
        self.flux = flux;
        self
    }

    /// Parse one log's full text.
    ///
    /// Returns `Err(ParseIssue::MissingSection)` only when the final section
    /// is empty or names none of the candidate models.
    pub fn parse(&self, text: &str) -> Result<ModelRecord, ParseIssue> {
        let section = final_section(text).ok_or(ParseIssue::MissingSection)?;
        let model = self.detect_model(section).ok_or(ParseIssue::MissingSection)?;
        let scanner = LineScanner::new(section);

        let mut record = ModelRecord::new(model);

        for spec in model.parameters() {
            match parameter(&scanner, spec.name) {
                Some(value) => {
                    record.parameters.insert(spec.name.to_string(), value);
                }
                None => record.issues.push(ParseIssue::MissingParameter {
                    name: spec.name.to_string(),
                }),
            }
        }

        match statistic(&scanner) {
            Ok(stat) => record.statistic = Some(stat),
            Err(issue) => record.issues.push(issue),
        }

        if self.flux {
            match flux(&scanner) {
                Ok(f) => record.flux = Some(f),
                Err(issue) => record.issues.push(issue),
            }
        }

        Ok(record)
    }

    fn detect_model(&self, section: &str) -> Option<ModelKind> {
        self.models.iter().copied().find(|m| section.contains(m.name()))
    }
}

/// Text after the last separator, if it has any content.
pub fn final_section(text: &str) -> Option<&str> {
    let section = SECTION_SEPARATOR.split(text).last()?;
    if section.trim().is_empty() {
        None
    } else {
        Some(section)
    }
}

fn parameter(scanner: &LineScanner<'_>, name: &str) -> Option<ParamValue> {
    let line = scanner.first_with_token(name)?;
    let values = decimals(line);
    let value = *values.first()?;
    Some(ParamValue {
        value,
        error: values.get(1).copied(),
    })
}

fn statistic(scanner: &LineScanner<'_>) -> Result<TestStatistic, ParseIssue> {
    let stat_line = scanner
        .last_containing("Test statistic")
        .or_else(|| scanner.last_containing("Fit statistic"))
        .ok_or_else(|| missing_statistic("no test statistic line"))?;
    let chi_squared = numbers(stat_line)
        .first()
        .copied()
        .ok_or_else(|| missing_statistic("no value on the test statistic line"))?;

    let dof_line = scanner
        .last_containing("degrees of freedom")
        .or_else(|| scanner.last_containing("Null hypothesis"))
        .ok_or_else(|| missing_statistic("no degrees-of-freedom line"))?;
    let dof = DOF_PINNED
        .captures(dof_line)
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .or_else(|| last_integer_token(dof_line))
        .ok_or_else(|| missing_statistic("no integer on the degrees-of-freedom line"))?;

    if dof == 0 {
        tracing::warn!(line = dof_line.trim(), "fit reports zero degrees of freedom");
    }

    Ok(TestStatistic {
        chi_squared,
        degrees_of_freedom: dof as f64,
    })
}

fn flux(scanner: &LineScanner<'_>) -> Result<Flux, ParseIssue> {
    let (idx, flux_line) = scanner
        .last_index_containing("Model Flux")
        .ok_or_else(|| missing_flux("no model flux line"))?;
    let error_line = scanner
        .first_containing_after(idx, "Error range")
        .ok_or_else(|| missing_flux("no error range line after the model flux"))?;

    let value = ENERGY_FLUX
        .captures(flux_line)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .or_else(|| numbers(flux_line).first().copied())
        .ok_or_else(|| missing_flux("no value on the model flux line"))?;

    let (error_low, error_high) = match BOUND_PAIR.captures(error_line) {
        Some(caps) => match (caps[1].parse::<f64>(), caps[2].parse::<f64>()) {
            (Ok(lo), Ok(hi)) => (lo, hi),
            _ => return Err(missing_flux("unreadable error range")),
        },
        None => {
            let values = numbers(error_line);
            match values.as_slice() {
                [lo, hi, ..] => (*lo, *hi),
                _ => return Err(missing_flux("error range needs two bounds")),
            }
        }
    };

    Ok(Flux {
        value,
        error_low,
        error_high,
    })
}

fn missing_statistic(detail: &str) -> ParseIssue {
    ParseIssue::MissingStatistic {
        detail: detail.to_string(),
    }
}

fn missing_flux(detail: &str) -> ParseIssue {
    ParseIssue::MissingFlux {
        detail: detail.to_string(),
    }
}
