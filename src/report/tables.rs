//! Table Builder: flatten result sets into the three output tables.
//!
//! Rows are tagged with their model and sorted by a canonical model order
//! (a priority list, not lexical). Models missing from the list sort last,
//! keeping their relative input order.

use serde::{Deserialize, Serialize};

use crate::domain::{ModelKind, ResultSet, TestStatistic};
use crate::error::TargetError;

pub const PARAMETER_HEADER: [&str; 4] = ["Model", "Parameter", "Value", "Error"];
pub const STATISTIC_HEADER: [&str; 4] = ["Model", "Chi2", "DOF", "RedChi2"];
pub const FLUX_HEADER: [&str; 4] = ["Model", "Flux", "ErrorLow", "ErrorHigh"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRow {
    #[serde(rename = "Model")]
    pub model: ModelKind,
    #[serde(rename = "Parameter")]
    pub parameter: String,
    #[serde(rename = "Value")]
    pub value: f64,
    /// Empty for frozen parameters.
    #[serde(rename = "Error")]
    pub error: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticRow {
    #[serde(rename = "Model")]
    pub model: ModelKind,
    #[serde(rename = "Chi2")]
    pub chi_squared: f64,
    #[serde(rename = "DOF")]
    pub dof: f64,
    #[serde(rename = "RedChi2")]
    pub reduced_chi_squared: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluxRow {
    #[serde(rename = "Model")]
    pub model: ModelKind,
    #[serde(rename = "Flux")]
    pub flux: f64,
    #[serde(rename = "ErrorLow")]
    pub error_low: f64,
    #[serde(rename = "ErrorHigh")]
    pub error_high: f64,
}

/// The three tables derived from one or more result sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTables {
    pub parameters: Vec<ParameterRow>,
    pub statistics: Vec<StatisticRow>,
    pub fluxes: Vec<FluxRow>,
}

impl ResultTables {
    /// Build and sort the tables.
    ///
    /// Records without a statistic get no statistic row and records without
    /// flux get no flux row; nothing is zero-filled.
    pub fn build<'a>(
        sets: impl IntoIterator<Item = &'a ResultSet>,
        order: &[ModelKind],
    ) -> Result<Self, TargetError> {
        let mut tables = ResultTables::default();

        for set in sets {
            for record in set.records() {
                for (name, value) in &record.parameters {
                    tables.parameters.push(ParameterRow {
                        model: record.model,
                        parameter: name.clone(),
                        value: value.value,
                        error: value.error,
                    });
                }

                if let Some(stat) = &record.statistic {
                    tables.statistics.push(StatisticRow {
                        model: record.model,
                        chi_squared: stat.chi_squared,
                        dof: stat.degrees_of_freedom,
                        reduced_chi_squared: reduced_chi_squared(stat, record.model)?,
                    });
                }

                if let Some(flux) = &record.flux {
                    tables.fluxes.push(FluxRow {
                        model: record.model,
                        flux: flux.value,
                        error_low: flux.error_low,
                        error_high: flux.error_high,
                    });
                }
            }
        }

        sort_canonical(&mut tables.parameters, order, |r| r.model);
        sort_canonical(&mut tables.statistics, order, |r| r.model);
        sort_canonical(&mut tables.fluxes, order, |r| r.model);

        Ok(tables)
    }
}

/// `chi2 / dof` rounded to 4 decimal places.
pub fn reduced_chi_squared(stat: &TestStatistic, model: ModelKind) -> Result<f64, TargetError> {
    if stat.degrees_of_freedom <= 0.0 {
        return Err(TargetError::DivisionUndefined { model });
    }
    Ok(round_to(stat.chi_squared / stat.degrees_of_freedom, 4))
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Position of `model` in `order`; unlisted models rank after all listed ones.
pub fn canonical_rank(model: ModelKind, order: &[ModelKind]) -> usize {
    order.iter().position(|m| *m == model).unwrap_or(order.len())
}

/// Stable sort by canonical rank.
pub fn sort_canonical<T>(rows: &mut [T], order: &[ModelKind], model_of: impl Fn(&T) -> ModelKind) {
    rows.sort_by_key(|row| canonical_rank(model_of(row), order));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Flux, ModelRecord, ParamValue};

    fn record(model: ModelKind, dof: f64, flux: bool) -> ModelRecord {
        let mut record = ModelRecord::new(model);
        for spec in model.parameters() {
            record.parameters.insert(
                spec.name.to_string(),
                ParamValue {
                    value: 2.0,
                    error: spec.initial.map(|_| 0.1),
                },
            );
        }
        record.statistic = Some(TestStatistic {
            chi_squared: 100.0,
            degrees_of_freedom: dof,
        });
        if flux {
            record.flux = Some(Flux {
                value: 1.0e-11,
                error_low: 0.9e-11,
                error_high: 1.1e-11,
            });
        }
        record
    }

    fn set_of(models: &[ModelKind]) -> ResultSet {
        let mut set = ResultSet::new();
        for m in models {
            set.insert(record(*m, 97.0, *m != ModelKind::BknPower)).unwrap();
        }
        set
    }

    fn permutations() -> Vec<Vec<ModelKind>> {
        use ModelKind::*;
        vec![
            vec![LogPar, PowerLaw, BknPower],
            vec![LogPar, BknPower, PowerLaw],
            vec![PowerLaw, LogPar, BknPower],
            vec![PowerLaw, BknPower, LogPar],
            vec![BknPower, LogPar, PowerLaw],
            vec![BknPower, PowerLaw, LogPar],
        ]
    }

    #[test]
    fn row_order_is_canonical_for_every_input_order() {
        let order = [ModelKind::PowerLaw, ModelKind::BknPower, ModelKind::LogPar];
        for input in permutations() {
            let tables = ResultTables::build([&set_of(&input)], &order).unwrap();

            let stat_models: Vec<_> = tables.statistics.iter().map(|r| r.model).collect();
            assert_eq!(stat_models, order.to_vec(), "input {input:?}");

            let param_models: Vec<_> = tables.parameters.iter().map(|r| r.model).collect();
            let mut expected = Vec::new();
            for m in order {
                expected.extend(std::iter::repeat_n(m, m.parameters().len()));
            }
            assert_eq!(param_models, expected, "input {input:?}");
        }
    }

    #[test]
    fn parameters_keep_declared_order_within_model() {
        let tables = ResultTables::build([&set_of(&[ModelKind::BknPower])], &[]).unwrap();
        let names: Vec<_> = tables.parameters.iter().map(|r| r.parameter.as_str()).collect();
        assert_eq!(names, vec!["PhoIndx1", "BreakE", "PhoIndx2", "norm"]);
    }

    #[test]
    fn unlisted_models_sort_last_in_input_order() {
        let order = [ModelKind::LogPar];
        let first = set_of(&[ModelKind::BknPower, ModelKind::PowerLaw, ModelKind::LogPar]);
        let second = set_of(&[ModelKind::PowerLaw, ModelKind::BknPower]);

        let tables = ResultTables::build([&first, &second], &order).unwrap();
        let models: Vec<_> = tables.statistics.iter().map(|r| r.model).collect();
        assert_eq!(
            models,
            vec![
                ModelKind::LogPar,
                ModelKind::BknPower,
                ModelKind::PowerLaw,
                ModelKind::PowerLaw,
                ModelKind::BknPower,
            ]
        );
    }

    #[test]
    fn models_without_flux_are_omitted() {
        let tables = ResultTables::build([&set_of(&ModelKind::ALL)], &ModelKind::ALL).unwrap();
        let models: Vec<_> = tables.fluxes.iter().map(|r| r.model).collect();
        assert_eq!(models, vec![ModelKind::LogPar, ModelKind::PowerLaw]);
    }

    #[test]
    fn reduced_chi_squared_is_rounded_and_stable() {
        let stat = TestStatistic {
            chi_squared: 112.34,
            degrees_of_freedom: 101.0,
        };
        let once = reduced_chi_squared(&stat, ModelKind::LogPar).unwrap();
        assert_eq!(once, 1.1123);
        assert_eq!(round_to(once, 4), once);
    }

    #[test]
    fn zero_dof_is_division_undefined() {
        let mut set = ResultSet::new();
        set.insert(record(ModelKind::PowerLaw, 0.0, false)).unwrap();

        let err = ResultTables::build([&set], &ModelKind::ALL).unwrap_err();
        assert!(matches!(
            err,
            TargetError::DivisionUndefined {
                model: ModelKind::PowerLaw
            }
        ));
    }
}
