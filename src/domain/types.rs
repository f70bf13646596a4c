//! Parsed fit results.
//!
//! These types are kept small and serializable so they can be:
//!
//! - built incrementally by the log parser
//! - flattened into CSV tables
//! - dumped into the combined JSON run report

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::domain::ModelKind;
use crate::error::ParseIssue;

/// Best-fit value of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamValue {
    pub value: f64,
    /// 1-sigma error; `None` when the parameter was frozen.
    pub error: Option<f64>,
}

impl ParamValue {
    pub fn is_frozen(&self) -> bool {
        self.error.is_none()
    }
}

/// Goodness-of-fit statistic reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestStatistic {
    pub chi_squared: f64,
    pub degrees_of_freedom: f64,
}

/// Model flux with its confidence bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Flux {
    pub value: f64,
    pub error_low: f64,
    pub error_high: f64,
}

/// One fitted model's result, as recovered from its log.
#[derive(Debug, Clone, Serialize)]
pub struct ModelRecord {
    pub model: ModelKind,
    /// Parameters in the model's declared order. Missing ones are absent.
    pub parameters: IndexMap<String, ParamValue>,
    pub statistic: Option<TestStatistic>,
    pub flux: Option<Flux>,
    /// Everything the parser had to skip.
    #[serde(serialize_with = "issues_as_text")]
    pub issues: Vec<ParseIssue>,
}

impl ModelRecord {
    pub fn new(model: ModelKind) -> Self {
        Self {
            model,
            parameters: IndexMap::new(),
            statistic: None,
            flux: None,
            issues: Vec::new(),
        }
    }

    /// Declared parameters that were not recovered.
    pub fn missing_parameters(&self) -> Vec<&'static str> {
        self.model
            .parameters()
            .iter()
            .map(|p| p.name)
            .filter(|name| !self.parameters.contains_key(*name))
            .collect()
    }

    /// A record is complete when every declared parameter and the test
    /// statistic were found. Flux is optional and does not count.
    pub fn is_complete(&self) -> bool {
        self.missing_parameters().is_empty() && self.statistic.is_some()
    }
}

fn issues_as_text<S: Serializer>(issues: &[ParseIssue], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(issues.iter().map(ToString::to_string))
}

/// All model records of one Target, keyed by model.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    records: IndexMap<ModelKind, ModelRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. A second record for the same model is rejected and
    /// handed back.
    pub fn insert(&mut self, record: ModelRecord) -> Result<(), ModelRecord> {
        if self.records.contains_key(&record.model) {
            return Err(record);
        }
        self.records.insert(record.model, record);
        Ok(())
    }

    pub fn get(&self, model: ModelKind) -> Option<&ModelRecord> {
        self.records.get(&model)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &ModelRecord> {
        self.records.values()
    }

    pub fn incomplete_models(&self) -> Vec<ModelKind> {
        self.records()
            .filter(|r| !r.is_complete())
            .map(|r| r.model)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(model: ModelKind, names: &[&str]) -> ModelRecord {
        let mut record = ModelRecord::new(model);
        for name in names {
            record.parameters.insert(
                name.to_string(),
                ParamValue {
                    value: 1.0,
                    error: Some(0.1),
                },
            );
        }
        record.statistic = Some(TestStatistic {
            chi_squared: 10.0,
            degrees_of_freedom: 8.0,
        });
        record
    }

    #[test]
    fn record_missing_a_parameter_is_incomplete() {
        let record = record_with(ModelKind::PowerLaw, &["PhoIndex"]);
        assert_eq!(record.missing_parameters(), vec!["norm"]);
        assert!(!record.is_complete());

        let full = record_with(ModelKind::PowerLaw, &["PhoIndex", "norm"]);
        assert!(full.is_complete());
    }

    #[test]
    fn record_without_statistic_is_incomplete() {
        let mut record = record_with(ModelKind::PowerLaw, &["PhoIndex", "norm"]);
        record.statistic = None;
        assert!(!record.is_complete());
    }

    #[test]
    fn result_set_rejects_duplicate_models() {
        let mut set = ResultSet::new();
        assert!(set.insert(ModelRecord::new(ModelKind::LogPar)).is_ok());
        assert!(set.insert(ModelRecord::new(ModelKind::LogPar)).is_err());
        assert_eq!(set.len(), 1);
    }
}
