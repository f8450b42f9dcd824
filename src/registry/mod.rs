//! # Type Registry
//!
//! Maps the `type` / `parameter` discriminator strings found in configuration
//! documents to the code that builds or binds the corresponding objects.
//!
//! ## Namespaces
//!
//! - **records**: point record backends (`CSV`, `SCADA`, `MySQL`)
//! - **timeseries**: time series node kinds (`TimeSeries`, `MovingAverage`,
//!   `Aggregator`, ...)
//! - **parameters**: element parameters a time series can be bound to
//!   (`headmeasure`, `boundaryhead`, `flow`, ...)
//!
//! Every discriminator is registered once, in [`TypeRegistry::new`]. There is
//! no way to add entries afterwards, so a registry handed to a loader always
//! describes exactly the types this build knows about.
//!
//! ## Unknown discriminators
//!
//! A lookup miss is reported as [`BuildError::UnknownType`]. Callers treat it
//! as a failure of the single entry being built and carry on with the rest of
//! the section.

use crate::config_tree::{Setting, SettingError};
use crate::model::ParameterKind;
use crate::records::{self, PointRecord, RecordContext};
use crate::timeseries::builder::{self, SeriesContext};
use crate::timeseries::TimeSeries;
use std::collections::HashMap;
use std::fmt;

/// Builds a point record from its setting
pub type RecordConstructor =
    fn(&Setting<'_>, &mut RecordContext<'_>) -> Result<PointRecord, BuildError>;

/// Builds a time series node from its setting
pub type SeriesConstructor =
    fn(&Setting<'_>, &mut SeriesContext<'_>) -> Result<TimeSeries, BuildError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Records,
    TimeSeries,
    Parameters,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Namespace::Records => "point record",
            Namespace::TimeSeries => "time series",
            Namespace::Parameters => "parameter",
        };
        f.write_str(name)
    }
}

/// Why a single entity could not be built
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("{namespace} type [{discriminator}] not supported (known: {known})")]
    UnknownType {
        namespace: Namespace,
        discriminator: String,
        known: String,
    },
    #[error(transparent)]
    Setting(#[from] SettingError),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug)]
pub struct TypeRegistry {
    records: HashMap<&'static str, RecordConstructor>,
    series: HashMap<&'static str, SeriesConstructor>,
    parameters: HashMap<&'static str, ParameterKind>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut record_types: HashMap<&'static str, RecordConstructor> = HashMap::new();
        record_types.insert("CSV", records::create_flat_file_record);
        record_types.insert("SCADA", records::create_odbc_record);
        record_types.insert("MySQL", records::create_database_record);

        let mut series_types: HashMap<&'static str, SeriesConstructor> = HashMap::new();
        series_types.insert("TimeSeries", builder::create_time_series);
        series_types.insert("MovingAverage", builder::create_moving_average);
        series_types.insert("Aggregator", builder::create_aggregator);
        series_types.insert("Resampler", builder::create_resampler);
        series_types.insert("Derivative", builder::create_derivative);
        series_types.insert("FirstDerivative", builder::create_derivative);
        series_types.insert("Offset", builder::create_offset);
        series_types.insert("Threshold", builder::create_threshold);
        series_types.insert("CurveFunction", builder::create_curve_function);
        series_types.insert("Multiplier", builder::create_multiplier);
        series_types.insert("ValidRange", builder::create_valid_range);
        series_types.insert("Constant", builder::create_constant);

        let parameters = ParameterKind::ALL
            .iter()
            .map(|kind| (kind.discriminator(), *kind))
            .collect();

        Self {
            records: record_types,
            series: series_types,
            parameters,
        }
    }

    pub fn record_constructor(&self, discriminator: &str) -> Result<RecordConstructor, BuildError> {
        self.records
            .get(discriminator)
            .copied()
            .ok_or_else(|| self.unknown(Namespace::Records, discriminator))
    }

    pub fn series_constructor(&self, discriminator: &str) -> Result<SeriesConstructor, BuildError> {
        self.series
            .get(discriminator)
            .copied()
            .ok_or_else(|| self.unknown(Namespace::TimeSeries, discriminator))
    }

    pub fn parameter_kind(&self, discriminator: &str) -> Result<ParameterKind, BuildError> {
        self.parameters
            .get(discriminator)
            .copied()
            .ok_or_else(|| self.unknown(Namespace::Parameters, discriminator))
    }

    /// Registered discriminators of a namespace, sorted
    pub fn discriminators(&self, namespace: Namespace) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = match namespace {
            Namespace::Records => self.records.keys().copied().collect(),
            Namespace::TimeSeries => self.series.keys().copied().collect(),
            Namespace::Parameters => self.parameters.keys().copied().collect(),
        };
        names.sort_unstable();
        names
    }

    fn unknown(&self, namespace: Namespace, discriminator: &str) -> BuildError {
        BuildError::UnknownType {
            namespace,
            discriminator: discriminator.to_string(),
            known: self.discriminators(namespace).join(", "),
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_namespaces() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.discriminators(Namespace::Records), vec!["CSV", "MySQL", "SCADA"]);
        assert_eq!(registry.discriminators(Namespace::TimeSeries).len(), 12);
        assert_eq!(registry.discriminators(Namespace::Parameters).len(), 12);

        assert!(registry.series_constructor("MovingAverage").is_ok());
        assert_eq!(registry.parameter_kind("boundaryhead"), Ok(ParameterKind::BoundaryHead));
    }

    #[test]
    fn test_unknown_type() {
        let registry = TypeRegistry::new();
        let err = registry.record_constructor("Parquet").unwrap_err();
        match &err {
            BuildError::UnknownType { namespace, discriminator, known } => {
                assert_eq!(*namespace, Namespace::Records);
                assert_eq!(discriminator, "Parquet");
                assert_eq!(known, "CSV, MySQL, SCADA");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.to_string().contains("[Parquet]"));

        // discriminators are case-sensitive
        assert!(registry.series_constructor("movingaverage").is_err());
        assert!(registry.parameter_kind("HeadMeasure").is_err());
    }

    #[test]
    fn test_derivative_alias() {
        let registry = TypeRegistry::new();
        let a = registry.series_constructor("Derivative").unwrap();
        let b = registry.series_constructor("FirstDerivative").unwrap();
        assert_eq!(a as usize, b as usize);
    }
}
