//! Error taxonomy for the comparison engine.
//!
//! Fatal conditions surface as [`EngineError`] and stop a run before a
//! result table is produced. Per-cell failures of the metric library are
//! [`MetricError`]s and never leave result-table assembly.

use crate::validator::{ParameterFailure, TableFailure};
use thiserror::Error;

/// Fatal engine failures.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("parameter file is invalid: {}", join(.failures))]
    SchemaInvalid { failures: Vec<ParameterFailure> },

    #[error("table '{source_name}' is invalid: {}", join(.failures))]
    TableInvalid {
        source_name: String,
        failures: Vec<TableFailure>,
    },

    #[error("no pool column matches parameter '{parameter}'")]
    ReferenceProfileEmpty { parameter: String },

    #[error("case '{case}' has {found} values for '{parameter}', expected {expected}")]
    ProfileLengthMismatch {
        case: String,
        parameter: String,
        expected: usize,
        found: usize,
    },

    #[error("no valid table in the case pool")]
    EmptyPool,

    #[error("invalid metric selection: {0}")]
    InvalidSelection(String),

    #[error("duplicate case name '{0}'")]
    DuplicateCase(String),

    #[error("test case is missing parameter '{0}'")]
    MissingParameter(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// A single metric invocation that could not produce a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    #[error("series lengths differ (reference {reference}, candidate {candidate}, timestamps {timestamps})")]
    LengthMismatch {
        reference: usize,
        candidate: usize,
        timestamps: usize,
    },

    #[error("series is empty")]
    Empty,

    #[error("{0} of the reference is zero")]
    ZeroReference(&'static str),

    #[error("reference is constant while the residual is not")]
    UndefinedRSquared,

    #[error("logarithm undefined for value {0}")]
    LogDomain(f64),

    #[error("result is not finite")]
    NonFinite,
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
