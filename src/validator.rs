//! Structural validation of data tables and parameter files.
//!
//! Validation is a pure predicate: it never repairs a table. Failure reasons
//! are kept in check order for diagnostics.

use crate::analyzers::types::Kpi;
use crate::parser::RawTable;
use crate::schema::{
    self, COLUMN_COUNT, COLUMN_NAMES, DEFAULT_METRICS, DEFAULT_WEIGHTS, FIRST_DATA_ROW,
    HEADER_LENGTH, ParameterFile, REQUIRED_FIELDS, ROW_COUNT, SAMPLING_INTERVAL, START_TIMESTAMP,
    Schema, TYPICAL_DAYS,
};
use std::collections::HashSet;
use thiserror::Error;

/// Outcome of a validation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult<F> {
    pub failures: Vec<F>,
}

impl<F> ValidationResult<F> {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Why a data table was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableFailure {
    #[error("table could not be parsed: {0}")]
    Structural(String),

    #[error("{0} null or missing cells")]
    NullCells(usize),

    #[error("column count mismatch: expected {expected}, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("row count mismatch: expected {expected}, found {found}")]
    RowCount { expected: usize, found: usize },

    #[error("elapsed time has {0} distinct consecutive deltas, expected exactly 1")]
    NonUniformSampling(usize),

    #[error("elapsed time step is {found} s, expected {expected} s")]
    SamplingInterval { expected: u32, found: f64 },
}

/// Why a parameter file was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterFailure {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("required field '{0}' is missing")]
    MissingField(&'static str),

    #[error("required field '{0}' is empty or NaN")]
    EmptyField(&'static str),

    #[error("field '{field}' is not a valid non-negative integer: '{value}'")]
    NotAnInteger { field: &'static str, value: String },

    #[error("sampling interval must be greater than zero")]
    ZeroSamplingInterval,

    #[error("{names} column names declared for {count} columns")]
    ColumnNameCount { names: usize, count: usize },

    #[error("'{0}' is not an implemented KPI")]
    UnknownMetric(String),

    #[error("{weights} weights declared for {metrics} KPIs")]
    WeightCount { weights: usize, metrics: usize },

    #[error("weight '{0}' is not a strictly positive number")]
    InvalidWeight(String),

    #[error("start date time '{0}' is not a valid date-time")]
    InvalidStartTimestamp(String),

    #[error("typical days list is empty")]
    NoTypicalDays,

    #[error("typical day '{0}' is not a valid date")]
    InvalidTypicalDay(String),
}

/// Checks a parsed data table against the declared schema.
///
/// The elapsed-time delta check covers monotonicity, uniform sampling and
/// the absence of gaps or duplicates in a single pass.
pub fn validate_table(table: &RawTable, schema: &Schema) -> ValidationResult<TableFailure> {
    let mut failures = Vec::new();

    if let Some(reason) = &table.structural_error {
        failures.push(TableFailure::Structural(reason.clone()));
    }

    let nulls = table.null_count();
    if nulls > 0 {
        failures.push(TableFailure::NullCells(nulls));
    }

    if table.column_count() != schema.column_count {
        failures.push(TableFailure::ColumnCount {
            expected: schema.column_count,
            found: table.column_count(),
        });
    }

    if table.row_count() != schema.row_count {
        failures.push(TableFailure::RowCount {
            expected: schema.row_count,
            found: table.row_count(),
        });
    }

    let deltas = elapsed_deltas(table);
    let distinct: HashSet<u64> = deltas.iter().map(|d| d.to_bits()).collect();
    if distinct.len() != 1 {
        failures.push(TableFailure::NonUniformSampling(distinct.len()));
    } else if deltas[0] != f64::from(schema.sampling_interval_seconds) {
        failures.push(TableFailure::SamplingInterval {
            expected: schema.sampling_interval_seconds,
            found: deltas[0],
        });
    }

    ValidationResult { failures }
}

/// Consecutive differences of the first column. Null cells poison the set
/// with a NaN delta.
fn elapsed_deltas(table: &RawTable) -> Vec<f64> {
    let elapsed: Vec<f64> = table
        .rows
        .iter()
        .map(|row| row.first().copied().flatten().unwrap_or(f64::NAN))
        .collect();

    elapsed.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Checks every field of a parameter file before it is trusted as a schema.
pub fn validate_parameter_file(file: &ParameterFile) -> ValidationResult<ParameterFailure> {
    let mut failures = Vec::new();

    if file.entries.len() != REQUIRED_FIELDS.len() {
        failures.push(ParameterFailure::FieldCount {
            expected: REQUIRED_FIELDS.len(),
            found: file.entries.len(),
        });
    }

    for name in REQUIRED_FIELDS {
        match file.get(name) {
            None => failures.push(ParameterFailure::MissingField(name)),
            Some(v) if is_blank(v) => failures.push(ParameterFailure::EmptyField(name)),
            Some(_) => {}
        }
    }

    // Only values that are present get their content checks.
    let value = |name: &'static str| file.get(name).filter(|v| !is_blank(v));

    let integer = |name: &'static str, failures: &mut Vec<ParameterFailure>| {
        let raw = value(name)?;
        match raw.trim().parse::<usize>() {
            Ok(n) => Some(n),
            Err(_) => {
                failures.push(ParameterFailure::NotAnInteger {
                    field: name,
                    value: raw.to_string(),
                });
                None
            }
        }
    };

    integer(HEADER_LENGTH, &mut failures);
    integer(FIRST_DATA_ROW, &mut failures);
    let column_count = integer(COLUMN_COUNT, &mut failures);
    integer(ROW_COUNT, &mut failures);
    match value(SAMPLING_INTERVAL).map(|raw| (raw, raw.trim().parse::<u32>())) {
        Some((_, Ok(0))) => failures.push(ParameterFailure::ZeroSamplingInterval),
        Some((raw, Err(_))) => failures.push(ParameterFailure::NotAnInteger {
            field: SAMPLING_INTERVAL,
            value: raw.to_string(),
        }),
        _ => {}
    }

    if let (Some(names), Some(count)) = (value(COLUMN_NAMES), column_count) {
        let names = schema::split_list(names).len();
        if names != count {
            failures.push(ParameterFailure::ColumnNameCount { names, count });
        }
    }

    let metrics = value(DEFAULT_METRICS).map(schema::split_list);
    if let Some(metrics) = &metrics {
        for m in metrics {
            if m.parse::<Kpi>().is_err() {
                failures.push(ParameterFailure::UnknownMetric(m.clone()));
            }
        }
    }

    if let Some(weights) = value(DEFAULT_WEIGHTS).map(schema::split_list) {
        if let Some(metrics) = &metrics {
            if weights.len() != metrics.len() {
                failures.push(ParameterFailure::WeightCount {
                    weights: weights.len(),
                    metrics: metrics.len(),
                });
            }
        }
        for w in weights {
            match w.parse::<f64>() {
                Ok(v) if v.is_finite() && v > 0.0 => {}
                _ => failures.push(ParameterFailure::InvalidWeight(w)),
            }
        }
    }

    if let Some(raw) = value(START_TIMESTAMP) {
        if schema::parse_start_timestamp(raw).is_none() {
            failures.push(ParameterFailure::InvalidStartTimestamp(raw.to_string()));
        }
    }

    if let Some(raw) = value(TYPICAL_DAYS) {
        let days: Vec<String> = schema::split_list(raw)
            .into_iter()
            .filter(|d| !d.is_empty())
            .collect();
        if days.is_empty() {
            failures.push(ParameterFailure::NoTypicalDays);
        }
        for d in days {
            if schema::parse_day(&d).is_none() {
                failures.push(ParameterFailure::InvalidTypicalDay(d));
            }
        }
    }

    ValidationResult { failures }
}

fn is_blank(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case("nan")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_table;
    use crate::schema::tests::{PARAMETERS, schema};

    const HEADER: &str = "Exercise B1\nTime [s],Heat [W],Temp [C]\n";

    fn table(body: &str) -> RawTable {
        let text = format!("{HEADER}{body}");
        parse_table(text.as_bytes(), &schema())
    }

    #[test]
    fn test_valid_table() {
        let result = validate_table(
            &table("0,1.0,20\n3600,2.0,21\n7200,3.0,22\n10800,4.0,23\n"),
            &schema(),
        );
        assert!(result.is_ok(), "{:?}", result.failures);
    }

    #[test]
    fn test_rejects_wrong_row_count() {
        let result = validate_table(&table("0,1.0,20\n3600,2.0,21\n7200,3.0,22\n"), &schema());
        assert_eq!(
            result.failures,
            vec![TableFailure::RowCount {
                expected: 4,
                found: 3
            }]
        );
        assert!(result.failures[0].to_string().contains("row count mismatch"));
    }

    #[test]
    fn test_rejects_null_cells() {
        let result = validate_table(
            &table("0,1.0,20\n3600,,21\n7200,3.0,22\n10800,4.0,23\n"),
            &schema(),
        );
        assert_eq!(result.failures, vec![TableFailure::NullCells(1)]);
    }

    #[test]
    fn test_rejects_wrong_column_count() {
        let result = validate_table(&table("0,1.0\n3600,2.0\n7200,3.0\n10800,4.0\n"), &schema());
        assert_eq!(
            result.failures,
            vec![TableFailure::ColumnCount {
                expected: 3,
                found: 2
            }]
        );
    }

    #[test]
    fn test_rejects_gap_in_elapsed_time() {
        let result = validate_table(
            &table("0,1.0,20\n3600,2.0,21\n10800,3.0,22\n14400,4.0,23\n"),
            &schema(),
        );
        assert_eq!(result.failures, vec![TableFailure::NonUniformSampling(2)]);
    }

    #[test]
    fn test_rejects_decreasing_elapsed_time() {
        let result = validate_table(
            &table("10800,1.0,20\n7200,2.0,21\n3600,3.0,22\n0,4.0,23\n"),
            &schema(),
        );
        assert!(matches!(
            result.failures.as_slice(),
            [TableFailure::SamplingInterval { .. }]
        ));
    }

    #[test]
    fn test_rejects_structural_error() {
        let result = validate_table(
            &table("0,1.0,20\n3600,abc,21\n7200,3.0,22\n10800,4.0,23\n"),
            &schema(),
        );
        assert!(matches!(
            result.failures.first(),
            Some(TableFailure::Structural(_))
        ));
    }

    fn parameter_file(text: &str) -> ParameterFile {
        ParameterFile::parse(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_valid_parameter_file() {
        let result = validate_parameter_file(&parameter_file(PARAMETERS));
        assert!(result.is_ok(), "{:?}", result.failures);
    }

    #[test]
    fn test_parameter_file_missing_field() {
        let text: String = PARAMETERS
            .lines()
            .filter(|l| !l.starts_with("list typical days:"))
            .map(|l| format!("{l}\n"))
            .collect();
        let result = validate_parameter_file(&parameter_file(&text));

        assert!(result.failures.contains(&ParameterFailure::FieldCount {
            expected: 10,
            found: 9
        }));
        assert!(result
            .failures
            .contains(&ParameterFailure::MissingField(TYPICAL_DAYS)));
    }

    #[test]
    fn test_parameter_file_nan_field() {
        let text = PARAMETERS.replace("number of data rows:\t4", "number of data rows:\tNaN");
        let result = validate_parameter_file(&parameter_file(&text));
        assert_eq!(result.failures, vec![ParameterFailure::EmptyField(ROW_COUNT)]);
    }

    #[test]
    fn test_parameter_file_column_names_mismatch() {
        let text = PARAMETERS.replace("Time [s],Heat [W],Temp [C]", "Time [s],Heat [W]");
        let result = validate_parameter_file(&parameter_file(&text));
        assert_eq!(
            result.failures,
            vec![ParameterFailure::ColumnNameCount { names: 2, count: 3 }]
        );
    }

    #[test]
    fn test_parameter_file_unknown_metric() {
        let text = PARAMETERS.replace("NMBE [%],", "MAPE [%],");
        let result = validate_parameter_file(&parameter_file(&text));
        assert_eq!(
            result.failures,
            vec![ParameterFailure::UnknownMetric("MAPE [%]".to_string())]
        );
    }

    #[test]
    fn test_parameter_file_bad_weights() {
        let text = PARAMETERS.replace("1,2,1", "1,0,heavy");
        let result = validate_parameter_file(&parameter_file(&text));
        assert_eq!(
            result.failures,
            vec![
                ParameterFailure::InvalidWeight("0".to_string()),
                ParameterFailure::InvalidWeight("heavy".to_string()),
            ]
        );
    }

    #[test]
    fn test_parameter_file_weight_count() {
        let text = PARAMETERS.replace("1,2,1", "1,2");
        let result = validate_parameter_file(&parameter_file(&text));
        assert_eq!(
            result.failures,
            vec![ParameterFailure::WeightCount {
                weights: 2,
                metrics: 3
            }]
        );
    }

    #[test]
    fn test_parameter_file_zero_sampling_interval() {
        let text = PARAMETERS.replace(
            "sampling time interval [sec]:\t3600",
            "sampling time interval [sec]:\t0",
        );
        let result = validate_parameter_file(&parameter_file(&text));
        assert_eq!(result.failures, vec![ParameterFailure::ZeroSamplingInterval]);
    }

    #[test]
    fn test_parameter_file_fractional_row_count() {
        let text = PARAMETERS.replace("number of data rows:\t4", "number of data rows:\t4.5");
        let result = validate_parameter_file(&parameter_file(&text));
        assert_eq!(
            result.failures,
            vec![ParameterFailure::NotAnInteger {
                field: ROW_COUNT,
                value: "4.5".to_string()
            }]
        );
    }

    #[test]
    fn test_parameter_file_no_typical_days() {
        let text = PARAMETERS.replace("list typical days:\t2019-01-01", "list typical days:\t,");
        let result = validate_parameter_file(&parameter_file(&text));
        assert_eq!(result.failures, vec![ParameterFailure::NoTypicalDays]);
    }

    #[test]
    fn test_parameter_file_invalid_typical_day() {
        let text = PARAMETERS.replace(
            "list typical days:\t2019-01-01",
            "list typical days:\t2019-01-01,2019-13-01",
        );
        let result = validate_parameter_file(&parameter_file(&text));
        assert_eq!(
            result.failures,
            vec![ParameterFailure::InvalidTypicalDay("2019-13-01".to_string())]
        );
    }

    #[test]
    fn test_parameter_file_bad_start_timestamp() {
        let text = PARAMETERS.replace("2019-01-01 00:00:00", "yesterday");
        let result = validate_parameter_file(&parameter_file(&text));
        assert_eq!(
            result.failures,
            vec![ParameterFailure::InvalidStartTimestamp("yesterday".to_string())]
        );
    }
}
