//! Declared shape of the data files, parsed from a parameter file.
//!
//! The parameter file is tab-separated, one `<field name>\t<value>` pair per
//! line. It is validated as a whole by
//! [`validate_parameter_file`](crate::validator::validate_parameter_file)
//! before any value is trusted.

use crate::analyzers::types::Kpi;
use crate::error::EngineError;
use crate::validator::validate_parameter_file;
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;

pub const HEADER_LENGTH: &str = "length header data files (number of lines):";
pub const FIRST_DATA_ROW: &str = "first data line (line number):";
pub const COLUMN_COUNT: &str = "number of data columns:";
pub const ROW_COUNT: &str = "number of data rows:";
pub const COLUMN_NAMES: &str = "list of column names:";
pub const DEFAULT_METRICS: &str = "list of default KPIs:";
pub const DEFAULT_WEIGHTS: &str = "list of default KPI_weights:";
pub const SAMPLING_INTERVAL: &str = "sampling time interval [sec]:";
pub const START_TIMESTAMP: &str = "start date time:";
pub const TYPICAL_DAYS: &str = "list typical days:";

/// Every field a parameter file must declare, in canonical order.
pub const REQUIRED_FIELDS: [&str; 10] = [
    HEADER_LENGTH,
    FIRST_DATA_ROW,
    COLUMN_COUNT,
    ROW_COUNT,
    COLUMN_NAMES,
    DEFAULT_METRICS,
    DEFAULT_WEIGHTS,
    SAMPLING_INTERVAL,
    START_TIMESTAMP,
    TYPICAL_DAYS,
];

/// Raw `(name, value)` pairs of a parameter file, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterFile {
    pub entries: Vec<(String, String)>,
}

impl ParameterFile {
    /// Reads tab-separated `name\tvalue` lines.
    ///
    /// Lines with a single cell keep an empty value so that validation can
    /// report them as empty rather than missing.
    pub fn parse(bytes: &[u8]) -> Result<Self, csv::Error> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record?;
            let name = record.get(0).unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            let value = record.get(1).unwrap_or_default();
            entries.push((name.to_string(), value.to_string()));
        }

        Ok(Self { entries })
    }

    /// Value of the first entry named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Splits a comma-separated list value, trimming every item.
pub fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).collect()
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or a bare date.
pub fn parse_start_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Expected tabular shape and default grading setup for one exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub column_count: usize,
    pub header_length: usize,
    pub first_data_row: usize,
    pub row_count: usize,
    /// Ordered names; the first is the elapsed-time column.
    pub column_names: Vec<String>,
    pub sampling_interval_seconds: u32,
    pub start_timestamp: NaiveDateTime,
    pub default_metrics: Vec<Kpi>,
    pub default_metric_weights: Vec<f64>,
    /// Dates used for zoomed plots downstream.
    pub typical_days: Vec<NaiveDate>,
}

impl Schema {
    /// Validates `file` and builds the schema it declares.
    pub fn from_parameter_file(file: &ParameterFile) -> Result<Self, EngineError> {
        let validation = validate_parameter_file(file);
        if !validation.is_ok() {
            return Err(EngineError::SchemaInvalid {
                failures: validation.failures,
            });
        }

        // Every lookup below was checked by the validator.
        let field = |name: &str| file.get(name).unwrap_or_default();
        let integer = |name: &str| field(name).trim().parse::<usize>().unwrap_or_default();

        Ok(Schema {
            column_count: integer(COLUMN_COUNT),
            header_length: integer(HEADER_LENGTH),
            first_data_row: integer(FIRST_DATA_ROW),
            row_count: integer(ROW_COUNT),
            column_names: split_list(field(COLUMN_NAMES)),
            sampling_interval_seconds: field(SAMPLING_INTERVAL).trim().parse().unwrap_or_default(),
            start_timestamp: parse_start_timestamp(field(START_TIMESTAMP)).unwrap_or_default(),
            default_metrics: split_list(field(DEFAULT_METRICS))
                .iter()
                .filter_map(|k| k.parse().ok())
                .collect(),
            default_metric_weights: split_list(field(DEFAULT_WEIGHTS))
                .iter()
                .filter_map(|w| w.parse().ok())
                .collect(),
            typical_days: split_list(field(TYPICAL_DAYS))
                .iter()
                .filter_map(|d| parse_day(d))
                .collect(),
        })
    }

    /// Parses and validates raw parameter-file bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EngineError> {
        let file = ParameterFile::parse(bytes)?;
        Self::from_parameter_file(&file)
    }

    /// Parameter (data) column names, i.e. everything but elapsed time.
    pub fn parameters(&self) -> &[String] {
        self.column_names.get(1..).unwrap_or_default()
    }

    /// Header lines to skip before the first data row.
    pub fn skip_lines(&self) -> usize {
        self.first_data_row.saturating_sub(1)
    }

    /// Absolute timestamp of every row.
    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        let step = chrono::Duration::seconds(i64::from(self.sampling_interval_seconds));
        (0..self.row_count)
            .scan(self.start_timestamp, |ts, _| {
                let current = *ts;
                *ts += step;
                Some(current)
            })
            .collect()
    }
}
