//! Point-wise mean profile of the case pool.

use crate::analyzers::utility::mean;
use crate::error::EngineError;
use crate::schema::Schema;
use crate::table::{CasePool, Series};
use chrono::NaiveDateTime;
use tracing::debug;

/// The comparison baseline: one averaged series per parameter on the
/// schema's time axis. Derived from the pool and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceProfile {
    /// Elapsed-time column of the first pool member.
    pub elapsed_seconds: Vec<f64>,
    pub timestamps: Vec<NaiveDateTime>,
    pub series: Vec<Series>,
}

impl ReferenceProfile {
    pub fn get(&self, parameter: &str) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|s| s.parameter == parameter)
            .map(|s| s.values.as_slice())
    }
}

fn check_length(
    case: &str,
    parameter: &str,
    expected: usize,
    found: usize,
) -> Result<(), EngineError> {
    if expected != found {
        return Err(EngineError::ProfileLengthMismatch {
            case: case.to_string(),
            parameter: parameter.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

/// Averages every pool series of each schema parameter row by row.
///
/// # Errors
///
/// [`EngineError::ReferenceProfileEmpty`] if no pool member carries a
/// parameter, [`EngineError::ProfileLengthMismatch`] if a member series is
/// not exactly one value per timestamp.
pub fn build_reference_profile(
    pool: &CasePool,
    schema: &Schema,
) -> Result<ReferenceProfile, EngineError> {
    let timestamps = schema.timestamps();
    let rows = timestamps.len();

    let elapsed_seconds = match pool.cases().first() {
        Some(first) => {
            let time_column = schema.column_names.first().map_or("", String::as_str);
            check_length(&first.name, time_column, rows, first.table.elapsed_seconds.len())?;
            first.table.elapsed_seconds.clone()
        }
        None => Vec::new(),
    };

    let mut series = Vec::with_capacity(schema.parameters().len());
    for parameter in schema.parameters() {
        let mut members: Vec<&[f64]> = Vec::with_capacity(pool.len());
        for (case, values) in pool.series(parameter) {
            check_length(case, parameter, rows, values.len())?;
            members.push(values);
        }
        if members.is_empty() {
            return Err(EngineError::ReferenceProfileEmpty {
                parameter: parameter.clone(),
            });
        }

        debug!(
            parameter = %parameter,
            cases = members.len(),
            rows,
            "Averaging pool series"
        );

        let mut row = Vec::with_capacity(members.len());
        let values = (0..rows)
            .map(|i| {
                row.clear();
                row.extend(members.iter().map(|m| m[i]));
                mean(&row)
            })
            .collect();

        series.push(Series {
            parameter: parameter.clone(),
            values,
        });
    }

    Ok(ReferenceProfile {
        elapsed_seconds,
        timestamps,
        series,
    })
}
