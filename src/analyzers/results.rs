//! The (parameter x metric x case) result matrix.

use crate::analyzers::metrics::{compute_kpi, compute_statistic};
use crate::analyzers::profile::ReferenceProfile;
use crate::analyzers::types::{CaseId, Kpi, RowLabel, Statistic};
use crate::error::{EngineError, MetricError};
use crate::schema::Schema;
use crate::table::{CasePool, TimeSeriesTable};
use serde::Serialize;
use tracing::warn;

/// Parameter label of the summary rows.
pub const SUMMARY_PARAMETER: &str = "Summary";

/// One row: a metric of one parameter, with a value per case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub parameter: String,
    pub metric: RowLabel,
    /// Parallel to [`ResultTable::cases`]; NaN marks a failed computation.
    pub values: Vec<f64>,
}

/// Metric values per parameter and case, in deterministic row order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    pub cases: Vec<CaseId>,
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new(cases: Vec<CaseId>) -> Self {
        Self {
            cases,
            rows: Vec::new(),
        }
    }

    pub fn case_index(&self, case: &CaseId) -> Option<usize> {
        self.cases.iter().position(|c| c == case)
    }

    pub fn row(&self, parameter: &str, metric: RowLabel) -> Option<&ResultRow> {
        self.rows
            .iter()
            .find(|r| r.parameter == parameter && r.metric == metric)
    }

    /// Value at `(parameter, metric, case)`.
    pub fn get(&self, parameter: &str, metric: RowLabel, case: &CaseId) -> Option<f64> {
        let idx = self.case_index(case)?;
        self.row(parameter, metric)?.values.get(idx).copied()
    }

    pub fn push_row(&mut self, parameter: impl Into<String>, metric: RowLabel, values: Vec<f64>) {
        self.rows.push(ResultRow {
            parameter: parameter.into(),
            metric,
            values,
        });
    }

    /// Number of NaN cells, i.e. metric computations that failed.
    pub fn failed_cells(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| &r.values)
            .filter(|v| v.is_nan())
            .count()
    }
}

/// Column order of every output: test case, reference, pool members.
pub fn case_columns(pool: &CasePool, has_test_case: bool) -> Vec<CaseId> {
    let mut cases = Vec::with_capacity(pool.len() + 2);
    if has_test_case {
        cases.push(CaseId::TestCase);
    }
    cases.push(CaseId::Reference);
    cases.extend(pool.names().map(|n| CaseId::Pool(n.to_string())));
    cases
}

/// Computes every KPI in `kpis` and every descriptive statistic for each
/// parameter and case.
///
/// A failed metric becomes a NaN cell and computation continues.
pub fn assemble_results(
    schema: &Schema,
    reference: &ReferenceProfile,
    pool: &CasePool,
    test_case: Option<&TimeSeriesTable>,
    kpis: &[Kpi],
) -> Result<ResultTable, EngineError> {
    let mut table = ResultTable::new(case_columns(pool, test_case.is_some()));
    let labels: Vec<RowLabel> = kpis
        .iter()
        .map(|k| RowLabel::Kpi(*k))
        .chain(Statistic::ALL.into_iter().map(RowLabel::Statistic))
        .collect();

    for parameter in schema.parameters() {
        let reference_values =
            reference
                .get(parameter)
                .ok_or_else(|| EngineError::ReferenceProfileEmpty {
                    parameter: parameter.clone(),
                })?;

        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(table.cases.len());
        for case in &table.cases {
            let candidate = match case {
                CaseId::Reference => Some(reference_values),
                CaseId::TestCase => test_case.and_then(|t| t.get(parameter)),
                CaseId::Pool(name) => pool.get(name).and_then(|t| t.get(parameter)),
            };

            let column = labels
                .iter()
                .map(|label| {
                    let result = match candidate {
                        Some(values) => {
                            evaluate(*label, reference_values, values, &reference.timestamps)
                        }
                        None => Err(MetricError::Empty),
                    };
                    result.unwrap_or_else(|e| {
                        warn!(
                            parameter = %parameter,
                            case = %case,
                            metric = %label,
                            error = %e,
                            "Metric computation failed"
                        );
                        f64::NAN
                    })
                })
                .collect();
            columns.push(column);
        }

        for (m, label) in labels.iter().enumerate() {
            let values = columns.iter().map(|c| c[m]).collect();
            table.push_row(parameter.clone(), *label, values);
        }
    }

    Ok(table)
}

fn evaluate(
    label: RowLabel,
    reference: &[f64],
    candidate: &[f64],
    timestamps: &[chrono::NaiveDateTime],
) -> Result<f64, MetricError> {
    match label {
        RowLabel::Kpi(kpi) => compute_kpi(kpi, reference, candidate, timestamps),
        RowLabel::Statistic(stat) => compute_statistic(stat, reference, candidate, timestamps),
        RowLabel::Summary(_) => Err(MetricError::Empty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::profile::build_reference_profile;
    use crate::schema::tests::schema;
    use crate::table::tests::{case, table};

    fn pool() -> CasePool {
        CasePool::new(vec![
            case("a", [1.0, 2.0, 3.0, 4.0], [20.0, 21.0, 22.0, 23.0]),
            case("b", [3.0, 4.0, 5.0, 6.0], [20.0, 21.0, 22.0, 23.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_row_order_and_columns() {
        let pool = pool();
        let schema = schema();
        let reference = build_reference_profile(&pool, &schema).unwrap();
        let test = table([2.0, 3.0, 4.0, 5.0], [20.0; 4]);

        let results =
            assemble_results(&schema, &reference, &pool, Some(&test), &[Kpi::Nmbe, Kpi::Rmse])
                .unwrap();

        assert_eq!(
            results.cases,
            vec![
                CaseId::TestCase,
                CaseId::Reference,
                CaseId::Pool("a".into()),
                CaseId::Pool("b".into())
            ]
        );
        // 2 parameters x (2 KPIs + 4 statistics)
        assert_eq!(results.rows.len(), 12);
        assert_eq!(results.rows[0].parameter, "Heat [W]");
        assert_eq!(results.rows[0].metric, RowLabel::Kpi(Kpi::Nmbe));
        assert_eq!(results.rows[2].metric, RowLabel::Statistic(Statistic::Minimum));
        assert_eq!(results.rows[6].parameter, "Temp [C]");
    }

    #[test]
    fn test_values() {
        let pool = pool();
        let schema = schema();
        let reference = build_reference_profile(&pool, &schema).unwrap();

        let results = assemble_results(&schema, &reference, &pool, None, &[Kpi::Rmse]).unwrap();
        let rmse = RowLabel::Kpi(Kpi::Rmse);

        assert_eq!(results.get("Heat [W]", rmse, &CaseId::Reference), Some(0.0));
        assert_eq!(results.get("Heat [W]", rmse, &CaseId::Pool("a".into())), Some(1.0));
        assert_eq!(
            results.get("Heat [W]", RowLabel::Statistic(Statistic::Maximum), &CaseId::Pool("b".into())),
            Some(6.0)
        );
        assert_eq!(results.get("Heat [W]", rmse, &CaseId::TestCase), None);
    }

    #[test]
    fn test_failed_metric_becomes_nan() {
        let pool = pool();
        let schema = schema();
        let reference = build_reference_profile(&pool, &schema).unwrap();
        let mut test = table([2.0, 3.0, 4.0, 5.0], [20.0; 4]);
        test.series[0].values.pop();

        let results =
            assemble_results(&schema, &reference, &pool, Some(&test), &[Kpi::Nmbe]).unwrap();

        let nmbe = RowLabel::Kpi(Kpi::Nmbe);
        assert!(results.get("Heat [W]", nmbe, &CaseId::TestCase).unwrap().is_nan());
        assert_eq!(results.get("Temp [C]", nmbe, &CaseId::TestCase), Some(-6.98));
        // 1 KPI + 4 statistics on the truncated series
        assert_eq!(results.failed_cells(), 5);
    }
}
