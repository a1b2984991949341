//! Normalised error and accuracy grades.
//!
//! Each graded row is a selected KPI of one parameter. Within a row the best
//! case scores 0 and the worst case scores the row weight, with values in
//! between interpolated linearly. A case's error grade is its score sum over
//! all rows as a percentage of the total weight.

use crate::analyzers::results::{ResultTable, SUMMARY_PARAMETER};
use crate::analyzers::types::{CaseId, GradingPolicy, Kpi, RowLabel, SummaryMetric};
use crate::analyzers::utility::round2;
use crate::error::EngineError;
use crate::schema::Schema;
use serde::Serialize;
use tracing::debug;

/// Ordered KPIs to grade on, with a positive weight each.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSelection {
    kpis: Vec<Kpi>,
    weights: Vec<f64>,
}

impl MetricSelection {
    pub fn new(kpis: Vec<Kpi>, weights: Vec<f64>) -> Result<Self, EngineError> {
        if kpis.is_empty() {
            return Err(EngineError::InvalidSelection("no KPI selected".into()));
        }
        if kpis.len() != weights.len() {
            return Err(EngineError::InvalidSelection(format!(
                "{} weights for {} KPIs",
                weights.len(),
                kpis.len()
            )));
        }
        for (i, kpi) in kpis.iter().enumerate() {
            if kpis[..i].contains(kpi) {
                return Err(EngineError::InvalidSelection(format!(
                    "{kpi} is listed twice"
                )));
            }
        }
        if let Some(w) = weights.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
            return Err(EngineError::InvalidSelection(format!(
                "weight {w} is not strictly positive"
            )));
        }
        Ok(Self { kpis, weights })
    }

    /// The schema's default KPIs and weights.
    pub fn from_schema(schema: &Schema) -> Result<Self, EngineError> {
        Self::new(
            schema.default_metrics.clone(),
            schema.default_metric_weights.clone(),
        )
    }

    pub fn kpis(&self) -> &[Kpi] {
        &self.kpis
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

/// One row entering the grading algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedRow {
    pub parameter: String,
    pub kpi: Kpi,
    pub policy: GradingPolicy,
    pub weight: f64,
    /// One value per case, NaN for a failed cell.
    pub values: Vec<f64>,
}

/// Weighted sub-grades, one row per graded row and one column per case.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubGradeMatrix {
    pub cases: Vec<CaseId>,
    pub rows: Vec<SubGradeRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubGradeRow {
    pub parameter: String,
    pub kpi: Kpi,
    pub weight: f64,
    pub sub_grades: Vec<f64>,
}

/// Error and accuracy grade of one case, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseGrade {
    pub case: CaseId,
    pub error_grade: f64,
    pub accuracy_grade: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GradeSummary {
    pub grades: Vec<CaseGrade>,
    pub total_weight: f64,
}

impl GradeSummary {
    pub fn get(&self, case: &CaseId) -> Option<&CaseGrade> {
        self.grades.iter().find(|g| &g.case == case)
    }
}

/// Picks the graded rows out of `results`: for every parameter, the
/// selected KPIs in selection order. Weights repeat cyclically across rows.
pub fn graded_rows(results: &ResultTable, selection: &MetricSelection) -> Vec<GradedRow> {
    let mut parameters: Vec<&str> = Vec::new();
    for row in &results.rows {
        if row.parameter != SUMMARY_PARAMETER && !parameters.contains(&row.parameter.as_str()) {
            parameters.push(&row.parameter);
        }
    }

    let weights = selection.weights().iter().copied().cycle();
    parameters
        .into_iter()
        .flat_map(|p| selection.kpis().iter().map(move |k| (p, *k)))
        .filter_map(|(parameter, kpi)| {
            let row = results.row(parameter, RowLabel::Kpi(kpi))?;
            Some((parameter, kpi, row.values.clone()))
        })
        .zip(weights)
        .map(|((parameter, kpi, values), weight)| GradedRow {
            parameter: parameter.to_string(),
            kpi,
            policy: kpi.policy(),
            weight,
            values,
        })
        .collect()
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Best and worst of a row under `policy`, ignoring NaN cells.
fn best_and_worst(policy: GradingPolicy, values: &[f64]) -> Option<(f64, f64)> {
    let finite = || values.iter().copied().filter(|v| !v.is_nan());
    finite().next()?;

    Some(match policy {
        GradingPolicy::BestAtZero => min_max(finite().map(f64::abs)),
        GradingPolicy::BestAtMax => {
            let (lo, hi) = min_max(finite());
            (hi, lo)
        }
        GradingPolicy::BestAtMin => min_max(finite()),
    })
}

/// Sub-grade of every value in a row: 0 for the best case, the full weight
/// for the worst.
pub fn sub_grades(policy: GradingPolicy, weight: f64, values: &[f64]) -> Vec<f64> {
    let Some((best, worst)) = best_and_worst(policy, values) else {
        return vec![f64::NAN; values.len()];
    };

    if best == worst {
        debug!(?policy, best, "All cases tie on graded row");
        return values
            .iter()
            .map(|v| if v.is_nan() { f64::NAN } else { 0.0 })
            .collect();
    }

    values
        .iter()
        .map(|&c| match policy {
            GradingPolicy::BestAtZero => weight * (c.abs() - best) / (worst - best),
            GradingPolicy::BestAtMax => weight * (best - c) / (best - worst),
            GradingPolicy::BestAtMin => weight * (c - best) / (worst - best),
        })
        .collect()
}

/// Grades every case over `rows`. NaN sub-grades add nothing to a case's
/// sum; the denominator is always the full weight of all rows.
pub fn grade_rows(cases: &[CaseId], rows: &[GradedRow]) -> (GradeSummary, SubGradeMatrix) {
    let matrix = SubGradeMatrix {
        cases: cases.to_vec(),
        rows: rows
            .iter()
            .map(|r| SubGradeRow {
                parameter: r.parameter.clone(),
                kpi: r.kpi,
                weight: r.weight,
                sub_grades: sub_grades(r.policy, r.weight, &r.values),
            })
            .collect(),
    };

    let total_weight: f64 = rows.iter().map(|r| r.weight).sum();

    let grades = cases
        .iter()
        .enumerate()
        .map(|(j, case)| {
            let sum: f64 = matrix
                .rows
                .iter()
                .filter_map(|r| r.sub_grades.get(j))
                .filter(|g| !g.is_nan())
                .sum();
            let error = if total_weight > 0.0 {
                sum / total_weight
            } else {
                0.0
            };
            CaseGrade {
                case: case.clone(),
                error_grade: round2(error * 100.0),
                accuracy_grade: round2(100.0 - error * 100.0),
            }
        })
        .collect();

    (
        GradeSummary {
            grades,
            total_weight,
        },
        matrix,
    )
}

/// Grades `results` on `selection` and appends the two summary rows.
#[tracing::instrument(skip_all, fields(kpis = selection.kpis().len(), cases = results.cases.len()))]
pub fn grade(
    results: &mut ResultTable,
    selection: &MetricSelection,
) -> (GradeSummary, SubGradeMatrix) {
    let rows = graded_rows(results, selection);
    let (summary, matrix) = grade_rows(&results.cases, &rows);

    debug!(
        rows = rows.len(),
        total_weight = summary.total_weight,
        "Graded result rows"
    );

    results.push_row(
        SUMMARY_PARAMETER,
        RowLabel::Summary(SummaryMetric::ErrorGrade),
        summary.grades.iter().map(|g| g.error_grade).collect(),
    );
    results.push_row(
        SUMMARY_PARAMETER,
        RowLabel::Summary(SummaryMetric::AccuracyGrade),
        summary.grades.iter().map(|g| g.accuracy_grade).collect(),
    );

    (summary, matrix)
}
