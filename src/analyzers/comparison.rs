//! End-to-end comparison of a test case against a case pool.

use crate::analyzers::grade::{GradeSummary, MetricSelection, SubGradeMatrix, grade};
use crate::analyzers::profile::{ReferenceProfile, build_reference_profile};
use crate::analyzers::results::{ResultTable, assemble_results};
use crate::analyzers::types::Kpi;
use crate::error::EngineError;
use crate::schema::Schema;
use crate::table::{CasePool, TimeSeriesTable};
use tracing::info;

/// Everything one comparison run produces.
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Metric values plus the two summary rows.
    pub results: ResultTable,
    pub reference: ReferenceProfile,
    pub sub_grades: SubGradeMatrix,
    pub summary: GradeSummary,
}

/// Row order of the KPI block: the selection first, then the rest of the
/// catalog.
fn kpi_rows(selection: &MetricSelection) -> Vec<Kpi> {
    let mut kpis = selection.kpis().to_vec();
    kpis.extend(Kpi::ALL.into_iter().filter(|k| !selection.kpis().contains(k)));
    kpis
}

/// Builds the reference profile, assembles the result table and grades it.
#[tracing::instrument(skip_all, fields(pool = pool.len(), test_case = test_case.is_some()))]
pub fn compare(
    schema: &Schema,
    pool: &CasePool,
    test_case: Option<&TimeSeriesTable>,
    selection: &MetricSelection,
) -> Result<Comparison, EngineError> {
    if pool.is_empty() {
        return Err(EngineError::EmptyPool);
    }
    if let Some(test) = test_case
        && let Some(missing) = schema.parameters().iter().find(|p| test.get(p).is_none())
    {
        return Err(EngineError::MissingParameter(missing.clone()));
    }

    let reference = build_reference_profile(pool, schema)?;
    let mut results = assemble_results(schema, &reference, pool, test_case, &kpi_rows(selection))?;
    let (summary, sub_grades) = grade(&mut results, selection);

    info!(
        rows = results.rows.len(),
        cases = results.cases.len(),
        failed_cells = results.failed_cells(),
        "Comparison complete"
    );

    Ok(Comparison {
        results,
        reference,
        sub_grades,
        summary,
    })
}
