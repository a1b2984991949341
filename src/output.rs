//! Output formatting and persistence for comparison results.
//!
//! Supports CSV files (optionally gzip-compressed), pretty JSON and a
//! per-case grade summary in the log.

use anyhow::Result;
use tracing::{debug, info};

use crate::analyzers::grade::GradeSummary;
use crate::analyzers::profile::ReferenceProfile;
use crate::analyzers::results::ResultTable;
use crate::schema::Schema;
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Creates `path` and hands `write` a writer, gzip-compressed when `gzip`
/// is set.
fn write_file<F>(path: &Path, gzip: bool, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let mut file = File::create(path)?;
    if gzip {
        let mut encoder = GzEncoder::new(file, Compression::default());
        write(&mut encoder)?;
        encoder.finish()?;
    } else {
        write(&mut file)?;
        file.flush()?;
    }
    Ok(())
}

/// Writes the result table: one row per (parameter, metric), one column per
/// case. Failed cells are written as `NaN`.
pub fn write_results<W: Write>(writer: W, results: &ResultTable) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);

    let mut header = vec!["Parameter".to_string(), "KPI / Metric".to_string()];
    header.extend(results.cases.iter().map(|c| c.name().to_string()));
    writer.write_record(&header)?;

    for row in &results.rows {
        let mut record = vec![row.parameter.clone(), row.metric.label().to_string()];
        record.extend(row.values.iter().map(f64::to_string));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_results_csv(path: &Path, results: &ResultTable, gzip: bool) -> Result<()> {
    debug!(path = %path.display(), gzip, rows = results.rows.len(), "Writing result table");
    write_file(path, gzip, |out| write_results(out, results))
}

/// Writes the reference profile with the pool's elapsed-time column and
/// the derived timestamps.
pub fn write_reference<W: Write>(
    writer: W,
    schema: &Schema,
    reference: &ReferenceProfile,
) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);

    let time_column = schema
        .column_names
        .first()
        .map_or("Time [s]", String::as_str);
    let mut header = vec![time_column.to_string(), "Timestamp".to_string()];
    header.extend(reference.series.iter().map(|s| s.parameter.clone()));
    writer.write_record(&header)?;

    for (i, ts) in reference.timestamps.iter().enumerate() {
        let elapsed = reference.elapsed_seconds.get(i).copied().unwrap_or(f64::NAN);
        let mut record = vec![
            elapsed.to_string(),
            ts.format(TIMESTAMP_FORMAT).to_string(),
        ];
        record.extend(
            reference
                .series
                .iter()
                .map(|s| s.values.get(i).copied().unwrap_or(f64::NAN).to_string()),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_reference_csv(
    path: &Path,
    schema: &Schema,
    reference: &ReferenceProfile,
) -> Result<()> {
    debug!(path = %path.display(), "Writing reference profile");
    write_file(path, false, |out| write_reference(out, schema, reference))
}

/// Pretty JSON of the result table. NaN cells become `null`.
pub fn to_json(results: &ResultTable) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Logs the error and accuracy grade of every case.
pub fn log_summary(summary: &GradeSummary) {
    for grade in &summary.grades {
        info!(
            case = %grade.case,
            error_grade = grade.error_grade,
            accuracy_grade = grade.accuracy_grade,
            "Case grade"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::grade::CaseGrade;
    use crate::analyzers::types::{CaseId, Kpi, RowLabel, Statistic};
    use crate::table::Series;
    use flate2::read::GzDecoder;
    use std::env;
    use std::fs;
    use std::io::Read;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(name)
    }

    fn results() -> ResultTable {
        let mut results = ResultTable::new(vec![
            CaseId::TestCase,
            CaseId::Reference,
            CaseId::Pool("alice".into()),
        ]);
        results.push_row("Heat [W]", RowLabel::Kpi(Kpi::Nmbe), vec![1.5, 0.0, f64::NAN]);
        results.push_row(
            "Heat [W]",
            RowLabel::Statistic(Statistic::Average),
            vec![3.0, 3.0, 2.0],
        );
        results
    }

    #[test]
    fn test_write_results_layout() {
        let mut buf = Vec::new();
        write_results(&mut buf, &results()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "Parameter,KPI / Metric,User Test,Reference,alice");
        assert_eq!(lines[1], "Heat [W],NMBE [%],1.5,0,NaN");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_write_results_csv_gzip() {
        let path = temp_path("kpi_grader_test_results.csv.gz");
        let _ = fs::remove_file(&path);

        write_results_csv(&path, &results(), true).unwrap();

        let mut text = String::new();
        GzDecoder::new(fs::File::open(&path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert!(text.starts_with("Parameter,KPI / Metric"));

        fs::remove_file(&path).unwrap();
    }

    fn profile(elapsed_seconds: Vec<f64>) -> ReferenceProfile {
        let schema = crate::schema::tests::schema();
        ReferenceProfile {
            elapsed_seconds,
            timestamps: schema.timestamps(),
            series: vec![
                Series {
                    parameter: "Heat [W]".into(),
                    values: vec![1.0, 2.0, 3.0, 4.0],
                },
                Series {
                    parameter: "Temp [C]".into(),
                    values: vec![20.0, 20.5, 21.0, 21.5],
                },
            ],
        }
    }

    #[test]
    fn test_write_reference_layout() {
        let schema = crate::schema::tests::schema();
        let reference = profile(vec![0.0, 3600.0, 7200.0, 10800.0]);

        let mut buf = Vec::new();
        write_reference(&mut buf, &schema, &reference).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "Time [s],Timestamp,Heat [W],Temp [C]");
        assert_eq!(lines[2], "3600,2019-01-01 01:00:00,2,20.5");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_write_reference_keeps_time_offset() {
        let schema = crate::schema::tests::schema();
        let reference = profile(vec![900.0, 4500.0, 8100.0, 11700.0]);

        let mut buf = Vec::new();
        write_reference(&mut buf, &schema, &reference).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.lines().nth(1).unwrap().starts_with("900,2019-01-01 00:00:00,"));
    }

    #[test]
    fn test_to_json() {
        let json = to_json(&results()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["cases"][0], "User Test");
        assert_eq!(value["rows"][0]["metric"], "NMBE [%]");
        assert!(value["rows"][0]["values"][2].is_null());
    }

    #[test]
    fn test_log_summary_does_not_panic() {
        log_summary(&GradeSummary {
            grades: vec![CaseGrade {
                case: CaseId::Reference,
                error_grade: 0.0,
                accuracy_grade: 100.0,
            }],
            total_weight: 1.0,
        });
    }
}
