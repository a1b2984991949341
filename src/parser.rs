//! CSV parser for time-series data files.

use crate::schema::Schema;
use csv::ReaderBuilder;

/// A data file as read from disk, before validation.
///
/// Cells are `None` when empty or explicitly not-a-number. Parsing never
/// fails outright: structural problems are recorded so that the validator
/// can report them alongside every other failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub rows: Vec<Vec<Option<f64>>>,
    pub structural_error: Option<String>,
}

impl RawTable {
    /// Width of the first data row.
    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn null_count(&self) -> usize {
        self.rows.iter().flatten().filter(|c| c.is_none()).count()
    }

    /// Column `index` with nulls replaced by NaN.
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| row.get(index).copied().flatten().unwrap_or(f64::NAN))
            .collect()
    }
}

/// Drops the first `lines` newline-terminated lines of `bytes`.
fn skip_physical_lines(bytes: &[u8], lines: usize) -> &[u8] {
    let mut rest = bytes;
    for _ in 0..lines {
        match rest.iter().position(|b| *b == b'\n') {
            Some(end) => rest = &rest[end + 1..],
            None => return &[],
        }
    }
    rest
}

/// Parses comma-separated `bytes`, skipping the schema's header lines.
///
/// The header is cut off by physical lines before CSV parsing, so blank or
/// quoted header lines cannot swallow data rows. Diagnostics report line
/// numbers in the original file.
pub fn parse_table(bytes: &[u8], schema: &Schema) -> RawTable {
    let mut table = RawTable::default();
    let skip = schema.skip_lines();

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(skip_physical_lines(bytes, skip));

    for (idx, result) in reader.records().enumerate() {
        let body_line = |pos: Option<&csv::Position>| {
            pos.map_or(idx + 1, |p| p.line() as usize)
        };

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = skip + body_line(e.position());
                table.note(format!("line {line}: {e}"));
                continue;
            }
        };
        let line = skip + body_line(record.position());

        let mut row = Vec::with_capacity(record.len());
        for (col, cell) in record.iter().enumerate() {
            match parse_cell(cell) {
                Ok(value) => row.push(value),
                Err(()) => {
                    table.note(format!("line {line}, column {}: '{cell}' is not a number", col + 1));
                    row.push(None);
                }
            }
        }

        if let Some(width) = table.rows.first().map(Vec::len) {
            if row.len() != width {
                table.note(format!(
                    "line {line}: {} fields where the first data row has {width}",
                    row.len()
                ));
            }
        }

        table.rows.push(row);
    }

    table
}

impl RawTable {
    /// Keeps the first structural problem only.
    fn note(&mut self, reason: String) {
        self.structural_error.get_or_insert(reason);
    }
}

fn parse_cell(cell: &str) -> Result<Option<f64>, ()> {
    if cell.is_empty() || matches!(cell, "nan" | "NaN" | "NA" | "N/A") {
        return Ok(None);
    }
    cell.parse::<f64>().map(Some).map_err(|_| ())
}
