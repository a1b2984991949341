//! Validated time-series tables and the pool of peer cases.

use crate::error::EngineError;
use crate::parser::RawTable;
use crate::schema::Schema;
use crate::validator::validate_table;
use chrono::NaiveDateTime;

/// One named data column.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub parameter: String,
    pub values: Vec<f64>,
}

/// A table that passed validation: elapsed time, derived timestamps and one
/// series per schema parameter, all of the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    pub elapsed_seconds: Vec<f64>,
    pub timestamps: Vec<NaiveDateTime>,
    pub series: Vec<Series>,
}

impl TimeSeriesTable {
    /// Validates `raw` against `schema` and names its columns.
    pub fn from_raw(
        raw: &RawTable,
        schema: &Schema,
        source_name: &str,
    ) -> Result<Self, EngineError> {
        let validation = validate_table(raw, schema);
        if !validation.is_ok() {
            return Err(EngineError::TableInvalid {
                source_name: source_name.to_string(),
                failures: validation.failures,
            });
        }

        let series = schema
            .parameters()
            .iter()
            .enumerate()
            .map(|(i, parameter)| Series {
                parameter: parameter.clone(),
                values: raw.column(i + 1),
            })
            .collect();

        Ok(Self {
            elapsed_seconds: raw.column(0),
            timestamps: schema.timestamps(),
            series,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Values of `parameter`, if the table carries it.
    pub fn get(&self, parameter: &str) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|s| s.parameter == parameter)
            .map(|s| s.values.as_slice())
    }
}

/// A pool member: its table plus the case name it was loaded under.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseTable {
    pub name: String,
    pub table: TimeSeriesTable,
}

/// Ordered peer cases validated against one schema. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CasePool {
    cases: Vec<CaseTable>,
}

impl CasePool {
    /// Builds a pool, rejecting duplicate case names.
    pub fn new(cases: Vec<CaseTable>) -> Result<Self, EngineError> {
        for (i, case) in cases.iter().enumerate() {
            if cases[..i].iter().any(|c| c.name == case.name) {
                return Err(EngineError::DuplicateCase(case.name.clone()));
            }
        }
        Ok(Self { cases })
    }

    pub fn cases(&self) -> &[CaseTable] {
        &self.cases
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cases.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Every `(case, values)` pair carrying `parameter`, in pool order.
    pub fn series<'a>(&'a self, parameter: &'a str) -> impl Iterator<Item = (&'a str, &'a [f64])> {
        self.cases
            .iter()
            .filter_map(move |c| c.table.get(parameter).map(|v| (c.name.as_str(), v)))
    }

    pub fn get(&self, name: &str) -> Option<&TimeSeriesTable> {
        self.cases.iter().find(|c| c.name == name).map(|c| &c.table)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::parser::parse_table;
    use crate::schema::tests::schema;

    /// A four-row table in the shared test schema.
    pub(crate) fn table(heat: [f64; 4], temp: [f64; 4]) -> TimeSeriesTable {
        let mut text = String::from("h\nh\n");
        for i in 0..4 {
            text.push_str(&format!("{},{},{}\n", i * 3600, heat[i], temp[i]));
        }
        TimeSeriesTable::from_raw(&parse_table(text.as_bytes(), &schema()), &schema(), "test")
            .unwrap()
    }

    pub(crate) fn case(name: &str, heat: [f64; 4], temp: [f64; 4]) -> CaseTable {
        CaseTable {
            name: name.to_string(),
            table: table(heat, temp),
        }
    }

    #[test]
    fn test_from_raw_names_columns() {
        let t = table([1.0, 2.0, 3.0, 4.0], [20.0, 21.0, 22.0, 23.0]);

        assert_eq!(t.len(), 4);
        assert_eq!(t.elapsed_seconds, vec![0.0, 3600.0, 7200.0, 10800.0]);
        assert_eq!(t.get("Heat [W]"), Some(&[1.0, 2.0, 3.0, 4.0][..]));
        assert_eq!(t.get("Temp [C]").map(|v| v[3]), Some(23.0));
        assert_eq!(t.get("Flow [kg/s]"), None);
    }

    #[test]
    fn test_from_raw_rejects_invalid_table() {
        let raw = parse_table(b"h\nh\n0,1,2\n", &schema());
        let err = TimeSeriesTable::from_raw(&raw, &schema(), "short.csv").unwrap_err();

        match err {
            EngineError::TableInvalid { source_name, failures } => {
                assert_eq!(source_name, "short.csv");
                assert!(!failures.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_pool_rejects_duplicate_names() {
        let a = case("a", [1.0; 4], [1.0; 4]);
        let err = CasePool::new(vec![a.clone(), a]).unwrap_err();
        assert!(err.to_string().contains("duplicate case name 'a'"));
    }

    #[test]
    fn test_pool_series_in_order() {
        let pool = CasePool::new(vec![
            case("b", [2.0; 4], [0.0; 4]),
            case("a", [1.0; 4], [0.0; 4]),
        ])
        .unwrap();

        let names: Vec<&str> = pool.series("Heat [W]").map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(pool.series("Flow [kg/s]").count(), 0);
    }
}
