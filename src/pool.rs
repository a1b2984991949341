//! Loading the case pool and the user test case.
//!
//! Pool members come from local directories, single local files or URLs.
//! Every file is parsed and validated against the schema; files that fail
//! are skipped with a warning so one bad submission cannot block a run.

use crate::error::EngineError;
use crate::fetch::{HttpClient, is_url, load_source};
use crate::parser::parse_table;
use crate::schema::Schema;
use crate::table::{CasePool, CaseTable, TimeSeriesTable};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Raw contents of one data file together with its file name.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Last path segment of a path or URL.
fn file_name(location: &str) -> &str {
    location
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(location)
}

/// Case name of a pool file: the file name up to its last `_<code>`, or its
/// stem when the code does not occur.
pub fn case_name(location: &str, code: &str) -> String {
    let name = file_name(location);
    let marker = format!("_{code}");
    if !code.is_empty()
        && let Some(idx) = name.rfind(&marker)
        && idx > 0
    {
        return name[..idx].to_string();
    }
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string()
}

/// CSV files in `dir` whose name contains `code`, sorted by name.
pub fn discover_local(dir: &Path, code: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(code))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Resolves pool locations to data sources. Directories are scanned with
/// [`discover_local`]; files and URLs are taken as they are.
pub async fn collect_sources<C: HttpClient>(
    client: &C,
    locations: &[String],
    code: &str,
) -> Result<Vec<DataSource>> {
    let mut sources = Vec::new();
    for location in locations {
        let path = Path::new(location);
        let files: Vec<String> = if !is_url(location) && path.is_dir() {
            discover_local(path, code)
                .with_context(|| format!("scanning pool directory {location}"))?
                .into_iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect()
        } else {
            vec![location.clone()]
        };

        for file in files {
            let bytes = load_source(client, &file).await?;
            sources.push(DataSource {
                name: file_name(&file).to_string(),
                bytes,
            });
        }
    }
    Ok(sources)
}

/// Parses and validates one data file.
pub fn load_table(source: &DataSource, schema: &Schema) -> Result<TimeSeriesTable, EngineError> {
    let raw = parse_table(&source.bytes, schema);
    TimeSeriesTable::from_raw(&raw, schema, &source.name)
}

/// Builds the case pool from `sources`, skipping invalid files and
/// duplicate case names.
///
/// # Errors
///
/// [`EngineError::EmptyPool`] if no source yields a valid table.
#[tracing::instrument(skip_all, fields(sources = sources.len(), code = %code))]
pub fn load_pool(
    sources: &[DataSource],
    code: &str,
    schema: &Schema,
) -> Result<CasePool, EngineError> {
    let mut cases: Vec<CaseTable> = Vec::with_capacity(sources.len());

    for source in sources {
        let name = case_name(&source.name, code);
        if cases.iter().any(|c| c.name == name) {
            warn!(file = %source.name, case = %name, "Skipping pool file: duplicate case name");
            continue;
        }
        match load_table(source, schema) {
            Ok(table) => cases.push(CaseTable { name, table }),
            Err(e) => warn!(file = %source.name, error = %e, "Skipping invalid pool file"),
        }
    }

    if cases.is_empty() {
        return Err(EngineError::EmptyPool);
    }

    info!(
        valid = cases.len(),
        skipped = sources.len() - cases.len(),
        "Loaded case pool"
    );
    CasePool::new(cases)
}

/// Parses and validates the user test case.
pub fn load_test_case(
    source: &DataSource,
    schema: &Schema,
) -> Result<TimeSeriesTable, EngineError> {
    load_table(source, schema)
}
