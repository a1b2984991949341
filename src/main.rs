//! CLI entry point for the KPI grader.
//!
//! Provides subcommands for comparing a test case against a case pool,
//! validating data files against a parameter file, and listing the metric
//! catalog.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use kpi_grader::analyzers::comparison::compare;
use kpi_grader::analyzers::grade::MetricSelection;
use kpi_grader::analyzers::types::{Kpi, Statistic};
use kpi_grader::{
    fetch::{BasicClient, load_source},
    output::{log_summary, to_json, write_reference_csv, write_results_csv},
    parser::parse_table,
    pool::{DataSource, collect_sources, load_pool, load_test_case},
    schema::Schema,
    validator::validate_table,
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "kpi_grader")]
#[command(about = "Grade simulation results against a pool of peer cases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a test case against the case pool and grade every case
    Compare {
        /// Parameter file describing the exercise (path or URL)
        #[arg(short, long)]
        parameters: String,

        /// Pool directories, files or URLs
        #[arg(long, required = true, num_args = 1..)]
        pool: Vec<String>,

        /// Filtering code that pool file names must contain
        #[arg(short, long)]
        code: String,

        /// Optional user test case (path or URL)
        #[arg(short, long)]
        test: Option<String>,

        /// KPI labels to grade on; defaults to the parameter file's list
        #[arg(long = "kpi", num_args = 1..)]
        kpis: Vec<String>,

        /// Weight per KPI; defaults to 1 for every KPI given with --kpi
        #[arg(long = "weight", num_args = 1..)]
        weights: Vec<f64>,

        /// CSV file to write the result table to
        #[arg(short, long, default_value = "results.csv")]
        output: String,

        /// Optional CSV file for the reference profile
        #[arg(long)]
        reference_output: Option<String>,

        /// Also log the result table as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Gzip compress the result table
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Validate data files against a parameter file
    Validate {
        /// Parameter file (path or URL)
        #[arg(short, long)]
        parameters: String,

        /// Data files to check (paths or URLs)
        #[arg(long, required = true, num_args = 1..)]
        data: Vec<String>,
    },
    /// List every KPI with its grading policy, and every statistic
    ListMetrics,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/kpi_grader.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("kpi_grader.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compare {
            parameters,
            pool,
            code,
            test,
            kpis,
            weights,
            output,
            reference_output,
            json,
            gzip,
        } => {
            let client = BasicClient::new();
            let schema = Schema::from_bytes(&load_source(&client, &parameters).await?)?;
            let selection = selection(&schema, &kpis, weights)?;

            let sources = collect_sources(&client, &pool, &code).await?;
            info!(files = sources.len(), "Pool sources collected");
            let pool = load_pool(&sources, &code, &schema)?;

            let test_case = match test {
                Some(location) => {
                    let source = DataSource {
                        name: location.clone(),
                        bytes: load_source(&client, &location).await?,
                    };
                    match load_test_case(&source, &schema) {
                        Ok(table) => Some(table),
                        Err(e) => {
                            warn!(error = %e, "Test case rejected, continuing without it");
                            None
                        }
                    }
                }
                None => None,
            };

            let comparison = compare(&schema, &pool, test_case.as_ref(), &selection)?;

            write_results_csv(Path::new(&output), &comparison.results, gzip)?;
            info!(path = %output, gzip, "Result table written");

            if let Some(path) = reference_output {
                write_reference_csv(Path::new(&path), &schema, &comparison.reference)?;
                info!(path = %path, "Reference profile written");
            }

            if json {
                info!("{}", to_json(&comparison.results)?);
            }

            log_summary(&comparison.summary);
        }
        Commands::Validate { parameters, data } => {
            validate(&parameters, &data).await?;
        }
        Commands::ListMetrics => {
            for kpi in Kpi::ALL {
                info!(kpi = %kpi, policy = ?kpi.policy(), "KPI");
            }
            for stat in Statistic::ALL {
                info!(statistic = stat.label(), "Statistic");
            }
        }
    }

    Ok(())
}

/// KPI selection from the command line, or the schema defaults when no KPI
/// was given.
fn selection(schema: &Schema, kpis: &[String], weights: Vec<f64>) -> Result<MetricSelection> {
    if kpis.is_empty() {
        if !weights.is_empty() {
            bail!("--weight requires --kpi");
        }
        return Ok(MetricSelection::from_schema(schema)?);
    }

    let kpis = kpis
        .iter()
        .map(|k| k.parse::<Kpi>())
        .collect::<Result<Vec<_>, _>>()?;
    let weights = if weights.is_empty() {
        vec![1.0; kpis.len()]
    } else {
        weights
    };
    Ok(MetricSelection::new(kpis, weights)?)
}

/// Checks every data file and reports its failures; fails if any is invalid.
#[tracing::instrument(skip(data), fields(files = data.len()))]
async fn validate(parameters: &str, data: &[String]) -> Result<()> {
    let client = BasicClient::new();
    let schema = Schema::from_bytes(&load_source(&client, parameters).await?)?;

    let mut invalid = 0;
    for location in data {
        let bytes = load_source(&client, location).await?;
        let result = validate_table(&parse_table(&bytes, &schema), &schema);
        if result.is_ok() {
            info!(file = %location, "Valid");
        } else {
            invalid += 1;
            for failure in &result.failures {
                warn!(file = %location, reason = %failure, "Invalid");
            }
        }
    }

    if invalid > 0 {
        bail!("{invalid} of {} files are invalid", data.len());
    }
    Ok(())
}
