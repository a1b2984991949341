//! Time-series KPI comparison and grading.
//!
//! Data files from a pool of peer cases are validated against a parameter
//! file, averaged into a reference profile and compared against it with a
//! set of error metrics. Selected metrics are then turned into normalised
//! error and accuracy grades per case.

pub mod analyzers;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod pool;
pub mod schema;
pub mod table;
pub mod validator;
