//! Reference profile, metric computation and grading.
//!
//! [`comparison::compare`] runs the three stages in order: average the pool
//! into a reference profile, compute every metric for every case, then
//! grade the selected KPIs.

pub mod comparison;
pub mod grade;
pub mod metrics;
pub mod profile;
pub mod results;
pub mod types;
pub mod utility;
