//! Comparison metrics and descriptive statistics.
//!
//! Every function takes `(reference, candidate, timestamps)`, aligned by row
//! index, and returns a scalar rounded to two decimals. Grading runs on the
//! rounded values, so the rounding is part of each function's contract.

use crate::analyzers::types::{Kpi, Statistic};
use crate::analyzers::utility::{day_bucket, group_by_bucket, hour_bucket, mean, round2, stddev};
use crate::error::MetricError;
use chrono::NaiveDateTime;

pub type MetricResult = Result<f64, MetricError>;

/// Evaluates a KPI of `candidate` against `reference`.
pub fn compute_kpi(
    kpi: Kpi,
    reference: &[f64],
    candidate: &[f64],
    timestamps: &[NaiveDateTime],
) -> MetricResult {
    check_aligned(reference, candidate, timestamps)?;

    let value = match kpi {
        Kpi::Nmbe => nmbe(reference, candidate)?,
        Kpi::Cvrmse => cvrmse(reference, candidate)?,
        Kpi::HourlyCvrmse => hourly_cvrmse(reference, candidate, timestamps)?,
        Kpi::DailyAmplitudeCvrmse => daily_amplitude_cvrmse(reference, candidate, timestamps)?,
        Kpi::RSquared => r_squared(reference, candidate)?,
        Kpi::Rmse => rmse(reference, candidate),
        Kpi::Rmsle => rmsle(reference, candidate)?,
    };

    finish(value)
}

/// Evaluates a descriptive statistic of `candidate`.
///
/// `reference` and `timestamps` only take part in the alignment check.
pub fn compute_statistic(
    statistic: Statistic,
    reference: &[f64],
    candidate: &[f64],
    timestamps: &[NaiveDateTime],
) -> MetricResult {
    check_aligned(reference, candidate, timestamps)?;

    let value = match statistic {
        Statistic::Minimum => candidate.iter().copied().fold(f64::INFINITY, f64::min),
        Statistic::Maximum => candidate.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Statistic::Average => mean(candidate),
        Statistic::StandardDeviation => stddev(candidate, mean(candidate)),
    };

    finish(value)
}

fn check_aligned(
    reference: &[f64],
    candidate: &[f64],
    timestamps: &[NaiveDateTime],
) -> Result<(), MetricError> {
    if reference.len() != candidate.len() || reference.len() != timestamps.len() {
        return Err(MetricError::LengthMismatch {
            reference: reference.len(),
            candidate: candidate.len(),
            timestamps: timestamps.len(),
        });
    }
    if reference.is_empty() {
        return Err(MetricError::Empty);
    }
    Ok(())
}

fn finish(value: f64) -> MetricResult {
    if value.is_finite() {
        Ok(round2(value))
    } else {
        Err(MetricError::NonFinite)
    }
}

fn nmbe(reference: &[f64], candidate: &[f64]) -> MetricResult {
    let reference_sum: f64 = reference.iter().sum();
    if reference_sum == 0.0 {
        return Err(MetricError::ZeroReference("sum"));
    }
    let bias: f64 = candidate.iter().zip(reference).map(|(c, r)| c - r).sum();
    Ok(100.0 * bias / reference_sum)
}

fn squared_error_sum(reference: &[f64], candidate: &[f64]) -> f64 {
    reference
        .iter()
        .zip(candidate)
        .map(|(r, c)| (r - c).powi(2))
        .sum()
}

fn rmse(reference: &[f64], candidate: &[f64]) -> f64 {
    (squared_error_sum(reference, candidate) / reference.len() as f64).sqrt()
}

/// CVRMSE of an already computed difference series, normalised by the mean
/// of `reference`.
fn cvrmse_of_difference(difference: &[f64], reference: &[f64]) -> MetricResult {
    let reference_mean = mean(reference);
    if reference_mean == 0.0 {
        return Err(MetricError::ZeroReference("mean"));
    }
    if difference.is_empty() {
        return Err(MetricError::Empty);
    }
    let mean_square = difference.iter().map(|d| d.powi(2)).sum::<f64>() / difference.len() as f64;
    Ok(100.0 * mean_square.sqrt() / reference_mean)
}

fn cvrmse(reference: &[f64], candidate: &[f64]) -> MetricResult {
    let difference: Vec<f64> = candidate.iter().zip(reference).map(|(c, r)| c - r).collect();
    cvrmse_of_difference(&difference, reference)
}

/// CVRMSE of the difference series averaged per calendar hour.
///
/// Only hours holding at least one sample are averaged. With a sampling
/// interval above one hour the empty hours in between are not counted, so
/// the result equals the plain CVRMSE instead of shrinking with the number
/// of empty hours.
fn hourly_cvrmse(
    reference: &[f64],
    candidate: &[f64],
    timestamps: &[NaiveDateTime],
) -> MetricResult {
    let difference: Vec<f64> = candidate.iter().zip(reference).map(|(c, r)| c - r).collect();
    let hourly: Vec<f64> = group_by_bucket(&difference, timestamps, hour_bucket)
        .into_iter()
        .map(mean)
        .collect();

    cvrmse_of_difference(&hourly, reference)
}

fn daily_amplitudes(values: &[f64], timestamps: &[NaiveDateTime]) -> Vec<f64> {
    group_by_bucket(values, timestamps, day_bucket)
        .into_iter()
        .map(|day| {
            let max = day.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min = day.iter().copied().fold(f64::INFINITY, f64::min);
            max - min
        })
        .collect()
}

fn daily_amplitude_cvrmse(
    reference: &[f64],
    candidate: &[f64],
    timestamps: &[NaiveDateTime],
) -> MetricResult {
    let reference_amplitude = daily_amplitudes(reference, timestamps);
    let candidate_amplitude = daily_amplitudes(candidate, timestamps);
    let difference: Vec<f64> = candidate_amplitude
        .iter()
        .zip(&reference_amplitude)
        .map(|(c, r)| c - r)
        .collect();

    cvrmse_of_difference(&difference, &reference_amplitude)
}

fn r_squared(reference: &[f64], candidate: &[f64]) -> MetricResult {
    let ss_res = squared_error_sum(reference, candidate);
    let reference_mean = mean(reference);
    let ss_tot: f64 = reference.iter().map(|r| (r - reference_mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 {
            Ok(1.0)
        } else {
            Err(MetricError::UndefinedRSquared)
        };
    }

    Ok(1.0 - ss_res / ss_tot)
}

fn rmsle(reference: &[f64], candidate: &[f64]) -> MetricResult {
    if let Some(&bad) = reference.iter().chain(candidate).find(|v| **v <= -1.0) {
        return Err(MetricError::LogDomain(bad));
    }
    let sum: f64 = candidate
        .iter()
        .zip(reference)
        .map(|(c, r)| (c.ln_1p() - r.ln_1p()).powi(2))
        .sum();
    Ok((sum / candidate.len() as f64).sqrt())
}
