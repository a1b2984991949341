use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

/// Rounds to two decimals, the published precision of every metric.
/// Exact ties go to the even neighbour, so `0.125` becomes `0.12`.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Calendar hour a timestamp falls in.
pub fn hour_bucket(ts: &NaiveDateTime) -> (NaiveDate, u32) {
    (ts.date(), ts.hour())
}

/// Calendar day (midnight to midnight) a timestamp falls in.
pub fn day_bucket(ts: &NaiveDateTime) -> NaiveDate {
    ts.date()
}

/// Splits `values` into runs of consecutive rows sharing the same bucket key.
///
/// Timestamps are monotonic, so each calendar bucket is one contiguous run
/// and empty buckets never appear.
pub fn group_by_bucket<'a, K, F>(
    values: &'a [f64],
    timestamps: &[NaiveDateTime],
    key: F,
) -> Vec<&'a [f64]>
where
    K: PartialEq,
    F: Fn(&NaiveDateTime) -> K,
{
    let mut groups = Vec::new();
    let mut start = 0;

    for i in 1..=values.len() {
        if i == values.len() || key(&timestamps[i]) != key(&timestamps[start]) {
            groups.push(&values[start..i]);
            start = i;
        }
    }

    groups
}
