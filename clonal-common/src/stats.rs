use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Observations per simulated week, one entry per replicate (or per clone/chunk).
pub type WeekSeries = BTreeMap<i64, Vec<f64>>;

/// Mean and population standard deviation of a set of observations.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

impl Summary {
    /// Returns `None` for an empty slice.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Summary { mean, std: variance.sqrt(), count: values.len() })
    }
}

/// Week-ordered summaries of a series, skipping weeks without observations.
pub fn summarize(series: &WeekSeries) -> Vec<(i64, Summary)> {
    series
        .iter()
        .filter_map(|(&week, values)| Summary::of(values).map(|s| (week, s)))
        .collect()
}

/// Appends one observation under `week`.
pub fn record(series: &mut WeekSeries, week: i64, value: f64) {
    series.entry(week).or_default().push(value);
}
