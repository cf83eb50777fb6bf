//! Aggregation builders.
//!
//! Every builder is a pure function over filtered rows. Empty or
//! under-threshold input is reported through [`Outcome`] instead of an error.

pub mod composition;
pub mod cooccurrence;
pub mod dawn;
pub mod diversity;
pub mod explorer;
pub mod frequency;
pub mod ordination;
pub mod quality;
pub mod records;
pub mod weather;

use crate::data::TimeFeatures;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// Result of an aggregation builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Outcome<T> {
    /// The summary was computed.
    Ready(T),
    /// No rows to aggregate.
    NoData,
    /// Too few qualifying items to compute the summary.
    Insufficient {
        /// Qualifying items found.
        available: usize,
        /// Items needed.
        required: usize,
    },
}

impl<T> Outcome<T> {
    /// `Ready(value)` unless `empty` is true.
    pub fn unless_empty(empty: bool, value: impl FnOnce() -> T) -> Self {
        if empty { Self::NoData } else { Self::Ready(value()) }
    }

    /// Whether the summary was computed.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The computed value, if any.
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Borrow the computed value, if any.
    pub fn as_ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Transform the computed value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Ready(value) => Outcome::Ready(f(value)),
            Self::NoData => Outcome::NoData,
            Self::Insufficient {
                available,
                required,
            } => Outcome::Insufficient {
                available,
                required,
            },
        }
    }

    /// Human-readable placeholder for a missing summary.
    pub fn placeholder(&self) -> Option<String> {
        match self {
            Self::Ready(_) => None,
            Self::NoData => Some("No data for the current filters.".to_string()),
            Self::Insufficient {
                available,
                required,
            } => Some(format!(
                "Insufficient data: {available} qualifying item(s), {required} required."
            )),
        }
    }
}

/// Least-squares straight line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    /// Slope.
    pub slope: f64,
    /// Intercept.
    pub intercept: f64,
}

impl LinearFit {
    /// Value of the line at `x`.
    pub fn at(&self, x: f64) -> f64 {
        self.slope.mul_add(x, self.intercept)
    }
}

/// Fit a degree-1 least-squares line.
///
/// Needs more than two points and some spread in `x`.
#[allow(clippy::cast_precision_loss)]
pub fn linear_fit(points: &[(f64, f64)]) -> Option<LinearFit> {
    if points.len() <= 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    if sxx <= f64::EPSILON {
        return None;
    }
    let sxy: f64 = points.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum();

    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: slope.mul_add(-mean_x, mean_y),
    })
}

/// Most frequent value; ties go to the value seen first.
pub fn mode_of<K, I>(values: I) -> Option<K>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut counts: HashMap<K, (usize, usize)> = HashMap::new();
    for (position, value) in values.into_iter().enumerate() {
        counts.entry(value).or_insert((0, position)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.0.cmp(&b.1.0).then(b.1.1.cmp(&a.1.1)))
        .map(|(value, _)| value)
}

/// Percentage of `count` in `total`, 0 when `total` is 0.
#[allow(clippy::cast_precision_loss)]
pub fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

/// Arithmetic mean, `None` for an empty input.
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// `YYYY` period label.
pub fn year_period(t: &TimeFeatures) -> String {
    format!("{:04}", t.year)
}

/// `YYYY-MM` period label.
pub fn month_period(t: &TimeFeatures) -> String {
    format!("{:04}-{:02}", t.year, t.month)
}

/// `YYYY-Www` period label using the ISO week-based year.
pub fn week_period(t: &TimeFeatures) -> String {
    format!("{:04}-W{:02}", t.iso_year, t.week)
}
