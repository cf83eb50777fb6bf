//! Data quality: confidence spread, false-positive candidates, review queue.

use crate::analysis::frequency::{SpeciesCount, top_by};
use crate::analysis::{Outcome, mean};
use crate::data::Detection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Five-number summary of one species' confidences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSummary {
    /// Species.
    pub species: String,
    /// Detections.
    pub count: usize,
    /// Minimum.
    pub min: f64,
    /// First quartile.
    pub q1: f64,
    /// Median.
    pub median: f64,
    /// Third quartile.
    pub q3: f64,
    /// Maximum.
    pub max: f64,
}

/// Linearly interpolated quantile of sorted, non-empty values.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    (sorted[upper] - sorted[lower]).mul_add(fraction, sorted[lower])
}

/// Confidence spread of the `top_n` species with the highest median,
/// ordered by ascending median.
pub fn confidence_distribution(rows: &[&Detection], top_n: usize) -> Outcome<Vec<ConfidenceSummary>> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for d in rows {
        if d.confidence.is_finite() {
            groups.entry(d.common_name.as_str()).or_default().push(d.confidence);
        }
    }
    if groups.is_empty() {
        return Outcome::NoData;
    }

    let mut summaries: Vec<ConfidenceSummary> = groups
        .into_iter()
        .map(|(species, mut values)| {
            values.sort_by(f64::total_cmp);
            ConfidenceSummary {
                species: species.to_string(),
                count: values.len(),
                min: values[0],
                q1: quantile(&values, 0.25),
                median: quantile(&values, 0.5),
                q3: quantile(&values, 0.75),
                max: values[values.len() - 1],
            }
        })
        .collect();

    summaries.sort_by(|a, b| a.median.total_cmp(&b.median));
    let skip = summaries.len().saturating_sub(top_n);
    Outcome::Ready(summaries.split_off(skip))
}

/// Low-confidence detections of one species and status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FalsePositiveCandidate {
    /// Species.
    pub species: String,
    /// Conservation status.
    pub status: String,
    /// Detections at or below the threshold.
    pub count: usize,
    /// Mean confidence of those detections.
    pub mean_confidence: f64,
}

/// Detections with confidence at or below `threshold`, optionally limited
/// to `statuses`, summarised per (species, status) by ascending mean confidence.
pub fn false_positive_candidates(
    rows: &[&Detection],
    threshold: f64,
    statuses: &BTreeSet<String>,
) -> Outcome<Vec<FalsePositiveCandidate>> {
    let mut groups: BTreeMap<(&str, &str), Vec<f64>> = BTreeMap::new();
    for d in rows {
        if d.confidence <= threshold && (statuses.is_empty() || statuses.contains(&d.status)) {
            groups
                .entry((d.common_name.as_str(), d.status.as_str()))
                .or_default()
                .push(d.confidence);
        }
    }

    let mut candidates: Vec<FalsePositiveCandidate> = groups
        .into_iter()
        .map(|((species, status), values)| FalsePositiveCandidate {
            species: species.to_string(),
            status: status.to_string(),
            count: values.len(),
            mean_confidence: mean(values).unwrap_or(0.0),
        })
        .collect();
    candidates.sort_by(|a, b| a.mean_confidence.total_cmp(&b.mean_confidence));
    Outcome::unless_empty(candidates.is_empty(), || candidates)
}

/// Review queue: most detected scientific names needing classification.
pub fn review_top_species(review: &[&Detection], n: usize) -> Outcome<Vec<SpeciesCount>> {
    top_by(review, n, |d| d.scientific_name.as_str())
}

/// Mean confidence per hour of day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourConfidence {
    /// Hour of day.
    pub hour: u32,
    /// Mean confidence in that hour.
    pub mean_confidence: f64,
}

/// Mean confidence by hour for the review subset, hours with data only.
pub fn review_confidence_by_hour(review: &[&Detection]) -> Outcome<Vec<HourConfidence>> {
    let mut hours: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for d in review {
        if let Some(t) = d.time {
            hours.entry(t.hour).or_default().push(d.confidence);
        }
    }
    let series: Vec<HourConfidence> = hours
        .into_iter()
        .filter_map(|(hour, values)| {
            Some(HourConfidence {
                hour,
                mean_confidence: mean(values)?,
            })
        })
        .collect();
    Outcome::unless_empty(series.is_empty(), || series)
}
