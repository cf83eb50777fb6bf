//! Time-of-day activity and percent-of-bucket composition.

use crate::analysis::frequency::{count_by, top_species_names};
use crate::analysis::{Outcome, month_period, percent};
use crate::data::Detection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Share of one category within one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share<K> {
    /// Primary-axis bucket (hour, month ...).
    pub bucket: K,
    /// Category within the bucket.
    pub category: String,
    /// Detections of the category in the bucket.
    pub count: usize,
    /// Percentage of the bucket's total (0-100).
    pub percent: f64,
}

/// Group `(bucket, category)` pairs and express each category as a
/// percentage of its bucket's total.
///
/// Output is ordered by bucket, then category. Percentages within every
/// bucket sum to 100.
pub fn percent_by_bucket<K: Ord + Clone>(
    pairs: impl IntoIterator<Item = (K, String)>,
) -> Vec<Share<K>> {
    let mut counts: BTreeMap<K, BTreeMap<String, usize>> = BTreeMap::new();
    for (bucket, category) in pairs {
        *counts.entry(bucket).or_default().entry(category).or_default() += 1;
    }

    let mut shares = Vec::new();
    for (bucket, categories) in counts {
        let total: usize = categories.values().sum();
        for (category, count) in categories {
            shares.push(Share {
                bucket: bucket.clone(),
                category,
                count,
                percent: percent(count, total),
            });
        }
    }
    shares
}

/// How hourly activity is split into lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ActivityBreakdown {
    /// A single total line.
    #[default]
    Total,
    /// One line per top species plus the total.
    Species,
    /// One line per conservation status.
    Status,
}

/// Detections per hour of day for one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlySeries {
    /// Line label.
    pub label: String,
    /// 24 counts, index is the hour.
    pub counts: Vec<usize>,
}

fn hourly<'a>(rows: impl IntoIterator<Item = &'a Detection>) -> Vec<usize> {
    let mut counts = vec![0; 24];
    for t in rows.into_iter().filter_map(|d| d.time.as_ref()) {
        if let Some(c) = counts.get_mut(t.hour as usize) {
            *c += 1;
        }
    }
    counts
}

/// Activity by hour of day. Untimed rows are dropped.
pub fn activity_by_hour(
    rows: &[&Detection],
    breakdown: ActivityBreakdown,
    top_n: usize,
) -> Outcome<Vec<HourlySeries>> {
    let timed: Vec<&Detection> = rows.iter().copied().filter(|d| d.time.is_some()).collect();
    if timed.is_empty() {
        return Outcome::NoData;
    }

    let total = HourlySeries {
        label: "Total".to_string(),
        counts: hourly(timed.iter().copied()),
    };

    let series = match breakdown {
        ActivityBreakdown::Total => vec![total],
        ActivityBreakdown::Species => {
            let mut series: Vec<HourlySeries> = top_species_names(&timed, top_n)
                .into_iter()
                .map(|name| {
                    let counts = hourly(timed.iter().copied().filter(|d| d.common_name == name));
                    HourlySeries {
                        label: name,
                        counts,
                    }
                })
                .collect();
            series.push(total);
            series
        }
        ActivityBreakdown::Status => {
            let statuses: BTreeSet<&str> = timed.iter().map(|d| d.status.as_str()).collect();
            statuses
                .into_iter()
                .map(|status| HourlySeries {
                    label: status.to_string(),
                    counts: hourly(timed.iter().copied().filter(|d| d.status == status)),
                })
                .collect()
        }
    };

    Outcome::Ready(series)
}

/// Month by hour detection counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heatmap {
    /// 12 rows (January first) of 24 hourly counts.
    pub counts: Vec<Vec<usize>>,
}

impl Heatmap {
    /// Largest cell value.
    pub fn max(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }
}

/// Full 12 x 24 month-by-hour grid, zero-filled.
pub fn activity_heatmap(rows: &[&Detection]) -> Outcome<Heatmap> {
    let mut counts = vec![vec![0; 24]; 12];
    let mut seen = false;
    for t in rows.iter().filter_map(|d| d.time.as_ref()) {
        if let Some(c) = counts
            .get_mut(t.month as usize - 1)
            .and_then(|row| row.get_mut(t.hour as usize))
        {
            *c += 1;
            seen = true;
        }
    }
    Outcome::unless_empty(!seen, || Heatmap { counts })
}

/// Hourly percentage mix of the `top_n` most frequent species.
///
/// Species are ranked over timed rows only.
pub fn composition_by_hour(rows: &[&Detection], top_n: usize) -> Outcome<Vec<Share<u32>>> {
    let timed: Vec<&Detection> = rows.iter().copied().filter(|d| d.time.is_some()).collect();
    let top: BTreeSet<String> = top_species_names(&timed, top_n).into_iter().collect();
    let shares = percent_by_bucket(timed.iter().filter_map(|d| {
        let t = d.time.as_ref()?;
        top.contains(&d.common_name)
            .then(|| (t.hour, d.common_name.clone()))
    }));
    Outcome::unless_empty(shares.is_empty(), || shares)
}

/// Category used by the composition-over-time view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompositionDimension {
    /// Conservation status.
    #[default]
    Status,
    /// Diet category.
    Diet,
}

/// Monthly (`YYYY-MM`) percentage mix by status or diet.
pub fn composition_over_time(
    rows: &[&Detection],
    dimension: CompositionDimension,
) -> Outcome<Vec<Share<String>>> {
    let shares = percent_by_bucket(rows.iter().filter_map(|d| {
        let t = d.time.as_ref()?;
        let category = match dimension {
            CompositionDimension::Status => d.status.clone(),
            CompositionDimension::Diet => d.diet.clone(),
        };
        Some((month_period(t), category))
    }));
    Outcome::unless_empty(shares.is_empty(), || shares)
}

/// Species detected per status, most frequent status first.
pub fn status_breakdown(rows: &[&Detection]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = count_by(rows, |d| d.status.as_str())
        .into_iter()
        .map(|(s, c)| (s.to_string(), c))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
