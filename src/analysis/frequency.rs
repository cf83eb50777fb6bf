//! Species frequency, headline figures, and detection trends.

use crate::analysis::{Outcome, mean, month_period, week_period, year_period};
use crate::data::Detection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Detections of one species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesCount {
    /// Species name.
    pub name: String,
    /// Number of detections.
    pub count: usize,
}

/// Count detections per key, keeping keys in first-appearance order.
pub fn count_by<'a>(
    rows: &[&'a Detection],
    key: impl Fn(&'a Detection) -> &'a str,
) -> Vec<(&'a str, usize)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for &row in rows {
        let name = key(row);
        if let Some(&i) = index.get(name) {
            counts[i].1 += 1;
        } else {
            index.insert(name, counts.len());
            counts.push((name, 1));
        }
    }
    counts
}

/// The `n` most frequent keys, descending; ties keep first-appearance order.
pub fn top_by<'a>(
    rows: &[&'a Detection],
    n: usize,
    key: impl Fn(&'a Detection) -> &'a str,
) -> Outcome<Vec<SpeciesCount>> {
    if rows.is_empty() {
        return Outcome::NoData;
    }
    let mut counts = count_by(rows, key);
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(n);
    Outcome::Ready(
        counts
            .into_iter()
            .map(|(name, count)| SpeciesCount {
                name: name.to_string(),
                count,
            })
            .collect(),
    )
}

/// The `n` most frequently detected species by common name.
pub fn top_species(rows: &[&Detection], n: usize) -> Outcome<Vec<SpeciesCount>> {
    top_by(rows, n, |d| d.common_name.as_str())
}

/// Names of the `n` most frequent species, most frequent first.
pub fn top_species_names(rows: &[&Detection], n: usize) -> Vec<String> {
    top_species(rows, n)
        .ready()
        .unwrap_or_default()
        .into_iter()
        .map(|s| s.name)
        .collect()
}

/// Headline figures for the filtered set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    /// Number of detections.
    pub total_detections: usize,
    /// Distinct species (by scientific name).
    pub unique_species: usize,
    /// Mean detector confidence, `None` when there are no rows.
    pub mean_confidence: Option<f64>,
}

/// Compute headline figures.
pub fn kpis(rows: &[&Detection]) -> Kpis {
    let species: BTreeSet<&str> = rows.iter().map(|d| d.scientific_name.as_str()).collect();
    Kpis {
        total_detections: rows.len(),
        unique_species: species.len(),
        mean_confidence: mean(rows.iter().map(|d| d.confidence)),
    }
}

/// Trend granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TrendPeriod {
    /// Calendar year.
    Year,
    /// Calendar month.
    Month,
    /// ISO week.
    Week,
}

/// Detections in one labelled period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCount {
    /// Period label (`YYYY`, `YYYY-MM` or `YYYY-Www`).
    pub period: String,
    /// Number of detections.
    pub count: usize,
}

/// Detections per period, in chronological order. Untimed rows are dropped.
pub fn detection_trend(rows: &[&Detection], period: TrendPeriod) -> Outcome<Vec<PeriodCount>> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for t in rows.iter().filter_map(|d| d.time.as_ref()) {
        let label = match period {
            TrendPeriod::Year => year_period(t),
            TrendPeriod::Month => month_period(t),
            TrendPeriod::Week => week_period(t),
        };
        *counts.entry(label).or_default() += 1;
    }
    Outcome::unless_empty(counts.is_empty(), || {
        counts
            .into_iter()
            .map(|(period, count)| PeriodCount { period, count })
            .collect()
    })
}

/// Per-year counts indexed by month (12 slots) or ISO week (53 slots).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearSeries {
    /// Calendar year.
    pub year: i32,
    /// Counts; slot 0 is January or week 1.
    pub counts: Vec<usize>,
}

/// Overlay several years on the same month or week axis.
///
/// `TrendPeriod::Year` is treated as monthly. Years with no detections
/// still get a zero-filled series.
pub fn compare_years(
    rows: &[&Detection],
    years: &[i32],
    period: TrendPeriod,
) -> Outcome<Vec<YearSeries>> {
    let slots = if period == TrendPeriod::Week { 53 } else { 12 };
    let mut series: BTreeMap<i32, Vec<usize>> =
        years.iter().map(|&y| (y, vec![0; slots])).collect();

    let mut seen = false;
    for t in rows.iter().filter_map(|d| d.time.as_ref()) {
        if let Some(counts) = series.get_mut(&t.year) {
            let slot = if period == TrendPeriod::Week {
                t.week
            } else {
                t.month
            };
            if let Some(c) = counts.get_mut(slot as usize - 1) {
                *c += 1;
                seen = true;
            }
        }
    }

    Outcome::unless_empty(!seen, || {
        series
            .into_iter()
            .map(|(year, counts)| YearSeries { year, counts })
            .collect()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn d(common: &str, date: &str) -> Detection {
        Detection::new(format!("{common} sci"), common, 0.8, date, "06:00")
    }

    #[test]
    fn test_top_species_scenario() {
        let rows = vec![Detection::new(
            "Erithacus rubecula",
            "Robin",
            0.9,
            "2024-05-01",
            "06:00",
        )];
        let refs: Vec<&Detection> = rows.iter().collect();
        let top = top_species(&refs, 20).ready().unwrap();
        assert_eq!(
            top,
            vec![SpeciesCount {
                name: "Robin".to_string(),
                count: 1
            }]
        );
    }

    #[test]
    fn test_top_species_ties_keep_input_order() {
        let rows = vec![
            d("Wren", "2024-01-01"),
            d("Robin", "2024-01-01"),
            d("Robin", "2024-01-02"),
            d("Wren", "2024-01-02"),
            d("Dunnock", "2024-01-02"),
        ];
        let refs: Vec<&Detection> = rows.iter().collect();
        let names: Vec<String> = top_species(&refs, 2)
            .ready()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Wren", "Robin"]);
    }

    #[test]
    fn test_top_species_empty_is_no_data() {
        assert_eq!(top_species(&[], 5), Outcome::NoData);
    }

    #[test]
    fn test_kpis() {
        let rows = vec![d("Wren", "2024-01-01"), d("Wren", "2024-01-02")];
        let refs: Vec<&Detection> = rows.iter().collect();
        let k = kpis(&refs);
        assert_eq!(k.total_detections, 2);
        assert_eq!(k.unique_species, 1);
        assert!((k.mean_confidence.unwrap() - 0.8).abs() < 1e-9);
        assert!(kpis(&[]).mean_confidence.is_none());
    }

    #[test]
    fn test_detection_trend_by_month() {
        let rows = vec![
            d("Wren", "2024-02-01"),
            d("Wren", "2024-01-05"),
            d("Wren", "2024-01-06"),
            Detection::new("x", "x", 0.5, "bad", "bad"),
        ];
        let refs: Vec<&Detection> = rows.iter().collect();
        let trend = detection_trend(&refs, TrendPeriod::Month).ready().unwrap();
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].period, "2024-01");
        assert_eq!(trend[0].count, 2);
    }

    #[test]
    fn test_compare_years_zero_fills() {
        let rows = vec![d("Wren", "2024-03-01"), d("Wren", "2023-03-01")];
        let refs: Vec<&Detection> = rows.iter().collect();
        let series = compare_years(&refs, &[2022, 2024], TrendPeriod::Month)
            .ready()
            .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].counts, vec![0; 12]);
        assert_eq!(series[1].counts[2], 1);
    }
}
