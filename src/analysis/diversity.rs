//! Shannon and Simpson diversity per period.

use crate::analysis::{Outcome, month_period, week_period};
use crate::data::Detection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Diversity indices of one categorical distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DiversityIndices {
    /// Distinct species.
    pub richness: usize,
    /// Shannon entropy `H' = -sum(p ln p)`.
    pub shannon: f64,
    /// Gini-Simpson index `1 - sum(p^2)`.
    pub simpson: f64,
}

/// Compute indices from per-species counts.
///
/// Zero counts are ignored. An empty or all-zero input yields all zeros.
#[allow(clippy::cast_precision_loss)]
pub fn indices(counts: impl IntoIterator<Item = usize>) -> DiversityIndices {
    let counts: Vec<usize> = counts.into_iter().filter(|&c| c > 0).collect();
    let total: usize = counts.iter().sum();
    if total == 0 || counts.is_empty() {
        return DiversityIndices::default();
    }

    let total = total as f64;
    let (shannon, sum_sq) = counts.iter().fold((0.0, 0.0), |(h, s), &c| {
        let p = c as f64 / total;
        (p.mul_add(-p.ln(), h), p.mul_add(p, s))
    });

    DiversityIndices {
        richness: counts.len(),
        shannon: shannon.max(0.0),
        simpson: (1.0 - sum_sq).max(0.0),
    }
}

/// Period used to group detections for diversity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DiversityPeriod {
    /// `YYYY-MM`.
    #[default]
    Month,
    /// `YYYY-Www` (ISO week).
    Week,
}

/// Diversity of one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodDiversity {
    /// Period label.
    pub period: String,
    /// Detections in the period.
    pub detections: usize,
    /// Indices.
    #[serde(flatten)]
    pub indices: DiversityIndices,
}

/// Diversity per month or week, chronological. Untimed rows are dropped.
pub fn diversity_by_period(
    rows: &[&Detection],
    period: DiversityPeriod,
) -> Outcome<Vec<PeriodDiversity>> {
    let mut groups: BTreeMap<String, HashMap<&str, usize>> = BTreeMap::new();
    for d in rows {
        let Some(t) = d.time.as_ref() else {
            continue;
        };
        let label = match period {
            DiversityPeriod::Month => month_period(t),
            DiversityPeriod::Week => week_period(t),
        };
        *groups
            .entry(label)
            .or_default()
            .entry(d.scientific_name.as_str())
            .or_default() += 1;
    }

    Outcome::unless_empty(groups.is_empty(), || {
        groups
            .into_iter()
            .map(|(period, species)| PeriodDiversity {
                period,
                detections: species.values().sum(),
                indices: indices(species.into_values()),
            })
            .collect()
    })
}

/// Diversity of one month of one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearMonthDiversity {
    /// Calendar year.
    pub year: i32,
    /// Month (1-12).
    pub month: u32,
    /// Indices (zeros for an empty month).
    #[serde(flatten)]
    pub indices: DiversityIndices,
}

/// All twelve months of each selected year, empty months reporting zeros.
pub fn diversity_compare_years(
    rows: &[&Detection],
    years: &[i32],
) -> Outcome<Vec<YearMonthDiversity>> {
    if years.is_empty() {
        return Outcome::Insufficient {
            available: 0,
            required: 1,
        };
    }

    let mut groups: HashMap<(i32, u32), HashMap<&str, usize>> = HashMap::new();
    for d in rows {
        if let Some(t) = d.time.as_ref()
            && years.contains(&t.year)
        {
            *groups
                .entry((t.year, t.month))
                .or_default()
                .entry(d.scientific_name.as_str())
                .or_default() += 1;
        }
    }
    if groups.is_empty() {
        return Outcome::NoData;
    }

    let mut sorted_years = years.to_vec();
    sorted_years.sort_unstable();
    sorted_years.dedup();

    Outcome::Ready(
        sorted_years
            .into_iter()
            .flat_map(|year| (1..=12).map(move |month| (year, month)))
            .map(|(year, month)| YearMonthDiversity {
                year,
                month,
                indices: groups
                    .remove(&(year, month))
                    .map(|species| indices(species.into_values()))
                    .unwrap_or_default(),
            })
            .collect(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_single_species_is_zero() {
        let idx = indices([10]);
        assert_eq!(idx.richness, 1);
        assert!(idx.shannon.abs() < 1e-12);
        assert!(idx.simpson.abs() < 1e-12);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(indices([]), DiversityIndices::default());
        assert_eq!(indices([0, 0]), DiversityIndices::default());
    }

    #[test]
    fn test_even_distribution_is_maximal() {
        let idx = indices([5, 5, 5, 5]);
        assert_eq!(idx.richness, 4);
        assert!((idx.shannon - 4.0_f64.ln()).abs() < 1e-9);
        assert!((idx.simpson - 0.75).abs() < 1e-9);

        let uneven = indices([17, 1, 1, 1]);
        assert!(uneven.shannon < idx.shannon);
    }

    #[test]
    fn test_diversity_by_month() {
        let rows = vec![
            Detection::new("a", "A", 0.9, "2024-05-01", "06:00"),
            Detection::new("b", "B", 0.9, "2024-05-02", "06:00"),
            Detection::new("a", "A", 0.9, "2024-06-01", "06:00"),
        ];
        let refs: Vec<&Detection> = rows.iter().collect();
        let periods = diversity_by_period(&refs, DiversityPeriod::Month)
            .ready()
            .unwrap();
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].period, "2024-05");
        assert_eq!(periods[0].indices.richness, 2);
        assert_eq!(periods[1].indices.richness, 1);
    }

    #[test]
    fn test_diversity_by_week_label() {
        let rows = vec![Detection::new("a", "A", 0.9, "2024-12-30", "06:00")];
        let refs: Vec<&Detection> = rows.iter().collect();
        let periods = diversity_by_period(&refs, DiversityPeriod::Week)
            .ready()
            .unwrap();
        assert_eq!(periods[0].period, "2025-W01");
    }

    #[test]
    fn test_compare_years_fills_all_months() {
        let rows = vec![Detection::new("a", "A", 0.9, "2024-05-01", "06:00")];
        let refs: Vec<&Detection> = rows.iter().collect();
        let months = diversity_compare_years(&refs, &[2024, 2023])
            .ready()
            .unwrap();
        assert_eq!(months.len(), 24);
        assert_eq!(months[0].year, 2023);
        let may = months.iter().find(|m| m.year == 2024 && m.month == 5).unwrap();
        assert_eq!(may.indices.richness, 1);
        assert_eq!(diversity_compare_years(&[], &[2024]), Outcome::NoData);
    }
}
