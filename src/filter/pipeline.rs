//! Ordered filter pipeline.
//!
//! Stages run in a fixed order, each narrowing the output of the previous:
//! confidence, species, status, date range, year, season, month, review
//! exclusion. Inactive stages are skipped, so rows without a timestamp
//! survive unless a time-based stage is active.

use crate::constants::status;
use crate::data::{Detection, Season};
use crate::filter::FilterState;
use tracing::debug;

/// Output of one pipeline run, borrowing from the loaded detections.
#[derive(Debug, Clone, Default)]
pub struct FilteredSet<'a> {
    /// Rows that passed every active stage.
    pub active: Vec<&'a Detection>,
    /// Rows with the review sentinel status, kept regardless of exclusion.
    pub review: Vec<&'a Detection>,
    /// Rows before season and month selection, used to build comparison
    /// panels. Review exclusion drops only review rows here; false
    /// positives stay.
    pub comparison_base: Vec<&'a Detection>,
}

impl FilteredSet<'_> {
    /// Whether no rows survived.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Whether a status is dropped by review exclusion.
pub fn is_excluded_status(value: &str) -> bool {
    value == status::REVIEW || value == status::FALSE_POSITIVE
}

/// Whether a detection falls in `season`. Untimed rows never match.
pub fn in_season(detection: &Detection, season: Season) -> bool {
    detection.time.is_some_and(|t| t.season == season)
}

/// Whether a detection falls in `month` (1-12). Untimed rows never match.
pub fn in_month(detection: &Detection, month: u32) -> bool {
    detection.time.is_some_and(|t| t.month == month)
}

/// Run the pipeline over `rows`.
pub fn apply<'a>(rows: &'a [Detection], state: &FilterState) -> FilteredSet<'a> {
    let mut active: Vec<&Detection> = rows.iter().collect();
    debug!("Filter input: {} rows", active.len());

    narrow(&mut active, "confidence", |d| {
        d.confidence >= state.min_confidence
    });

    if !state.species.is_empty() {
        narrow(&mut active, "species", |d| {
            state.species.contains(&d.common_name) || state.species.contains(&d.scientific_name)
        });
    }

    if !state.statuses.is_empty() {
        narrow(&mut active, "status", |d| state.statuses.contains(&d.status));
    }

    if let Some(range) = state.date_range {
        narrow(&mut active, "date range", |d| {
            d.date().is_some_and(|day| range.contains(day))
        });
    }

    if state.years.is_active() {
        narrow(&mut active, "year", |d| {
            d.time.is_some_and(|t| state.years.contains(t.year))
        });
    }

    let mut comparison_base = active.clone();

    if let Some(season) = state.season {
        narrow(&mut active, "season", |d| in_season(d, season));
    }

    if let Some(month) = state.month {
        narrow(&mut active, "month", |d| in_month(d, month));
    }

    let review: Vec<&Detection> = active
        .iter()
        .copied()
        .filter(|d| d.status == status::REVIEW)
        .collect();

    if state.exclude_review {
        narrow(&mut active, "review exclusion", |d| {
            !is_excluded_status(&d.status)
        });
        comparison_base.retain(|d| d.status != status::REVIEW);
    }

    FilteredSet {
        active,
        review,
        comparison_base,
    }
}

fn narrow(rows: &mut Vec<&Detection>, stage: &str, keep: impl Fn(&Detection) -> bool) {
    let before = rows.len();
    rows.retain(|d| keep(d));
    debug!("Filter {stage}: {before} -> {} rows", rows.len());
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::filter::{DateRange, YearSelection};
    use chrono::NaiveDate;

    fn detection(common: &str, conf: f64, date: &str, time: &str, status: &str) -> Detection {
        let mut d = Detection::new(format!("{common} sci"), common, conf, date, time);
        d.status = status.to_string();
        d
    }

    fn sample() -> Vec<Detection> {
        vec![
            detection("Robin", 0.9, "2024-05-01", "06:00", "Resident"),
            detection("Robin", 0.4, "2024-05-01", "06:30", "Resident"),
            detection("Wren", 0.8, "2023-12-24", "08:00", "Resident"),
            detection("Swift", 0.7, "2024-07-10", "12:00", "Summer visitor"),
            detection("Oddity", 0.95, "2024-05-02", "09:00", status::REVIEW),
            detection("Parrot", 0.6, "2024-05-03", "10:00", status::FALSE_POSITIVE),
            detection("Ghost", 0.99, "bad", "bad", "Resident"),
        ]
    }

    #[test]
    fn test_confidence_floor_scenario() {
        let rows = vec![
            Detection::new("Erithacus rubecula", "Robin", 0.9, "2024-05-01", "06:00"),
            Detection::new("Erithacus rubecula", "Robin", 0.4, "2024-05-01", "06:30"),
        ];
        let state = FilterState {
            min_confidence: 0.5,
            ..FilterState::permissive()
        };
        let set = apply(&rows, &state);
        assert_eq!(set.active.len(), 1);
        assert!((set.active[0].confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_permissive_keeps_everything() {
        let rows = sample();
        let set = apply(&rows, &FilterState::permissive());
        assert_eq!(set.active.len(), rows.len());
    }

    #[test]
    fn test_review_exclusion_drops_false_positives() {
        let rows = sample();
        let state = FilterState::default();
        let set = apply(&rows, &state);
        assert!(set.active.iter().all(|d| !is_excluded_status(&d.status)));
        assert_eq!(set.review.len(), 1);
        assert_eq!(set.review[0].common_name, "Oddity");
    }

    #[test]
    fn test_species_matches_common_or_scientific() {
        let rows = sample();
        let state = FilterState {
            species: ["Robin".to_string(), "Wren sci".to_string()].into(),
            ..FilterState::permissive()
        };
        let set = apply(&rows, &state);
        assert_eq!(set.active.len(), 3);
    }

    #[test]
    fn test_date_range_drops_untimed_rows() {
        let rows = sample();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let state = FilterState {
            date_range: Some(DateRange::new(day, day).unwrap()),
            ..FilterState::permissive()
        };
        let set = apply(&rows, &state);
        assert_eq!(set.active.len(), 2);
        assert!(set.active.iter().all(|d| d.time.is_some()));
    }

    #[test]
    fn test_year_season_month_selection() {
        let rows = sample();
        let state = FilterState {
            years: YearSelection::from_years([2024]),
            season: Some(Season::Spring),
            month: Some(5),
            ..FilterState::permissive()
        };
        let set = apply(&rows, &state);
        assert_eq!(set.active.len(), 4);
        // comparison base ignores season and month
        assert_eq!(set.comparison_base.len(), 5);
    }

    #[test]
    fn test_output_is_subset_and_deterministic() {
        let rows = sample();
        let state = FilterState {
            min_confidence: 0.5,
            statuses: ["Resident".to_string()].into(),
            ..FilterState::default()
        };
        let first = apply(&rows, &state);
        let second = apply(&rows, &state);
        assert!(first.active.len() <= rows.len());
        assert_eq!(first.active, second.active);
        for d in &first.active {
            assert!(rows.iter().any(|r| std::ptr::eq(r, *d)));
        }
    }

    #[test]
    fn test_comparison_base_keeps_false_positives() {
        let rows = sample();
        let state = FilterState {
            min_confidence: 0.0,
            ..FilterState::default()
        };
        let set = apply(&rows, &state);
        assert_eq!(set.active.len(), 5);
        assert_eq!(set.comparison_base.len(), 6);
        assert!(set.comparison_base.iter().all(|d| d.status != status::REVIEW));
        assert!(
            set.comparison_base
                .iter()
                .any(|d| d.status == status::FALSE_POSITIVE)
        );
    }
}
