//! Side-by-side comparison panels.

use crate::constants::MONTH_LABELS;
use crate::data::{Detection, Season};
use crate::filter::{FilterState, FilteredSet, in_month, in_season};
use serde::{Deserialize, Serialize};

/// How a view splits its rows into panels, decided once per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonMode {
    /// A single panel of the active rows.
    #[default]
    None,
    /// Two months (1-12) side by side, within the selected season.
    CompareMonths(u32, u32),
    /// Two seasons side by side, within the selected month.
    CompareSeasons(Season, Season),
}

/// One labelled panel of rows.
#[derive(Debug, Clone)]
pub struct Panel<'a> {
    /// Panel heading.
    pub label: String,
    /// Rows shown in the panel.
    pub rows: Vec<&'a Detection>,
}

/// Display label of a month number.
pub fn month_label(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_LABELS.get(i as usize))
        .copied()
        .unwrap_or("?")
}

impl ComparisonMode {
    /// Split the filtered rows into panels.
    ///
    /// Comparison panels start from the rows before season and month
    /// selection, then re-apply the selection that is not being compared.
    pub fn panels<'a>(&self, set: &FilteredSet<'a>, state: &FilterState) -> Vec<Panel<'a>> {
        match *self {
            Self::None => vec![Panel {
                label: "All".to_string(),
                rows: set.active.clone(),
            }],
            Self::CompareMonths(a, b) => {
                let base: Vec<&Detection> = set
                    .comparison_base
                    .iter()
                    .copied()
                    .filter(|d| state.season.is_none_or(|s| in_season(d, s)))
                    .collect();
                [a, b]
                    .into_iter()
                    .map(|month| Panel {
                        label: month_label(month).to_string(),
                        rows: base.iter().copied().filter(|d| in_month(d, month)).collect(),
                    })
                    .collect()
            }
            Self::CompareSeasons(a, b) => {
                let base: Vec<&Detection> = set
                    .comparison_base
                    .iter()
                    .copied()
                    .filter(|d| state.month.is_none_or(|m| in_month(d, m)))
                    .collect();
                [a, b]
                    .into_iter()
                    .map(|season| Panel {
                        label: season.to_string(),
                        rows: base
                            .iter()
                            .copied()
                            .filter(|d| in_season(d, season))
                            .collect(),
                    })
                    .collect()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::filter::apply;

    fn rows() -> Vec<Detection> {
        vec![
            Detection::new("a", "Robin", 0.9, "2024-04-01", "06:00"),
            Detection::new("a", "Robin", 0.9, "2024-05-01", "06:00"),
            Detection::new("b", "Wren", 0.9, "2024-05-02", "07:00"),
            Detection::new("c", "Swift", 0.9, "2024-07-02", "07:00"),
        ]
    }

    #[test]
    fn test_none_is_single_active_panel() {
        let rows = rows();
        let state = FilterState {
            month: Some(5),
            ..FilterState::permissive()
        };
        let set = apply(&rows, &state);
        let panels = ComparisonMode::None.panels(&set, &state);
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].rows.len(), 2);
    }

    #[test]
    fn test_compare_months_ignores_month_selection() {
        let rows = rows();
        let state = FilterState {
            month: Some(5),
            ..FilterState::permissive()
        };
        let set = apply(&rows, &state);
        let panels = ComparisonMode::CompareMonths(4, 7).panels(&set, &state);
        assert_eq!(panels[0].label, "Apr");
        assert_eq!(panels[0].rows.len(), 1);
        assert_eq!(panels[1].label, "Jul");
        assert_eq!(panels[1].rows.len(), 1);
    }

    #[test]
    fn test_compare_seasons_keeps_month_selection() {
        let rows = rows();
        let state = FilterState {
            month: Some(5),
            ..FilterState::permissive()
        };
        let set = apply(&rows, &state);
        let panels =
            ComparisonMode::CompareSeasons(Season::Spring, Season::Summer).panels(&set, &state);
        assert_eq!(panels[0].rows.len(), 2);
        assert!(panels[1].rows.is_empty());
    }

    #[test]
    fn test_month_label() {
        assert_eq!(month_label(1), "Jan");
        assert_eq!(month_label(12), "Dec");
        assert_eq!(month_label(0), "?");
    }
}
