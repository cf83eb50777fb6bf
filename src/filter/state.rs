//! Immutable filter state.

use crate::constants::DEFAULT_MIN_CONFIDENCE;
use crate::data::Season;
use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build a range from a date picker selection.
    ///
    /// No dates means no range; a single date means `start == end`.
    pub fn from_selection(dates: &[NaiveDate]) -> Result<Option<Self>> {
        match dates {
            [] => Ok(None),
            [single] => Self::new(*single, *single).map(Some),
            [start, end, ..] => Self::new(*start, *end).map(Some),
        }
    }

    /// First day of the range.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range.
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` lies inside the range (inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Year selection mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YearSelection {
    /// Every year.
    #[default]
    All,
    /// Only the listed years. An empty set selects everything.
    Only(BTreeSet<i32>),
}

impl YearSelection {
    /// Build a selection from a list of years (empty list means all).
    pub fn from_years(years: impl IntoIterator<Item = i32>) -> Self {
        let years: BTreeSet<i32> = years.into_iter().collect();
        if years.is_empty() {
            Self::All
        } else {
            Self::Only(years)
        }
    }

    /// Whether the selection narrows anything.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Only(years) if !years.is_empty())
    }

    /// Whether `year` is selected.
    pub fn contains(&self, year: i32) -> bool {
        match self {
            Self::All => true,
            Self::Only(years) => years.is_empty() || years.contains(&year),
        }
    }
}

/// Every active predicate for one run, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    /// Confidence floor (inclusive).
    pub min_confidence: f64,
    /// Species allow-list (common or scientific names); empty keeps all.
    pub species: BTreeSet<String>,
    /// Status allow-list; empty keeps all.
    pub statuses: BTreeSet<String>,
    /// Inclusive date range.
    pub date_range: Option<DateRange>,
    /// Year selection.
    pub years: YearSelection,
    /// Season selection, `None` for all seasons.
    pub season: Option<Season>,
    /// Month selection (1-12), `None` for all months.
    pub month: Option<u32>,
    /// Drop review and false-positive rows from the active set.
    pub exclude_review: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            species: BTreeSet::new(),
            statuses: BTreeSet::new(),
            date_range: None,
            years: YearSelection::All,
            season: None,
            month: None,
            exclude_review: true,
        }
    }
}

impl FilterState {
    /// State that keeps every row.
    pub fn permissive() -> Self {
        Self {
            exclude_review: false,
            ..Self::default()
        }
    }
}
