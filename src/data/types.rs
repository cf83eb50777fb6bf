//! Typed detection records and derived time features.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar season of a month (meteorological seasons).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    /// March to May.
    Spring,
    /// June to August.
    Summer,
    /// September to November.
    Autumn,
    /// December to February.
    Winter,
}

impl Season {
    /// All seasons in calendar order.
    pub const ALL: [Self; 4] = [Self::Spring, Self::Summer, Self::Autumn, Self::Winter];

    /// Season a month (1-12) falls in.
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Autumn,
            _ => Self::Winter,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spring => write!(f, "Spring"),
            Self::Summer => write!(f, "Summer"),
            Self::Autumn => write!(f, "Autumn"),
            Self::Winter => write!(f, "Winter"),
        }
    }
}

/// Time-of-day bucket used by the ordination feature matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    /// 05:00-07:59.
    Dawn,
    /// 08:00-11:59.
    Morning,
    /// 12:00-16:59.
    Afternoon,
    /// 17:00-19:59.
    Dusk,
    /// 20:00-04:59.
    Night,
}

impl TimeBucket {
    /// All buckets in day order.
    pub const ALL: [Self; 5] = [
        Self::Dawn,
        Self::Morning,
        Self::Afternoon,
        Self::Dusk,
        Self::Night,
    ];

    /// Bucket an hour of the day (0-23) falls in.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=7 => Self::Dawn,
            8..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=19 => Self::Dusk,
            _ => Self::Night,
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dawn => write!(f, "Dawn (5-8)"),
            Self::Morning => write!(f, "Morning (8-12)"),
            Self::Afternoon => write!(f, "Afternoon (12-17)"),
            Self::Dusk => write!(f, "Dusk (17-20)"),
            Self::Night => write!(f, "Night (20-5)"),
        }
    }
}

/// Calendar features derived once from a parsed timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFeatures {
    /// Local civil timestamp as recorded.
    pub timestamp: NaiveDateTime,
    /// Hour of day (0-23).
    pub hour: u32,
    /// ISO week number (1-53).
    pub week: u32,
    /// ISO week-based year, used to label week periods.
    pub iso_year: i32,
    /// Month (1-12).
    pub month: u32,
    /// Calendar year.
    pub year: i32,
    /// Day of year (1-366).
    pub day_of_year: u32,
    /// Season of the month.
    pub season: Season,
}

impl TimeFeatures {
    /// Derive all features from a timestamp.
    pub fn from_timestamp(timestamp: NaiveDateTime) -> Self {
        let iso = timestamp.iso_week();
        Self {
            timestamp,
            hour: timestamp.hour(),
            week: iso.week(),
            iso_year: iso.year(),
            month: timestamp.month(),
            year: timestamp.year(),
            day_of_year: timestamp.ordinal(),
            season: Season::from_month(timestamp.month()),
        }
    }

    /// Calendar date of the detection.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Hour as a decimal (e.g. 06:30 -> 6.5).
    pub fn decimal_hour(&self) -> f64 {
        f64::from(self.timestamp.hour()) + f64::from(self.timestamp.minute()) / 60.0
    }
}

/// One enriched detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Scientific name of the species (join key).
    pub scientific_name: String,
    /// Common name as reported by the detector.
    pub common_name: String,
    /// Detector confidence (0.0 - 1.0).
    pub confidence: f64,
    /// Time features, `None` when the date/time fields could not be parsed.
    pub time: Option<TimeFeatures>,
    /// Recording latitude.
    pub latitude: Option<f64>,
    /// Recording longitude.
    pub longitude: Option<f64>,
    /// Conservation status, the review sentinel when unknown.
    pub status: String,
    /// Diet category, the unclassified sentinel when unknown.
    pub diet: String,
}

impl Detection {
    /// Create an un-enriched detection from raw date and time strings.
    pub fn new(
        scientific_name: impl Into<String>,
        common_name: impl Into<String>,
        confidence: f64,
        date: &str,
        time: &str,
    ) -> Self {
        Self {
            scientific_name: scientific_name.into(),
            common_name: common_name.into(),
            confidence,
            time: parse_timestamp(date, time).map(TimeFeatures::from_timestamp),
            latitude: None,
            longitude: None,
            status: crate::constants::status::REVIEW.to_string(),
            diet: crate::constants::diet::UNCLASSIFIED.to_string(),
        }
    }

    /// Attach recording coordinates.
    #[must_use]
    pub fn with_location(mut self, latitude: Option<f64>, longitude: Option<f64>) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    /// Calendar date, if the timestamp parsed.
    pub fn date(&self) -> Option<NaiveDate> {
        self.time.as_ref().map(TimeFeatures::date)
    }
}

/// Reference facts about one species, keyed by scientific name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesMeta {
    /// Scientific name.
    pub scientific_name: String,
    /// Display name from the reference table.
    pub common_name: String,
    /// Conservation status.
    pub status: String,
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Parse separate date and time fields into a timestamp.
///
/// Returns `None` for anything unparseable instead of failing the load.
pub fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let date = date.trim();
    let time = time.trim();

    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())?;
    let time = TIME_FORMATS
        .iter()
        .find_map(|fmt| chrono::NaiveTime::parse_from_str(time, fmt).ok())?;

    Some(date.and_time(time))
}
