//! Dawn chorus: earliest detections in the morning window against sunrise.
//!
//! Detection timestamps and sunrise times are both local civil time in the
//! deployment timezone. [`TimeReference::Utc`] converts both to UTC, so the
//! two series always share one clock.

use crate::analysis::frequency::top_by;
use crate::analysis::{LinearFit, Outcome, linear_fit};
use crate::clients::WeatherData;
use crate::constants::dawn::{FALLBACK_SUNRISE_HOUR, FIRST_HOUR, LAST_HOUR};
use crate::data::Detection;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Clock used to express hours of the day.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TimeReference {
    /// Local civil time of the deployment.
    #[default]
    Local,
    /// Coordinated universal time.
    Utc,
}

impl fmt::Display for TimeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Utc => write!(f, "UTC"),
        }
    }
}

impl TimeReference {
    /// Express a local civil timestamp on this clock.
    pub fn convert(self, local: NaiveDateTime, tz: Tz) -> NaiveDateTime {
        match self {
            Self::Local => local,
            Self::Utc => local_to_utc(local, tz),
        }
    }

    /// Decimal hour of a local civil timestamp on this clock.
    pub fn decimal_hour(self, local: NaiveDateTime, tz: Tz) -> f64 {
        let t = self.convert(local, tz);
        f64::from(t.hour()) + f64::from(t.minute()) / 60.0
    }
}

/// Convert local civil time to naive UTC.
///
/// Ambiguous times (clocks going back) take the earlier instant; times in a
/// spring-forward gap are shifted one hour later.
pub fn local_to_utc(local: NaiveDateTime, tz: Tz) -> NaiveDateTime {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(local + TimeDelta::hours(1)))
                .earliest()
        })
        .map_or(local, |dt| dt.naive_utc())
}

/// Rows inside the dawn window (03:00 to 10:59 local).
pub fn dawn_window<'a>(rows: &[&'a Detection]) -> Vec<&'a Detection> {
    rows.iter()
        .copied()
        .filter(|d| {
            d.time
                .is_some_and(|t| (FIRST_HOUR..=LAST_HOUR).contains(&t.hour))
        })
        .collect()
}

/// Earliest detection of one species on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarliestDetection {
    /// Local calendar date.
    pub date: NaiveDate,
    /// Species.
    pub species: String,
    /// Decimal hour on the chosen clock.
    pub hour: f64,
}

/// Sunrise of one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunrisePoint {
    /// Local calendar date.
    pub date: NaiveDate,
    /// Decimal hour on the chosen clock.
    pub hour: f64,
}

/// Dawn chorus tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DawnChorus {
    /// Clock the hours are expressed on.
    pub reference: TimeReference,
    /// Species shown, most frequent at dawn first.
    pub species: Vec<String>,
    /// Earliest detection per (date, species).
    pub earliest: Vec<EarliestDetection>,
    /// Sunrise per day, empty when weather is unavailable.
    pub sunrise: Vec<SunrisePoint>,
}

/// Earliest dawn detection per day of the `top_n` dawn species.
pub fn dawn_chorus(
    rows: &[&Detection],
    top_n: usize,
    reference: TimeReference,
    tz: Tz,
    weather: Option<&WeatherData>,
) -> Outcome<DawnChorus> {
    let dawn = dawn_window(rows);
    let Some(top) = top_by(&dawn, top_n, |d| d.common_name.as_str()).ready() else {
        return Outcome::NoData;
    };
    let species: Vec<String> = top.into_iter().map(|s| s.name).collect();
    let wanted: HashSet<&str> = species.iter().map(String::as_str).collect();

    let mut earliest: BTreeMap<(NaiveDate, &str), NaiveDateTime> = BTreeMap::new();
    for d in &dawn {
        let Some(t) = d.time else { continue };
        if !wanted.contains(d.common_name.as_str()) {
            continue;
        }
        earliest
            .entry((t.date(), d.common_name.as_str()))
            .and_modify(|e| *e = (*e).min(t.timestamp))
            .or_insert(t.timestamp);
    }

    let earliest = earliest
        .into_iter()
        .map(|((date, name), ts)| EarliestDetection {
            date,
            species: name.to_string(),
            hour: reference.decimal_hour(ts, tz),
        })
        .collect();

    let sunrise = weather
        .map(|w| {
            w.daily
                .iter()
                .filter_map(|day| {
                    day.sunrise.map(|s| SunrisePoint {
                        date: day.date,
                        hour: reference.decimal_hour(s, tz),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Outcome::Ready(DawnChorus {
        reference,
        species,
        earliest,
        sunrise,
    })
}

/// First detection of one day with sunrise conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirstDetection {
    /// Local calendar date.
    pub date: NaiveDate,
    /// Decimal hour of the first dawn detection.
    pub earliest_hour: f64,
    /// Decimal hour of sunrise, when known.
    pub sunrise_hour: Option<f64>,
    /// Air temperature in the sunrise hour (°C).
    pub sunrise_temp: f64,
}

/// First detection of each day against sunrise temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunriseComparison {
    /// Clock the hours are expressed on.
    pub reference: TimeReference,
    /// One point per day with both detections and weather.
    pub points: Vec<FirstDetection>,
    /// Least-squares trend of first detection hour on sunrise temperature.
    pub trend: Option<LinearFit>,
}

/// Compare the first dawn detection of each day with sunrise temperature.
///
/// Days without a temperature for their sunrise hour are dropped.
pub fn first_detection_vs_sunrise(
    rows: &[&Detection],
    reference: TimeReference,
    tz: Tz,
    weather: &WeatherData,
) -> Outcome<SunriseComparison> {
    let dawn = dawn_window(rows);
    if dawn.is_empty() {
        return Outcome::NoData;
    }

    let mut first: BTreeMap<NaiveDate, NaiveDateTime> = BTreeMap::new();
    for t in dawn.iter().filter_map(|d| d.time) {
        first
            .entry(t.date())
            .and_modify(|e| *e = (*e).min(t.timestamp))
            .or_insert(t.timestamp);
    }

    let temperature_at = |date: NaiveDate, hour: u32| {
        weather
            .hourly
            .iter()
            .find(|h| h.timestamp.date() == date && h.timestamp.hour() == hour)
            .and_then(|h| h.temperature)
    };

    let points: Vec<FirstDetection> = first
        .into_iter()
        .filter_map(|(date, ts)| {
            let day = weather.day(date)?;
            let sunrise_hour = day
                .sunrise
                .map_or(FALLBACK_SUNRISE_HOUR, |s| s.hour());
            Some(FirstDetection {
                date,
                earliest_hour: reference.decimal_hour(ts, tz),
                sunrise_hour: day.sunrise.map(|s| reference.decimal_hour(s, tz)),
                sunrise_temp: temperature_at(date, sunrise_hour)?,
            })
        })
        .collect();

    if points.is_empty() {
        return Outcome::NoData;
    }
    let xy: Vec<(f64, f64)> = points
        .iter()
        .map(|p| (p.sunrise_temp, p.earliest_hour))
        .collect();
    Outcome::Ready(SunriseComparison {
        reference,
        trend: linear_fit(&xy),
        points,
    })
}
