//! Detection activity joined with historical weather.

use crate::analysis::{LinearFit, Outcome, linear_fit, mean, mode_of};
use crate::clients::{DailyWeather, WeatherData, WeatherRequest};
use crate::constants::weather::WIND_BRACKETS;
use crate::data::Detection;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// Weather lookup covering the timed rows: modal coordinates, first to last date.
///
/// `None` when no timed row carries coordinates.
pub fn weather_request(rows: &[&Detection]) -> Option<WeatherRequest> {
    let timed: Vec<&Detection> = rows.iter().copied().filter(|d| d.time.is_some()).collect();
    let latitude = mode_of(timed.iter().filter_map(|d| d.latitude.map(f64::to_bits)))?;
    let longitude = mode_of(timed.iter().filter_map(|d| d.longitude.map(f64::to_bits)))?;
    let start = timed.iter().filter_map(|d| d.date()).min()?;
    let end = timed.iter().filter_map(|d| d.date()).max()?;
    Some(WeatherRequest {
        latitude: f64::from_bits(latitude),
        longitude: f64::from_bits(longitude),
        start,
        end,
    })
}

/// Detections of one day alongside that day's weather.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyActivity {
    /// Detections on the day.
    pub detections: usize,
    /// Distinct species on the day.
    pub species: usize,
    /// Weather of the day.
    #[serde(flatten)]
    pub weather: DailyWeather,
}

/// Rainy or dry day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    /// Precipitation at or above the threshold.
    Rainy,
    /// Anything else, including days without weather.
    Dry,
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rainy => write!(f, "Rainy"),
            Self::Dry => write!(f, "Dry"),
        }
    }
}

/// Average detections in one hour of one day type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyRainActivity {
    /// Hour of day.
    pub hour: u32,
    /// Day type.
    pub day_type: DayType,
    /// Detections in the hour divided by the number of days of the type.
    pub avg_detections: f64,
}

/// Hourly activity on rainy against dry days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainProfile {
    /// Rainy day threshold (mm/day).
    pub threshold: f64,
    /// Rainy days with detections (at least 1).
    pub rainy_days: usize,
    /// Dry days with detections (at least 1).
    pub dry_days: usize,
    /// Hourly averages, ordered by hour then day type.
    pub hourly: Vec<HourlyRainActivity>,
    /// Mean daily detections on rainy days.
    pub avg_rainy_detections: Option<f64>,
    /// Mean daily detections on dry days.
    pub avg_dry_detections: Option<f64>,
}

/// Activity on days in one wind bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindBracket {
    /// Bracket label.
    pub label: String,
    /// Mean daily detections.
    pub avg_detections: f64,
    /// Mean daily species richness.
    pub avg_species: f64,
    /// Days in the bracket.
    pub days: usize,
}

/// Monthly totals with weather.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyWeather {
    /// Month (1-12).
    pub month: u32,
    /// Detections in the month.
    pub detections: usize,
    /// Mean daily maximum temperature.
    pub avg_temp_max: Option<f64>,
    /// Total precipitation.
    pub total_rain: f64,
}

/// Weather and activity summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherActivity {
    /// Days with both detections and weather.
    pub days: Vec<DailyActivity>,
    /// Trend of daily detections on maximum temperature.
    pub detections_vs_temperature: Option<LinearFit>,
    /// Trend of daily species on maximum temperature.
    pub species_vs_temperature: Option<LinearFit>,
    /// Trend of daily species on maximum wind speed.
    pub species_vs_wind: Option<LinearFit>,
    /// Rainy against dry days.
    pub rain: RainProfile,
    /// Wind brackets that have days.
    pub wind: Vec<WindBracket>,
    /// Monthly totals.
    pub monthly: Vec<MonthlyWeather>,
}

#[derive(Default)]
struct DayCounts<'a> {
    detections: usize,
    species: HashSet<&'a str>,
}

/// Join daily detections with weather and summarise.
pub fn weather_activity(
    rows: &[&Detection],
    weather: &WeatherData,
    rain_threshold: f64,
) -> Outcome<WeatherActivity> {
    let mut by_day: BTreeMap<NaiveDate, DayCounts> = BTreeMap::new();
    let mut by_hour: BTreeMap<(u32, DayType), usize> = BTreeMap::new();

    let rain_days: BTreeSet<NaiveDate> = weather
        .daily
        .iter()
        .filter(|d| d.precip_sum.is_some_and(|p| p >= rain_threshold))
        .map(|d| d.date)
        .collect();
    let day_type = |date: &NaiveDate| {
        if rain_days.contains(date) {
            DayType::Rainy
        } else {
            DayType::Dry
        }
    };

    for d in rows {
        let Some(t) = d.time else { continue };
        let counts = by_day.entry(t.date()).or_default();
        counts.detections += 1;
        counts.species.insert(d.common_name.as_str());
        *by_hour.entry((t.hour, day_type(&t.date()))).or_default() += 1;
    }
    if by_day.is_empty() {
        return Outcome::NoData;
    }

    let days: Vec<DailyActivity> = by_day
        .iter()
        .filter_map(|(date, counts)| {
            weather.day(*date).map(|w| DailyActivity {
                detections: counts.detections,
                species: counts.species.len(),
                weather: w.clone(),
            })
        })
        .collect();

    let rainy_days = by_day.keys().filter(|d| rain_days.contains(d)).count().max(1);
    let dry_days = by_day.keys().filter(|d| !rain_days.contains(d)).count().max(1);
    let hourly = by_hour
        .into_iter()
        .map(|((hour, day_type), count)| {
            let n = match day_type {
                DayType::Rainy => rainy_days,
                DayType::Dry => dry_days,
            };
            HourlyRainActivity {
                hour,
                day_type,
                avg_detections: ratio(count, n),
            }
        })
        .collect();

    let rain = RainProfile {
        threshold: rain_threshold,
        rainy_days,
        dry_days,
        hourly,
        avg_rainy_detections: mean(detections_where(&days, |d| rain_days.contains(&d.weather.date))),
        avg_dry_detections: mean(detections_where(&days, |d| !rain_days.contains(&d.weather.date))),
    };

    let trend = |x: fn(&DailyActivity) -> Option<f64>, y: fn(&DailyActivity) -> usize| {
        let points: Vec<(f64, f64)> = days
            .iter()
            .filter_map(|d| x(d).map(|x| (x, as_f64(y(d)))))
            .collect();
        linear_fit(&points)
    };

    Outcome::Ready(WeatherActivity {
        detections_vs_temperature: trend(|d| d.weather.temp_max, |d| d.detections),
        species_vs_temperature: trend(|d| d.weather.temp_max, |d| d.species),
        species_vs_wind: trend(|d| d.weather.wind_max, |d| d.species),
        rain,
        wind: wind_brackets(&days),
        monthly: monthly_weather(&days),
        days,
    })
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(n: usize) -> f64 {
    n as f64
}

fn ratio(count: usize, n: usize) -> f64 {
    as_f64(count) / as_f64(n)
}

fn detections_where(
    days: &[DailyActivity],
    keep: impl Fn(&DailyActivity) -> bool,
) -> Vec<f64> {
    days.iter()
        .filter(|d| keep(d))
        .map(|d| as_f64(d.detections))
        .collect()
}

/// Label of the wind bracket containing `speed`; lower bounds are inclusive.
pub fn wind_bracket(speed: f64) -> Option<&'static str> {
    let mut lower = 0.0;
    for (upper, label) in WIND_BRACKETS {
        if speed >= lower && speed < upper {
            return Some(label);
        }
        lower = upper;
    }
    None
}

fn wind_brackets(days: &[DailyActivity]) -> Vec<WindBracket> {
    WIND_BRACKETS
        .iter()
        .filter_map(|(_, label)| {
            let members: Vec<&DailyActivity> = days
                .iter()
                .filter(|d| d.weather.wind_max.and_then(wind_bracket) == Some(*label))
                .collect();
            Some(WindBracket {
                label: (*label).to_string(),
                avg_detections: mean(members.iter().map(|d| as_f64(d.detections)))?,
                avg_species: mean(members.iter().map(|d| as_f64(d.species)))?,
                days: members.len(),
            })
        })
        .collect()
}

fn monthly_weather(days: &[DailyActivity]) -> Vec<MonthlyWeather> {
    let mut months: BTreeMap<u32, Vec<&DailyActivity>> = BTreeMap::new();
    for d in days {
        months.entry(d.weather.date.month()).or_default().push(d);
    }
    months
        .into_iter()
        .map(|(month, members)| MonthlyWeather {
            month,
            detections: members.iter().map(|d| d.detections).sum(),
            avg_temp_max: mean(members.iter().filter_map(|d| d.weather.temp_max)),
            total_rain: members.iter().filter_map(|d| d.weather.precip_sum).sum(),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn day(d: &str, temp_max: f64, precip: f64, wind: f64) -> DailyWeather {
        DailyWeather {
            date: date(d),
            temp_max: Some(temp_max),
            temp_min: Some(temp_max - 8.0),
            precip_sum: Some(precip),
            wind_max: Some(wind),
            sunrise: None,
            sunset: None,
        }
    }

    fn det(name: &str, d: &str, time: &str) -> Detection {
        Detection::new(name, name, 0.9, d, time).with_location(Some(51.5), Some(-0.12))
    }

    fn fixture() -> (Vec<Detection>, WeatherData) {
        let rows = vec![
            det("Robin", "2024-05-01", "06:00"),
            det("Wren", "2024-05-01", "06:30"),
            det("Robin", "2024-05-01", "07:00"),
            det("Robin", "2024-05-02", "06:10"),
            det("Robin", "2024-05-03", "06:20"),
            det("Wren", "2024-05-03", "08:00"),
            det("Robin", "2024-06-01", "05:00"),
        ];
        let weather = WeatherData {
            hourly: Vec::new(),
            daily: vec![
                day("2024-05-01", 14.0, 0.0, 5.0),
                day("2024-05-02", 11.0, 4.5, 10.0),
                day("2024-05-03", 16.0, 1.0, 35.0),
                day("2024-06-01", 20.0, 0.2, 120.0),
            ],
        };
        (rows, weather)
    }

    #[test]
    fn test_weather_request_uses_mode_and_range() {
        let mut rows = fixture().0;
        rows.push(det("Robin", "2024-06-02", "06:00").with_location(Some(52.0), Some(-1.0)));
        let refs: Vec<&Detection> = rows.iter().collect();
        let request = weather_request(&refs).unwrap();
        assert_eq!(request.latitude, 51.5);
        assert_eq!(request.longitude, -0.12);
        assert_eq!(request.start, date("2024-05-01"));
        assert_eq!(request.end, date("2024-06-02"));
    }

    #[test]
    fn test_weather_request_needs_coordinates() {
        let rows = [Detection::new("Robin", "Robin", 0.9, "2024-05-01", "06:00")];
        let refs: Vec<&Detection> = rows.iter().collect();
        assert!(weather_request(&refs).is_none());
    }

    #[test]
    fn test_wind_bracket_is_left_inclusive() {
        assert_eq!(wind_bracket(0.0), Some("Calm (0-10)"));
        assert_eq!(wind_bracket(9.9), Some("Calm (0-10)"));
        assert_eq!(wind_bracket(10.0), Some("Light (10-20)"));
        assert_eq!(wind_bracket(30.0), Some("Strong (30+)"));
        assert_eq!(wind_bracket(100.0), None);
        assert_eq!(wind_bracket(-1.0), None);
    }

    #[test]
    fn test_weather_activity() {
        let (rows, weather) = fixture();
        let refs: Vec<&Detection> = rows.iter().collect();
        let summary = weather_activity(&refs, &weather, 1.0).ready().unwrap();

        assert_eq!(summary.days.len(), 4);
        assert_eq!(summary.days[0].detections, 3);
        assert_eq!(summary.days[0].species, 2);

        // Rainy: 05-02 and 05-03
        assert_eq!(summary.rain.rainy_days, 2);
        assert_eq!(summary.rain.dry_days, 2);
        let rainy_six = summary
            .rain
            .hourly
            .iter()
            .find(|h| h.hour == 6 && h.day_type == DayType::Rainy)
            .unwrap();
        assert!((rainy_six.avg_detections - 1.0).abs() < 1e-9);
        assert_eq!(summary.rain.avg_rainy_detections, Some(1.5));
        assert_eq!(summary.rain.avg_dry_detections, Some(2.0));

        // 120 km/h is outside every bracket
        let labels: Vec<&str> = summary.wind.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(labels, vec!["Calm (0-10)", "Light (10-20)", "Strong (30+)"]);
        assert_eq!(summary.wind.iter().map(|w| w.days).sum::<usize>(), 3);

        assert_eq!(summary.monthly.len(), 2);
        assert_eq!(summary.monthly[0].month, 5);
        assert_eq!(summary.monthly[0].detections, 6);
        assert!((summary.monthly[0].total_rain - 5.5).abs() < 1e-9);
        assert!((summary.monthly[0].avg_temp_max.unwrap() - 41.0 / 3.0).abs() < 1e-9);

        assert!(summary.detections_vs_temperature.is_some());
    }

    #[test]
    fn test_days_without_weather_are_not_joined() {
        let (rows, _) = fixture();
        let refs: Vec<&Detection> = rows.iter().collect();
        let summary = weather_activity(&refs, &WeatherData::default(), 1.0)
            .ready()
            .unwrap();
        assert!(summary.days.is_empty());
        assert!(summary.wind.is_empty());
        assert!(summary.detections_vs_temperature.is_none());
        assert_eq!(summary.rain.rainy_days, 1);
        assert_eq!(summary.rain.dry_days, 4);
    }

    #[test]
    fn test_no_timed_rows() {
        let rows = [Detection::new("Robin", "Robin", 0.9, "bad", "06:00")];
        let refs: Vec<&Detection> = rows.iter().collect();
        assert_eq!(
            weather_activity(&refs, &WeatherData::default(), 1.0),
            Outcome::NoData
        );
    }
}
