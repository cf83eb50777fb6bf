//! Historical weather archive lookup.

use crate::clients::http::{build_client, ensure_success, request_error};
use crate::config::HttpConfig;
use crate::constants::weather::{DAILY_FIELDS, HOURLY_FIELDS};
use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const HOURLY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";
const DAILY_DATE_FORMAT: &str = "%Y-%m-%d";

/// One hour of weather, in the deployment timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyWeather {
    /// Start of the hour.
    pub timestamp: NaiveDateTime,
    /// Air temperature at 2 m (°C).
    pub temperature: Option<f64>,
    /// Precipitation (mm).
    pub precipitation: Option<f64>,
    /// Wind speed at 10 m (km/h).
    pub wind_speed: Option<f64>,
    /// Cloud cover (%).
    pub cloud_cover: Option<f64>,
    /// Mean sea level pressure (hPa).
    pub pressure: Option<f64>,
}

/// One day of weather, in the deployment timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeather {
    /// Calendar date.
    pub date: NaiveDate,
    /// Maximum temperature (°C).
    pub temp_max: Option<f64>,
    /// Minimum temperature (°C).
    pub temp_min: Option<f64>,
    /// Total precipitation (mm).
    pub precip_sum: Option<f64>,
    /// Maximum wind speed (km/h).
    pub wind_max: Option<f64>,
    /// Local civil sunrise.
    pub sunrise: Option<NaiveDateTime>,
    /// Local civil sunset.
    pub sunset: Option<NaiveDateTime>,
}

/// Hourly and daily series for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    /// Hourly rows in time order.
    pub hourly: Vec<HourlyWeather>,
    /// Daily rows in date order.
    pub daily: Vec<DailyWeather>,
}

impl WeatherData {
    /// Daily row for `date`.
    pub fn day(&self, date: NaiveDate) -> Option<&DailyWeather> {
        self.daily.iter().find(|d| d.date == date)
    }
}

/// Coordinates and inclusive date range of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherRequest {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// First day.
    pub start: NaiveDate,
    /// Last day.
    pub end: NaiveDate,
}

impl WeatherRequest {
    /// Cache key identifying this request.
    pub fn cache_key(&self, timezone: &str) -> String {
        format!(
            "{:.4},{:.4},{},{},{timezone}",
            self.latitude, self.longitude, self.start, self.end
        )
    }
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    hourly: Option<HourlySeries>,
    #[serde(default)]
    daily: Option<DailySeries>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HourlySeries {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    precipitation: Vec<Option<f64>>,
    wind_speed_10m: Vec<Option<f64>>,
    cloud_cover: Vec<Option<f64>>,
    pressure_msl: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DailySeries {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
    wind_speed_10m_max: Vec<Option<f64>>,
    sunrise: Vec<Option<String>>,
    sunset: Vec<Option<String>>,
}

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

fn parse_local(value: Option<&String>) -> Option<NaiveDateTime> {
    value.and_then(|v| NaiveDateTime::parse_from_str(v, HOURLY_TIME_FORMAT).ok())
}

/// Parse an archive response body.
///
/// Rows whose time cannot be parsed are skipped; missing values stay `None`.
pub fn parse_weather(body: &str) -> Result<WeatherData> {
    let response: ArchiveResponse = serde_json::from_str(body).map_err(|e| Error::RemoteRequest {
        url: "weather archive".to_string(),
        source: Box::new(e),
    })?;

    let hourly_series = response.hourly.unwrap_or_default();
    let hourly = hourly_series
        .time
        .iter()
        .enumerate()
        .filter_map(|(i, time)| {
            let timestamp = NaiveDateTime::parse_from_str(time, HOURLY_TIME_FORMAT).ok()?;
            Some(HourlyWeather {
                timestamp,
                temperature: at(&hourly_series.temperature_2m, i),
                precipitation: at(&hourly_series.precipitation, i),
                wind_speed: at(&hourly_series.wind_speed_10m, i),
                cloud_cover: at(&hourly_series.cloud_cover, i),
                pressure: at(&hourly_series.pressure_msl, i),
            })
        })
        .collect();

    let daily_series = response.daily.unwrap_or_default();
    let daily = daily_series
        .time
        .iter()
        .enumerate()
        .filter_map(|(i, time)| {
            let date = NaiveDate::parse_from_str(time, DAILY_DATE_FORMAT).ok()?;
            Some(DailyWeather {
                date,
                temp_max: at(&daily_series.temperature_2m_max, i),
                temp_min: at(&daily_series.temperature_2m_min, i),
                precip_sum: at(&daily_series.precipitation_sum, i),
                wind_max: at(&daily_series.wind_speed_10m_max, i),
                sunrise: parse_local(daily_series.sunrise.get(i).and_then(Option::as_ref)),
                sunset: parse_local(daily_series.sunset.get(i).and_then(Option::as_ref)),
            })
        })
        .collect();

    Ok(WeatherData { hourly, daily })
}

/// Client for the weather archive.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    timezone: String,
}

impl WeatherClient {
    /// Create a client; series are requested in `timezone`.
    pub fn new(http: &HttpConfig, timezone: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(&http.user_agent, http.weather_timeout_secs)?,
            base_url: http.weather_url.clone(),
            timezone: timezone.to_string(),
        })
    }

    /// Timezone the series are requested in.
    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    /// Request URL for `request`.
    pub fn url(&self, request: &WeatherRequest) -> Result<Url> {
        Url::parse_with_params(
            &self.base_url,
            &[
                ("latitude", request.latitude.to_string()),
                ("longitude", request.longitude.to_string()),
                ("start_date", request.start.format(DAILY_DATE_FORMAT).to_string()),
                ("end_date", request.end.format(DAILY_DATE_FORMAT).to_string()),
                ("hourly", HOURLY_FIELDS.to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("timezone", self.timezone.clone()),
            ],
        )
        .map_err(|e| Error::RemoteRequest {
            url: self.base_url.clone(),
            source: Box::new(e),
        })
    }

    /// Fetch hourly and daily series.
    ///
    /// Any transport error, non-success status or malformed body yields `None`.
    pub async fn fetch(&self, request: &WeatherRequest) -> Option<WeatherData> {
        match self.try_fetch(request).await {
            Ok(data) => {
                info!(
                    "Fetched {} hourly and {} daily weather rows",
                    data.hourly.len(),
                    data.daily.len()
                );
                Some(data)
            }
            Err(e) => {
                warn!("Weather data unavailable: {e}");
                None
            }
        }
    }

    async fn try_fetch(&self, request: &WeatherRequest) -> Result<WeatherData> {
        let url = self.url(request)?;
        debug!("GET {url}");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| request_error(url.as_str(), e))?;
        let response = ensure_success("weather GET", response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| request_error(url.as_str(), e))?;
        parse_weather(&body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "latitude": 51.5,
        "longitude": -0.12,
        "hourly": {
            "time": ["2024-05-01T00:00", "2024-05-01T01:00", "bad"],
            "temperature_2m": [8.5, null, 7.0],
            "precipitation": [0.0, 0.2, 0.0],
            "wind_speed_10m": [12.0, 14.5, 9.0],
            "cloud_cover": [80, 90, 100],
            "pressure_msl": [1012.3, 1012.0, 1011.8]
        },
        "daily": {
            "time": ["2024-05-01"],
            "temperature_2m_max": [16.2],
            "temperature_2m_min": [7.1],
            "precipitation_sum": [2.4],
            "wind_speed_10m_max": [22.0],
            "sunrise": ["2024-05-01T05:32"],
            "sunset": [null]
        }
    }"#;

    fn request() -> WeatherRequest {
        WeatherRequest {
            latitude: 51.5,
            longitude: -0.12,
            start: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        }
    }

    #[test]
    fn test_parse_weather() {
        let data = parse_weather(BODY).unwrap();
        assert_eq!(data.hourly.len(), 2);
        assert_eq!(data.hourly[0].temperature, Some(8.5));
        assert_eq!(data.hourly[1].temperature, None);
        assert_eq!(data.hourly[1].cloud_cover, Some(90.0));

        let day = data.day(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()).unwrap();
        assert_eq!(day.precip_sum, Some(2.4));
        assert_eq!(
            day.sunrise,
            NaiveDateTime::parse_from_str("2024-05-01T05:32", HOURLY_TIME_FORMAT).ok()
        );
        assert!(day.sunset.is_none());
    }

    #[test]
    fn test_parse_missing_sections() {
        let data = parse_weather(r#"{"latitude": 1.0}"#).unwrap();
        assert!(data.hourly.is_empty());
        assert!(data.daily.is_empty());
    }

    #[test]
    fn test_request_url() {
        let client = WeatherClient::new(&HttpConfig::default(), "Europe/London").unwrap();
        let url = client.url(&request()).unwrap();
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("start_date".to_string(), "2024-05-01".to_string())));
        assert!(query.contains(&("end_date".to_string(), "2024-05-31".to_string())));
        assert!(query.contains(&("timezone".to_string(), "Europe/London".to_string())));
        assert!(query.contains(&("daily".to_string(), DAILY_FIELDS.to_string())));
    }

    #[test]
    fn test_cache_key_includes_range() {
        let key = request().cache_key("Europe/London");
        assert!(key.contains("2024-05-01"));
        assert!(key.contains("2024-05-31"));
        assert!(key.ends_with("Europe/London"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let http = HttpConfig {
            weather_url: "http://127.0.0.1:9/archive".to_string(),
            weather_timeout_secs: 2,
            ..HttpConfig::default()
        };
        let client = WeatherClient::new(&http, "Europe/London").unwrap();
        assert!(client.fetch(&request()).await.is_none());
    }
}
