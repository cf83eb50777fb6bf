//! External enrichment clients.
//!
//! Summary and weather lookups are fail-soft: every failure becomes `None`
//! plus a warning. Successful results are memoised in the [`TtlCache`] for
//! the configured freshness window; failures are never cached.

mod content;
mod http;
mod summary;
#[cfg(test)]
pub(crate) mod test_server;
mod weather;

pub use content::{ContentClient, contents_url};
pub use http::{build_client, runtime};
pub use summary::{SpeciesSummary, SummaryClient, parse_summary, summary_url};
pub use weather::{
    DailyWeather, HourlyWeather, WeatherClient, WeatherData, WeatherRequest, parse_weather,
};

use crate::cache::TtlCache;
use crate::config::Config;
use crate::error::Result;
use crate::output::progress::create_spinner;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

const SUMMARY_FN: &str = "species_summary";
const WEATHER_FN: &str = "weather_archive";

/// Cached, synchronous front for the summary and weather clients.
pub struct Lookups<'a> {
    summary: SummaryClient,
    weather: WeatherClient,
    cache: &'a TtlCache,
    ttl: Duration,
    runtime: Runtime,
    progress: bool,
}

impl<'a> Lookups<'a> {
    /// Build both clients from configuration.
    pub fn new(config: &Config, cache: &'a TtlCache, progress: bool) -> Result<Self> {
        Ok(Self {
            summary: SummaryClient::new(&config.http)?,
            weather: WeatherClient::new(&config.http, &config.location.timezone)?,
            cache,
            ttl: Duration::from_secs(config.cache.ttl_secs),
            runtime: runtime()?,
            progress,
        })
    }

    /// Summary for the first of `titles` that has one.
    pub fn summary(&self, titles: &[&str]) -> Option<SpeciesSummary> {
        titles.iter().find_map(|title| self.summary_for(title))
    }

    fn summary_for(&self, title: &str) -> Option<SpeciesSummary> {
        if let Some(hit) = self.cache.get(SUMMARY_FN, title, Some(self.ttl)) {
            debug!("Cache hit: {SUMMARY_FN}({title})");
            return Some(hit);
        }
        let spinner = create_spinner(&format!("Looking up {title}"), self.progress);
        let summary = self.runtime.block_on(self.summary.fetch(title));
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        if let Some(summary) = &summary {
            self.cache.insert(SUMMARY_FN, title, summary);
        }
        summary
    }

    /// Weather series for `request`.
    pub fn weather(&self, request: &WeatherRequest) -> Option<WeatherData> {
        let key = request.cache_key(self.weather.timezone());
        if let Some(hit) = self.cache.get(WEATHER_FN, &key, Some(self.ttl)) {
            debug!("Cache hit: {WEATHER_FN}({key})");
            return Some(hit);
        }
        let spinner = create_spinner(
            &format!("Fetching weather {} to {}", request.start, request.end),
            self.progress,
        );
        let data = self.runtime.block_on(self.weather.fetch(request));
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        if let Some(data) = &data {
            self.cache.insert(WEATHER_FN, &key, data);
        }
        data
    }
}
