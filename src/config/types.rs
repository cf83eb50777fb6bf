//! Configuration type definitions.

use crate::constants::{self, DEFAULT_MIN_CONFIDENCE, DEFAULT_TIMEZONE, DEFAULT_TOP_N, http};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data file locations.
    pub data: DataConfig,

    /// Deployment location.
    pub location: LocationConfig,

    /// Default filter and view settings.
    pub defaults: DefaultsConfig,

    /// Outbound HTTP settings.
    pub http: HttpConfig,

    /// Lookup cache settings.
    pub cache: CacheConfig,

    /// Remote mirror of the reference table.
    pub remote: RemoteConfig,
}

/// Data file locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// `SQLite` database holding detections.
    pub database: PathBuf,

    /// Detections table name.
    pub table: String,

    /// Species reference table (CSV).
    pub reference: PathBuf,

    /// Diet map (JSON).
    pub diet: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(constants::data::DATABASE),
            table: constants::data::TABLE.to_string(),
            reference: PathBuf::from(constants::data::REFERENCE),
            diet: PathBuf::from(constants::data::DIET),
        }
    }
}

/// Deployment location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// IANA timezone detections are recorded in.
    pub timezone: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

/// Default filter and view settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Confidence floor.
    pub min_confidence: f64,

    /// Species shown by top-N views.
    pub top_n: usize,

    /// Drop review and false-positive rows.
    pub exclude_review: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            top_n: DEFAULT_TOP_N,
            exclude_review: true,
        }
    }
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Species summary endpoint.
    pub summary_url: String,

    /// Weather archive endpoint.
    pub weather_url: String,

    /// User agent sent with every request.
    pub user_agent: String,

    /// Summary lookup timeout in seconds.
    pub summary_timeout_secs: u64,

    /// Weather lookup timeout in seconds.
    pub weather_timeout_secs: u64,

    /// Content API read timeout in seconds.
    pub content_read_timeout_secs: u64,

    /// Content API write timeout in seconds.
    pub content_write_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            summary_url: http::SUMMARY_URL.to_string(),
            weather_url: http::WEATHER_URL.to_string(),
            user_agent: http::USER_AGENT.to_string(),
            summary_timeout_secs: http::SUMMARY_TIMEOUT_SECS,
            weather_timeout_secs: http::WEATHER_TIMEOUT_SECS,
            content_read_timeout_secs: http::CONTENT_READ_TIMEOUT_SECS,
            content_write_timeout_secs: http::CONTENT_WRITE_TIMEOUT_SECS,
        }
    }
}

/// Lookup cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Freshness window of external lookups in seconds.
    pub ttl_secs: u64,

    /// Keep lookups in the platform cache directory between runs.
    pub persist: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: constants::cache::LOOKUP_TTL_SECS,
            persist: true,
        }
    }
}

/// Remote mirror of the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Content API base URL.
    pub api_url: String,

    /// Repository as `owner/name`.
    pub repository: Option<String>,

    /// Path of the reference table inside the repository.
    pub path: String,

    /// Branch to commit to (repository default when unset).
    pub branch: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: http::CONTENT_API_URL.to_string(),
            repository: None,
            path: constants::data::REFERENCE.to_string(),
            branch: None,
        }
    }
}
