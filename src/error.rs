//! Error types for birdash.

/// Result type alias for birdash operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for birdash.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Cache directory could not be determined.
    #[error("could not determine cache directory for this platform")]
    CacheDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Detections database does not exist.
    #[error("detections database does not exist: {path}")]
    DatabaseNotFound {
        /// Path to the missing database.
        path: std::path::PathBuf,
    },

    /// Failed to query the detections database.
    #[error("failed to read detections from '{path}'")]
    DatabaseRead {
        /// Path to the database.
        path: std::path::PathBuf,
        /// Underlying SQLite error.
        #[source]
        source: rusqlite::Error,
    },

    /// Failed to read the species reference table.
    #[error("failed to read reference table '{path}'")]
    ReferenceRead {
        /// Path to the reference table.
        path: std::path::PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Reference table header lacks a required column.
    #[error("reference table '{path}' has no '{column}' column")]
    ReferenceColumn {
        /// Path to the reference table.
        path: std::path::PathBuf,
        /// Missing column name.
        column: String,
    },

    /// Failed to write the species reference table.
    #[error("failed to write reference table '{path}'")]
    ReferenceWrite {
        /// Path to the reference table.
        path: std::path::PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Failed to read the diet map file.
    #[error("failed to read diet map '{path}'")]
    DietRead {
        /// Path to the diet map.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the diet map file.
    #[error("failed to parse diet map '{path}'")]
    DietParse {
        /// Path to the diet map.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write the diet map file.
    #[error("failed to write diet map '{path}'")]
    DietWrite {
        /// Path to the diet map.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Status is not part of the accepted vocabulary.
    #[error("unknown conservation status '{value}'")]
    UnknownStatus {
        /// Rejected value.
        value: String,
    },

    /// Diet category is not part of the accepted vocabulary.
    #[error("unknown diet category '{value}'")]
    UnknownDiet {
        /// Rejected value.
        value: String,
    },

    /// Species not present in the loaded detections.
    #[error("species '{name}' not found in detections")]
    SpeciesNotFound {
        /// Requested species name.
        name: String,
    },

    /// Invalid timezone name.
    #[error("invalid timezone '{value}'")]
    InvalidTimezone {
        /// Rejected value.
        value: String,
    },

    /// Date range with start after end.
    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange {
        /// Range start.
        start: chrono::NaiveDate,
        /// Range end.
        end: chrono::NaiveDate,
    },

    /// Write access credential missing.
    #[error("no write credential configured (set GITHUB_TOKEN or pass --token)")]
    MissingCredential,

    /// Remote repository not configured.
    #[error("remote repository not configured (set remote.repository in config)")]
    RemoteNotConfigured,

    /// Failed to build the HTTP client.
    #[error("failed to create HTTP client: {reason}")]
    HttpClient {
        /// Description of the failure.
        reason: String,
    },

    /// HTTP request could not be completed.
    #[error("request to '{url}' failed")]
    RemoteRequest {
        /// URL that failed.
        url: String,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Remote endpoint answered with a non-success status.
    #[error("{operation} failed ({status}): {body}")]
    RemoteStatus {
        /// Operation that failed (e.g. "content GET").
        operation: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Remote write rejected because the revision marker was stale.
    #[error("remote file changed since it was read ({status}): {body}")]
    RevisionConflict {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Failed to read the lookup cache file.
    #[error("failed to read cache file '{path}'")]
    CacheRead {
        /// Path to the cache file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to write the lookup cache file.
    #[error("failed to write cache file '{path}'")]
    CacheWrite {
        /// Path to the cache file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to serialize report output.
    #[error("failed to serialize output")]
    OutputSerialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}
