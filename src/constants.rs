//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "birdash";

/// Default minimum confidence threshold for detections.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.0;

/// Default number of species shown by top-N views.
pub const DEFAULT_TOP_N: usize = 20;

/// Confidence value bounds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f64 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f64 = 1.0;
    /// Decimal places for confidence formatting.
    pub const DECIMAL_PLACES: usize = 3;
}

/// Conservation status vocabulary.
pub mod status {
    /// Sentinel for species missing from the reference table.
    pub const REVIEW: &str = "Review Recording";

    /// Status assigned to species confirmed as misidentifications.
    pub const FALSE_POSITIVE: &str = "False Positive";

    /// Statuses that may be assigned through the write-back path.
    pub const ASSIGNABLE: &[&str] = &[
        "Resident",
        "Summer visitor",
        "Winter visitor",
        "Passage migrant",
        "Scarce visitor",
        "Rare vagrant",
        "Introduced species",
        "Reintroduced",
        "Extinct",
        FALSE_POSITIVE,
        "Other",
    ];

    /// Statuses flagged by default when looking for false positives.
    pub const FALSE_POSITIVE_DEFAULTS: &[&str] = &["Rare vagrant", "Scarce visitor"];
}

/// Diet category vocabulary.
pub mod diet {
    /// Sentinel for species without a diet classification.
    pub const UNCLASSIFIED: &str = "Unclassified";

    /// Diet categories that may be assigned.
    pub const CATEGORIES: &[&str] = &[
        "Insectivore",
        "Granivore",
        "Omnivore",
        "Frugivore",
        "Carnivore",
        "Piscivore",
        "Herbivore",
    ];
}

/// Default data file locations (relative to the working directory).
pub mod data {
    /// Detections database.
    pub const DATABASE: &str = "birds.db";
    /// Detections table name.
    pub const TABLE: &str = "detections";
    /// Species reference table.
    pub const REFERENCE: &str = "UK_Birds_Generalized_Status.csv";
    /// Diet map side file.
    pub const DIET: &str = "species_diet.json";
}

/// Ordination constants.
pub mod nmds {
    /// Minimum number of species required for an ordination.
    pub const MIN_SPECIES: usize = 5;
    /// Default minimum detections per species.
    pub const DEFAULT_MIN_DETECTIONS: usize = 5;
    /// Number of random restarts.
    pub const N_INIT: usize = 10;
    /// Maximum SMACOF iterations per restart.
    pub const MAX_ITER: usize = 500;
    /// Convergence tolerance on relative stress improvement.
    pub const EPS: f64 = 1e-3;
    /// Seed for restart configurations.
    pub const SEED: u64 = 42;
    /// Stress upper bound for an "Excellent" fit.
    pub const EXCELLENT: f64 = 0.05;
    /// Stress upper bound for a "Good" fit.
    pub const GOOD: f64 = 0.10;
    /// Stress upper bound for a "Fair" fit.
    pub const FAIR: f64 = 0.20;
}

/// Dawn chorus window (inclusive local hours).
pub mod dawn {
    /// First hour of the dawn window.
    pub const FIRST_HOUR: u32 = 3;
    /// Last hour of the dawn window.
    pub const LAST_HOUR: u32 = 10;
    /// Default number of dawn species.
    pub const DEFAULT_TOP_N: usize = 12;
    /// Hour used for sunrise temperature when sunrise is unknown.
    pub const FALLBACK_SUNRISE_HOUR: u32 = 6;
}

/// Weather analysis constants.
pub mod weather {
    /// Default rainy day threshold (mm/day).
    pub const DEFAULT_RAIN_THRESHOLD: f64 = 1.0;
    /// Upper bounds of the wind brackets (km/h).
    pub const WIND_BRACKETS: [(f64, &str); 4] = [
        (10.0, "Calm (0-10)"),
        (20.0, "Light (10-20)"),
        (30.0, "Moderate (20-30)"),
        (100.0, "Strong (30+)"),
    ];
    /// Hourly variables requested from the archive.
    pub const HOURLY_FIELDS: &str =
        "temperature_2m,precipitation,wind_speed_10m,cloud_cover,pressure_msl";
    /// Daily variables requested from the archive.
    pub const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,precipitation_sum,wind_speed_10m_max,sunrise,sunset";
}

/// Data quality defaults.
pub mod quality {
    /// Default false-positive confidence ceiling.
    pub const DEFAULT_FP_THRESHOLD: f64 = 0.7;
    /// Default number of review species shown.
    pub const REVIEW_TOP_N: usize = 20;
}

/// Co-occurrence defaults.
pub mod cooccurrence {
    /// Default number of species in the matrix.
    pub const DEFAULT_TOP_N: usize = 15;
}

/// Records defaults.
pub mod records {
    /// Default number of rarest species.
    pub const DEFAULT_RAREST_N: usize = 15;
    /// Days covered by a year list curve.
    pub const YEAR_DAYS: u32 = 366;
}

/// HTTP endpoints and timeouts.
pub mod http {
    /// Species summary endpoint (title is appended as a path segment).
    pub const SUMMARY_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";
    /// Historical weather archive endpoint.
    pub const WEATHER_URL: &str = "https://archive-api.open-meteo.com/v1/archive";
    /// Content API base URL.
    pub const CONTENT_API_URL: &str = "https://api.github.com";
    /// User agent sent with every request.
    pub const USER_AGENT: &str = concat!("birdash/", env!("CARGO_PKG_VERSION"));
    /// Summary lookup timeout in seconds.
    pub const SUMMARY_TIMEOUT_SECS: u64 = 10;
    /// Weather lookup timeout in seconds.
    pub const WEATHER_TIMEOUT_SECS: u64 = 30;
    /// Content API read timeout in seconds.
    pub const CONTENT_READ_TIMEOUT_SECS: u64 = 15;
    /// Content API write timeout in seconds.
    pub const CONTENT_WRITE_TIMEOUT_SECS: u64 = 30;
    /// Connect timeout applied to every client.
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
}

/// Cache constants.
pub mod cache {
    /// Freshness window for external lookups (one day).
    pub const LOOKUP_TTL_SECS: u64 = 86_400;
    /// Cache file name inside the platform cache directory.
    pub const FILE_NAME: &str = "lookups.json";
}

/// Default deployment timezone.
pub const DEFAULT_TIMEZONE: &str = "Europe/London";

/// Month abbreviations, index 0 is January.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

