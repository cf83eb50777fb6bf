//! CLI argument definitions.

use crate::analysis::composition::{ActivityBreakdown, CompositionDimension};
use crate::analysis::cooccurrence::CoUnit;
use crate::analysis::dawn::TimeReference;
use crate::analysis::diversity::DiversityPeriod;
use crate::analysis::frequency::TrendPeriod;
use crate::analysis::ordination::FeatureSet;
use crate::cli::validators::{parse_confidence, parse_date, parse_month, parse_rain_threshold};
use crate::config::{CONFIG_ENV, DefaultsConfig};
use crate::data::Season;
use crate::error::Result;
use crate::filter::{ComparisonMode, DateRange, FilterState, YearSelection};
use crate::output::OutputMode;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Garden bird detection analytics.
#[derive(Debug, Parser)]
#[command(name = "birdash")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: platform config directory).
    #[arg(long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Output mode.
    #[arg(short, long, value_enum, global = true, default_value_t = OutputMode::Human)]
    pub output: OutputMode,

    /// Skip weather and species summary lookups.
    #[arg(long, global = true)]
    pub offline: bool,

    /// Suppress progress output and informational logs.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Row filters shared by every view.
    #[command(flatten)]
    pub filters: FilterArgs,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Headline counts, top species and status mix.
    Overview {
        /// Species to list.
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Detection counts over time.
    Trends {
        /// Time resolution.
        #[arg(long, value_enum, default_value_t = TrendPeriod::Month)]
        period: TrendPeriod,
        /// Overlay these years (comma-separated).
        #[arg(long, value_delimiter = ',')]
        compare_years: Vec<i32>,
    },
    /// Detections by hour of day.
    Activity {
        /// How to split the hourly counts.
        #[arg(long, value_enum, default_value_t)]
        breakdown: ActivityBreakdown,
        /// Species shown with `--breakdown species`.
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Month by hour detection grid.
    Heatmap,
    /// Hourly species mix.
    Composition {
        /// Species to include.
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Monthly mix by status or diet.
    CompositionOverTime {
        /// Category to break down.
        #[arg(long, value_enum, default_value_t)]
        by: CompositionDimension,
    },
    /// Species co-occurrence matrix.
    Cooccurrence {
        /// Species to include.
        #[arg(long, default_value_t = crate::constants::cooccurrence::DEFAULT_TOP_N)]
        top_n: usize,
        /// Sampling unit two species must share.
        #[arg(long, value_enum, default_value_t)]
        unit: CoUnit,
    },
    /// Richness, Shannon and Simpson indices.
    Diversity {
        /// Time resolution.
        #[arg(long, value_enum, default_value_t)]
        period: DiversityPeriod,
        /// Monthly indices for these years (comma-separated).
        #[arg(long, value_delimiter = ',')]
        compare_years: Vec<i32>,
    },
    /// Two-dimensional NMDS ordination of species.
    Nmds {
        /// Category profile each species is described by.
        #[arg(long, value_enum, default_value_t)]
        feature: FeatureSet,
        /// Minimum detections for a species to be placed.
        #[arg(long, default_value_t = crate::constants::nmds::DEFAULT_MIN_DETECTIONS)]
        min_detections: usize,
    },
    /// Earliest dawn detections and sunrise.
    Dawn {
        /// Clock used for hours of the day.
        #[arg(long, value_enum, default_value_t)]
        reference: TimeReference,
        /// Dawn species to include.
        #[arg(long, default_value_t = crate::constants::dawn::DEFAULT_TOP_N)]
        top_n: usize,
    },
    /// Activity against daily weather.
    Weather {
        /// Daily precipitation (mm) at which a day counts as rainy.
        #[arg(long, value_parser = parse_rain_threshold,
              default_value_t = crate::constants::weather::DEFAULT_RAIN_THRESHOLD)]
        rain_threshold: f64,
    },
    /// Confidence distribution, false-positive candidates and review queue.
    Quality {
        /// Species in the confidence distribution.
        #[arg(long)]
        top_n: Option<usize>,
        /// Confidence at or below which a detection is suspicious.
        #[arg(long, value_parser = parse_confidence,
              default_value_t = crate::constants::quality::DEFAULT_FP_THRESHOLD)]
        fp_threshold: f64,
        /// Statuses considered for false positives (comma-separated, empty for all).
        #[arg(long, value_delimiter = ',')]
        fp_status: Option<Vec<String>>,
        /// Species listed from the review queue.
        #[arg(long, default_value_t = crate::constants::quality::REVIEW_TOP_N)]
        review_top: usize,
    },
    /// Rarest species, streaks, arrivals and year lists.
    Records {
        /// Rarest species to list.
        #[arg(long, default_value_t = crate::constants::records::DEFAULT_RAREST_N)]
        rarest: usize,
    },
    /// Profile one species (default: bird of the day).
    Explore {
        /// Common or scientific name.
        #[arg(value_name = "SPECIES")]
        name: Option<String>,
        /// List the species available instead.
        #[arg(long)]
        list: bool,
    },
    /// List species without a diet category.
    Unclassified,
    /// Assign a diet category to a species.
    Classify {
        /// Common or scientific name.
        #[arg(value_name = "SPECIES")]
        name: String,
        /// Diet category.
        diet: String,
    },
    /// Set the status of a species and push the reference table.
    Validate {
        /// Common or scientific name.
        #[arg(value_name = "SPECIES")]
        name: String,
        /// New status.
        #[arg(value_name = "STATUS")]
        new_status: String,
        /// Also set the diet category.
        #[arg(long)]
        diet: Option<String>,
        /// Access token for the content API.
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Update local files only.
        #[arg(long)]
        no_push: bool,
    },
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage the lookup cache.
    Cache {
        /// Cache action to perform.
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Cache subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum CacheAction {
    /// Drop every cached lookup.
    Clear,
}

/// Row filters applied before every view.
#[derive(Debug, Default, Args)]
pub struct FilterArgs {
    /// Minimum confidence threshold (0.0-1.0).
    #[arg(short = 'c', long, global = true, value_parser = parse_confidence,
          env = "BIRDASH_MIN_CONFIDENCE")]
    pub min_confidence: Option<f64>,

    /// Keep only these species (common or scientific names; repeatable).
    #[arg(long, global = true, value_delimiter = ',')]
    pub species: Vec<String>,

    /// Keep only these statuses (repeatable).
    #[arg(long, global = true, value_delimiter = ',')]
    pub status: Vec<String>,

    /// Date range: one date, or start and end (YYYY-MM-DD).
    #[arg(long, global = true, num_args = 1..=2, value_parser = parse_date)]
    pub dates: Vec<NaiveDate>,

    /// Keep only these years (comma-separated).
    #[arg(long, global = true, value_delimiter = ',')]
    pub years: Vec<i32>,

    /// Keep only this season.
    #[arg(long, global = true, value_enum)]
    pub season: Option<Season>,

    /// Keep only this month (number or name).
    #[arg(long, global = true, value_parser = parse_month)]
    pub month: Option<u32>,

    /// Keep review and false-positive rows.
    #[arg(long, global = true)]
    pub include_review: bool,

    /// Compare two months side by side.
    #[arg(long, global = true, num_args = 2, value_names = ["A", "B"],
          value_parser = parse_month, conflicts_with = "compare_seasons")]
    pub compare_months: Vec<u32>,

    /// Compare two seasons side by side.
    #[arg(long, global = true, num_args = 2, value_names = ["A", "B"], value_enum)]
    pub compare_seasons: Vec<Season>,
}

impl FilterArgs {
    /// Filter state for this run, falling back to configured defaults.
    pub fn to_state(&self, defaults: &DefaultsConfig) -> Result<FilterState> {
        Ok(FilterState {
            min_confidence: self.min_confidence.unwrap_or(defaults.min_confidence),
            species: non_blank(&self.species),
            statuses: non_blank(&self.status),
            date_range: DateRange::from_selection(&self.dates)?,
            years: YearSelection::from_years(self.years.iter().copied()),
            season: self.season,
            month: self.month,
            exclude_review: defaults.exclude_review && !self.include_review,
        })
    }

    /// Comparison mode for this run.
    pub fn comparison(&self) -> ComparisonMode {
        match (self.compare_months.as_slice(), self.compare_seasons.as_slice()) {
            ([a, b], _) => ComparisonMode::CompareMonths(*a, *b),
            (_, [a, b]) => ComparisonMode::CompareSeasons(*a, *b),
            _ => ComparisonMode::None,
        }
    }
}

fn non_blank(values: &[String]) -> std::collections::BTreeSet<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}
