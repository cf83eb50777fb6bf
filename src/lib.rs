//! Birdash - garden bird detection analytics.
//!
//! Loads acoustic detections from `SQLite`, joins them with a species
//! reference table and a diet map, and turns filtered rows into the
//! summaries behind each report: activity, composition, diversity,
//! ordination, dawn chorus, weather and records.

#![warn(missing_docs)]

pub mod analysis;
pub mod cache;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod filter;
pub mod output;
pub mod writeback;

use cache::TtlCache;
use clap::Parser;
use cli::manage::{self, ValidateRequest};
use cli::{CacheAction, Cli, Command, ConfigAction, Context, views};
use config::{Config, load_config_file, resolve_config_path, save_config, validate_config};
use data::DataStore;
use output::{OutputMode, ResultType, emit, emit_error};
use serde::Serialize;
use std::path::Path;
use tracing::info;

pub use error::{Error, Result};

/// Main entry point for birdash CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let mode = cli.output;
    let result = execute(cli);
    if let Err(e) = &result {
        emit_error(mode, e);
    }
    result
}

fn execute(cli: Cli) -> Result<()> {
    let config_path = resolve_config_path(cli.config.clone())?;

    if let Command::Config { action } = cli.command {
        return handle_config_command(action, &config_path, cli.output);
    }

    let config = load_config_file(&config_path)?;
    validate_config(&config)?;

    let cache = TtlCache::from_config(&config.cache)?;
    let ctx = Context {
        filters: cli.filters.to_state(&config.defaults)?,
        comparison: cli.filters.comparison(),
        store: DataStore::new(config.data.clone()),
        mode: cli.output,
        progress: cli.output.shows_progress() && !cli.quiet,
        offline: cli.offline,
        cache,
        config,
    };

    let result = handle_command(cli.command, &ctx, &config_path);
    ctx.cache.save()?;
    result
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter_str = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_command(command: Command, ctx: &Context, config_path: &Path) -> Result<()> {
    match command {
        Command::Overview { top_n } => views::overview(ctx, top_n),
        Command::Trends {
            period,
            compare_years,
        } => views::trends(ctx, period, &compare_years),
        Command::Activity { breakdown, top_n } => views::activity(ctx, breakdown, top_n),
        Command::Heatmap => views::heatmap(ctx),
        Command::Composition { top_n } => views::composition(ctx, top_n),
        Command::CompositionOverTime { by } => views::composition_over_time_view(ctx, by),
        Command::Cooccurrence { top_n, unit } => views::cooccurrence_view(ctx, top_n, unit),
        Command::Diversity {
            period,
            compare_years,
        } => views::diversity(ctx, period, &compare_years),
        Command::Nmds {
            feature,
            min_detections,
        } => views::nmds(ctx, feature, min_detections),
        Command::Dawn { reference, top_n } => views::dawn(ctx, reference, top_n),
        Command::Weather { rain_threshold } => views::weather(ctx, rain_threshold),
        Command::Quality {
            top_n,
            fp_threshold,
            fp_status,
            review_top,
        } => views::quality(ctx, top_n, fp_threshold, fp_status.as_deref(), review_top),
        Command::Records { rarest } => views::records(ctx, rarest),
        Command::Explore { name, list } => views::explore(ctx, name.as_deref(), list),
        Command::Unclassified => views::unclassified(ctx),
        Command::Classify { name, diet } => manage::classify(ctx, &name, &diet),
        Command::Validate {
            name,
            new_status,
            diet,
            token,
            no_push,
        } => manage::validate(
            ctx,
            ValidateRequest {
                name: &name,
                status: &new_status,
                diet: diet.as_deref(),
                token: token.as_deref(),
                no_push,
            },
        ),
        Command::Cache { action } => handle_cache_command(action, ctx),
        Command::Config { action } => handle_config_command(action, config_path, ctx.mode),
    }
}

/// Outcome of a config or cache action.
#[derive(Debug, Serialize)]
struct ActionReport {
    action: &'static str,
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entries: Option<usize>,
}

fn handle_config_command(action: ConfigAction, path: &Path, mode: OutputMode) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let created = !path.exists();
            if created {
                save_config(&Config::default(), path)?;
                info!("Created configuration file: {}", path.display());
            }
            let report = ActionReport {
                action: if created { "created" } else { "exists" },
                path: Some(path.display().to_string()),
                entries: None,
            };
            emit(mode, ResultType::Config, &report, |r| {
                if created {
                    format!("Created configuration file: {}", r.path.as_deref().unwrap_or_default())
                } else {
                    format!(
                        "Configuration file already exists: {}",
                        r.path.as_deref().unwrap_or_default()
                    )
                }
            })
        }
        ConfigAction::Show => {
            let config = load_config_file(path)?;
            emit(mode, ResultType::Config, &config, |c| {
                toml::to_string_pretty(c).unwrap_or_else(|e| format!("{c:#?}\n({e})"))
            })
        }
        ConfigAction::Path => {
            let report = ActionReport {
                action: "path",
                path: Some(path.display().to_string()),
                entries: None,
            };
            emit(mode, ResultType::Config, &report, |r| {
                r.path.clone().unwrap_or_default()
            })
        }
    }
}

fn handle_cache_command(action: CacheAction, ctx: &Context) -> Result<()> {
    match action {
        CacheAction::Clear => {
            let entries = ctx.cache.len();
            ctx.cache.clear();
            info!("Cleared {entries} cached lookup(s)");
            let report = ActionReport {
                action: "cleared",
                path: ctx.cache.path().map(|p| p.display().to_string()),
                entries: Some(entries),
            };
            emit(ctx.mode, ResultType::Cache, &report, |r| {
                format!("Cleared {} cached entries", r.entries.unwrap_or(0))
            })
        }
    }
}
