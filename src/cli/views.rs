//! Read-only report subcommands.
//!
//! Each view loads the dataset once, runs the filter pipeline with the
//! run's [`FilterState`], hands the surviving rows to one or more builders
//! and emits the result.

use crate::analysis::composition::{
    ActivityBreakdown, CompositionDimension, HourlySeries, Share, activity_by_hour,
    activity_heatmap, composition_by_hour, composition_over_time, status_breakdown,
};
use crate::analysis::cooccurrence::{CoOccurrence, CoUnit, cooccurrence};
use crate::analysis::dawn::{
    DawnChorus, SunriseComparison, TimeReference, dawn_chorus, first_detection_vs_sunrise,
};
use crate::analysis::diversity::{
    DiversityPeriod, PeriodDiversity, YearMonthDiversity, diversity_by_period,
    diversity_compare_years,
};
use crate::analysis::explorer::{
    SpeciesPair, SpeciesProfile, bird_of_the_day, find_species, species_pairs, species_profile,
    unclassified_species,
};
use crate::analysis::frequency::{
    Kpis, PeriodCount, SpeciesCount, TrendPeriod, YearSeries, compare_years, detection_trend,
    kpis, top_species,
};
use crate::analysis::ordination::{FeatureSet, Ordination, ordination};
use crate::analysis::quality::{
    ConfidenceSummary, FalsePositiveCandidate, HourConfidence, confidence_distribution,
    false_positive_candidates, review_confidence_by_hour, review_top_species,
};
use crate::analysis::records::{
    Arrival, SpeciesRecord, YearList, new_arrivals, rarest_species, streak_leaders, year_lists,
};
use crate::analysis::weather::{WeatherActivity, weather_activity, weather_request};
use crate::analysis::{LinearFit, Outcome, mean};
use crate::cache::TtlCache;
use crate::clients::{Lookups, SpeciesSummary, WeatherData};
use crate::config::Config;
use crate::constants::confidence::DECIMAL_PLACES;
use crate::constants::status::FALSE_POSITIVE_DEFAULTS;
use crate::data::DataStore;
use crate::error::Result;
use crate::filter::{self, ComparisonMode, FilterState, month_label};
use crate::output::{OutputMode, ResultType, Table, emit};
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use tracing::{info, warn};

/// Everything a subcommand needs, fixed for one run.
pub struct Context {
    /// Loaded configuration.
    pub config: Config,
    /// Output mode.
    pub mode: OutputMode,
    /// Whether spinners may be drawn.
    pub progress: bool,
    /// Skip external lookups.
    pub offline: bool,
    /// Filter predicates for this run.
    pub filters: FilterState,
    /// Panel split for views that support comparison.
    pub comparison: ComparisonMode,
    /// Dataset holder.
    pub store: DataStore,
    /// Lookup and memo cache.
    pub cache: TtlCache,
}

impl Context {
    fn lookups(&self) -> Result<Option<Lookups<'_>>> {
        if self.offline {
            info!("Offline: skipping external lookups");
            return Ok(None);
        }
        Lookups::new(&self.config, &self.cache, self.progress).map(Some)
    }

    fn top_n(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.config.defaults.top_n).max(1)
    }
}

/// One comparison panel of a view.
#[derive(Debug, Serialize)]
pub struct PanelReport<T> {
    /// Panel heading.
    pub label: String,
    /// Builder result for the panel's rows.
    pub outcome: Outcome<T>,
}

fn outcome_text<T>(outcome: &Outcome<T>, render: impl FnOnce(&T) -> String) -> String {
    outcome
        .as_ready()
        .map_or_else(|| outcome.placeholder().unwrap_or_default(), render)
}

fn panels_text<T>(panels: &[PanelReport<T>], render: impl Fn(&T) -> String) -> String {
    if let [single] = panels {
        return outcome_text(&single.outcome, render);
    }
    let mut text = String::new();
    for panel in panels {
        let _ = writeln!(text, "== {} ==", panel.label);
        let _ = writeln!(text, "{}", outcome_text(&panel.outcome, &render));
    }
    text
}

#[allow(clippy::cast_possible_truncation)]
fn clock(hour: f64) -> String {
    let minutes = (hour * 60.0).round() as i64;
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

fn opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

fn fit_text(label: &str, fit: Option<&LinearFit>) -> String {
    fit.map_or_else(
        || format!("{label}: not enough points\n"),
        |f| format!("{label}: slope {:.3}, intercept {:.3}\n", f.slope, f.intercept),
    )
}

// --- overview ------------------------------------------------------------

/// Status with its detection count.
#[derive(Debug, Serialize)]
pub struct StatusCount {
    /// Status.
    pub status: String,
    /// Detections.
    pub count: usize,
}

/// Headline numbers of the filtered set.
#[derive(Debug, Serialize)]
pub struct OverviewReport {
    /// Totals.
    pub kpis: Kpis,
    /// Most detected species.
    pub top_species: Outcome<Vec<SpeciesCount>>,
    /// Detections per status.
    pub statuses: Vec<StatusCount>,
}

/// Headline counts, top species and status mix.
pub fn overview(ctx: &Context, top_n: Option<usize>) -> Result<()> {
    let dataset = ctx.store.get()?;
    let set = filter::apply(&dataset.detections, &ctx.filters);

    let report = OverviewReport {
        kpis: kpis(&set.active),
        top_species: top_species(&set.active, ctx.top_n(top_n)),
        statuses: status_breakdown(&set.active)
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect(),
    };

    emit(ctx.mode, ResultType::Overview, &report, |r| {
        let mut text = format!(
            "Detections: {}\nSpecies: {}\nMean confidence: {}\n\n",
            r.kpis.total_detections,
            r.kpis.unique_species,
            opt(r.kpis.mean_confidence, DECIMAL_PLACES)
        );
        text.push_str(&outcome_text(&r.top_species, |rows| {
            let mut table = Table::new(["Species", "Detections"]);
            for row in rows {
                table.row([row.name.clone(), row.count.to_string()]);
            }
            table.to_string()
        }));
        if !r.statuses.is_empty() {
            let mut table = Table::new(["Status", "Detections"]);
            for s in &r.statuses {
                table.row([s.status.clone(), s.count.to_string()]);
            }
            let _ = write!(text, "\n{table}");
        }
        text
    })
}

// --- trends --------------------------------------------------------------

/// Detection counts over time.
#[derive(Debug, Serialize)]
pub struct TrendsReport {
    /// Counts per period.
    pub trend: Outcome<Vec<PeriodCount>>,
    /// Per-year overlay, when years were requested.
    pub years: Option<Outcome<Vec<YearSeries>>>,
}

/// Detection counts by year, month or week, with an optional year overlay.
pub fn trends(ctx: &Context, period: TrendPeriod, years: &[i32]) -> Result<()> {
    let dataset = ctx.store.get()?;
    let set = filter::apply(&dataset.detections, &ctx.filters);

    let report = TrendsReport {
        trend: detection_trend(&set.active, period),
        years: (!years.is_empty()).then(|| compare_years(&set.active, years, period)),
    };

    emit(ctx.mode, ResultType::Trends, &report, |r| {
        let mut text = outcome_text(&r.trend, |counts| {
            let mut table = Table::new(["Period", "Detections"]);
            for c in counts {
                table.row([c.period.clone(), c.count.to_string()]);
            }
            table.to_string()
        });
        if let Some(years) = &r.years {
            text.push('\n');
            text.push_str(&outcome_text(years, |series| year_series_table(series, period)));
        }
        text
    })
}

fn year_series_table(series: &[YearSeries], period: TrendPeriod) -> String {
    let mut headers = vec![if period == TrendPeriod::Week { "Week" } else { "Month" }.to_string()];
    headers.extend(series.iter().map(|s| s.year.to_string()));
    let mut table = Table::new(headers);
    let slots = series.iter().map(|s| s.counts.len()).max().unwrap_or(0);
    for slot in 0..slots {
        let label = if period == TrendPeriod::Week {
            (slot + 1).to_string()
        } else {
            month_label(u32::try_from(slot + 1).unwrap_or(0)).to_string()
        };
        let mut row = vec![label];
        row.extend(
            series
                .iter()
                .map(|s| s.counts.get(slot).copied().unwrap_or(0).to_string()),
        );
        table.row(row);
    }
    table.to_string()
}

// --- activity ------------------------------------------------------------

/// Detections by hour of day, one panel per comparison side.
pub fn activity(ctx: &Context, breakdown: ActivityBreakdown, top_n: Option<usize>) -> Result<()> {
    let dataset = ctx.store.get()?;
    let set = filter::apply(&dataset.detections, &ctx.filters);
    let top_n = ctx.top_n(top_n);

    let panels: Vec<PanelReport<Vec<HourlySeries>>> = ctx
        .comparison
        .panels(&set, &ctx.filters)
        .into_iter()
        .map(|panel| PanelReport {
            outcome: activity_by_hour(&panel.rows, breakdown, top_n),
            label: panel.label,
        })
        .collect();

    emit(ctx.mode, ResultType::Activity, &panels, |p| {
        panels_text(p, |series| {
            let mut headers = vec!["Hour".to_string()];
            headers.extend(series.iter().map(|s| s.label.clone()));
            let mut table = Table::new(headers);
            for hour in 0..24 {
                let mut row = vec![format!("{hour:02}")];
                row.extend(
                    series
                        .iter()
                        .map(|s| s.counts.get(hour).copied().unwrap_or(0).to_string()),
                );
                table.row(row);
            }
            table.to_string()
        })
    })
}

/// Month by hour detection grid.
pub fn heatmap(ctx: &Context) -> Result<()> {
    let dataset = ctx.store.get()?;
    let set = filter::apply(&dataset.detections, &ctx.filters);
    let grid = activity_heatmap(&set.active);

    emit(ctx.mode, ResultType::Heatmap, &grid, |g| {
        outcome_text(g, |heatmap| {
            let mut headers = vec!["Month".to_string()];
            headers.extend((0..24).map(|h| format!("{h:02}")));
            let mut table = Table::new(headers);
            for (month, counts) in (1..).zip(&heatmap.counts) {
                let mut row = vec![month_label(month).to_string()];
                row.extend(counts.iter().map(ToString::to_string));
                table.row(row);
            }
            format!("{table}\nPeak cell: {}\n", heatmap.max())
        })
    })
}

fn shares_table<K: ToString>(shares: &[Share<K>], bucket: &str) -> String {
    let mut table = Table::new([bucket, "Category", "Count", "Share"]);
    for s in shares {
        table.row([
            s.bucket.to_string(),
            s.category.clone(),
            s.count.to_string(),
            format!("{:.1}%", s.percent),
        ]);
    }
    table.to_string()
}

/// Hourly percentage mix of the top species, one panel per comparison side.
pub fn composition(ctx: &Context, top_n: Option<usize>) -> Result<()> {
    let dataset = ctx.store.get()?;
    let set = filter::apply(&dataset.detections, &ctx.filters);
    let top_n = ctx.top_n(top_n);

    let panels: Vec<PanelReport<Vec<Share<u32>>>> = ctx
        .comparison
        .panels(&set, &ctx.filters)
        .into_iter()
        .map(|panel| PanelReport {
            outcome: composition_by_hour(&panel.rows, top_n),
            label: panel.label,
        })
        .collect();

    emit(ctx.mode, ResultType::Composition, &panels, |p| {
        panels_text(p, |shares| shares_table(shares, "Hour"))
    })
}

/// Monthly percentage mix by status or diet.
pub fn composition_over_time_view(ctx: &Context, dimension: CompositionDimension) -> Result<()> {
    let dataset = ctx.store.get()?;
    let set = filter::apply(&dataset.detections, &ctx.filters);
    let shares = composition_over_time(&set.active, dimension);

    emit(ctx.mode, ResultType::CompositionOverTime, &shares, |s| {
        outcome_text(s, |shares| shares_table(shares, "Month"))
    })
}

// --- co-occurrence, diversity, ordination ------------------------------------

/// Co-occurrence of the most detected species (overlap coefficient).
pub fn cooccurrence_view(ctx: &Context, top_n: usize, unit: CoUnit) -> Result<()> {
    let dataset = ctx.store.get()?;
    let set = filter::apply(&dataset.detections, &ctx.filters);
    let result = cooccurrence(&set.active, top_n, unit);

    emit(ctx.mode, ResultType::Cooccurrence, &result, |r| {
        outcome_text(r, cooccurrence_text)
    })
}

fn cooccurrence_text(co: &CoOccurrence) -> String {
    let mut headers = vec!["#".to_string(), "Species".to_string(), "Units".to_string()];
    headers.extend((1..=co.species.len()).map(|i| i.to_string()));
    let mut table = Table::new(headers);
    for (i, (name, row)) in co.species.iter().zip(&co.matrix).enumerate() {
        let mut cells = vec![
            (i + 1).to_string(),
            name.clone(),
            co.presence.get(i).copied().unwrap_or(0).to_string(),
        ];
        cells.extend(row.iter().map(|v| format!("{v:.2}")));
        table.row(cells);
    }
    table.to_string()
}

/// Diversity indices by period and, optionally, per month of selected years.
#[derive(Debug, Serialize)]
pub struct DiversityReport {
    /// Indices per period.
    pub periods: Outcome<Vec<PeriodDiversity>>,
    /// Monthly indices per selected year.
    pub years: Option<Outcome<Vec<YearMonthDiversity>>>,
}

/// Richness, Shannon and Simpson indices over time.
pub fn diversity(ctx: &Context, period: DiversityPeriod, years: &[i32]) -> Result<()> {
    let dataset = ctx.store.get()?;
    let set = filter::apply(&dataset.detections, &ctx.filters);

    let report = DiversityReport {
        periods: diversity_by_period(&set.active, period),
        years: (!years.is_empty()).then(|| diversity_compare_years(&set.active, years)),
    };

    emit(ctx.mode, ResultType::Diversity, &report, |r| {
        let mut text = outcome_text(&r.periods, |rows| {
            let mut table = Table::new(["Period", "Detections", "Richness", "Shannon", "Simpson"]);
            for p in rows {
                table.row([
                    p.period.clone(),
                    p.detections.to_string(),
                    p.indices.richness.to_string(),
                    format!("{:.3}", p.indices.shannon),
                    format!("{:.3}", p.indices.simpson),
                ]);
            }
            table.to_string()
        });
        if let Some(years) = &r.years {
            text.push('\n');
            text.push_str(&outcome_text(years, |rows| {
                let mut table = Table::new(["Year", "Month", "Richness", "Shannon", "Simpson"]);
                for p in rows {
                    table.row([
                        p.year.to_string(),
                        month_label(p.month).to_string(),
                        p.indices.richness.to_string(),
                        format!("{:.3}", p.indices.shannon),
                        format!("{:.3}", p.indices.simpson),
                    ]);
                }
                table.to_string()
            }));
        }
        text
    })
}

/// NMDS ordination of species profiles.
pub fn nmds(ctx: &Context, feature: FeatureSet, min_detections: usize) -> Result<()> {
    let dataset = ctx.store.get()?;
    let set = filter::apply(&dataset.detections, &ctx.filters);
    let result = ordination(&set.active, feature, min_detections, Some(&ctx.cache));

    emit(ctx.mode, ResultType::Nmds, &result, |r| outcome_text(r, ordination_text))
}

fn ordination_text(o: &Ordination) -> String {
    let mut table = Table::new([
        "Species", "X", "Y", "Detections", "Diet", "Status", "Time", "Season",
    ]);
    for p in &o.points {
        table.row([
            p.species.clone(),
            format!("{:.3}", p.x),
            format!("{:.3}", p.y),
            p.detections.to_string(),
            p.dominant_diet.clone().unwrap_or_default(),
            p.dominant_status.clone().unwrap_or_default(),
            p.dominant_time.map(|t| t.to_string()).unwrap_or_default(),
            p.peak_season.map(|s| s.to_string()).unwrap_or_default(),
        ]);
    }
    format!(
        "Features: {}\nStress: {:.4} ({})\n\n{table}",
        o.categories.join(", "),
        o.stress,
        o.quality
    )
}

// --- dawn and weather ----------------------------------------------------

fn fetch_weather(ctx: &Context, rows: &[&crate::data::Detection]) -> Result<Option<WeatherData>> {
    let Some(request) = weather_request(rows) else {
        return Ok(None);
    };
    Ok(ctx.lookups()?.and_then(|lookups| lookups.weather(&request)))
}

/// Dawn chorus and first-detection-versus-sunrise.
#[derive(Debug, Serialize)]
pub struct DawnReport {
    /// Earliest dawn detections per day and species.
    pub chorus: Outcome<DawnChorus>,
    /// First detection of each day against sunrise, when weather was available.
    pub sunrise: Option<Outcome<SunriseComparison>>,
}

/// Earliest dawn detections per day against sunrise.
pub fn dawn(ctx: &Context, reference: TimeReference, top_n: usize) -> Result<()> {
    let dataset = ctx.store.get()?;
    let set = filter::apply(&dataset.detections, &ctx.filters);
    let tz = ctx.config.location.tz()?;
    let weather = fetch_weather(ctx, &set.active)?;

    let report = DawnReport {
        chorus: dawn_chorus(&set.active, top_n, reference, tz, weather.as_ref()),
        sunrise: weather
            .as_ref()
            .map(|w| first_detection_vs_sunrise(&set.active, reference, tz, w)),
    };

    emit(ctx.mode, ResultType::Dawn, &report, |r| {
        let mut text = outcome_text(&r.chorus, dawn_text);
        match &r.sunrise {
            Some(sunrise) => {
                text.push('\n');
                text.push_str(&outcome_text(sunrise, sunrise_text));
            }
            None => text.push_str("\nSunrise times unavailable.\n"),
        }
        text
    })
}

fn dawn_text(chorus: &DawnChorus) -> String {
    let mut per_species: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for e in &chorus.earliest {
        per_species.entry(e.species.as_str()).or_default().push(e.hour);
    }
    let mut table = Table::new(["Species", "Days", "Mean earliest", "Earliest"]);
    for name in &chorus.species {
        let hours = per_species.get(name.as_str()).map_or(&[][..], Vec::as_slice);
        table.row([
            name.clone(),
            hours.len().to_string(),
            mean(hours.iter().copied()).map_or_else(|| "-".to_string(), clock),
            hours
                .iter()
                .copied()
                .reduce(f64::min)
                .map_or_else(|| "-".to_string(), clock),
        ]);
    }
    let sunrise = mean(chorus.sunrise.iter().map(|s| s.hour))
        .map_or_else(|| "-".to_string(), clock);
    format!(
        "Dawn chorus ({} time)\n\n{table}\nMean sunrise: {sunrise} over {} day(s)\n",
        chorus.reference,
        chorus.sunrise.len()
    )
}

fn sunrise_text(comparison: &SunriseComparison) -> String {
    let mut table = Table::new(["Date", "First detection", "Sunrise", "Temp at sunrise"]);
    for p in &comparison.points {
        table.row([
            p.date.to_string(),
            clock(p.earliest_hour),
            p.sunrise_hour.map_or_else(|| "-".to_string(), clock),
            format!("{:.1}", p.sunrise_temp),
        ]);
    }
    format!(
        "{table}\n{}",
        fit_text("First detection vs temperature", comparison.trend.as_ref())
    )
}

/// Activity against daily weather.
pub fn weather(ctx: &Context, rain_threshold: f64) -> Result<()> {
    let dataset = ctx.store.get()?;
    let set = filter::apply(&dataset.detections, &ctx.filters);
    let weather = fetch_weather(ctx, &set.active)?;
    if weather.is_none() && !set.is_empty() {
        warn!("Weather data unavailable");
    }

    let report: Option<Outcome<WeatherActivity>> = weather
        .as_ref()
        .map(|w| weather_activity(&set.active, w, rain_threshold));

    emit(ctx.mode, ResultType::Weather, &report, |r| match r {
        Some(outcome) => outcome_text(outcome, weather_text),
        None if set.is_empty() => Outcome::<()>::NoData.placeholder().unwrap_or_default(),
        None => "Weather data unavailable.".to_string(),
    })
}

fn weather_text(w: &WeatherActivity) -> String {
    let mut text = format!("Days with weather: {}\n", w.days.len());
    text.push_str(&fit_text("Detections vs max temperature", w.detections_vs_temperature.as_ref()));
    text.push_str(&fit_text("Species vs max temperature", w.species_vs_temperature.as_ref()));
    text.push_str(&fit_text("Species vs max wind", w.species_vs_wind.as_ref()));

    let rain = &w.rain;
    let _ = writeln!(
        text,
        "\nRain threshold {:.1} mm: {} rainy, {} dry day(s); mean detections {} vs {}",
        rain.threshold,
        rain.rainy_days,
        rain.dry_days,
        opt(rain.avg_rainy_detections, 1),
        opt(rain.avg_dry_detections, 1)
    );

    let mut hourly: BTreeMap<u32, [f64; 2]> = BTreeMap::new();
    for h in &rain.hourly {
        let slot = usize::from(h.day_type != crate::analysis::weather::DayType::Rainy);
        if let Some(cell) = hourly.entry(h.hour).or_default().get_mut(slot) {
            *cell = h.avg_detections;
        }
    }
    if !hourly.is_empty() {
        let mut table = Table::new(["Hour", "Rainy", "Dry"]);
        for (hour, [rainy, dry]) in &hourly {
            table.row([format!("{hour:02}"), format!("{rainy:.2}"), format!("{dry:.2}")]);
        }
        let _ = write!(text, "\n{table}");
    }

    let mut table = Table::new(["Wind", "Days", "Mean detections", "Mean species"]);
    for b in &w.wind {
        table.row([
            b.label.clone(),
            b.days.to_string(),
            format!("{:.1}", b.avg_detections),
            format!("{:.1}", b.avg_species),
        ]);
    }
    let _ = write!(text, "\n{table}");

    let mut table = Table::new(["Month", "Detections", "Mean max temp", "Total rain"]);
    for m in &w.monthly {
        table.row([
            month_label(m.month).to_string(),
            m.detections.to_string(),
            opt(m.avg_temp_max, 1),
            format!("{:.1}", m.total_rain),
        ]);
    }
    let _ = write!(text, "\n{table}");
    text
}

// --- quality and records -------------------------------------------------

/// Data quality summaries.
#[derive(Debug, Serialize)]
pub struct QualityReport {
    /// Five-number confidence summaries.
    pub distribution: Outcome<Vec<ConfidenceSummary>>,
    /// Low-confidence detections of watched statuses.
    pub false_positives: Outcome<Vec<FalsePositiveCandidate>>,
    /// Most frequent species awaiting review.
    pub review_species: Outcome<Vec<SpeciesCount>>,
    /// Mean confidence of the review queue by hour.
    pub review_by_hour: Outcome<Vec<HourConfidence>>,
}

/// Confidence distribution, false-positive candidates and review queue.
pub fn quality(
    ctx: &Context,
    top_n: Option<usize>,
    fp_threshold: f64,
    fp_status: Option<&[String]>,
    review_top: usize,
) -> Result<()> {
    let dataset = ctx.store.get()?;
    let set = filter::apply(&dataset.detections, &ctx.filters);
    let statuses: BTreeSet<String> = fp_status.map_or_else(
        || FALSE_POSITIVE_DEFAULTS.iter().map(ToString::to_string).collect(),
        |values| values.iter().filter(|v| !v.trim().is_empty()).cloned().collect(),
    );

    let report = QualityReport {
        distribution: confidence_distribution(&set.active, ctx.top_n(top_n)),
        false_positives: false_positive_candidates(&set.active, fp_threshold, &statuses),
        review_species: review_top_species(&set.review, review_top),
        review_by_hour: review_confidence_by_hour(&set.review),
    };

    emit(ctx.mode, ResultType::Quality, &report, |r| {
        let mut text = String::from("Confidence by species\n");
        text.push_str(&outcome_text(&r.distribution, |rows| {
            let mut table = Table::new(["Species", "N", "Min", "Q1", "Median", "Q3", "Max"]);
            for s in rows {
                table.row([
                    s.species.clone(),
                    s.count.to_string(),
                    format!("{:.2}", s.min),
                    format!("{:.2}", s.q1),
                    format!("{:.2}", s.median),
                    format!("{:.2}", s.q3),
                    format!("{:.2}", s.max),
                ]);
            }
            table.to_string()
        }));
        text.push_str("\nFalse-positive candidates\n");
        text.push_str(&outcome_text(&r.false_positives, |rows| {
            let mut table = Table::new(["Species", "Status", "Detections", "Mean confidence"]);
            for c in rows {
                table.row([
                    c.species.clone(),
                    c.status.clone(),
                    c.count.to_string(),
                    format!("{:.DECIMAL_PLACES$}", c.mean_confidence),
                ]);
            }
            table.to_string()
        }));
        text.push_str("\nReview queue\n");
        text.push_str(&outcome_text(&r.review_species, |rows| {
            let mut table = Table::new(["Species", "Detections"]);
            for c in rows {
                table.row([c.name.clone(), c.count.to_string()]);
            }
            table.to_string()
        }));
        if let Some(hours) = r.review_by_hour.as_ready() {
            let mut table = Table::new(["Hour", "Mean confidence"]);
            for h in hours {
                table.row([
                    format!("{:02}", h.hour),
                    format!("{:.DECIMAL_PLACES$}", h.mean_confidence),
                ]);
            }
            let _ = write!(text, "\n{table}");
        }
        text
    })
}

/// Species records.
#[derive(Debug, Serialize)]
pub struct RecordsReport {
    /// Least detected species.
    pub rarest: Outcome<Vec<SpeciesRecord>>,
    /// Longest consecutive-day streaks.
    pub streaks: Outcome<Vec<SpeciesRecord>>,
    /// First detection per species and year.
    pub arrivals: Outcome<Vec<Arrival>>,
    /// Cumulative species per day of year.
    pub year_lists: Outcome<Vec<YearList>>,
}

/// Rarest species, streaks, arrivals and year lists.
pub fn records(ctx: &Context, rarest: usize) -> Result<()> {
    let dataset = ctx.store.get()?;
    let set = filter::apply(&dataset.detections, &ctx.filters);

    let report = RecordsReport {
        rarest: rarest_species(&set.active, rarest),
        streaks: streak_leaders(&set.active, rarest),
        arrivals: new_arrivals(&set.active),
        year_lists: year_lists(&set.active),
    };

    emit(ctx.mode, ResultType::Records, &report, |r| {
        let record_table = |rows: &Vec<SpeciesRecord>| {
            let mut table = Table::new([
                "Species", "Detections", "Streak", "First seen", "Last seen", "Confidence", "Status",
            ]);
            for s in rows {
                table.row([
                    s.species.clone(),
                    s.detections.to_string(),
                    s.longest_streak.to_string(),
                    s.first_seen.format("%Y-%m-%d %H:%M").to_string(),
                    s.last_seen.format("%Y-%m-%d %H:%M").to_string(),
                    format!("{:.DECIMAL_PLACES$}", s.mean_confidence),
                    s.status.clone(),
                ]);
            }
            table.to_string()
        };
        let mut text = String::from("Rarest species\n");
        text.push_str(&outcome_text(&r.rarest, record_table));
        text.push_str("\nLongest streaks\n");
        text.push_str(&outcome_text(&r.streaks, record_table));
        text.push_str("\nArrivals\n");
        text.push_str(&outcome_text(&r.arrivals, |rows| {
            let mut table = Table::new(["Year", "Species", "First seen", "New"]);
            for a in rows {
                table.row([
                    a.year.to_string(),
                    a.species.clone(),
                    a.first_seen.format("%Y-%m-%d %H:%M").to_string(),
                    if a.is_new { "yes" } else { "" }.to_string(),
                ]);
            }
            table.to_string()
        }));
        text.push_str("\nYear lists\n");
        text.push_str(&outcome_text(&r.year_lists, |rows| {
            let mut table = Table::new(["Year", "Species"]);
            for y in rows {
                table.row([y.year.to_string(), y.total.to_string()]);
            }
            table.to_string()
        }));
        text
    })
}

// --- explorer ------------------------------------------------------------

/// One species with its profile and summary.
#[derive(Debug, Serialize)]
pub struct ExploreReport {
    /// Whether the species was picked as bird of the day.
    pub bird_of_the_day: bool,
    /// Detection profile.
    pub profile: SpeciesProfile,
    /// Encyclopedia summary, when available.
    pub summary: Option<SpeciesSummary>,
    /// First sentence of the summary.
    pub fun_fact: Option<String>,
}

/// Species list, or a profile of one species (default: bird of the day).
pub fn explore(ctx: &Context, name: Option<&str>, list: bool) -> Result<()> {
    let dataset = ctx.store.get()?;
    let set = filter::apply(&dataset.detections, &ctx.filters);
    let pairs = species_pairs(&set.active);

    if list {
        return emit(ctx.mode, ResultType::Explore, &pairs, |p| pairs_text(p));
    }

    let chosen: Option<&SpeciesPair> = match name {
        Some(query) => Some(find_species(&pairs, query)?),
        None => {
            let today = Utc::now()
                .with_timezone(&ctx.config.location.tz()?)
                .date_naive();
            bird_of_the_day(today, pairs.len()).and_then(|i| pairs.get(i))
        }
    };

    let report = match chosen {
        Some(pair) => {
            let summary = ctx.lookups()?.and_then(|lookups| {
                lookups.summary(&[pair.scientific_name.as_str(), pair.common_name.as_str()])
            });
            Outcome::Ready(ExploreReport {
                bird_of_the_day: name.is_none(),
                profile: species_profile(&set.active, pair),
                fun_fact: summary.as_ref().and_then(SpeciesSummary::fun_fact),
                summary,
            })
        }
        None => Outcome::NoData,
    };

    emit(ctx.mode, ResultType::Explore, &report, |r| outcome_text(r, explore_text))
}

fn pairs_text(pairs: &[SpeciesPair]) -> String {
    let mut table = Table::new(["Common name", "Scientific name"]);
    for p in pairs {
        table.row([p.common_name.clone(), p.scientific_name.clone()]);
    }
    table.to_string()
}

fn explore_text(r: &ExploreReport) -> String {
    let p = &r.profile;
    let mut text = String::new();
    if r.bird_of_the_day {
        text.push_str("Bird of the day\n");
    }
    let _ = writeln!(text, "{} ({})", p.species.common_name, p.species.scientific_name);
    let _ = writeln!(text, "Detections: {}", p.total);
    let _ = writeln!(
        text,
        "Last seen: {}",
        p.last_seen
            .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string())
    );
    let _ = writeln!(
        text,
        "Peak hour: {}",
        p.peak_hour.map_or_else(|| "-".to_string(), |h| format!("{h:02}:00"))
    );
    let _ = writeln!(
        text,
        "Peak month: {}",
        p.peak_month.map_or("-", month_label)
    );
    let _ = writeln!(text, "Status: {}", p.status);
    let _ = writeln!(text, "Diet: {}", p.diet);
    if let Some(fact) = &r.fun_fact {
        let _ = writeln!(text, "\n{fact}");
    }
    if let Some(url) = r.summary.as_ref().and_then(|s| s.page_url.as_deref()) {
        let _ = writeln!(text, "{url}");
    }
    text
}

/// Species whose diet has not been assigned, across the whole dataset.
pub fn unclassified(ctx: &Context) -> Result<()> {
    let dataset = ctx.store.get()?;
    let pairs = unclassified_species(&dataset.detections);

    emit(ctx.mode, ResultType::Unclassified, &pairs, |p| {
        if p.is_empty() {
            "Every species has a diet category.".to_string()
        } else {
            pairs_text(p)
        }
    })
}
