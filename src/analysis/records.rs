//! Records: streaks, first and last sightings, arrivals, year lists.

use crate::analysis::{Outcome, mean};
use crate::constants::records::YEAR_DAYS;
use crate::data::Detection;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Longest run of consecutive calendar days.
///
/// Input must be sorted ascending; duplicates are ignored.
pub fn longest_streak(dates: &[NaiveDate]) -> usize {
    let mut best = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;
    for &date in dates {
        current = match previous {
            Some(prev) if prev == date => current,
            Some(prev) if (date - prev).num_days() == 1 => current + 1,
            _ => 1,
        };
        best = best.max(current);
        previous = Some(date);
    }
    best
}

/// Sightings summary of one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    /// Species.
    pub species: String,
    /// Detections.
    pub detections: usize,
    /// First detection.
    pub first_seen: NaiveDateTime,
    /// Most recent detection.
    pub last_seen: NaiveDateTime,
    /// Longest run of consecutive days with a detection.
    pub longest_streak: usize,
    /// Mean detector confidence.
    pub mean_confidence: f64,
    /// Conservation status.
    pub status: String,
}

fn by_species<'a>(rows: &[&'a Detection]) -> BTreeMap<&'a str, Vec<&'a Detection>> {
    let mut groups: BTreeMap<&str, Vec<&Detection>> = BTreeMap::new();
    for &d in rows {
        if d.time.is_some() {
            groups.entry(d.common_name.as_str()).or_default().push(d);
        }
    }
    groups
}

/// First/last sightings and streak per species, alphabetical.
pub fn species_records(rows: &[&Detection]) -> Outcome<Vec<SpeciesRecord>> {
    let records: Vec<SpeciesRecord> = by_species(rows)
        .into_iter()
        .filter_map(|(species, group)| {
            let stamps: Vec<NaiveDateTime> = group.iter().filter_map(|d| d.time.map(|t| t.timestamp)).collect();
            let dates: BTreeSet<NaiveDate> = stamps.iter().map(NaiveDateTime::date).collect();
            let dates: Vec<NaiveDate> = dates.into_iter().collect();
            Some(SpeciesRecord {
                species: species.to_string(),
                detections: group.len(),
                first_seen: stamps.iter().min().copied()?,
                last_seen: stamps.iter().max().copied()?,
                longest_streak: longest_streak(&dates),
                mean_confidence: mean(group.iter().map(|d| d.confidence)).unwrap_or(0.0),
                status: group.first().map(|d| d.status.clone()).unwrap_or_default(),
            })
        })
        .collect();
    Outcome::unless_empty(records.is_empty(), || records)
}

/// The `n` least detected species, rarest first.
pub fn rarest_species(rows: &[&Detection], n: usize) -> Outcome<Vec<SpeciesRecord>> {
    species_records(rows).map(|mut records| {
        records.sort_by(|a, b| a.detections.cmp(&b.detections));
        records.truncate(n);
        records
    })
}

/// Species with the longest streaks, longest first.
pub fn streak_leaders(rows: &[&Detection], n: usize) -> Outcome<Vec<SpeciesRecord>> {
    species_records(rows).map(|mut records| {
        records.sort_by(|a, b| b.longest_streak.cmp(&a.longest_streak));
        records.truncate(n);
        records
    })
}

/// First detection of a species in a year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrival {
    /// Species.
    pub species: String,
    /// Calendar year.
    pub year: i32,
    /// First detection that year.
    pub first_seen: NaiveDateTime,
    /// Whether this is the species' first year ever.
    pub is_new: bool,
}

/// First sighting per (species, year), most recent first.
pub fn new_arrivals(rows: &[&Detection]) -> Outcome<Vec<Arrival>> {
    let mut first: HashMap<(&str, i32), NaiveDateTime> = HashMap::new();
    let mut earliest_year: HashMap<&str, i32> = HashMap::new();
    for d in rows {
        let Some(t) = d.time else { continue };
        let name = d.common_name.as_str();
        first
            .entry((name, t.year))
            .and_modify(|ts| *ts = (*ts).min(t.timestamp))
            .or_insert(t.timestamp);
        earliest_year
            .entry(name)
            .and_modify(|y| *y = (*y).min(t.year))
            .or_insert(t.year);
    }

    let mut arrivals: Vec<Arrival> = first
        .into_iter()
        .map(|((species, year), first_seen)| Arrival {
            species: species.to_string(),
            year,
            first_seen,
            is_new: earliest_year.get(species) == Some(&year),
        })
        .collect();
    arrivals.sort_by(|a, b| {
        b.first_seen
            .cmp(&a.first_seen)
            .then_with(|| a.species.cmp(&b.species))
    });
    Outcome::unless_empty(arrivals.is_empty(), || arrivals)
}

/// Cumulative species count through one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearList {
    /// Calendar year.
    pub year: i32,
    /// Distinct species seen by day-of-year `d` at index `d - 1` (366 slots).
    pub cumulative: Vec<usize>,
    /// Species seen during the year.
    pub total: usize,
}

/// Year list progress for every year present.
pub fn year_lists(rows: &[&Detection]) -> Outcome<Vec<YearList>> {
    let mut first_day: BTreeMap<i32, HashMap<&str, u32>> = BTreeMap::new();
    for d in rows {
        let Some(t) = d.time else { continue };
        first_day
            .entry(t.year)
            .or_default()
            .entry(d.scientific_name.as_str())
            .and_modify(|day| *day = (*day).min(t.day_of_year))
            .or_insert(t.day_of_year);
    }

    let lists: Vec<YearList> = first_day
        .into_iter()
        .map(|(year, species)| {
            let mut new_per_day = vec![0usize; YEAR_DAYS as usize];
            for &day in species.values() {
                if let Some(slot) = new_per_day.get_mut(day as usize - 1) {
                    *slot += 1;
                }
            }
            let cumulative: Vec<usize> = new_per_day
                .iter()
                .scan(0, |acc, &n| {
                    *acc += n;
                    Some(*acc)
                })
                .collect();
            YearList {
                year,
                total: species.len(),
                cumulative,
            }
        })
        .collect();
    Outcome::unless_empty(lists.is_empty(), || lists)
}
