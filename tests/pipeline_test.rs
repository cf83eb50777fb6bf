//! Library-level properties of the load, filter and aggregate pipeline.

use birdash::analysis::composition::{CompositionDimension, composition_over_time};
use birdash::analysis::frequency::kpis;
use birdash::data::{Dataset, Detection, DietMap, ReferenceRow, ReferenceTable, Season};
use birdash::filter::{self, DateRange, FilterState, YearSelection};
use chrono::NaiveDate;
use std::collections::BTreeMap;

fn garden() -> Dataset {
    let rows = vec![
        Detection::new("Erithacus rubecula", "European Robin", 0.9, "2024-03-14", "05:40:00"),
        Detection::new("Erithacus rubecula", "European Robin", 0.6, "2024-07-02", "21:15:00"),
        Detection::new("Erithacus rubecula", "European Robin", 0.95, "2023-12-24", "08:00:00"),
        Detection::new("Turdus merula", "Eurasian Blackbird", 0.7, "2024-03-15", "06:10:00"),
        Detection::new("Turdus merula", "Eurasian Blackbird", 0.4, "not a date", "??"),
        Detection::new("Parus major", "Great Tit", 0.8, "2024-04-01", "09:30:00"),
        Detection::new("Apus apus", "Common Swift", 0.3, "2024-06-20", "14:00:00"),
    ];
    let reference = ReferenceTable::from_rows(vec![
        ReferenceRow {
            common_name: "European Robin".to_string(),
            latin_name: "Erithacus rubecula".to_string(),
            status: "Resident".to_string(),
        },
        ReferenceRow {
            common_name: "Eurasian Blackbird".to_string(),
            latin_name: "Turdus merula".to_string(),
            status: "Resident".to_string(),
        },
        ReferenceRow {
            common_name: "Common Swift".to_string(),
            latin_name: "Apus apus".to_string(),
            status: "False Positive".to_string(),
        },
    ]);
    let diets: DietMap = BTreeMap::from([
        ("Erithacus rubecula".to_string(), "Insectivore".to_string()),
        ("Turdus merula".to_string(), "Omnivore".to_string()),
    ]);
    Dataset::from_parts(rows, reference, diets)
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn test_enrichment_assigns_sentinels() {
    let dataset = garden();
    let tit = dataset
        .detections
        .iter()
        .find(|d| d.scientific_name == "Parus major")
        .unwrap();
    assert_eq!(tit.status, "Review Recording");
    assert_eq!(tit.diet, "Unclassified");
}

#[test]
fn test_review_exclusion_drops_review_and_false_positive() {
    let dataset = garden();
    let set = filter::apply(&dataset.detections, &FilterState::default());
    assert!(set.active.iter().all(|d| d.status == "Resident"));
    assert_eq!(set.active.len(), 5);
    assert_eq!(set.review.len(), 1);
}

#[test]
fn test_filtering_is_idempotent() {
    let dataset = garden();
    let state = FilterState {
        min_confidence: 0.5,
        season: Some(Season::Spring),
        ..FilterState::default()
    };
    let once: Vec<Detection> = filter::apply(&dataset.detections, &state)
        .active
        .into_iter()
        .cloned()
        .collect();
    let twice = filter::apply(&once, &state).active;
    assert_eq!(once.len(), twice.len());
}

#[test]
fn test_raising_the_floor_never_adds_rows() {
    let dataset = garden();
    let mut previous = usize::MAX;
    for floor in [0.0, 0.3, 0.5, 0.7, 0.9, 1.0] {
        let state = FilterState {
            min_confidence: floor,
            ..FilterState::permissive()
        };
        let count = filter::apply(&dataset.detections, &state).active.len();
        assert!(count <= previous, "floor {floor} grew the set");
        previous = count;
    }
}

#[test]
fn test_untimed_rows_survive_without_time_filters() {
    let dataset = garden();
    let set = filter::apply(&dataset.detections, &FilterState::permissive());
    assert_eq!(set.active.len(), 7);

    let state = FilterState {
        years: YearSelection::from_years([2024]),
        ..FilterState::permissive()
    };
    let set = filter::apply(&dataset.detections, &state);
    assert!(set.active.iter().all(|d| d.time.is_some()));
    assert_eq!(set.active.len(), 5);
}

#[test]
fn test_single_day_range() {
    let dataset = garden();
    let state = FilterState {
        date_range: DateRange::from_selection(&[date("2024-03-14")]).unwrap(),
        ..FilterState::permissive()
    };
    let set = filter::apply(&dataset.detections, &state);
    assert_eq!(set.active.len(), 1);
    assert_eq!(set.active[0].common_name, "European Robin");
}

#[test]
fn test_kpis_and_shares() {
    let dataset = garden();
    let set = filter::apply(&dataset.detections, &FilterState::default());
    let k = kpis(&set.active);
    assert_eq!(k.total_detections, 5);
    assert_eq!(k.unique_species, 2);

    let shares = composition_over_time(&set.active, CompositionDimension::Diet)
        .ready()
        .unwrap();
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for s in &shares {
        *totals.entry(s.bucket.clone()).or_default() += s.percent;
    }
    for (bucket, total) in totals {
        assert!((total - 100.0).abs() < 1e-9, "{bucket} sums to {total}");
    }
}
