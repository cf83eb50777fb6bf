//! Species explorer: species list, bird of the day, per-species profile.

use crate::analysis::mode_of;
use crate::constants::diet::UNCLASSIFIED;
use crate::data::Detection;
use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Common and scientific name of one species.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesPair {
    /// Common name.
    pub common_name: String,
    /// Scientific name.
    pub scientific_name: String,
}

impl SpeciesPair {
    fn of(d: &Detection) -> Self {
        Self {
            common_name: d.common_name.clone(),
            scientific_name: d.scientific_name.clone(),
        }
    }

    /// Whether `query` names this species (either name, case-insensitive).
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        self.common_name.eq_ignore_ascii_case(query)
            || self.scientific_name.eq_ignore_ascii_case(query)
    }
}

/// Distinct species pairs sorted by common name.
pub fn species_pairs(rows: &[&Detection]) -> Vec<SpeciesPair> {
    rows.iter()
        .filter(|d| !d.common_name.is_empty() && !d.scientific_name.is_empty())
        .map(|d| SpeciesPair::of(d))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Index of the bird of the day among `count` species.
///
/// The SHA-256 digest of the ISO date is read as a big-endian integer and
/// reduced modulo `count`, so the pick is stable for a whole day.
pub fn bird_of_the_day(date: NaiveDate, count: usize) -> Option<usize> {
    if count == 0 {
        return None;
    }
    let digest = Sha256::digest(date.format("%Y-%m-%d").to_string().as_bytes());
    let modulus = count as u128;
    let index = digest
        .iter()
        .fold(0u128, |acc, &byte| ((acc << 8) | u128::from(byte)) % modulus);
    usize::try_from(index).ok()
}

/// Find the species `query` names.
pub fn find_species<'a>(pairs: &'a [SpeciesPair], query: &str) -> Result<&'a SpeciesPair> {
    pairs
        .iter()
        .find(|p| p.matches(query))
        .ok_or_else(|| Error::SpeciesNotFound {
            name: query.to_string(),
        })
}

/// Detection summary of one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesProfile {
    /// Species.
    #[serde(flatten)]
    pub species: SpeciesPair,
    /// Detections in the filtered set.
    pub total: usize,
    /// Most recent detection.
    pub last_seen: Option<NaiveDateTime>,
    /// Hour with most detections.
    pub peak_hour: Option<u32>,
    /// Month with most detections.
    pub peak_month: Option<u32>,
    /// Most common conservation status.
    pub status: String,
    /// Most common diet category.
    pub diet: String,
}

/// Summarise the detections of `species`.
pub fn species_profile(rows: &[&Detection], species: &SpeciesPair) -> SpeciesProfile {
    let by_common: Vec<&Detection> = rows
        .iter()
        .copied()
        .filter(|d| d.common_name == species.common_name)
        .collect();
    let by_scientific = || {
        rows.iter()
            .filter(|d| d.scientific_name == species.scientific_name)
    };

    SpeciesProfile {
        species: species.clone(),
        total: by_common.len(),
        last_seen: by_common.iter().filter_map(|d| d.time).map(|t| t.timestamp).max(),
        peak_hour: mode_of(by_common.iter().filter_map(|d| d.time).map(|t| t.hour)),
        peak_month: mode_of(by_common.iter().filter_map(|d| d.time).map(|t| t.month)),
        status: mode_of(by_scientific().map(|d| d.status.as_str()))
            .unwrap_or("Unknown")
            .to_string(),
        diet: mode_of(by_scientific().map(|d| d.diet.as_str()))
            .unwrap_or(UNCLASSIFIED)
            .to_string(),
    }
}

/// Species still without a diet category, sorted by scientific name.
pub fn unclassified_species(rows: &[Detection]) -> Vec<SpeciesPair> {
    let mut pairs: Vec<SpeciesPair> = rows
        .iter()
        .filter(|d| d.diet == UNCLASSIFIED)
        .map(SpeciesPair::of)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    pairs.sort_by(|a, b| a.scientific_name.cmp(&b.scientific_name));
    pairs
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn det(common: &str, scientific: &str, date: &str, time: &str) -> Detection {
        Detection::new(scientific, common, 0.9, date, time)
    }

    fn rows() -> Vec<Detection> {
        let mut rows = vec![
            det("Robin", "Erithacus rubecula", "2024-05-01", "06:00"),
            det("Robin", "Erithacus rubecula", "2024-05-02", "06:10"),
            det("Robin", "Erithacus rubecula", "2024-06-02", "18:00"),
            det("Wren", "Troglodytes troglodytes", "2024-05-01", "07:00"),
            det("Blackbird", "Turdus merula", "2024-05-03", "05:00"),
        ];
        rows[0].status = "Resident".to_string();
        rows[1].status = "Resident".to_string();
        for robin in &mut rows[..3] {
            robin.diet = "Insectivore".to_string();
        }
        rows
    }

    #[test]
    fn test_species_pairs_sorted_and_distinct() {
        let rows = rows();
        let refs: Vec<&Detection> = rows.iter().collect();
        let names: Vec<String> = species_pairs(&refs).into_iter().map(|p| p.common_name).collect();
        assert_eq!(names, vec!["Blackbird", "Robin", "Wren"]);
    }

    #[test]
    fn test_bird_of_the_day_is_stable() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let first = bird_of_the_day(date, 7).unwrap();
        assert!(first < 7);
        assert_eq!(bird_of_the_day(date, 7), Some(first));
        assert_eq!(bird_of_the_day(date, 1), Some(0));
        assert_eq!(bird_of_the_day(date, 0), None);
    }

    #[test]
    fn test_find_species_by_either_name() {
        let rows = rows();
        let refs: Vec<&Detection> = rows.iter().collect();
        let pairs = species_pairs(&refs);
        assert_eq!(find_species(&pairs, "robin").unwrap().scientific_name, "Erithacus rubecula");
        assert_eq!(find_species(&pairs, "Turdus merula").unwrap().common_name, "Blackbird");
        assert!(matches!(
            find_species(&pairs, "Dodo"),
            Err(Error::SpeciesNotFound { .. })
        ));
    }

    #[test]
    fn test_species_profile() {
        let rows = rows();
        let refs: Vec<&Detection> = rows.iter().collect();
        let pairs = species_pairs(&refs);
        let robin = find_species(&pairs, "Robin").unwrap();
        let profile = species_profile(&refs, robin);
        assert_eq!(profile.total, 3);
        assert_eq!(profile.last_seen.unwrap().to_string(), "2024-06-02 18:00:00");
        assert_eq!(profile.peak_hour, Some(6));
        assert_eq!(profile.peak_month, Some(5));
        assert_eq!(profile.status, "Resident");
    }

    #[test]
    fn test_unclassified_species() {
        let rows = rows();
        let names: Vec<String> = unclassified_species(&rows)
            .into_iter()
            .map(|p| p.scientific_name)
            .collect();
        assert_eq!(names, vec!["Troglodytes troglodytes", "Turdus merula"]);
    }
}
