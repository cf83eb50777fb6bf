//! Pairwise species co-occurrence.

use crate::analysis::Outcome;
use crate::analysis::frequency::top_species_names;
use crate::data::Detection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Sampling unit for presence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CoUnit {
    /// Calendar day.
    #[default]
    Day,
    /// Hour of a calendar day.
    Hour,
}

/// Species x species co-occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoOccurrence {
    /// Species in matrix order (most frequent first).
    pub species: Vec<String>,
    /// Units (days or hours) each species was present in.
    pub presence: Vec<usize>,
    /// Joint presence over the smaller individual presence; zero diagonal.
    pub matrix: Vec<Vec<f64>>,
}

/// Co-occurrence of the `top_n` most frequent species.
///
/// Entry `(i, j)` is the number of units where both species were present,
/// divided by the smaller of their individual presence counts.
#[allow(clippy::cast_precision_loss)]
pub fn cooccurrence(rows: &[&Detection], top_n: usize, unit: CoUnit) -> Outcome<CoOccurrence> {
    let timed: Vec<&Detection> = rows.iter().copied().filter(|d| d.time.is_some()).collect();
    if timed.is_empty() {
        return Outcome::NoData;
    }

    let species = top_species_names(&timed, top_n);
    if species.len() < 2 {
        return Outcome::Insufficient {
            available: species.len(),
            required: 2,
        };
    }
    let index: BTreeMap<&str, usize> = species
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_str(), i))
        .collect();

    let mut units: BTreeMap<(chrono::NaiveDate, Option<u32>), BTreeSet<usize>> = BTreeMap::new();
    for d in &timed {
        let (Some(t), Some(&i)) = (d.time.as_ref(), index.get(d.common_name.as_str())) else {
            continue;
        };
        let hour = (unit == CoUnit::Hour).then_some(t.hour);
        units.entry((t.date(), hour)).or_default().insert(i);
    }

    let n = species.len();
    let mut presence = vec![0usize; n];
    let mut joint = vec![vec![0usize; n]; n];
    for present in units.values() {
        for &i in present {
            presence[i] += 1;
            for &j in present {
                joint[i][j] += 1;
            }
        }
    }

    let matrix = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j {
                        return 0.0;
                    }
                    let denom = presence[i].min(presence[j]).max(1);
                    joint[i][j] as f64 / denom as f64
                })
                .collect()
        })
        .collect();

    Outcome::Ready(CoOccurrence {
        species,
        presence,
        matrix,
    })
}
