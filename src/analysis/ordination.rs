//! Species ordination: Bray-Curtis dissimilarity and non-metric MDS.
//!
//! Each qualifying species gets a profile over a category set (diet,
//! status, time-of-day bucket or season). Profiles are compared with
//! Bray-Curtis dissimilarity and embedded in two dimensions with SMACOF
//! using monotone (isotonic) regression of the disparities.

use crate::analysis::{Outcome, mode_of};
use crate::cache::TtlCache;
use crate::constants::nmds;
use crate::data::{Detection, Season, TimeBucket};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Category set used to build species profiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    /// Diet category.
    Diet,
    /// Conservation status.
    Status,
    /// Time-of-day bucket.
    #[default]
    TimeOfDay,
    /// Season.
    Season,
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diet => write!(f, "diet"),
            Self::Status => write!(f, "status"),
            Self::TimeOfDay => write!(f, "time_of_day"),
            Self::Season => write!(f, "season"),
        }
    }
}

/// Species x category proportions; each row sums to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    /// Species (row labels).
    pub species: Vec<String>,
    /// Categories (column labels).
    pub categories: Vec<String>,
    /// Row-normalised proportions.
    pub values: Vec<Vec<f64>>,
    /// Detections behind each row.
    pub detections: Vec<usize>,
}

impl FeatureMatrix {
    /// Stable digest of the matrix, used as a memo key.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for name in self.species.iter().chain(&self.categories) {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
        }
        for value in self.values.iter().flatten() {
            hasher.update(value.to_le_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

fn category_of(d: &Detection, feature: FeatureSet) -> Option<String> {
    match feature {
        FeatureSet::Diet => Some(d.diet.clone()),
        FeatureSet::Status => Some(d.status.clone()),
        FeatureSet::TimeOfDay => d.time.map(|t| TimeBucket::from_hour(t.hour).to_string()),
        FeatureSet::Season => d.time.map(|t| t.season.to_string()),
    }
}

/// Build the normalised profile matrix of species with at least
/// `min_detections` categorised detections.
#[allow(clippy::cast_precision_loss)]
pub fn feature_matrix(rows: &[&Detection], feature: FeatureSet, min_detections: usize) -> FeatureMatrix {
    let mut counts: BTreeMap<&str, BTreeMap<String, usize>> = BTreeMap::new();
    for d in rows {
        if let Some(category) = category_of(d, feature) {
            *counts
                .entry(d.common_name.as_str())
                .or_default()
                .entry(category)
                .or_default() += 1;
        }
    }
    counts.retain(|_, c| c.values().sum::<usize>() >= min_detections.max(1));

    let categories: Vec<String> = counts
        .values()
        .flat_map(|c| c.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut species = Vec::with_capacity(counts.len());
    let mut values = Vec::with_capacity(counts.len());
    let mut detections = Vec::with_capacity(counts.len());
    for (name, per_category) in counts {
        let total: usize = per_category.values().sum();
        let denom = if total == 0 { 1.0 } else { total as f64 };
        values.push(
            categories
                .iter()
                .map(|c| per_category.get(c).copied().unwrap_or(0) as f64 / denom)
                .collect(),
        );
        species.push(name.to_string());
        detections.push(total);
    }

    FeatureMatrix {
        species,
        categories,
        values,
        detections,
    }
}

/// Bray-Curtis dissimilarity `sum|a-b| / sum(a+b)`; 0 when both are empty.
pub fn bray_curtis(a: &[f64], b: &[f64]) -> f64 {
    let (diff, sum) = a
        .iter()
        .zip(b)
        .fold((0.0, 0.0), |(diff, sum), (x, y)| (diff + (x - y).abs(), sum + x + y));
    if sum <= 0.0 { 0.0 } else { diff / sum }
}

/// Symmetric pairwise Bray-Curtis matrix with a zero diagonal.
pub fn dissimilarity_matrix(values: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = values.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let dij = bray_curtis(&values[i], &values[j]);
            matrix[i][j] = dij;
            matrix[j][i] = dij;
        }
    }
    matrix
}

/// SMACOF parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NmdsParams {
    /// Random restarts; the lowest-stress run wins.
    pub n_init: usize,
    /// Iteration cap per restart.
    pub max_iter: usize,
    /// Convergence tolerance.
    pub eps: f64,
    /// Seed for the restart configurations.
    pub seed: u64,
}

impl Default for NmdsParams {
    fn default() -> Self {
        Self {
            n_init: nmds::N_INIT,
            max_iter: nmds::MAX_ITER,
            eps: nmds::EPS,
            seed: nmds::SEED,
        }
    }
}

/// Two-dimensional embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// One `[x, y]` per input item.
    pub coords: Vec<[f64; 2]>,
    /// Kruskal stress-1, in `[0, 1]`.
    pub stress: f64,
}

/// Pool-adjacent-violators: least-squares non-decreasing fit.
#[allow(clippy::cast_precision_loss)]
fn isotonic(values: &[f64]) -> Vec<f64> {
    let mut blocks: Vec<(f64, usize)> = Vec::with_capacity(values.len());
    for &v in values {
        blocks.push((v, 1));
        while blocks.len() >= 2 {
            let (s2, c2) = blocks[blocks.len() - 1];
            let (s1, c1) = blocks[blocks.len() - 2];
            if s1 / c1 as f64 <= s2 / c2 as f64 {
                break;
            }
            blocks.pop();
            if let Some(last) = blocks.last_mut() {
                *last = (s1 + s2, c1 + c2);
            }
        }
    }
    blocks
        .into_iter()
        .flat_map(|(sum, count)| std::iter::repeat_n(sum / count as f64, count))
        .collect()
}

fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

/// Kruskal stress-1 of a configuration against the dissimilarity order.
fn stress1(coords: &[[f64; 2]], pairs: &[(usize, usize)]) -> f64 {
    let dist: Vec<f64> = pairs.iter().map(|&(i, j)| distance(coords[i], coords[j])).collect();
    let fitted = isotonic(&dist);
    let num: f64 = dist.iter().zip(&fitted).map(|(d, f)| (d - f).powi(2)).sum();
    let den: f64 = dist.iter().map(|d| d * d).sum();
    if den <= 0.0 { 0.0 } else { (num / den).sqrt().min(1.0) }
}

/// One SMACOF run from `init`.
#[allow(clippy::cast_precision_loss)]
fn smacof(pairs: &[(usize, usize)], n: usize, init: Vec<[f64; 2]>, params: &NmdsParams) -> Vec<[f64; 2]> {
    let mut coords = init;
    let target = (n * (n - 1)) as f64 / 2.0;
    let mut old_stress: Option<f64> = None;

    for iteration in 0..params.max_iter {
        let dist: Vec<f64> = pairs.iter().map(|&(i, j)| distance(coords[i], coords[j])).collect();

        let mut fitted = isotonic(&dist);
        let sum_sq: f64 = fitted.iter().map(|f| f * f).sum();
        if sum_sq > 0.0 {
            let scale = (target / sum_sq).sqrt();
            fitted.iter_mut().for_each(|f| *f *= scale);
        }

        let stress: f64 = dist.iter().zip(&fitted).map(|(d, f)| (d - f).powi(2)).sum();

        // Guttman transform
        let mut b = vec![vec![0.0; n]; n];
        for (k, &(i, j)) in pairs.iter().enumerate() {
            let ratio = if dist[k] > 0.0 { fitted[k] / dist[k] } else { 0.0 };
            b[i][j] = -ratio;
            b[j][i] = -ratio;
            b[i][i] += ratio;
            b[j][j] += ratio;
        }
        coords = (0..n)
            .map(|i| {
                let mut point = [0.0; 2];
                for (j, c) in coords.iter().enumerate() {
                    point[0] += b[i][j] * c[0];
                    point[1] += b[i][j] * c[1];
                }
                [point[0] / n as f64, point[1] / n as f64]
            })
            .collect();

        let spread: f64 = coords.iter().map(|c| c[0].hypot(c[1])).sum();
        if spread <= 0.0 {
            break;
        }
        let normalised = stress / spread;
        if let Some(old) = old_stress
            && old - normalised < params.eps
        {
            debug!("SMACOF converged after {} iterations", iteration + 1);
            break;
        }
        old_stress = Some(normalised);
    }

    coords
}

/// Non-metric MDS into two dimensions.
///
/// `dissimilarities` must be square and symmetric. Pairs are ranked by
/// dissimilarity with a stable sort, so tied dissimilarities keep pair order.
pub fn nmds(dissimilarities: &[Vec<f64>], params: &NmdsParams) -> Embedding {
    let n = dissimilarities.len();
    if n < 2 {
        return Embedding {
            coords: vec![[0.0, 0.0]; n],
            stress: 0.0,
        };
    }

    let mut pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect();
    pairs.sort_by(|a, b| {
        dissimilarities[a.0][a.1].total_cmp(&dissimilarities[b.0][b.1])
    });

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<Embedding> = None;
    for _ in 0..params.n_init.max(1) {
        let init: Vec<[f64; 2]> = (0..n).map(|_| [rng.r#gen::<f64>(), rng.r#gen::<f64>()]).collect();
        let coords = smacof(&pairs, n, init, params);
        let stress = stress1(&coords, &pairs);
        if best.as_ref().is_none_or(|b| stress < b.stress) {
            best = Some(Embedding { coords, stress });
        }
    }

    best.unwrap_or(Embedding {
        coords: vec![[0.0, 0.0]; n],
        stress: 0.0,
    })
}

/// Stress quality band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StressQuality {
    /// Stress below 0.05.
    Excellent,
    /// Stress below 0.10.
    Good,
    /// Stress below 0.20.
    Fair,
    /// Anything else.
    Poor,
}

impl StressQuality {
    /// Band a stress value.
    pub fn from_stress(stress: f64) -> Self {
        if stress < nmds::EXCELLENT {
            Self::Excellent
        } else if stress < nmds::GOOD {
            Self::Good
        } else if stress < nmds::FAIR {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

impl fmt::Display for StressQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excellent => write!(f, "Excellent"),
            Self::Good => write!(f, "Good"),
            Self::Fair => write!(f, "Fair"),
            Self::Poor => write!(f, "Poor"),
        }
    }
}

/// One species placed in the ordination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdinationPoint {
    /// Species.
    pub species: String,
    /// First axis.
    pub x: f64,
    /// Second axis.
    pub y: f64,
    /// Detections of the species in the filtered set.
    pub detections: usize,
    /// Most common diet.
    pub dominant_diet: Option<String>,
    /// Most common status.
    pub dominant_status: Option<String>,
    /// Most common time-of-day bucket.
    pub dominant_time: Option<TimeBucket>,
    /// Season with the most detections.
    pub peak_season: Option<Season>,
}

/// Ordination result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ordination {
    /// Category set the profiles were built from.
    pub feature: FeatureSet,
    /// Profile categories.
    pub categories: Vec<String>,
    /// Placed species.
    pub points: Vec<OrdinationPoint>,
    /// Kruskal stress-1.
    pub stress: f64,
    /// Stress band.
    pub quality: StressQuality,
}

const MEMO_FUNCTION: &str = "nmds";

/// Ordinate species with at least `min_detections` detections.
///
/// Fewer than five qualifying species is reported as insufficient and no
/// scaling is attempted. With a memo, embeddings are reused per matrix digest.
pub fn ordination(
    rows: &[&Detection],
    feature: FeatureSet,
    min_detections: usize,
    memo: Option<&TtlCache>,
) -> Outcome<Ordination> {
    if rows.is_empty() {
        return Outcome::NoData;
    }

    let matrix = feature_matrix(rows, feature, min_detections);
    if matrix.species.len() < nmds::MIN_SPECIES {
        return Outcome::Insufficient {
            available: matrix.species.len(),
            required: nmds::MIN_SPECIES,
        };
    }

    let compute = || nmds(&dissimilarity_matrix(&matrix.values), &NmdsParams::default());
    let embedding = match memo {
        Some(cache) => cache.get_or_insert_with(MEMO_FUNCTION, &matrix.digest(), None, compute),
        None => compute(),
    };

    let points = matrix
        .species
        .iter()
        .zip(&embedding.coords)
        .map(|(name, coord)| {
            let own: Vec<&Detection> = rows
                .iter()
                .copied()
                .filter(|d| &d.common_name == name)
                .collect();
            OrdinationPoint {
                species: name.clone(),
                x: coord[0],
                y: coord[1],
                detections: own.len(),
                dominant_diet: mode_of(own.iter().map(|d| d.diet.clone())),
                dominant_status: mode_of(own.iter().map(|d| d.status.clone())),
                dominant_time: mode_of(
                    own.iter()
                        .filter_map(|d| d.time.map(|t| TimeBucket::from_hour(t.hour))),
                ),
                peak_season: mode_of(own.iter().filter_map(|d| d.time.map(|t| t.season))),
            }
        })
        .collect();

    Outcome::Ready(Ordination {
        feature,
        categories: matrix.categories,
        points,
        stress: embedding.stress,
        quality: StressQuality::from_stress(embedding.stress),
    })
}
