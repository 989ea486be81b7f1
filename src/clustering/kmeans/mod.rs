//! Mini-batch k-means.
//!
//! Each iteration draws a batch of points (or the whole dataset when it is smaller
//! than the batch), assigns them to their nearest center and moves every center
//! towards its points with a per-center learning rate of `1 / count`. Centers are
//! seeded with k-means++ and the whole procedure is repeated `n_init` times, keeping
//! the run with the lowest inertia.
//!
//! The reported centroids are the arithmetic means of the final members, so they
//! are generally not unit length even when the input rows are.

#[cfg(test)]
mod tests;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::embeddings::vector::squared_distance;
use crate::{IntentError, Result};

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_N_INIT: usize = 10;
pub const DEFAULT_MAX_ITER: usize = 100;
const DEFAULT_TOLERANCE: f32 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct MiniBatchKMeans {
    k: usize,
    batch_size: usize,
    n_init: usize,
    max_iter: usize,
    tol: f32,
    seed: u64,
}

/// Result of one fit: labels are dense in `0..k`.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f32>>,
    pub inertia: f32,
}

impl MiniBatchKMeans {
    #[inline]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            batch_size: DEFAULT_BATCH_SIZE,
            n_init: DEFAULT_N_INIT,
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOLERANCE,
            seed: DEFAULT_SEED,
        }
    }

    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[inline]
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    #[inline]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    #[inline]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline]
    pub fn fit(&self, data: &[Vec<f32>]) -> Result<KMeansFit> {
        let n = data.len();
        if n == 0 {
            return Err(IntentError::Configuration(
                "cannot cluster an empty dataset".to_string(),
            ));
        }
        if self.k == 0 || self.k > n {
            return Err(IntentError::Configuration(format!(
                "cannot create {} clusters from {} points",
                self.k, n
            )));
        }

        let dim = data[0].len();
        if let Some(bad) = data.iter().position(|row| row.len() != dim) {
            return Err(IntentError::Numerical(format!(
                "row {} has dimension {}, expected {}",
                bad,
                data[bad].len(),
                dim
            )));
        }
        if data.iter().flatten().any(|x| !x.is_finite()) {
            return Err(IntentError::Numerical(
                "input contains non-finite values".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<(Vec<Vec<f32>>, f32)> = None;

        for init in 0..self.n_init {
            let centers = self.run_once(data, &mut rng);
            let (_, inertia) = assign_all(data, &centers);
            debug!("k={} init {}: inertia {:.4}", self.k, init, inertia);

            if best.as_ref().is_none_or(|(_, best_inertia)| inertia < *best_inertia) {
                best = Some((centers, inertia));
            }
        }

        let Some((centers, _)) = best else {
            return Err(IntentError::Numerical("k-means produced no run".to_string()));
        };

        let (labels, _) = assign_all(data, &centers);
        let centroids = member_means(data, &labels, &centers);
        let inertia = labels
            .iter()
            .zip(data.iter())
            .map(|(&label, row)| squared_distance(row, &centroids[label]))
            .sum();

        Ok(KMeansFit {
            labels,
            centroids,
            inertia,
        })
    }

    fn run_once(&self, data: &[Vec<f32>], rng: &mut StdRng) -> Vec<Vec<f32>> {
        let n = data.len();
        let mut centers = kmeans_plus_plus(data, self.k, rng);
        let mut counts = vec![0_usize; self.k];

        for iter in 0..self.max_iter {
            let batch: Vec<usize> = if self.batch_size >= n {
                (0..n).collect()
            } else {
                index::sample(rng, n, self.batch_size).into_vec()
            };

            let previous = centers.clone();
            for &i in &batch {
                let cluster = nearest_center(&data[i], &centers).0;
                counts[cluster] += 1;
                let eta = 1.0 / counts[cluster] as f32;
                for (c, &x) in centers[cluster].iter_mut().zip(data[i].iter()) {
                    *c += eta * (x - *c);
                }
            }

            let shift: f32 = previous
                .iter()
                .zip(centers.iter())
                .map(|(a, b)| squared_distance(a, b))
                .sum();
            if shift < self.tol {
                debug!("Converged after {} iterations", iter + 1);
                break;
            }
        }

        centers
    }
}

/// k-means++ seeding: the first center is uniform, later ones are drawn with
/// probability proportional to the squared distance to the nearest chosen center.
fn kmeans_plus_plus(data: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let n = data.len();
    let mut centers = Vec::with_capacity(k);
    centers.push(data[rng.gen_range(0..n)].clone());

    let mut distances: Vec<f64> = data
        .iter()
        .map(|row| f64::from(squared_distance(row, &centers[0])))
        .collect();

    while centers.len() < k {
        let total: f64 = distances.iter().sum();
        let selected = if total > 0.0 {
            let threshold = rng.r#gen::<f64>() * total;
            let mut cumulative = 0.0;
            distances
                .iter()
                .position(|&d| {
                    cumulative += d;
                    cumulative >= threshold && d > 0.0
                })
                .unwrap_or(n - 1)
        } else {
            rng.gen_range(0..n)
        };

        let center = data[selected].clone();
        for (d, row) in distances.iter_mut().zip(data.iter()) {
            *d = d.min(f64::from(squared_distance(row, &center)));
        }
        centers.push(center);
    }

    centers
}

/// Nearest center and its squared distance. Ties go to the lowest center index.
#[inline]
pub fn nearest_center(point: &[f32], centers: &[Vec<f32>]) -> (usize, f32) {
    let mut best = (0, f32::MAX);
    for (i, center) in centers.iter().enumerate() {
        let dist = squared_distance(point, center);
        if dist < best.1 {
            best = (i, dist);
        }
    }
    best
}

fn assign_all(data: &[Vec<f32>], centers: &[Vec<f32>]) -> (Vec<usize>, f32) {
    let mut inertia = 0.0;
    let labels = data
        .iter()
        .map(|row| {
            let (label, dist) = nearest_center(row, centers);
            inertia += dist;
            label
        })
        .collect();
    (labels, inertia)
}

/// Arithmetic mean of each cluster's members; clusters without members keep their center.
fn member_means(data: &[Vec<f32>], labels: &[usize], centers: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let dim = centers.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0_f64; dim]; centers.len()];
    let mut counts = vec![0_usize; centers.len()];

    for (row, &label) in data.iter().zip(labels.iter()) {
        counts[label] += 1;
        for (acc, &x) in sums[label].iter_mut().zip(row.iter()) {
            *acc += f64::from(x);
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(centers.iter())
        .map(|((sum, count), center)| {
            if count == 0 {
                center.clone()
            } else {
                sum.into_iter().map(|s| (s / count as f64) as f32).collect()
            }
        })
        .collect()
}
