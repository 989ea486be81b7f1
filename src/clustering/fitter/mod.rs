
use std::collections::HashSet;

use tracing::info;

use crate::clustering::kmeans::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_ITER, DEFAULT_N_INIT, DEFAULT_SEED, MiniBatchKMeans,
};
use crate::{IntentError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Centroid {
    pub cluster_id: usize,
    pub vector: Vec<f32>,
}

/// Labels and centroids of the full-dataset fit.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterFit {
    pub k: usize,
    pub labels: Vec<usize>,
    pub centroids: Vec<Centroid>,
    pub inertia: f32,
}

impl ClusterFit {
    /// Indices of the points labelled `cluster_id`, in ascending order.
    #[inline]
    pub fn members(&self, cluster_id: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|&(_, &label)| label == cluster_id)
            .map(|(i, _)| i)
            .collect()
    }

    #[inline]
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Fitting parameters shared with the k sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitParams {
    pub batch_size: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub seed: u64,
}

impl Default for FitParams {
    #[inline]
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            n_init: DEFAULT_N_INIT,
            max_iter: DEFAULT_MAX_ITER,
            seed: DEFAULT_SEED,
        }
    }
}

/// Fit `k` clusters over the whole dataset.
///
/// Fails with a configuration error when `k` is zero or not smaller than the number
/// of distinct vectors.
#[inline]
pub fn fit_clusters(vectors: &[Vec<f32>], k: usize, params: FitParams) -> Result<ClusterFit> {
    let distinct = count_distinct(vectors);
    if k == 0 || k >= distinct {
        return Err(IntentError::Configuration(format!(
            "k={k} must be between 1 and the number of distinct records ({distinct}) exclusive"
        )));
    }

    info!("Fitting k={} over {} records", k, vectors.len());

    let fit = MiniBatchKMeans::new(k)
        .with_batch_size(params.batch_size)
        .with_n_init(params.n_init)
        .with_max_iter(params.max_iter)
        .with_seed(params.seed)
        .fit(vectors)?;

    let centroids = fit
        .centroids
        .into_iter()
        .enumerate()
        .map(|(cluster_id, vector)| Centroid { cluster_id, vector })
        .collect();

    Ok(ClusterFit {
        k,
        labels: fit.labels,
        centroids,
        inertia: fit.inertia,
    })
}

fn count_distinct(vectors: &[Vec<f32>]) -> usize {
    vectors
        .iter()
        .map(|v| v.iter().map(|x| x.to_bits()).collect::<Vec<u32>>())
        .collect::<HashSet<_>>()
        .len()
}
