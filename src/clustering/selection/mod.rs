//! Choosing the number of clusters.
//!
//! Every candidate k is fitted on a bounded sample and scored by inertia and by
//! the cosine silhouette. The choice deliberately favors a usable cluster count
//! over the statistically best one: k = 2 is never chosen, only candidates at or
//! above the median silhouette survive, and among those a k in [5, 15] wins when
//! available.


use std::ops::Range;

use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clustering::kmeans::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_ITER, DEFAULT_N_INIT, DEFAULT_SEED, MiniBatchKMeans,
};
use crate::clustering::silhouette::cosine_silhouette_score;
use crate::{IntentError, Result};

pub const DEFAULT_SAMPLE_SIZE: usize = 10_000;
pub const DEFAULT_SILHOUETTE_SAMPLE_SIZE: usize = 5_000;
pub const FALLBACK_K: usize = 10;
pub const MIN_K: usize = 3;
pub const PREFERRED_K: std::ops::RangeInclusive<usize> = 5..=15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KSelection {
    pub k_values: Vec<usize>,
    pub inertias: Vec<f32>,
    pub silhouette_scores: Vec<f32>,
    pub best_k: usize,
    #[serde(default)]
    pub inertia_rates: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KSelector {
    k_range: Range<usize>,
    sample_size: usize,
    silhouette_sample_size: usize,
    batch_size: usize,
    n_init: usize,
    max_iter: usize,
    seed: u64,
}

impl KSelector {
    #[inline]
    pub fn new(k_range: Range<usize>) -> Self {
        Self {
            k_range,
            sample_size: DEFAULT_SAMPLE_SIZE,
            silhouette_sample_size: DEFAULT_SILHOUETTE_SAMPLE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            n_init: DEFAULT_N_INIT,
            max_iter: DEFAULT_MAX_ITER,
            seed: DEFAULT_SEED,
        }
    }

    #[inline]
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size.max(1);
        self
    }

    #[inline]
    pub fn with_silhouette_sample_size(mut self, size: usize) -> Self {
        self.silhouette_sample_size = size.max(2);
        self
    }

    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[inline]
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    #[inline]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    #[inline]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sweep the candidate range and apply the selection policy.
    #[inline]
    pub fn select(&self, vectors: &[Vec<f32>]) -> Result<KSelection> {
        let k_values: Vec<usize> = self.k_range.clone().collect();
        if k_values.is_empty() {
            return Err(IntentError::Configuration(format!(
                "empty candidate range {}..{}",
                self.k_range.start, self.k_range.end
            )));
        }
        if k_values[0] < 2 {
            return Err(IntentError::Configuration(
                "candidate k values must be at least 2".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let sample = subsample(vectors, self.sample_size, &mut rng);
        if sample.len() < 2 {
            return Err(IntentError::Configuration(format!(
                "need at least 2 points to select k, got {}",
                sample.len()
            )));
        }
        if sample.len() < vectors.len() {
            info!(
                "Selecting k on a sample of {} out of {} points",
                sample.len(),
                vectors.len()
            );
        }

        let max_k = k_values[k_values.len() - 1];
        if max_k >= sample.len() {
            return Err(IntentError::Configuration(format!(
                "candidate k={} needs more than {} sampled points",
                max_k,
                sample.len()
            )));
        }

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(k_values.len() as u64).with_style(
                ProgressStyle::with_template("{bar:30} [{pos}/{len}] testing {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut inertias = Vec::with_capacity(k_values.len());
        let mut silhouette_scores = Vec::with_capacity(k_values.len());

        for &k in &k_values {
            bar.set_message(format!("k={k}"));

            let fit = MiniBatchKMeans::new(k)
                .with_batch_size(self.batch_size)
                .with_n_init(self.n_init)
                .with_max_iter(self.max_iter)
                .with_seed(self.seed)
                .fit(&sample)?;

            let silhouette = if sample.len() > self.silhouette_sample_size {
                let picked = index::sample(&mut rng, sample.len(), self.silhouette_sample_size);
                let vectors: Vec<Vec<f32>> = picked.iter().map(|i| sample[i].clone()).collect();
                let labels: Vec<usize> = picked.iter().map(|i| fit.labels[i]).collect();
                cosine_silhouette_score(&vectors, &labels)?
            } else {
                cosine_silhouette_score(&sample, &fit.labels)?
            };

            debug!(
                "k={}: inertia={:.2}, silhouette={:.4}",
                k, fit.inertia, silhouette
            );
            inertias.push(fit.inertia);
            silhouette_scores.push(silhouette);
            bar.inc(1);
        }
        bar.finish_and_clear();

        let best_k = choose_best_k(&k_values, &silhouette_scores);
        let inertia_rates = inertia_rates(&inertias);

        if let Some(pos) = k_values.iter().position(|&k| k == best_k) {
            info!(
                "Best k: {} (silhouette {:.4}, inertia {:.2})",
                best_k, silhouette_scores[pos], inertias[pos]
            );
        } else {
            info!("Best k: {} (fallback, not among candidates)", best_k);
        }

        Ok(KSelection {
            k_values,
            inertias,
            silhouette_scores,
            best_k,
            inertia_rates,
        })
    }
}

/// Apply the selection policy to the sweep results.
///
/// 1. Drop candidates with k < 3.
/// 2. Keep candidates whose silhouette is at least the median of the remainder.
/// 3. Prefer the best silhouette within [5, 15] (first on ties), otherwise the
///    smallest surviving k.
/// 4. Fall back to 10 when nothing survives.
#[inline]
pub fn choose_best_k(k_values: &[usize], silhouettes: &[f32]) -> usize {
    let scored: Vec<(usize, f32)> = k_values
        .iter()
        .copied()
        .zip(silhouettes.iter().copied())
        .filter(|&(k, _)| k >= MIN_K)
        .collect();

    let Some(threshold) = median(scored.iter().map(|&(_, s)| s).collect()) else {
        return FALLBACK_K;
    };

    let candidates: Vec<(usize, f32)> = scored
        .into_iter()
        .filter(|&(_, s)| s >= threshold)
        .collect();

    let preferred = candidates
        .iter()
        .filter(|(k, _)| PREFERRED_K.contains(k))
        .fold(None, |best: Option<(usize, f32)>, &(k, s)| match best {
            Some((_, best_s)) if best_s >= s => best,
            _ => Some((k, s)),
        });

    match preferred {
        Some((k, _)) => k,
        None => candidates
            .iter()
            .map(|&(k, _)| k)
            .min()
            .unwrap_or(FALLBACK_K),
    }
}

/// Relative inertia drop between consecutive candidates.
#[inline]
pub fn inertia_rates(inertias: &[f32]) -> Vec<f32> {
    inertias
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[0] - w[1]) / w[0] } else { 0.0 })
        .collect()
}

fn median(mut values: Vec<f32>) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some(values[mid - 1].midpoint(values[mid]))
    } else {
        Some(values[mid])
    }
}

fn subsample(vectors: &[Vec<f32>], cap: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    if vectors.len() > cap {
        index::sample(rng, vectors.len(), cap)
            .iter()
            .map(|i| vectors[i].clone())
            .collect()
    } else {
        vectors.to_vec()
    }
}
