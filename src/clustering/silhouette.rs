// Mean silhouette coefficient under cosine distance

#[cfg(test)]
mod tests;

use tracing::warn;

use crate::embeddings::vector::{dot, normalized};
use crate::{IntentError, Result};

/// Mean silhouette coefficient using `1 - cos(a, b)` as the distance.
///
/// Points alone in their cluster score 0. When fewer than two clusters are present
/// the score is 0 as well, since no separation can be measured.
#[inline]
pub fn cosine_silhouette_score(vectors: &[Vec<f32>], labels: &[usize]) -> Result<f32> {
    if vectors.len() != labels.len() {
        return Err(IntentError::Numerical(format!(
            "{} vectors but {} labels",
            vectors.len(),
            labels.len()
        )));
    }

    let n = vectors.len();
    let n_clusters = labels.iter().max().map_or(0, |&m| m + 1);
    let mut sizes = vec![0_usize; n_clusters];
    for &label in labels {
        sizes[label] += 1;
    }

    if sizes.iter().filter(|&&s| s > 0).count() < 2 {
        warn!("Silhouette requested with fewer than two populated clusters");
        return Ok(0.0);
    }

    let units: Vec<Vec<f32>> = vectors.iter().map(|v| normalized(v)).collect();
    let mut total = 0.0_f64;
    let mut cluster_dists = vec![0.0_f64; n_clusters];

    for i in 0..n {
        cluster_dists.iter_mut().for_each(|d| *d = 0.0);
        for j in 0..n {
            if i != j {
                cluster_dists[labels[j]] += f64::from(1.0 - dot(&units[i], &units[j]));
            }
        }

        let own = labels[i];
        if sizes[own] <= 1 {
            continue;
        }

        let a = cluster_dists[own] / (sizes[own] - 1) as f64;
        let b = (0..n_clusters)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| cluster_dists[c] / sizes[c] as f64)
            .fold(f64::MAX, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    let score = (total / n as f64) as f32;
    if score.is_finite() {
        Ok(score)
    } else {
        Err(IntentError::Numerical(
            "silhouette score is not finite".to_string(),
        ))
    }
}
