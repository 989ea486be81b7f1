// Representative sampling
// Ranks cluster members by cosine similarity to the normalized centroid


use crate::embeddings::vector::cosine_similarity;

pub const DEFAULT_TOP_N: usize = 10;

/// Members of a cluster paired with their cosine similarity to the centroid, best first.
///
/// `members` are indices into `vectors`, which need not be unit length. The sort is stable, so members with equal
/// similarity keep the order they were given in.
#[inline]
pub fn ranked_members(
    vectors: &[Vec<f32>],
    members: &[usize],
    centroid: &[f32],
) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = members
        .iter()
        .map(|&i| (i, cosine_similarity(&vectors[i], centroid)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// The `top_n` members closest to the centroid direction.
#[inline]
pub fn top_similar_samples(
    vectors: &[Vec<f32>],
    members: &[usize],
    centroid: &[f32],
    top_n: usize,
) -> Vec<usize> {
    ranked_members(vectors, members, centroid)
        .into_iter()
        .take(top_n)
        .map(|(i, _)| i)
        .collect()
}
