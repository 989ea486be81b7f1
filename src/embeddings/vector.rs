// Small dense-vector helpers shared by the clustering and merge stages


#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn l2_norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

#[inline]
pub fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Scale a vector to unit length. Zero vectors are returned unchanged.
#[inline]
pub fn normalized(v: &[f32]) -> Vec<f32> {
    let norm = l2_norm(v);
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

/// Cosine similarity between two arbitrary vectors. Zero vectors have similarity 0.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let denom = l2_norm(a) * l2_norm(b);
    if denom > 0.0 { dot(a, b) / denom } else { 0.0 }
}

/// Element-wise mean of a set of equally sized vectors, `None` when empty.
#[inline]
pub fn mean<'a, I>(vectors: I) -> Option<Vec<f32>>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut iter = vectors.into_iter();
    let first = iter.next()?;
    let mut sum: Vec<f64> = first.iter().map(|&x| f64::from(x)).collect();
    let mut count = 1_usize;

    for v in iter {
        for (acc, &x) in sum.iter_mut().zip(v.iter()) {
            *acc += f64::from(x);
        }
        count += 1;
    }

    Some(sum.into_iter().map(|s| (s / count as f64) as f32).collect())
}
