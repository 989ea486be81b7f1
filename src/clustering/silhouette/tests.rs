use super::*;

#[test]
fn well_separated_directions_score_high() {
    let vectors = vec![
        vec![1.0, 0.0],
        vec![0.99, 0.05],
        vec![0.0, 1.0],
        vec![0.05, 0.99],
    ];
    let labels = vec![0, 0, 1, 1];

    let score = cosine_silhouette_score(&vectors, &labels).expect("score should compute");
    assert!(score > 0.9, "score was {score}");
    assert!(score <= 1.0);
}

#[test]
fn bad_assignment_scores_negative() {
    let vectors = vec![
        vec![1.0, 0.0],
        vec![0.99, 0.05],
        vec![0.0, 1.0],
        vec![0.05, 0.99],
    ];
    let labels = vec![0, 1, 0, 1];

    let score = cosine_silhouette_score(&vectors, &labels).expect("score should compute");
    assert!(score < 0.0, "score was {score}");
}

#[test]
fn singletons_contribute_zero() {
    // Two tight points plus one isolated point: the isolated one scores 0.
    let vectors = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
    let labels = vec![0, 0, 1];

    let score = cosine_silhouette_score(&vectors, &labels).expect("score should compute");
    // Each of the first two: a = 0, b = 1 -> s = 1. Third: s = 0.
    assert!((score - 2.0 / 3.0).abs() < 1e-5, "score was {score}");
}

#[test]
fn single_cluster_scores_zero() {
    let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
    let score = cosine_silhouette_score(&vectors, &[0, 0]).expect("score should compute");
    assert_eq!(score, 0.0);
}

#[test]
fn magnitude_does_not_matter() {
    let vectors = vec![
        vec![2.0, 0.0],
        vec![5.0, 0.1],
        vec![0.0, 3.0],
        vec![0.2, 7.0],
    ];
    let scaled: Vec<Vec<f32>> = vectors.iter().map(|v| normalized(v)).collect();
    let labels = vec![0, 0, 1, 1];

    let a = cosine_silhouette_score(&vectors, &labels).expect("score should compute");
    let b = cosine_silhouette_score(&scaled, &labels).expect("score should compute");
    assert!((a - b).abs() < 1e-5);
}

#[test]
fn length_mismatch_is_an_error() {
    let vectors = vec![vec![1.0, 0.0]];
    assert!(cosine_silhouette_score(&vectors, &[0, 1]).is_err());
}
