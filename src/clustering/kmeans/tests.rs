use super::*;
use std::collections::HashSet;

fn two_blobs() -> Vec<Vec<f32>> {
    vec![
        vec![0.0, 0.0],
        vec![0.1, 0.1],
        vec![0.05, 0.0],
        vec![10.0, 10.0],
        vec![10.1, 10.1],
        vec![10.0, 10.05],
    ]
}

#[test]
fn separates_obvious_blobs() {
    let fit = MiniBatchKMeans::new(2)
        .fit(&two_blobs())
        .expect("fit should succeed");

    assert_eq!(fit.labels.len(), 6);
    assert_eq!(fit.labels[0], fit.labels[1]);
    assert_eq!(fit.labels[1], fit.labels[2]);
    assert_eq!(fit.labels[3], fit.labels[4]);
    assert_eq!(fit.labels[4], fit.labels[5]);
    assert_ne!(fit.labels[0], fit.labels[3]);
}

#[test]
fn centroids_are_member_means() {
    let data = two_blobs();
    let fit = MiniBatchKMeans::new(2).fit(&data).expect("fit should succeed");

    for (cluster, centroid) in fit.centroids.iter().enumerate() {
        let members: Vec<&Vec<f32>> = data
            .iter()
            .zip(fit.labels.iter())
            .filter(|(_, l)| **l == cluster)
            .map(|(row, _)| row)
            .collect();
        for d in 0..2 {
            let expected = members.iter().map(|m| m[d]).sum::<f32>() / members.len() as f32;
            assert!((centroid[d] - expected).abs() < 1e-5);
        }
    }
}

#[test]
fn inertia_is_sum_of_squared_distances() {
    let data = two_blobs();
    let fit = MiniBatchKMeans::new(2).fit(&data).expect("fit should succeed");

    let expected: f32 = data
        .iter()
        .zip(fit.labels.iter())
        .map(|(row, &l)| squared_distance(row, &fit.centroids[l]))
        .sum();
    assert!((fit.inertia - expected).abs() < 1e-5);
    assert!(fit.inertia < 0.1);
}

#[test]
fn labels_are_dense() {
    let data: Vec<Vec<f32>> = (0..60)
        .map(|i| vec![(i % 6) as f32 * 3.0, (i / 6) as f32 * 0.01])
        .collect();
    let fit = MiniBatchKMeans::new(4)
        .with_batch_size(16)
        .fit(&data)
        .expect("fit should succeed");

    assert!(fit.labels.iter().all(|&l| l < 4));
    assert_eq!(fit.centroids.len(), 4);
}

#[test]
fn deterministic_with_seed() {
    let data: Vec<Vec<f32>> = (0..40)
        .map(|i| vec![(i as f32 * 0.37).sin(), (i as f32 * 0.11).cos()])
        .collect();

    let a = MiniBatchKMeans::new(3)
        .with_seed(7)
        .with_batch_size(8)
        .fit(&data)
        .expect("fit should succeed");
    let b = MiniBatchKMeans::new(3)
        .with_seed(7)
        .with_batch_size(8)
        .fit(&data)
        .expect("fit should succeed");

    assert_eq!(a.labels, b.labels);
    assert_eq!(a.centroids, b.centroids);
}

#[test]
fn k_equals_n_gives_singletons() {
    let data = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
    let fit = MiniBatchKMeans::new(3).fit(&data).expect("fit should succeed");
    let unique: HashSet<_> = fit.labels.iter().collect();
    assert_eq!(unique.len(), 3);
}

#[test]
fn rejects_invalid_k() {
    let data = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
    assert!(matches!(
        MiniBatchKMeans::new(5).fit(&data),
        Err(IntentError::Configuration(_))
    ));
    assert!(matches!(
        MiniBatchKMeans::new(0).fit(&data),
        Err(IntentError::Configuration(_))
    ));
    assert!(matches!(
        MiniBatchKMeans::new(1).fit(&[]),
        Err(IntentError::Configuration(_))
    ));
}

#[test]
fn rejects_non_finite_input() {
    let data = vec![vec![0.0, f32::NAN], vec![1.0, 1.0]];
    assert!(matches!(
        MiniBatchKMeans::new(1).fit(&data),
        Err(IntentError::Numerical(_))
    ));
}

#[test]
fn nearest_center_prefers_lowest_index_on_ties() {
    let centers = vec![vec![1.0, 0.0], vec![-1.0, 0.0]];
    let (idx, dist) = nearest_center(&[0.0, 1.0], &centers);
    assert_eq!(idx, 0);
    assert!((dist - 2.0).abs() < 1e-6);
}
