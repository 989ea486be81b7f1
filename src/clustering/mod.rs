// Clustering module
// Cluster-count selection, mini-batch k-means fitting and representative sampling

pub mod fitter;
pub mod kmeans;
pub mod sampler;
pub mod selection;
pub mod silhouette;

pub use fitter::{Centroid, ClusterFit, FitParams, fit_clusters};
pub use kmeans::{KMeansFit, MiniBatchKMeans};
pub use sampler::{DEFAULT_TOP_N, ranked_members, top_similar_samples};
pub use selection::{KSelection, KSelector, choose_best_k};
pub use silhouette::cosine_silhouette_score;
