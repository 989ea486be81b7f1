// Embeddings module
// Loading, normalizing and generating embedding vectors

pub mod batch;
pub mod gemini;
pub mod store;
pub mod vector;

pub use gemini::{Embedder, GeminiClient, TextGenerator};
pub use store::{EmbeddingRecord, ensure_normalized, load_embeddings, load_full_outputs};
