pub mod cache;
pub mod embeddings;

pub use cache::{CacheStats, EmbeddingCache};
pub use embeddings::EmbeddingClient;

use anyhow::Result;
use async_trait::async_trait;

/// Maps phrases to fixed-length vectors.
///
/// Implementations return exactly one vector per phrase, in input order, all
/// of the same length. An empty input yields an empty output.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, phrases: &[String]) -> Result<Vec<Vec<f32>>>;
}
