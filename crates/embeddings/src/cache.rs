use dashmap::DashMap;
use sha2::{Digest, Sha256};

/// Phrase embeddings keyed by the SHA-256 of the phrase.
pub struct EmbeddingCache {
    embeddings: DashMap<String, Vec<f32>>,
    max_entries: usize,
}

impl EmbeddingCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            embeddings: DashMap::new(),
            max_entries,
        }
    }

    pub fn set(&self, text: &str, embedding: Vec<f32>) {
        if self.max_entries == 0 {
            return;
        }
        if self.embeddings.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = self.embeddings.iter()
                .take((self.max_entries / 4).max(1))
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.embeddings.remove(&key);
            }
        }
        let key = Self::hash_text(text);
        self.embeddings.insert(key, embedding);
    }

    pub fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = Self::hash_text(text);
        self.embeddings.get(&key).map(|r| r.value().clone())
    }

    fn hash_text(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            embeddings_cached: self.embeddings.len(),
        }
    }

    pub fn clear(&self) {
        self.embeddings.clear();
    }
}

#[derive(Debug, serde::Serialize)]
pub struct CacheStats {
    pub embeddings_cached: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss() {
        let cache = EmbeddingCache::new(10);
        cache.set("app crashes", vec![0.1, 0.2]);

        assert_eq!(cache.get("app crashes"), Some(vec![0.1, 0.2]));
        assert_eq!(cache.get("App crashes"), None);
    }

    #[test]
    fn test_evicts_when_full() {
        let cache = EmbeddingCache::new(4);
        for i in 0..4 {
            cache.set(&format!("phrase {}", i), vec![i as f32]);
        }
        cache.set("one more", vec![9.0]);

        assert!(cache.stats().embeddings_cached <= 4);
        assert_eq!(cache.get("one more"), Some(vec![9.0]));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = EmbeddingCache::new(0);
        cache.set("x", vec![1.0]);
        assert_eq!(cache.stats().embeddings_cached, 0);

        cache.clear();
        assert!(cache.get("x").is_none());
    }
}
