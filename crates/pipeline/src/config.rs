use clustering::ClusterParams;
use extract::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::PipelineError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: OperationMode,
    pub ollama: OllamaConfig,
    pub clustering: ClusterParams,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    Fast,      // Cache embeddings aggressively, short timeouts
    Accurate,  // No cache, patient retries
    #[default]
    Balanced,
}

impl FromStr for OperationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(OperationMode::Fast),
            "accurate" => Ok(OperationMode::Accurate),
            "balanced" => Ok(OperationMode::Balanced),
            other => Err(format!("unknown mode '{}', expected fast|balanced|accurate", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub extraction_model: String,
    pub labeling_model: String,
    pub embedding_model: String,
    pub request_timeout_secs: u64,
    /// Correction prompts sent when extraction output is not JSON.
    pub max_json_corrections: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            extraction_model: "llama3".to_string(),
            labeling_model: "llama3".to_string(),
            embedding_model: "all-minilm".to_string(),
            request_timeout_secs: 60,
            max_json_corrections: 2,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: OperationMode::Balanced,
            ollama: OllamaConfig::default(),
            clustering: ClusterParams::default(),
            retry: RetryConfig {
                max_retries: 3,
                initial_backoff_ms: 1000,
                max_backoff_ms: 10000,
            },
            cache: CacheConfig {
                enabled: true,
                max_entries: 10000,
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn for_mode(mode: OperationMode) -> Self {
        match mode {
            OperationMode::Fast => Self::fast_mode(),
            OperationMode::Accurate => Self::accurate_mode(),
            OperationMode::Balanced => Self::default(),
        }
    }

    pub fn fast_mode() -> Self {
        Self {
            mode: OperationMode::Fast,
            ollama: OllamaConfig {
                request_timeout_secs: 30,
                max_json_corrections: 1,
                ..OllamaConfig::default()
            },
            retry: RetryConfig {
                max_retries: 2,
                initial_backoff_ms: 500,
                max_backoff_ms: 5000,
            },
            cache: CacheConfig {
                enabled: true,
                max_entries: 50000,
            },
            ..Self::default()
        }
    }

    pub fn accurate_mode() -> Self {
        Self {
            mode: OperationMode::Accurate,
            ollama: OllamaConfig {
                request_timeout_secs: 120,
                max_json_corrections: 3,
                ..OllamaConfig::default()
            },
            retry: RetryConfig {
                max_retries: 5,
                initial_backoff_ms: 2000,
                max_backoff_ms: 20000,
            },
            cache: CacheConfig {
                enabled: false,
                max_entries: 0,
            },
            ..Self::default()
        }
    }

    /// Load a TOML config file. The file's `mode` (or `mode_override` when
    /// given) picks the preset; keys present in the file override it.
    pub fn load(path: &Path, mode_override: Option<OperationMode>) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| PipelineError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_with_mode(&raw, mode_override)
    }

    pub fn from_toml(raw: &str) -> Result<Self, PipelineError> {
        Self::from_toml_with_mode(raw, None)
    }

    pub fn from_toml_with_mode(raw: &str, mode_override: Option<OperationMode>) -> Result<Self, PipelineError> {
        let overrides: toml::Table = toml::from_str(raw).map_err(config_error)?;

        let mode = match (mode_override, overrides.get("mode")) {
            (Some(mode), _) => mode,
            (None, Some(value)) => value.clone().try_into::<OperationMode>().map_err(config_error)?,
            (None, None) => OperationMode::default(),
        };

        let mut merged = match toml::Value::try_from(Self::for_mode(mode)).map_err(config_error)? {
            toml::Value::Table(table) => table,
            _ => {
                return Err(PipelineError::Config {
                    message: "preset did not serialize to a table".to_string(),
                })
            }
        };
        merge_tables(&mut merged, overrides);
        merged.insert("mode".to_string(), toml::Value::try_from(mode).map_err(config_error)?);

        let config = toml::Value::Table(merged).try_into::<Self>().map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let threshold = self.clustering.distance_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(PipelineError::Config {
                message: format!("clustering.distance_threshold must be >= 0, got {}", threshold),
            });
        }
        if self.ollama.base_url.trim().is_empty() {
            return Err(PipelineError::Config {
                message: "ollama.base_url must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            self.retry.initial_backoff_ms,
            self.retry.max_backoff_ms,
        )
    }
}

fn config_error(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Config {
        message: e.to_string(),
    }
}

/// Deep-merge `overrides` into `base`; nested tables merge key by key.
fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match value {
            toml::Value::Table(incoming) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, incoming),
                _ => {
                    base.insert(key, toml::Value::Table(incoming));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        PipelineConfig::default().retry
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        PipelineConfig::default().cache
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use clustering::{DistanceMetric, Linkage};

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
            [ollama]
            extraction_model = "qwen2.5"

            [clustering]
            distance_threshold = 0.3
            linkage = "complete"
            "#,
        )
        .unwrap();

        assert_eq!(config.ollama.extraction_model, "qwen2.5");
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.clustering.distance_threshold, 0.3);
        assert_eq!(config.clustering.linkage, Linkage::Complete);
        assert_eq!(config.clustering.metric, DistanceMetric::Cosine);
        assert_eq!(config.retry.max_retries, 3);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config.mode, OperationMode::Balanced);
        assert_eq!(config.clustering.distance_threshold, 0.25);
    }

    #[test]
    fn test_rejects_negative_threshold() {
        let err = PipelineConfig::from_toml("[clustering]\ndistance_threshold = -1.0\n").unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));
    }

    #[test]
    fn test_rejects_unknown_linkage() {
        assert!(PipelineConfig::from_toml("[clustering]\ndistance_threshold = 0.2\nlinkage = \"ward\"\n").is_err());
    }

    #[test]
    fn test_demo_config_parses() {
        let config = PipelineConfig::from_toml(include_str!("../../../demos/pipeline.toml")).unwrap();
        assert_eq!(config.ollama.embedding_model, "all-minilm");
        assert_eq!(config.cache.max_entries, 10000);
    }

    #[test]
    fn test_mode_key_selects_preset_before_overrides() {
        let config = PipelineConfig::from_toml("mode = \"accurate\"\n[retry]\nmax_retries = 1\n").unwrap();
        assert_eq!(config.mode, OperationMode::Accurate);
        assert!(!config.cache.enabled);
        assert_eq!(config.ollama.request_timeout_secs, 120);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.initial_backoff_ms, 2000);
    }

    #[test]
    fn test_mode_override_beats_file_mode() {
        let config =
            PipelineConfig::from_toml_with_mode("mode = \"accurate\"\n", Some(OperationMode::Fast)).unwrap();
        assert_eq!(config.mode, OperationMode::Fast);
        assert_eq!(config.cache.max_entries, 50000);
        assert!(PipelineConfig::from_toml("mode = \"turbo\"\n").is_err());
    }

    #[test]
    fn test_mode_presets() {
        assert!(!PipelineConfig::for_mode(OperationMode::Accurate).cache.enabled);
        assert_eq!(PipelineConfig::for_mode(OperationMode::Fast).retry.max_retries, 2);
        assert_eq!("Fast".parse::<OperationMode>(), Ok(OperationMode::Fast));
        assert!("turbo".parse::<OperationMode>().is_err());
    }
}
