//! Model configuration and registry structures

use crate::schema::ClassSchema;
use sentiment_core::{Error, Result, SentimentBucket};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Model used when nothing else is configured
pub const DEFAULT_MODEL: &str = "nlptown/bert-base-multilingual-uncased-sentiment";

/// Model registry containing all available models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRegistry {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Configuration for a single BERT-family sequence classification model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name
    #[serde(default)]
    pub name: String,

    /// Model description
    #[serde(default)]
    pub description: String,

    /// Model source (where to load from)
    pub source: ModelSource,

    /// How the model's classes map onto sentiment buckets
    pub schema: SchemaSpec,

    /// Inference settings
    #[serde(default)]
    pub inference: InferenceConfig,
}

/// Model source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSource {
    /// Load from a local directory holding config, tokenizer, and weights
    Local { path: PathBuf },

    /// Download from HuggingFace Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

fn default_revision() -> String {
    "main".to_string()
}

/// Class schema as written in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaSpec {
    StarRating,
    Binary,
    Polarity,
    Custom { buckets: Vec<SentimentBucket> },
}

impl SchemaSpec {
    /// Convert to the runtime schema
    pub fn to_schema(&self) -> Result<ClassSchema> {
        match self {
            Self::StarRating => Ok(ClassSchema::star_rating()),
            Self::Binary => Ok(ClassSchema::binary()),
            Self::Polarity => Ok(ClassSchema::polarity()),
            Self::Custom { buckets } => ClassSchema::custom(buckets.clone()),
        }
    }
}

/// Inference configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Device to run on (cpu, cuda, mps)
    #[serde(default = "default_device")]
    pub device: String,

    /// Maximum sequence length, longer input is truncated
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_max_length() -> usize {
    512
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            max_length: default_max_length(),
        }
    }
}

impl ModelConfig {
    fn huggingface(repo: &str, description: &str, schema: SchemaSpec) -> Self {
        Self {
            name: repo.to_string(),
            description: description.to_string(),
            source: ModelSource::HuggingFace {
                repo: repo.to_string(),
                revision: default_revision(),
            },
            schema,
            inference: InferenceConfig::default(),
        }
    }
}

impl ModelRegistry {
    /// Registry of models known to work out of the box
    pub fn builtin() -> Self {
        let models = [
            ModelConfig::huggingface(
                DEFAULT_MODEL,
                "Multilingual BERT fine-tuned on product reviews (1-5 stars)",
                SchemaSpec::StarRating,
            ),
            ModelConfig::huggingface(
                "ProsusAI/finbert",
                "BERT fine-tuned on financial news",
                SchemaSpec::Custom {
                    buckets: vec![
                        SentimentBucket::Positive,
                        SentimentBucket::Negative,
                        SentimentBucket::Neutral,
                    ],
                },
            ),
        ];

        Self {
            version: default_version(),
            models: models
                .into_iter()
                .map(|config| (config.name.clone(), config))
                .collect(),
        }
    }

    /// Load model registry from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut registry: ModelRegistry = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse model registry: {}", e)))?;

        for (key, config) in registry.models.iter_mut() {
            if config.name.is_empty() {
                config.name = key.clone();
            }
        }

        Ok(registry)
    }

    /// Load model registry from YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "Failed to read model registry {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml(&contents)
    }

    /// Add or replace entries with those from another registry
    pub fn merge(mut self, other: ModelRegistry) -> Self {
        self.models.extend(other.models);
        self
    }

    /// Get a model configuration by name
    pub fn get_model(&self, name: &str) -> Option<&ModelConfig> {
        self.models.get(name)
    }

    /// Get a model configuration by name, failing for unknown names
    pub fn resolve(&self, name: &str) -> Result<&ModelConfig> {
        self.get_model(name).ok_or_else(|| {
            let mut known: Vec<_> = self.models.keys().cloned().collect();
            known.sort();
            Error::config(format!(
                "Model '{}' not found in registry (known: {})",
                name,
                known.join(", ")
            ))
        })
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_default_model() {
        let registry = ModelRegistry::builtin();
        let model = registry.resolve(DEFAULT_MODEL).unwrap();

        assert_eq!(model.schema, SchemaSpec::StarRating);
        assert_eq!(model.schema.to_schema().unwrap().expected_classes(), 5);
        assert!(matches!(model.source, ModelSource::HuggingFace { .. }));
    }

    #[test]
    fn test_parse_model_config() {
        let yaml = r#"
version: "1.0"
models:
  sst2:
    description: "Binary sentiment"
    source:
      type: huggingface
      repo: "textattack/bert-base-uncased-SST-2"
    schema: binary
    inference:
      device: "cpu"
      max_length: 128
  finance:
    source:
      type: local
      path: "./models/finbert"
    schema:
      custom:
        buckets: [positive, negative, neutral]
"#;

        let registry = ModelRegistry::from_yaml(yaml).unwrap();
        assert_eq!(registry.models.len(), 2);

        let sst2 = registry.get_model("sst2").unwrap();
        assert_eq!(sst2.name, "sst2");
        assert_eq!(sst2.inference.max_length, 128);
        match &sst2.source {
            ModelSource::HuggingFace { repo, revision } => {
                assert_eq!(repo, "textattack/bert-base-uncased-SST-2");
                assert_eq!(revision, "main");
            }
            _ => panic!("Expected huggingface source"),
        }

        let finance = registry.get_model("finance").unwrap();
        let schema = finance.schema.to_schema().unwrap();
        assert_eq!(
            schema.class_buckets(),
            &[
                SentimentBucket::Positive,
                SentimentBucket::Negative,
                SentimentBucket::Neutral
            ]
        );
        assert_eq!(finance.inference.device, "cpu");
    }

    #[test]
    fn test_merge_overrides_builtin() {
        let overrides = ModelRegistry::from_yaml(
            r#"
models:
  nlptown/bert-base-multilingual-uncased-sentiment:
    source:
      type: local
      path: "/opt/models/nlptown"
    schema: star-rating
"#,
        )
        .unwrap();

        let registry = ModelRegistry::builtin().merge(overrides);
        let model = registry.resolve(DEFAULT_MODEL).unwrap();
        assert!(matches!(model.source, ModelSource::Local { .. }));
        assert!(registry.get_model("ProsusAI/finbert").is_some());
    }

    #[test]
    fn test_unknown_model_lists_known_names() {
        let err = ModelRegistry::builtin().resolve("nope").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains(DEFAULT_MODEL));
    }
}
