//! Server configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional YAML
//! file, then `SENTIMENT__*` environment overrides (`__` separates nesting,
//! e.g. `SENTIMENT__STORE__KEY`), then the well-known `OPENAI_API_KEY` and
//! `FEEDBACK_STORE_URL` variables. CLI flags are applied last by the binary.

use sentiment_classifiers::{ModelRegistry, OpenAiSettings, DEFAULT_MODEL, OPENAI_API_KEY_ENV};
use sentiment_store::{StoreConfig, FEEDBACK_STORE_URL_ENV};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpConfig,
    pub classifier: ClassifierSettings,
    pub openai: OpenAiSettings,
    pub store: StoreConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Listen address
    pub listen: String,

    /// Listen port
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_body_bytes: usize,

    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0".to_string(),
            port: 8000,
            max_body_bytes: 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

/// Local classifier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// Registry name of the model behind the `bert` method
    pub model: String,

    /// Extra model descriptors (YAML), merged over the built-in registry
    pub registry_path: Option<PathBuf>,

    /// Device override for the selected model (cpu, cuda, mps)
    pub device: Option<String>,

    /// Maximum sequence length override for the selected model
    pub max_length: Option<usize>,

    /// Load the model at start-up instead of on first use
    pub preload: bool,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            registry_path: None,
            device: None,
            max_length: None,
            preload: false,
        }
    }
}

impl ClassifierSettings {
    /// Built-in registry plus the configured registry file, with the selected
    /// model's inference overrides applied
    pub fn build_registry(&self) -> anyhow::Result<ModelRegistry> {
        let mut registry = ModelRegistry::builtin();
        if let Some(path) = &self.registry_path {
            registry = registry.merge(ModelRegistry::from_file(path)?);
        }

        // Fail at start-up rather than on the first request
        registry.resolve(&self.model)?;

        if let Some(model) = registry.models.get_mut(&self.model) {
            if let Some(device) = &self.device {
                model.inference.device = device.clone();
            }
            if let Some(max_length) = self.max_length {
                model.inference.max_length = max_length;
            }
        }

        Ok(registry)
    }
}

impl ServerConfig {
    /// Load configuration from file (if present) and environment
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::new(config_path, config::FileFormat::Yaml).required(false),
            )
            .add_source(
                config::Environment::with_prefix("SENTIMENT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: ServerConfig = settings.try_deserialize()?;
        config.apply_well_known_env();
        Ok(config)
    }

    fn apply_well_known_env(&mut self) {
        if let Ok(url) = std::env::var(FEEDBACK_STORE_URL_ENV) {
            if !url.trim().is_empty() {
                self.store.url = url;
            }
        }

        if let Ok(key) = std::env::var(OPENAI_API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.openai.api_key = Some(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.listen, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert!(config.server.cors_origins.is_empty());
        assert_eq!(config.classifier.model, DEFAULT_MODEL);
        assert!(!config.classifier.preload);
        assert_eq!(config.openai.model, "gpt-3.5-turbo-instruct");
        assert_eq!(config.store.key, "feedback");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ServerConfig::load("/nonexistent/sentiment.yaml").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.classifier.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            r#"
server:
  port: 9100
  cors_origins: ["https://shop.example.com"]
classifier:
  model: "ProsusAI/finbert"
  max_length: 256
openai:
  timeout_secs: 5
"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.listen, "0.0.0.0");
        assert_eq!(config.server.cors_origins, vec!["https://shop.example.com"]);
        assert_eq!(config.classifier.model, "ProsusAI/finbert");
        assert_eq!(config.openai.timeout_secs, 5);
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_build_registry_applies_overrides() {
        let settings = ClassifierSettings {
            device: Some("cuda".to_string()),
            max_length: Some(128),
            ..Default::default()
        };

        let registry = settings.build_registry().unwrap();
        let model = registry.resolve(DEFAULT_MODEL).unwrap();
        assert_eq!(model.inference.device, "cuda");
        assert_eq!(model.inference.max_length, 128);

        // Other models keep their own settings
        let other = registry.resolve("ProsusAI/finbert").unwrap();
        assert_eq!(other.inference.max_length, 512);
    }

    #[test]
    fn test_unknown_model_fails_at_startup() {
        let settings = ClassifierSettings {
            model: "someone/unknown-model".to_string(),
            ..Default::default()
        };
        assert!(settings.build_registry().is_err());
    }

    #[test]
    fn test_registry_file_adds_models() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
models:
  sst2:
    source:
      type: local
      path: "./models/sst2"
    schema: binary
"#
        )
        .unwrap();

        let settings = ClassifierSettings {
            model: "sst2".to_string(),
            registry_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };

        let registry = settings.build_registry().unwrap();
        assert!(registry.get_model("sst2").is_some());
        assert!(registry.get_model(DEFAULT_MODEL).is_some());
    }
}
