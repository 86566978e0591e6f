//! Model loading for Candle-based BERT sentiment classifiers
//!
//! Resolves model files (local directory or HuggingFace Hub), builds the
//! tokenizer, and loads a BERT backbone plus its sequence-classification head.

use crate::classifier::SequenceClassifier;
use crate::loader_plugin::ModelLoaderPlugin;
use crate::model_config::{ModelConfig, ModelRegistry, ModelSource};
use crate::schema::ClassSchema;
use async_trait::async_trait;
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use hf_hub::{api::sync::ApiBuilder, Repo, RepoType};
use sentiment_core::{Error, ProbabilityVector, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokenizers::{Tokenizer, TruncationParams};

/// Loads BERT sequence classifiers described by a [`ModelRegistry`]
pub struct CandleModelLoader {
    registry: Arc<ModelRegistry>,
    cache_dir: PathBuf,
}

impl CandleModelLoader {
    /// Create a loader caching downloads under the user cache directory
    pub fn new(registry: ModelRegistry) -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sentiment-service/models");

        Self::with_cache_dir(registry, cache_dir)
    }

    /// Create a loader with an explicit download cache
    pub fn with_cache_dir(registry: ModelRegistry, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry: Arc::new(registry),
            cache_dir: cache_dir.into(),
        }
    }

    /// Access the underlying model registry.
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

#[async_trait]
impl ModelLoaderPlugin for CandleModelLoader {
    async fn load_classifier(&self, name: &str) -> Result<Arc<dyn SequenceClassifier>> {
        let config = self.registry.resolve(name)?.clone();
        let schema = config.schema.to_schema()?;
        let cache_dir = self.cache_dir.clone();

        tracing::info!("Loading sentiment model '{}' ({})", config.name, schema);
        let start = Instant::now();

        // Downloads and weight loading are blocking
        let model = tokio::task::spawn_blocking(move || {
            BertSentimentModel::load(&config, schema, &cache_dir)
        })
        .await
        .map_err(|e| Error::model_unavailable(format!("Model loading task failed: {}", e)))??;

        tracing::info!(
            "Loaded sentiment model '{}' in {}ms",
            name,
            start.elapsed().as_millis()
        );

        Ok(Arc::new(model))
    }

    fn available_models(&self) -> Vec<String> {
        let mut names: Vec<_> = self.registry.models.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Files making up a model on disk
#[derive(Debug, Clone)]
struct ModelFiles {
    config: PathBuf,
    tokenizer: TokenizerFile,
    weights: WeightsFile,
}

#[derive(Debug, Clone)]
enum TokenizerFile {
    Json(PathBuf),
    Vocab(PathBuf),
}

#[derive(Debug, Clone)]
enum WeightsFile {
    SafeTensors(PathBuf),
    PyTorch(PathBuf),
}

impl ModelFiles {
    /// Locate files in a local model directory
    fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::model_unavailable(format!(
                "Model path does not exist: {}",
                dir.display()
            )));
        }

        let config = dir.join("config.json");
        if !config.exists() {
            return Err(Error::model_unavailable(format!(
                "config.json not found in {}",
                dir.display()
            )));
        }

        let tokenizer = if dir.join("tokenizer.json").exists() {
            TokenizerFile::Json(dir.join("tokenizer.json"))
        } else if dir.join("vocab.txt").exists() {
            TokenizerFile::Vocab(dir.join("vocab.txt"))
        } else {
            return Err(Error::model_unavailable(format!(
                "No tokenizer found in {} (tried tokenizer.json, vocab.txt)",
                dir.display()
            )));
        };

        let weights = if dir.join("model.safetensors").exists() {
            WeightsFile::SafeTensors(dir.join("model.safetensors"))
        } else if dir.join("pytorch_model.bin").exists() {
            WeightsFile::PyTorch(dir.join("pytorch_model.bin"))
        } else {
            return Err(Error::model_unavailable(format!(
                "No model weights found in {} (tried model.safetensors, pytorch_model.bin)",
                dir.display()
            )));
        };

        Ok(Self {
            config,
            tokenizer,
            weights,
        })
    }

    /// Download (or reuse cached) files from HuggingFace Hub
    fn from_hub(repo: &str, revision: &str, cache_dir: &Path) -> Result<Self> {
        tracing::info!("Fetching model from HuggingFace: {} @ {}", repo, revision);

        let api = ApiBuilder::new()
            .with_cache_dir(cache_dir.to_path_buf())
            .build()
            .map_err(|e| {
                Error::model_unavailable(format!("Failed to initialize HuggingFace API: {}", e))
            })?;

        let repo_obj = api.repo(Repo::with_revision(
            repo.to_string(),
            RepoType::Model,
            revision.to_string(),
        ));

        let config = repo_obj.get("config.json").map_err(|e| {
            Error::model_unavailable(format!("Failed to download config.json: {}", e))
        })?;

        let tokenizer = match repo_obj.get("tokenizer.json") {
            Ok(path) => TokenizerFile::Json(path),
            Err(_) => {
                tracing::debug!("tokenizer.json not published, falling back to vocab.txt");
                let path = repo_obj.get("vocab.txt").map_err(|e| {
                    Error::model_unavailable(format!(
                        "No tokenizer found (tried tokenizer.json, vocab.txt): {}",
                        e
                    ))
                })?;
                TokenizerFile::Vocab(path)
            }
        };

        let weights = match repo_obj.get("model.safetensors") {
            Ok(path) => WeightsFile::SafeTensors(path),
            Err(_) => {
                tracing::debug!(
                    "model.safetensors not published, falling back to pytorch_model.bin"
                );
                let path = repo_obj.get("pytorch_model.bin").map_err(|e| {
                    Error::model_unavailable(format!(
                        "No model weights found (tried model.safetensors, pytorch_model.bin): {}",
                        e
                    ))
                })?;
                WeightsFile::PyTorch(path)
            }
        };

        Ok(Self {
            config,
            tokenizer,
            weights,
        })
    }
}

/// BERT backbone, optional pooler, and linear classification head
pub struct BertSentimentModel {
    name: String,
    schema: ClassSchema,
    inner: Arc<BertInference>,
}

struct BertInference {
    tokenizer: Tokenizer,
    model: BertModel,
    pooler: Option<Linear>,
    classifier: Linear,
    device: Device,
}

impl BertSentimentModel {
    /// Load all model components. Blocking.
    pub fn load(config: &ModelConfig, schema: ClassSchema, cache_dir: &Path) -> Result<Self> {
        let files = match &config.source {
            ModelSource::Local { path } => ModelFiles::from_dir(path)?,
            ModelSource::HuggingFace { repo, revision } => {
                ModelFiles::from_hub(repo, revision, cache_dir)?
            }
        };

        let tokenizer = load_tokenizer(&files.tokenizer, config.inference.max_length)?;
        let bert_config: BertConfig = parse_json_config(&files.config)?;
        let device = get_device(&config.inference.device)?;
        let vb = load_var_builder(&files.weights, &device)?;

        let (model, prefix) = load_bert_backbone(&vb, &bert_config, &["bert", ""])?;

        let hidden_size = bert_config.hidden_size;
        let pooler_vb = if prefix.is_empty() {
            vb.pp("pooler").pp("dense")
        } else {
            vb.pp(prefix).pp("pooler").pp("dense")
        };
        let pooler = candle_nn::linear(hidden_size, hidden_size, pooler_vb).ok();
        if pooler.is_none() {
            tracing::debug!("No pooler weights found, classifying raw [CLS] embedding");
        }

        let num_labels = schema.expected_classes();
        let classifier =
            candle_nn::linear(hidden_size, num_labels, vb.pp("classifier")).map_err(|e| {
                Error::model_unavailable(format!(
                    "Failed to load classification head with {} labels ({} schema): {}",
                    num_labels,
                    schema.name(),
                    e
                ))
            })?;

        tracing::info!(
            "Loaded BERT classifier (hidden_size={}, num_labels={}, pooler={})",
            hidden_size,
            num_labels,
            pooler.is_some()
        );

        Ok(Self {
            name: config.name.clone(),
            schema,
            inner: Arc::new(BertInference {
                tokenizer,
                model,
                pooler,
                classifier,
                device,
            }),
        })
    }
}

impl BertInference {
    fn forward(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::internal(format!("Tokenization failed: {}", e)))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(inference_error("create input tensor"))?;

        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(inference_error("create token type tensor"))?;

        let hidden_states = self
            .model
            .forward(&input_ids, &token_type_ids, None)
            .map_err(inference_error("run forward pass"))?;

        let cls_embedding = hidden_states
            .i((.., 0, ..))
            .map_err(inference_error("select [CLS] token"))?;

        let pooled = match &self.pooler {
            Some(pooler) => pooler
                .forward(&cls_embedding)
                .and_then(|t| t.tanh())
                .map_err(inference_error("apply pooler"))?,
            None => cls_embedding,
        };

        let logits = self
            .classifier
            .forward(&pooled)
            .map_err(inference_error("apply classification head"))?;

        candle_nn::ops::softmax(&logits, D::Minus1)
            .and_then(|p| p.squeeze(0))
            .and_then(|p| p.to_vec1::<f32>())
            .map_err(inference_error("compute probabilities"))
    }
}

#[async_trait]
impl SequenceClassifier for BertSentimentModel {
    async fn infer(&self, text: &str) -> Result<ProbabilityVector> {
        let start = Instant::now();
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();

        // Forward passes are CPU-bound, keep them off the async workers
        let probabilities = tokio::task::spawn_blocking(move || inner.forward(&text))
            .await
            .map_err(|e| Error::internal(format!("Inference task failed: {}", e)))??;

        tracing::debug!(
            "Inference with '{}' took {}us",
            self.name,
            start.elapsed().as_micros()
        );

        ProbabilityVector::new(probabilities)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &ClassSchema {
        &self.schema
    }
}

fn inference_error(stage: &'static str) -> impl FnOnce(candle_core::Error) -> Error {
    move |e| Error::internal(format!("Failed to {}: {}", stage, e))
}

fn get_device(device_str: &str) -> Result<Device> {
    match device_str.to_lowercase().as_str() {
        "cuda" | "cuda:0" => Device::new_cuda(0).map_err(|e| {
            Error::model_unavailable(format!("Failed to initialize CUDA: {}", e))
        }),
        "mps" | "metal" => Device::new_metal(0).map_err(|e| {
            Error::model_unavailable(format!("Failed to initialize Metal: {}", e))
        }),
        _ => Ok(Device::Cpu),
    }
}

fn parse_json_config<T: serde::de::DeserializeOwned>(config_path: &Path) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        Error::model_unavailable(format!(
            "Failed to read config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    serde_json::from_str(&config_str).map_err(|e| {
        Error::model_unavailable(format!(
            "Failed to parse config {}: {}",
            config_path.display(),
            e
        ))
    })
}

fn load_var_builder(weights: &WeightsFile, device: &Device) -> Result<VarBuilder<'static>> {
    match weights {
        WeightsFile::SafeTensors(path) => {
            // SAFETY: the weights file is not modified while mapped
            unsafe {
                VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device).map_err(|e| {
                    Error::model_unavailable(format!("Failed to load SafeTensors: {}", e))
                })
            }
        }
        WeightsFile::PyTorch(path) => {
            VarBuilder::from_pth(path, DType::F32, device).map_err(|e| {
                Error::model_unavailable(format!("Failed to load PyTorch weights: {}", e))
            })
        }
    }
}

fn load_bert_backbone(
    vb: &VarBuilder,
    config: &BertConfig,
    prefixes: &[&'static str],
) -> Result<(BertModel, &'static str)> {
    let mut errors = Vec::new();

    for &prefix in prefixes {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };

        let label = if prefix.is_empty() { "<root>" } else { prefix };
        match BertModel::load(vb_prefix, config) {
            Ok(model) => {
                tracing::info!("Loaded BERT backbone from '{}'", label);
                return Ok((model, prefix));
            }
            Err(e) => errors.push(format!("{}: {}", label, e)),
        }
    }

    Err(Error::model_unavailable(format!(
        "Failed to load BERT backbone with tried prefixes [{}]",
        errors.join(" | ")
    )))
}

fn load_tokenizer(file: &TokenizerFile, max_length: usize) -> Result<Tokenizer> {
    let mut tokenizer = match file {
        TokenizerFile::Json(path) => {
            tracing::debug!("Loading tokenizer from tokenizer.json");
            Tokenizer::from_file(path).map_err(|e| {
                Error::model_unavailable(format!("Failed to load tokenizer.json: {}", e))
            })?
        }
        TokenizerFile::Vocab(path) => {
            tracing::debug!("Building tokenizer from vocab.txt");
            wordpiece_tokenizer(path)?
        }
    };

    tokenizer.with_padding(None);
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| Error::model_unavailable(format!("Failed to configure truncation: {}", e)))?;

    Ok(tokenizer)
}

fn wordpiece_tokenizer(vocab_path: &Path) -> Result<Tokenizer> {
    use tokenizers::models::wordpiece::WordPiece;
    use tokenizers::normalizers::BertNormalizer;
    use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
    use tokenizers::Model;
    use tokenizers::processors::bert::BertProcessing;

    let wordpiece = WordPiece::from_file(vocab_path.to_string_lossy().as_ref())
        .unk_token("[UNK]".to_string())
        .build()
        .map_err(|e| Error::model_unavailable(format!("Failed to build WordPiece model: {}", e)))?;

    let cls_id = wordpiece.token_to_id("[CLS]").unwrap_or(101);
    let sep_id = wordpiece.token_to_id("[SEP]").unwrap_or(102);

    let mut tokenizer = Tokenizer::new(wordpiece);
    tokenizer.with_normalizer(Some(BertNormalizer::default()));
    tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
    tokenizer.with_post_processor(Some(BertProcessing::new(
        ("[SEP]".to_string(), sep_id),
        ("[CLS]".to_string(), cls_id),
    )));

    Ok(tokenizer)
}
