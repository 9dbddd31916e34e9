use std::sync::{Mutex, MutexGuard};

use candle_core::{Device, Tensor};
use pylate_rs::ColBERT;

use crate::{
    embedding::{Embedding, EmbeddingProvider, ensure_non_empty},
    error::{Error, Result},
};

pub const DEFAULT_MODEL_ID: &str = "lightonai/GTE-ModernColBERT-v1";
pub const MODEL_ENV_VAR: &str = "RESUMERANK_MODEL";

/// Select the best available compute device.
///
/// Uses CUDA when compiled with the `cuda` feature, Metal when compiled with
/// the `metal` feature, and falls back to CPU otherwise.
fn default_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            return device;
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            return device;
        }
    }

    Device::Cpu
}

/// ColBERT-backed [`EmbeddingProvider`], loaded lazily on first use.
///
/// ColBERT produces one vector per token; these are mean-pooled and
/// L2-normalised into a single sentence vector so resumes and job
/// descriptions can be compared with cosine similarity.
pub struct ModelManager {
    model: Mutex<Option<ColBERT>>,
    model_id: String,
}

impl Default for ModelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelManager {
    /// Creates a new `ModelManager`. The model ID is resolved from:
    /// 1. The `RESUMERANK_MODEL` environment variable, if set
    /// 2. Otherwise, the default model (`lightonai/GTE-ModernColBERT-v1`)
    pub fn new() -> Self {
        let model_id = std::env::var(MODEL_ENV_VAR)
            .unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());
        Self::with_model_id(model_id)
    }

    /// Creates a `ModelManager` with an explicit model ID, bypassing
    /// environment variable resolution.
    pub fn with_model_id(model_id: String) -> Self {
        Self {
            model: Mutex::new(None),
            model_id,
        }
    }

    /// Returns `true` if the model has already been loaded into memory.
    pub fn is_loaded(&self) -> bool {
        self.model.lock().map(|m| m.is_some()).unwrap_or(false)
    }

    /// Ensures the model is loaded, downloading from HuggingFace Hub if needed.
    fn ensure_loaded(&self) -> Result<MutexGuard<'_, Option<ColBERT>>> {
        let mut guard = self
            .model
            .lock()
            .map_err(|_| Error::Model("model lock poisoned".into()))?;

        if guard.is_none() {
            tracing::info!(model = %self.model_id, "loading embedding model");
            let colbert: ColBERT = ColBERT::from(&self.model_id)
                .with_device(default_device())
                .try_into()
                .map_err(|e| {
                    Error::Model(format!(
                        "failed to load model {}: {e}",
                        self.model_id
                    ))
                })?;
            *guard = Some(colbert);
        }

        Ok(guard)
    }
}

impl EmbeddingProvider for ModelManager {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        for text in texts {
            ensure_non_empty(text)?;
        }

        let mut guard = self.ensure_loaded()?;
        let model = guard
            .as_mut()
            .ok_or_else(|| Error::Model("model not loaded".into()))?;

        // shape: [batch_size, num_tokens, dimension]
        let embeddings = model
            .encode(texts, false)
            .map_err(|e| Error::Model(format!("encoding failed: {e}")))?;
        drop(guard);

        let (batch_size, _num_tokens, _dimension) = embeddings.dims3()?;
        if batch_size != texts.len() {
            return Err(Error::Model(format!(
                "expected {} embeddings, model returned {batch_size}",
                texts.len()
            )));
        }

        (0..batch_size)
            .map(|i| {
                let tokens: Tensor = embeddings.get(i)?;
                mean_pool(&tokens.to_vec2::<f32>()?)
            })
            .collect()
    }
}

/// Average token vectors into one unit-length vector.
///
/// All-zero rows are padding and do not contribute to the mean.
pub fn mean_pool(tokens: &[Vec<f32>]) -> Result<Embedding> {
    let dimension = tokens.first().map(Vec::len).unwrap_or(0);
    if dimension == 0 {
        return Err(Error::DegenerateVector);
    }

    let mut sum = vec![0.0_f64; dimension];
    let mut counted = 0usize;
    for row in tokens {
        if row.len() != dimension {
            return Err(Error::DimensionMismatch {
                left: dimension,
                right: row.len(),
            });
        }
        if row.iter().all(|&x| x == 0.0) {
            continue;
        }
        for (acc, &x) in sum.iter_mut().zip(row) {
            *acc += f64::from(x);
        }
        counted += 1;
    }
    if counted == 0 {
        return Err(Error::DegenerateVector);
    }

    let norm = sum.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(Error::DegenerateVector);
    }
    Ok(sum.into_iter().map(|x| (x / norm) as f32).collect())
}
