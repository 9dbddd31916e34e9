use crate::error::{Error, Result};

/// A fixed-length sentence embedding.
pub type Embedding = Vec<f32>;

/// Maps text to fixed-length vectors.
///
/// Implementations must be deterministic for a fixed model version and
/// safe to share across the ranking worker pool.
pub trait EmbeddingProvider: Send + Sync {
    /// Human-readable identifier of the underlying model.
    fn model_id(&self) -> &str;

    /// Embed a batch of texts, returning one vector per input in order.
    ///
    /// Callers must not pass empty or whitespace-only texts; see
    /// [`ensure_non_empty`].
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Embedding> {
        ensure_non_empty(text)?;
        let mut out = self.embed_batch(&[text.to_string()])?;
        match (out.pop(), out.is_empty()) {
            (Some(v), true) => Ok(v),
            _ => Err(Error::Model(
                "provider returned the wrong number of embeddings".into(),
            )),
        }
    }
}

/// Reject text that carries nothing to embed.
pub fn ensure_non_empty(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        Err(Error::EmptyInput)
    } else {
        Ok(())
    }
}

/// Embed `texts` in batches, isolating failures to single items.
///
/// A batch that fails as a whole is retried text by text, so one bad input
/// only costs its own slot. The returned vector is aligned with `texts`.
pub fn embed_isolated(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> Vec<Result<Embedding>> {
    if texts.is_empty() {
        return Vec::new();
    }

    match provider.embed_batch(texts) {
        Ok(vectors) if vectors.len() == texts.len() => {
            vectors.into_iter().map(Ok).collect()
        }
        Ok(vectors) => {
            tracing::warn!(
                expected = texts.len(),
                got = vectors.len(),
                "embedding batch size mismatch, retrying individually"
            );
            texts.iter().map(|t| provider.embed(t)).collect()
        }
        Err(e) => {
            tracing::debug!("embedding batch failed ({e}), retrying individually");
            texts.iter().map(|t| provider.embed(t)).collect()
        }
    }
}
