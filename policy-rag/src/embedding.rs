//! The embedding side of the index adapter.

use async_trait::async_trait;

use crate::error::{RagError, Result};

/// Turns text into fixed-length vectors for the vector store.
///
/// The same provider must be used to build an index and to query it; vectors
/// from different providers are not comparable.
///
/// ```rust,ignore
/// use policy_rag::{EmbeddingProvider, HashingEmbeddingProvider};
///
/// let provider = HashingEmbeddingProvider::default();
/// let vector = provider.embed("refund window").await?;
/// assert_eq!(vector.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, one vector per input in input order.
    ///
    /// Falls back to one [`embed`](EmbeddingProvider::embed) call per text.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;
}

/// Fail unless every vector has the provider's advertised length.
pub(crate) fn check_dimensions(
    provider: &dyn EmbeddingProvider,
    vectors: &[Vec<f32>],
) -> Result<()> {
    let expected = provider.dimensions();
    match vectors.iter().position(|v| v.len() != expected) {
        None => Ok(()),
        Some(i) => Err(RagError::EmbeddingError {
            provider: provider.name().to_string(),
            message: format!("vector {i} has {} dimensions, expected {expected}", vectors[i].len()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashingEmbeddingProvider;

    #[tokio::test]
    async fn default_batch_preserves_order() {
        let provider = HashingEmbeddingProvider::new(32).unwrap();
        let batch = provider.embed_batch(&["refunds", "shipping"]).await.unwrap();
        assert_eq!(batch[0], provider.embed("refunds").await.unwrap());
        assert_eq!(batch[1], provider.embed("shipping").await.unwrap());
        assert!(check_dimensions(&provider, &batch).is_ok());
    }

    #[test]
    fn wrong_length_is_reported() {
        let provider = HashingEmbeddingProvider::new(4).unwrap();
        let err = check_dimensions(&provider, &[vec![0.0; 4], vec![0.0; 3]]).unwrap_err();
        assert!(err.to_string().contains("vector 1 has 3 dimensions, expected 4"));
    }
}
