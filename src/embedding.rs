//! Text embedding seam.
//!
//! The pipeline treats the embedder as an external capability: anything that maps a
//! string to a fixed-length vector implements [`Embedder`]. Failures are reported
//! per text so one bad remark never aborts a run.

use thiserror::Error;

use crate::cluster::util::normalize_in_place;
use crate::text::tokenize;

/// Failure of an external collaborator (embedder or translator) for one text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// The call itself failed.
    #[error("collaborator call failed: {message}")]
    Failed { message: String },
    /// The collaborator cannot handle this input, e.g. a language without a translator.
    #[error("operation not supported: {message}")]
    Unsupported { message: String },
    /// An embedding came back with the wrong length or a non-finite component.
    #[error("unusable vector: {message}")]
    BadVector { message: String },
}

impl CollaboratorError {
    pub fn failed(message: impl Into<String>) -> Self {
        CollaboratorError::Failed {
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        CollaboratorError::Unsupported {
            message: message.into(),
        }
    }

    pub fn bad_vector(message: impl Into<String>) -> Self {
        CollaboratorError::BadVector {
            message: message.into(),
        }
    }
}

/// Maps text to a fixed-length vector.
///
/// Implementations must return the same vector for the same text regardless of
/// which batch it arrives in.
pub trait Embedder {
    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Embed one text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError>;

    /// Embed a batch; the result is position-aligned with `texts`.
    fn embed_batch(&self, texts: &[&str]) -> Vec<Result<Vec<f32>, CollaboratorError>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

impl<E: Embedder + ?Sized> Embedder for &E {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Vec<Result<Vec<f32>, CollaboratorError>> {
        (**self).embed_batch(texts)
    }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Vec<Result<Vec<f32>, CollaboratorError>> {
        (**self).embed_batch(texts)
    }
}

/// Check an embedder's output before it enters clustering.
pub(crate) fn check_vector(v: &[f32], dimension: usize) -> Result<(), CollaboratorError> {
    if v.len() != dimension {
        return Err(CollaboratorError::bad_vector(format!(
            "expected {dimension} dimensions, got {}",
            v.len()
        )));
    }
    if v.iter().any(|x| !x.is_finite()) {
        return Err(CollaboratorError::bad_vector("non-finite component"));
    }
    Ok(())
}

/// Deterministic feature-hashing embedder.
///
/// Words and adjacent word pairs are hashed into signed buckets and the result is
/// L2-normalized, so texts sharing vocabulary land close together under cosine or
/// Euclidean distance. Stable across runs and platforms; useful offline and in tests.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    bigram_weight: f32,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl HashingEmbedder {
    /// `dimension` is clamped to at least 1.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            bigram_weight: 0.5,
        }
    }

    /// Weight of word-pair features relative to single words.
    pub fn with_bigram_weight(mut self, weight: f32) -> Self {
        self.bigram_weight = weight;
        self
    }

    fn add_feature(&self, out: &mut [f32], feature: &str, weight: f32) {
        let hash = blake3::hash(feature.as_bytes());
        let bytes = hash.as_bytes();
        let mut idx = [0u8; 8];
        idx.copy_from_slice(&bytes[..8]);
        let bucket = (u64::from_le_bytes(idx) % self.dimension as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        out[bucket] += sign * weight;
    }
}

impl Embedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
        let mut out = vec![0.0f32; self.dimension];
        let tokens = tokenize(text);
        if tokens.is_empty() {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(CollaboratorError::failed("empty text"));
            }
            self.add_feature(&mut out, trimmed, 1.0);
        }
        for t in &tokens {
            self.add_feature(&mut out, t, 1.0);
        }
        for pair in tokens.windows(2) {
            self.add_feature(&mut out, &format!("{} {}", pair[0], pair[1]), self.bigram_weight);
        }
        normalize_in_place(&mut out);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Metric;

    #[test]
    fn hashing_is_deterministic_and_normalized() {
        let e = HashingEmbedder::new(64);
        let a = e.embed("meter not working").unwrap();
        let b = e.embed("meter not working").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_vocabulary_is_closer() {
        let e = HashingEmbedder::default();
        let a = e.embed("electricity bill amount too high").unwrap();
        let b = e.embed("electricity bill amount is high").unwrap();
        let c = e.embed("transformer sparking near pole").unwrap();
        let m = Metric::Cosine;
        assert!(m.distance(&a, &b) < m.distance(&a, &c));
    }

    #[test]
    fn zero_bigram_weight_ignores_word_order() {
        let bag = HashingEmbedder::new(64).with_bigram_weight(0.0);
        assert_eq!(bag.embed("meter broken").unwrap(), bag.embed("broken meter").unwrap());

        let ordered = HashingEmbedder::new(256);
        assert_ne!(
            ordered.embed("meter broken").unwrap(),
            ordered.embed("broken meter").unwrap()
        );
    }

    #[test]
    fn tokenless_text_still_embeds() {
        let e = HashingEmbedder::new(16);
        assert!(e.embed("1234").is_ok());
        assert!(matches!(e.embed("   "), Err(CollaboratorError::Failed { .. })));
    }

    #[test]
    fn default_batch_matches_single_calls() {
        let e = HashingEmbedder::new(32);
        let batch = e.embed_batch(&["a b c", "power cut"]);
        assert_eq!(batch[1], e.embed("power cut"));
    }

    #[test]
    fn vector_checks() {
        assert!(check_vector(&[0.0, 1.0], 2).is_ok());
        assert!(check_vector(&[0.0], 2).is_err());
        assert!(check_vector(&[f32::NAN, 1.0], 2).is_err());
    }
}
