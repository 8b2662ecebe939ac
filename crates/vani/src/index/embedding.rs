//! Text embedders for the transcript index

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::distance::normalize;
use super::IndexError;
use crate::config::{EmbeddingProvider, EmbeddingSettings};

pub const EMBEDDING_KEY_VAR: &str = "VANI_EMBEDDING_API_KEY";

/// Name and dimension of the embedder that produced a collection's vectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedderIdentity {
  pub name: String,
  pub dimension: usize,
}

impl EmbedderIdentity {
  pub fn of(embedder: &dyn Embedder) -> Self {
    Self { name: embedder.name(), dimension: embedder.dimension() }
  }
}

impl std::fmt::Display for EmbedderIdentity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} ({} dims)", self.name, self.dimension)
  }
}

/// Deterministic text to fixed-length vector mapping
#[cfg_attr(test, mockall::automock)]
pub trait Embedder {
  fn name(&self) -> String;
  fn dimension(&self) -> usize;
  fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError>;
}

/// Build the embedder selected in the configuration
pub fn from_settings(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>, IndexError> {
  match settings.provider {
    EmbeddingProvider::Hashing => Ok(Box::new(HashingEmbedder::new(settings.dimension))),
    EmbeddingProvider::Remote => Ok(Box::new(RemoteEmbedder::from_settings(settings)?)),
    #[cfg(feature = "neural")]
    EmbeddingProvider::Onnx => Ok(Box::new(super::onnx::OnnxEmbedder::load()?)),
    #[cfg(not(feature = "neural"))]
    EmbeddingProvider::Onnx => {
      Err(IndexError::Embedding("the onnx provider needs vani built with the neural feature".to_string()))
    }
  }
}

/// Signed feature hashing of lower-cased word tokens, L2-normalized.
///
/// Texts sharing words land near each other; identical token multisets give
/// identical vectors.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
  dimension: usize,
}

impl HashingEmbedder {
  pub fn new(dimension: usize) -> Self {
    Self { dimension: dimension.max(1) }
  }
}

impl Default for HashingEmbedder {
  fn default() -> Self {
    Self::new(384)
  }
}

impl Embedder for HashingEmbedder {
  fn name(&self) -> String {
    "hashing-v1".to_string()
  }

  fn dimension(&self) -> usize {
    self.dimension
  }

  fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
    let mut vector = vec![0.0f32; self.dimension];

    for token in tokenize(text) {
      let hash = fnv1a(token.as_bytes());
      let bucket = (hash % self.dimension as u64) as usize;
      let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
      vector[bucket] += sign;
    }

    normalize(&mut vector);
    Ok(vector)
  }
}

/// Whitespace-separated words, lower-cased, with surrounding punctuation removed
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
  text
    .split_whitespace()
    .map(|word| word.trim_matches(is_token_boundary).to_lowercase())
    .filter(|word| !word.is_empty())
}

fn is_token_boundary(c: char) -> bool {
  c.is_ascii_punctuation() || matches!(c, '।' | '॥' | '“' | '”' | '‘' | '’' | '…')
}

// 64-bit FNV-1a. Persisted vectors depend on this staying fixed.
fn fnv1a(bytes: &[u8]) -> u64 {
  bytes.iter().fold(0xcbf29ce484222325u64, |hash, byte| {
    (hash ^ u64::from(*byte)).wrapping_mul(0x100000001b3)
  })
}

/// Client for an OpenAI-compatible `/embeddings` endpoint
pub struct RemoteEmbedder {
  client: Client,
  endpoint: String,
  model: String,
  dimension: usize,
}

impl RemoteEmbedder {
  pub fn new(
    base_url: &str,
    model: &str,
    dimension: usize,
    api_key: Option<String>,
    timeout: Duration,
  ) -> Result<Self, IndexError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
      let auth = format!("Bearer {}", key.trim());
      headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&auth)
          .map_err(|_| IndexError::Embedding("invalid embedding API key".to_string()))?,
      );
    }

    let client = Client::builder()
      .timeout(timeout)
      .default_headers(headers)
      .build()
      .map_err(|e| IndexError::Embedding(format!("failed to build HTTP client: {e}")))?;

    Ok(Self {
      client,
      endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
      model: model.to_string(),
      dimension,
    })
  }

  /// Uses `VANI_EMBEDDING_API_KEY` when it is set
  pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self, IndexError> {
    Self::new(
      &settings.endpoint,
      &settings.model,
      settings.dimension,
      std::env::var(EMBEDDING_KEY_VAR).ok(),
      Duration::from_secs(settings.timeout_secs),
    )
  }

  pub fn endpoint(&self) -> &str {
    &self.endpoint
  }
}

impl Embedder for RemoteEmbedder {
  fn name(&self) -> String {
    format!("remote:{}", self.model)
  }

  fn dimension(&self) -> usize {
    self.dimension
  }

  fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
    let request = EmbeddingRequest { model: &self.model, input: [text], dimensions: self.dimension };

    let response = self
      .client
      .post(&self.endpoint)
      .json(&request)
      .send()
      .map_err(|e| IndexError::Embedding(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().unwrap_or_else(|_| "<body unavailable>".to_string());
      return Err(IndexError::Embedding(format!("embeddings request failed ({status}): {body}")));
    }

    let parsed: EmbeddingResponse = response
      .json()
      .map_err(|e| IndexError::Embedding(format!("failed to parse embedding response: {e}")))?;
    let embedding = parsed
      .data
      .into_iter()
      .next()
      .map(|entry| entry.embedding)
      .ok_or_else(|| IndexError::Embedding("embedding response was empty".to_string()))?;

    if embedding.len() != self.dimension {
      return Err(IndexError::DimensionMismatch { expected: self.dimension, actual: embedding.len() });
    }
    Ok(embedding)
  }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  input: [&'a str; 1],
  dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
  embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::index::distance::squared_l2;

  #[test]
  fn test_hashing_is_deterministic_and_normalized() {
    let embedder = HashingEmbedder::default();
    let a = embedder.embed("राम बाज़ार गया").unwrap();
    let b = embedder.embed("राम बाज़ार गया").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 384);

    let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-5);
  }

  #[test]
  fn test_case_and_punctuation_do_not_matter() {
    let embedder = HashingEmbedder::new(64);
    assert_eq!(embedder.embed("Hello, World!").unwrap(), embedder.embed("hello world").unwrap());
    assert_eq!(embedder.embed("घर।").unwrap(), embedder.embed("घर").unwrap());
  }

  #[test]
  fn test_shared_words_are_closer() {
    let embedder = HashingEmbedder::default();
    let query = embedder.embed("train station ticket").unwrap();
    let near = embedder.embed("buying a train ticket at the station").unwrap();
    let far = embedder.embed("cooking dal with rice").unwrap();
    assert!(squared_l2(&query, &near) < squared_l2(&query, &far));
  }

  #[test]
  fn test_empty_text_is_zero_vector() {
    let embedder = HashingEmbedder::new(8);
    assert_eq!(embedder.embed("  ").unwrap(), vec![0.0; 8]);
  }

  #[test]
  fn test_identity_names_embedder() {
    let identity = EmbedderIdentity::of(&HashingEmbedder::new(16));
    assert_eq!(identity, EmbedderIdentity { name: "hashing-v1".to_string(), dimension: 16 });
    assert_eq!(identity.to_string(), "hashing-v1 (16 dims)");
  }

  #[cfg(not(feature = "neural"))]
  #[test]
  fn test_onnx_provider_needs_neural_feature() {
    let settings = EmbeddingSettings { provider: EmbeddingProvider::Onnx, ..EmbeddingSettings::default() };
    let err = from_settings(&settings).err().unwrap();
    assert!(err.to_string().contains("neural feature"));
  }

  #[test]
  fn test_remote_endpoint_path() {
    let embedder =
      RemoteEmbedder::new("http://localhost:8080/v1/", "mini", 8, None, Duration::from_secs(1)).unwrap();
    assert_eq!(embedder.endpoint(), "http://localhost:8080/v1/embeddings");
    assert_eq!(embedder.name(), "remote:mini");
  }
}
