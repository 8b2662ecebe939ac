//! all-MiniLM-L6-v2 sentence embeddings through ONNX Runtime
//!
//! The model and tokenizer are fetched from the Hugging Face hub on first use
//! and cached there. Token states are mean-pooled over the attention mask and
//! L2-normalized, matching sentence-transformers.

use hf_hub::api::sync::Api;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tokenizers::{Tokenizer, TruncationParams};

use super::distance::normalize;
use super::embedding::Embedder;
use super::IndexError;

pub const MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L6-v2";
const MODEL_FILE: &str = "onnx/model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";
const HIDDEN_SIZE: usize = 384;
const MAX_TOKENS: usize = 256;

pub struct OnnxEmbedder {
  session: Mutex<Session>,
  tokenizer: Tokenizer,
}

impl OnnxEmbedder {
  /// Download (or reuse the cached) model files and start a session
  pub fn load() -> Result<Self, IndexError> {
    bentley::info!("Loading {}...", MODEL_NAME);

    let api = Api::new().map_err(|e| embedding_error("Hugging Face API initialization failed", e))?;
    let repo = api.model(MODEL_NAME.to_string());
    let tokenizer_file =
      repo.get(TOKENIZER_FILE).map_err(|e| embedding_error("Failed to download tokenizer", e))?;
    let model_file = repo.get(MODEL_FILE).map_err(|e| embedding_error("Failed to download ONNX model", e))?;

    Self::from_files(&model_file, &tokenizer_file)
  }

  pub fn from_files(model_file: &Path, tokenizer_file: &Path) -> Result<Self, IndexError> {
    let mut tokenizer =
      Tokenizer::from_file(tokenizer_file).map_err(|e| embedding_error("Failed to load tokenizer", e))?;
    tokenizer
      .with_truncation(Some(TruncationParams { max_length: MAX_TOKENS, ..Default::default() }))
      .map_err(|e| embedding_error("Failed to configure truncation", e))?;

    let session = Session::builder()
      .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level1))
      .and_then(|builder| builder.commit_from_file(model_file))
      .map_err(|e| embedding_error("Failed to load ONNX model", e))?;

    tracing::debug!(model = %model_file.display(), "onnx session ready");
    Ok(Self { session: Mutex::new(session), tokenizer })
  }
}

impl Embedder for OnnxEmbedder {
  fn name(&self) -> String {
    "onnx:all-MiniLM-L6-v2".to_string()
  }

  fn dimension(&self) -> usize {
    HIDDEN_SIZE
  }

  fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
    let encoding = self.tokenizer.encode(text, true).map_err(|e| embedding_error("Failed to encode text", e))?;

    let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| i64::from(id)).collect();
    let mask: Vec<i64> = encoding.get_attention_mask().iter().map(|&m| i64::from(m)).collect();
    let token_type_ids = vec![0i64; ids.len()];
    let length = ids.len();

    let input = |values: Vec<i64>| {
      Tensor::from_array(([1, length], values.into_boxed_slice()))
        .map_err(|e| embedding_error("Failed to build input tensor", e))
    };
    let inputs = ort::inputs![
      "input_ids" => input(ids)?,
      "attention_mask" => input(mask.clone())?,
      "token_type_ids" => input(token_type_ids)?
    ];

    let mut session =
      self.session.lock().map_err(|_| IndexError::Embedding("ONNX session lock poisoned".to_string()))?;
    let outputs = session.run(inputs).map_err(|e| embedding_error("Inference failed", e))?;
    let hidden = last_hidden_state(&outputs)?;

    let mut pooled = mean_pool(hidden, &mask, HIDDEN_SIZE);
    normalize(&mut pooled);
    Ok(pooled)
  }
}

fn last_hidden_state<'a>(outputs: &'a SessionOutputs<'_>) -> Result<&'a [f32], IndexError> {
  let output = outputs
    .get("last_hidden_state")
    .ok_or_else(|| IndexError::Embedding("model has no last_hidden_state output".to_string()))?;
  let (_shape, data) =
    output.try_extract_tensor::<f32>().map_err(|e| embedding_error("Unexpected output tensor", e))?;
  Ok(data)
}

/// Average of the token states whose attention mask is set. `hidden` is
/// `[tokens, hidden_size]` in row-major order.
pub fn mean_pool(hidden: &[f32], mask: &[i64], hidden_size: usize) -> Vec<f32> {
  let mut pooled = vec![0.0f32; hidden_size];
  let mut count = 0.0f32;

  for (token, state) in hidden.chunks_exact(hidden_size).enumerate() {
    if mask.get(token).copied().unwrap_or(0) == 0 {
      continue;
    }
    pooled.iter_mut().zip(state).for_each(|(sum, x)| *sum += x);
    count += 1.0;
  }

  if count > 0.0 {
    pooled.iter_mut().for_each(|x| *x /= count);
  }
  pooled
}

fn embedding_error(context: &str, error: impl std::fmt::Display) -> IndexError {
  IndexError::Embedding(format!("{context}: {error}"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_mean_pool_skips_masked_tokens() {
    let hidden = [1.0, 2.0, 3.0, 4.0, 100.0, 100.0];
    assert_eq!(mean_pool(&hidden, &[1, 1, 0], 2), vec![2.0, 3.0]);
  }

  #[test]
  fn test_mean_pool_without_tokens_is_zero() {
    assert_eq!(mean_pool(&[5.0, 5.0], &[0], 2), vec![0.0, 0.0]);
    assert_eq!(mean_pool(&[], &[], 3), vec![0.0; 3]);
  }

  #[test]
  fn test_missing_model_file_is_an_embedding_error() {
    let temp = tempfile::TempDir::new().unwrap();
    let missing = temp.path().join("absent.json");
    let err = OnnxEmbedder::from_files(&temp.path().join("model.onnx"), &missing).err().unwrap();
    assert!(matches!(err, IndexError::Embedding(message) if message.contains("tokenizer")));
  }
}
