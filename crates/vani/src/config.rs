//! Configuration for vani
//!
//! Settings live in `<home>/config.json`; every field has a default so a
//! missing file or a partial file both work. The home directory is
//! `~/.vani` unless `VANI_HOME` points somewhere else.

use anyhow::{anyhow, Context, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub generation: GenerationSettings,
  #[serde(default)]
  pub embedding: EmbeddingSettings,
  #[serde(default)]
  pub index: IndexSettings,
  #[serde(default)]
  pub captions: CaptionSettings,
}

/// Chat-completions provider settings. The API key is read from the
/// environment only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
  #[serde(default = "default_api_url")]
  pub api_url: String,
  #[serde(default = "default_model")]
  pub model: String,
  #[serde(default = "default_temperature")]
  pub temperature: f32,
  #[serde(default = "default_generation_timeout")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
  /// Local feature hashing, no network
  Hashing,
  /// OpenAI-compatible `/embeddings` endpoint
  Remote,
  /// Local all-MiniLM-L6-v2 through ONNX Runtime (`neural` feature)
  Onnx,
}

impl Default for EmbeddingProvider {
  fn default() -> Self {
    if cfg!(feature = "neural") {
      EmbeddingProvider::Onnx
    } else {
      EmbeddingProvider::Hashing
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
  #[serde(default)]
  pub provider: EmbeddingProvider,
  #[serde(default = "default_dimension")]
  pub dimension: usize,
  #[serde(default = "default_embedding_endpoint")]
  pub endpoint: String,
  #[serde(default = "default_embedding_model")]
  pub model: String,
  #[serde(default = "default_embedding_timeout")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
  /// Overrides `<home>/index`
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub directory: Option<PathBuf>,
  #[serde(default = "default_collection")]
  pub collection: String,
}

/// Where `vani fetch` downloads captions from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSettings {
  #[serde(default = "default_caption_url")]
  pub base_url: String,
  #[serde(default = "default_caption_timeout")]
  pub timeout_secs: u64,
}

fn default_api_url() -> String {
  "https://openrouter.ai/api/v1/chat/completions".to_string()
}
fn default_model() -> String {
  "google/gemini-2.0-flash-lite-001".to_string()
}
fn default_temperature() -> f32 {
  0.7
}
fn default_generation_timeout() -> u64 {
  60
}
fn default_dimension() -> usize {
  384
}
fn default_embedding_endpoint() -> String {
  "https://api.openai.com/v1".to_string()
}
fn default_embedding_model() -> String {
  "text-embedding-3-small".to_string()
}
fn default_embedding_timeout() -> u64 {
  30
}
fn default_collection() -> String {
  "transcripts".to_string()
}
fn default_caption_url() -> String {
  "https://www.youtube.com".to_string()
}
fn default_caption_timeout() -> u64 {
  30
}

impl Default for GenerationSettings {
  fn default() -> Self {
    Self {
      api_url: default_api_url(),
      model: default_model(),
      temperature: default_temperature(),
      timeout_secs: default_generation_timeout(),
    }
  }
}

impl Default for EmbeddingSettings {
  fn default() -> Self {
    Self {
      provider: EmbeddingProvider::default(),
      dimension: default_dimension(),
      endpoint: default_embedding_endpoint(),
      model: default_embedding_model(),
      timeout_secs: default_embedding_timeout(),
    }
  }
}

impl Default for IndexSettings {
  fn default() -> Self {
    Self { directory: None, collection: default_collection() }
  }
}

impl Default for CaptionSettings {
  fn default() -> Self {
    Self { base_url: default_caption_url(), timeout_secs: default_caption_timeout() }
  }
}

impl Config {
  /// Load configuration from a file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&content)
      .with_context(|| format!("Invalid config file {}", path.display()))
  }

  /// Load `<home>/config.json`, or defaults when there is none
  pub fn load() -> Result<Self> {
    let path = get_vani_home()?.join(CONFIG_FILE);
    if path.exists() {
      Self::load_from_file(path)
    } else {
      Ok(Config::default())
    }
  }

  pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(self)?;
    std::fs::write(path, content)?;
    Ok(())
  }

  /// Directory holding the persisted index collections
  pub fn index_dir(&self) -> Result<PathBuf> {
    match &self.index.directory {
      Some(dir) => Ok(dir.clone()),
      None => Ok(get_vani_home()?.join("index")),
    }
  }

  /// Directory where fetched raw transcripts are saved
  pub fn transcripts_dir(&self) -> Result<PathBuf> {
    Ok(get_vani_home()?.join("transcripts"))
  }

  /// Directory where structured transcripts are saved and read back from
  pub fn structured_dir(&self) -> Result<PathBuf> {
    Ok(get_vani_home()?.join("structured_transcripts"))
  }
}

/// Get the vani home directory (~/.vani)
pub fn get_vani_home() -> Result<PathBuf> {
  if let Ok(custom_home) = std::env::var("VANI_HOME") {
    return Ok(PathBuf::from(custom_home));
  }

  let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
  Ok(home.join(".vani"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use tempfile::TempDir;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.generation.model, "google/gemini-2.0-flash-lite-001");
    assert_eq!(config.generation.temperature, 0.7);
    assert_eq!(config.embedding.dimension, 384);
    assert_eq!(config.index.collection, "transcripts");
    assert_eq!(config.captions.base_url, "https://www.youtube.com");
  }

  #[test]
  fn test_default_provider_follows_neural_feature() {
    let expected = if cfg!(feature = "neural") { EmbeddingProvider::Onnx } else { EmbeddingProvider::Hashing };
    assert_eq!(EmbeddingProvider::default(), expected);

    let parsed: EmbeddingSettings = serde_json::from_str(r#"{"provider": "onnx"}"#).unwrap();
    assert_eq!(parsed.provider, EmbeddingProvider::Onnx);
  }

  #[test]
  fn test_partial_file_keeps_defaults() -> Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join(CONFIG_FILE);
    std::fs::write(&path, r#"{"generation": {"temperature": 0.2}, "embedding": {"provider": "remote"}}"#)?;

    let config = Config::load_from_file(&path)?;
    assert_eq!(config.generation.temperature, 0.2);
    assert_eq!(config.generation.model, default_model());
    assert_eq!(config.embedding.provider, EmbeddingProvider::Remote);
    assert_eq!(config.embedding.dimension, 384);
    Ok(())
  }

  #[test]
  fn test_invalid_file_is_an_error() -> Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join(CONFIG_FILE);
    std::fs::write(&path, "not json")?;

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("Invalid config file"));
    Ok(())
  }

  #[test]
  #[serial]
  fn test_home_override_and_load() -> Result<()> {
    let temp = TempDir::new()?;
    std::env::set_var("VANI_HOME", temp.path());

    assert_eq!(get_vani_home()?, temp.path());
    assert_eq!(Config::load()?.index.collection, "transcripts");

    let mut config = Config::default();
    config.index.collection = "lessons".to_string();
    config.save_to_file(temp.path().join(CONFIG_FILE))?;

    let loaded = Config::load()?;
    assert_eq!(loaded.index.collection, "lessons");
    assert_eq!(loaded.index_dir()?, temp.path().join("index"));
    assert_eq!(loaded.transcripts_dir()?, temp.path().join("transcripts"));

    std::env::remove_var("VANI_HOME");
    Ok(())
  }
}
