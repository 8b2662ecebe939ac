//! Generative text collaborators
//!
//! Everything that talks to a language model goes through [`TextGenerator`], so
//! the parsing and exercise code never depends on a concrete provider. Failures
//! come back as [`GenerationError`]; callers decide whether to fall back or to
//! surface the failure.

pub mod openrouter;

use thiserror::Error;

pub use openrouter::OpenRouterClient;

/// Sampling options passed with every prompt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
  pub temperature: f32,
}

impl GenerationConfig {
  pub fn with_temperature(temperature: f32) -> Self {
    Self { temperature }
  }
}

impl Default for GenerationConfig {
  fn default() -> Self {
    Self { temperature: 0.7 }
  }
}

#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("generation service is not configured: {0}")]
  NotConfigured(String),
  #[error("request to generation service failed: {0}")]
  Request(String),
  #[error("generation service returned {status}: {body}")]
  Status { status: u16, body: String },
  #[error("generation service returned no content")]
  EmptyResponse,
  #[error("unexpected response from generation service: {0}")]
  Malformed(String),
}

/// A source of free text for a prompt
#[cfg_attr(test, mockall::automock)]
pub trait TextGenerator {
  fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, GenerationError>;
}

impl<F> TextGenerator for F
where
  F: Fn(&str, &GenerationConfig) -> Result<String, GenerationError>,
{
  fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, GenerationError> {
    self(prompt, config)
  }
}

/// Stand-in used when no provider is configured; every call fails
#[derive(Debug, Clone)]
pub struct Unavailable {
  reason: String,
}

impl Unavailable {
  pub fn new(reason: impl Into<String>) -> Self {
    Self { reason: reason.into() }
  }
}

impl TextGenerator for Unavailable {
  fn generate(&self, _prompt: &str, _config: &GenerationConfig) -> Result<String, GenerationError> {
    Err(GenerationError::NotConfigured(self.reason.clone()))
  }
}
