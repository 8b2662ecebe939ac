//! OpenRouter chat-completions client

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{GenerationConfig, GenerationError, TextGenerator};
use crate::config::GenerationSettings;

pub const API_KEY_VAR: &str = "OPENROUTER_API_KEY";

const SYSTEM_PROMPT: &str = "You are a helpful AI assistant focused on Hindi language learning.";

pub struct OpenRouterClient {
  client: Client,
  api_key: String,
  api_url: String,
  model: String,
}

impl OpenRouterClient {
  pub fn new(api_key: String, settings: &GenerationSettings) -> Result<Self, GenerationError> {
    if api_key.trim().is_empty() {
      return Err(GenerationError::NotConfigured(format!("{API_KEY_VAR} is empty")));
    }

    let client = Client::builder()
      .timeout(Duration::from_secs(settings.timeout_secs))
      .build()
      .map_err(|e| GenerationError::Request(format!("failed to build HTTP client: {e}")))?;

    Ok(Self {
      client,
      api_key: api_key.trim().to_string(),
      api_url: settings.api_url.clone(),
      model: settings.model.clone(),
    })
  }

  /// Build a client from `OPENROUTER_API_KEY`
  pub fn from_env(settings: &GenerationSettings) -> Result<Self, GenerationError> {
    let api_key = std::env::var(API_KEY_VAR)
      .map_err(|_| GenerationError::NotConfigured(format!("{API_KEY_VAR} is not set")))?;
    Self::new(api_key, settings)
  }

  pub fn model(&self) -> &str {
    &self.model
  }

  fn headers(&self) -> Result<HeaderMap, GenerationError> {
    let mut headers = HeaderMap::new();
    let auth = format!("Bearer {}", self.api_key);
    headers.insert(
      AUTHORIZATION,
      HeaderValue::from_str(&auth)
        .map_err(|_| GenerationError::NotConfigured("invalid API key".to_string()))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
  }
}

impl TextGenerator for OpenRouterClient {
  fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, GenerationError> {
    let body = ChatRequest {
      model: &self.model,
      temperature: config.temperature,
      messages: vec![
        ChatMessage { role: "system", content: SYSTEM_PROMPT },
        ChatMessage { role: "user", content: prompt },
      ],
    };

    tracing::debug!(model = %self.model, prompt_chars = prompt.chars().count(), "chat completion request");

    let response = self
      .client
      .post(&self.api_url)
      .headers(self.headers()?)
      .json(&body)
      .send()
      .map_err(|e| GenerationError::Request(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().unwrap_or_else(|_| "<body unavailable>".to_string());
      return Err(GenerationError::Status { status: status.as_u16(), body });
    }

    let parsed: ChatResponse =
      response.json().map_err(|e| GenerationError::Malformed(e.to_string()))?;
    extract_content(parsed)
  }
}

/// Pull the first choice's text out of a response body
fn extract_content(response: ChatResponse) -> Result<String, GenerationError> {
  if let Some(error) = response.error {
    return Err(GenerationError::Malformed(format!("provider error: {error}")));
  }

  let content = response
    .choices
    .into_iter()
    .next()
    .and_then(|choice| choice.message.content)
    .filter(|content| !content.trim().is_empty())
    .ok_or(GenerationError::EmptyResponse)?;

  Ok(compact_json_object(content))
}

/// Object-shaped content that parses is re-serialized compactly; anything
/// else is returned untouched
fn compact_json_object(content: String) -> String {
  let trimmed = content.trim();
  if trimmed.starts_with('{') && trimmed.ends_with('}') {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
      if let Ok(compact) = serde_json::to_string(&value) {
        return compact;
      }
    }
  }
  content
}

#[derive(Serialize)]
struct ChatRequest<'a> {
  model: &'a str,
  temperature: f32,
  messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
  role: &'a str,
  content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<ChatChoice>,
  #[serde(default)]
  error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
  message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
  #[serde(default)]
  content: Option<String>,
}
