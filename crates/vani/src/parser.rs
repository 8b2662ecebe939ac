//! Recovery of structured records from free-form model output
//!
//! Models asked for JSON routinely wrap it in code fences, pad it with prose or
//! leave placeholder tokens behind. [`parse`] runs an ordered cascade of
//! decoding strategies and always returns a populated [`StructuredTranscript`];
//! the winning [`Strategy`] is reported alongside so callers can tell a real
//! decode from the synthesized default.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Maximum length of an introduction, in characters
pub const INTRODUCTION_LIMIT: usize = 100;

/// Fence markers and placeholder tokens removed during cleaning, in removal order
const NOISE_TOKENS: [&str; 6] = ["```json", "```", "...", "…", "\"\"", "''"];

/// First `{` to last `}`, across lines
const WIDEST_BRACE_SPAN: &str = r"(?s)\{.*\}";

const TEXT_KEYS: [&str; 4] = ["introduction", "dialogue", "question", "answer"];

/// A transcript or exercise as extracted by the model.
///
/// Field order is the on-disk key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredTranscript {
  #[serde(default)]
  pub introduction: String,
  #[serde(default)]
  pub dialogue: String,
  #[serde(default)]
  pub question: String,
  #[serde(default)]
  pub help_clues: Option<String>,
  #[serde(default)]
  pub answer: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  /// The trimmed text was already a JSON object
  Direct,
  /// Decoded after removing fences and placeholder tokens
  Cleaned,
  /// Decoded from a `{ ... }` span inside surrounding text
  BraceSpan,
  /// Nothing decoded; the record was synthesized from the raw text
  Default,
}

impl Strategy {
  pub fn name(&self) -> &'static str {
    match self {
      Strategy::Direct => "direct",
      Strategy::Cleaned => "cleaned",
      Strategy::BraceSpan => "brace-span",
      Strategy::Default => "default",
    }
  }
}

impl fmt::Display for Strategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
  pub record: StructuredTranscript,
  pub strategy: Strategy,
}

impl ParsedResponse {
  /// True when the record came from decoded JSON rather than the default
  pub fn is_structured(&self) -> bool {
    self.strategy != Strategy::Default
  }
}

/// Parse model output into a structured record. Never fails.
pub fn parse(raw: &str) -> ParsedResponse {
  let cascade: [(Strategy, fn(&str) -> Option<Map<String, Value>>); 3] = [
    (Strategy::Direct, decode_direct),
    (Strategy::Cleaned, decode_cleaned),
    (Strategy::BraceSpan, decode_brace_span),
  ];

  for (strategy, decode) in cascade {
    if let Some(map) = decode(raw) {
      tracing::debug!(strategy = %strategy, "decoded model response");
      return ParsedResponse { record: normalize(&map), strategy };
    }
  }

  tracing::debug!(chars = raw.chars().count(), "no JSON object found, using default record");
  ParsedResponse { record: default_record(raw), strategy: Strategy::Default }
}

pub fn decode_direct(raw: &str) -> Option<Map<String, Value>> {
  decode_object(raw.trim())
}

pub fn decode_cleaned(raw: &str) -> Option<Map<String, Value>> {
  decode_object(&clean_text(raw))
}

/// Decode the widest `{ ... }` span, then each balanced span in order
pub fn decode_brace_span(raw: &str) -> Option<Map<String, Value>> {
  let widest = Regex::new(WIDEST_BRACE_SPAN).ok();
  if let Some(span) = widest.as_ref().and_then(|re| re.find(raw)) {
    if let Some(map) = decode_object(span.as_str()) {
      return Some(map);
    }
  }

  raw
    .char_indices()
    .filter(|(_, c)| *c == '{')
    .filter_map(|(start, _)| balanced_span(raw, start))
    .find_map(decode_object)
}

/// Record synthesized when no strategy decodes anything. The raw text fills
/// introduction, dialogue and answer, then goes through [`normalize`] like
/// any decoded object.
pub fn default_record(raw: &str) -> StructuredTranscript {
  let mut map = Map::new();
  for key in ["introduction", "dialogue", "answer"] {
    map.insert(key.to_string(), Value::String(raw.to_string()));
  }
  map.insert("question".to_string(), Value::String(String::new()));
  map.insert("help_clues".to_string(), Value::Null);
  normalize(&map)
}

/// Remove fence markers and placeholder tokens, then trim
pub fn clean_text(text: &str) -> String {
  NOISE_TOKENS
    .iter()
    .fold(text.to_string(), |acc, token| acc.replace(token, ""))
    .trim()
    .to_string()
}

/// Turn a decoded object into a record with every required key present
pub fn normalize(map: &Map<String, Value>) -> StructuredTranscript {
  let [introduction, dialogue, question, answer] = TEXT_KEYS.map(|key| text_value(map.get(key)));

  let help_clues = match map.get("help_clues") {
    None | Some(Value::Null) => None,
    other => Some(text_value(other)),
  };

  let options = match map.get("options") {
    Some(Value::Array(entries)) => Some(
      entries
        .iter()
        .filter(|entry| !matches!(entry, Value::Null | Value::Array(_) | Value::Object(_)))
        .map(|entry| text_value(Some(entry)))
        .filter(|entry| !entry.is_empty())
        .collect(),
    ),
    _ => None,
  };

  StructuredTranscript {
    introduction: truncate_chars(&introduction, INTRODUCTION_LIMIT),
    dialogue,
    question,
    help_clues,
    answer,
    options,
  }
}

pub fn truncate_chars(text: &str, limit: usize) -> String {
  text.chars().take(limit).collect()
}

fn text_value(value: Option<&Value>) -> String {
  match value {
    None | Some(Value::Null) => String::new(),
    Some(Value::String(s)) => clean_text(s),
    Some(other) => clean_text(&other.to_string()),
  }
}

fn decode_object(text: &str) -> Option<Map<String, Value>> {
  match serde_json::from_str::<Value>(text) {
    Ok(Value::Object(map)) => Some(map),
    _ => None,
  }
}

/// The span from the `{` at `start` to its matching `}`, skipping braces
/// inside string literals
fn balanced_span(text: &str, start: usize) -> Option<&str> {
  let mut depth = 0usize;
  let mut in_string = false;
  let mut escaped = false;

  for (offset, c) in text[start..].char_indices() {
    if in_string {
      match c {
        _ if escaped => escaped = false,
        '\\' => escaped = true,
        '"' => in_string = false,
        _ => {}
      }
      continue;
    }

    match c {
      '"' => in_string = true,
      '{' => depth += 1,
      '}' => {
        depth -= 1;
        if depth == 0 {
          return Some(&text[start..start + offset + c.len_utf8()]);
        }
      }
      _ => {}
    }
  }

  None
}
