//! Raw caption files to structured transcripts and back
//!
//! A raw transcript is a JSON array of caption entries. Its text is sent to the
//! model for extraction, the reply is parsed into a [`StructuredTranscript`] and
//! saved as pretty JSON. [`read_structured_transcripts`] reads a directory of
//! those files back as [`TranscriptDocument`]s ready for indexing.

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::generation::{GenerationConfig, TextGenerator};
use crate::parser::{self, StructuredTranscript};

pub const STRUCTURED_SUFFIX: &str = "_structured.json";
pub const DOCUMENT_SOURCE: &str = "listening_comprehension";

/// Caption languages tried in order
pub const CAPTION_LANGUAGES: [&str; 2] = ["hi", "en"];

const VIDEO_URL_PATTERNS: [&str; 4] = [
  r"(?:https?://)?(?:www\.)?youtube\.com/watch\?v=([^&\s]+)",
  r"(?:https?://)?youtu\.be/([^&\s]+)",
  r"(?:https?://)?(?:www\.)?youtube\.com/embed/([^&\s]+)",
  r"(?:https?://)?(?:www\.)?youtube\.com/v/([^&\s]+)",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionEntry {
  pub start: f64,
  pub duration: f64,
  pub text: String,
}

/// A structured transcript as read back for indexing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptDocument {
  pub title: String,
  pub content: String,
  pub source: String,
  pub timestamp: String,
  pub original_file: PathBuf,
  pub question: String,
  pub help_clues: Option<String>,
}

impl TranscriptDocument {
  /// Title is the introduction, or `file_name` when there is none
  pub fn from_structured(record: &StructuredTranscript, path: &Path) -> Self {
    let title = if record.introduction.is_empty() {
      path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
    } else {
      record.introduction.clone()
    };

    Self {
      title,
      content: format!("{} {}", record.dialogue, record.answer),
      source: DOCUMENT_SOURCE.to_string(),
      timestamp: String::new(),
      original_file: path.to_path_buf(),
      question: record.question.clone(),
      help_clues: record.help_clues.clone(),
    }
  }
}

/// Video id from a watch, short, embed or `/v/` YouTube URL
pub fn video_id(url: &str) -> Option<String> {
  VIDEO_URL_PATTERNS
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .find_map(|re| re.captures(url.trim()).and_then(|caps| caps.get(1)))
    .map(|id| id.as_str().to_string())
}

/// Downloads video captions in the raw transcript format
pub struct CaptionClient {
  client: Client,
  base_url: String,
}

impl CaptionClient {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
    let client = Client::builder().timeout(timeout).build().context("Failed to build HTTP client")?;
    Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
  }

  /// Captions for the video at `url`, in the first of [`CAPTION_LANGUAGES`]
  /// that has any
  pub fn fetch(&self, url: &str) -> Result<Vec<CaptionEntry>> {
    let id = video_id(url).ok_or_else(|| anyhow!("Invalid YouTube URL: {url}"))?;

    for language in CAPTION_LANGUAGES {
      let entries = self.fetch_language(&id, language)?;
      if !entries.is_empty() {
        tracing::debug!(video = %id, language, captions = entries.len(), "fetched captions");
        return Ok(entries);
      }
    }

    Err(anyhow!("No {} captions for video {id}", CAPTION_LANGUAGES.join("/")))
  }

  fn fetch_language(&self, id: &str, language: &str) -> Result<Vec<CaptionEntry>> {
    let response = self
      .client
      .get(format!("{}/api/timedtext", self.base_url))
      .query(&[("v", id), ("lang", language), ("fmt", "json3")])
      .send()
      .with_context(|| format!("Failed to request captions for {id}"))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
      return Ok(Vec::new());
    }
    if !status.is_success() {
      return Err(anyhow!("Caption request for {id} failed with {status}"));
    }

    let body = response.text().context("Failed to read caption response")?;
    captions_from_json3(&body)
  }
}

#[derive(Deserialize)]
struct TimedText {
  #[serde(default)]
  events: Vec<TimedTextEvent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedTextEvent {
  #[serde(default)]
  t_start_ms: u64,
  #[serde(default)]
  d_duration_ms: u64,
  #[serde(default)]
  segs: Vec<TimedTextSegment>,
}

#[derive(Deserialize)]
struct TimedTextSegment {
  #[serde(default)]
  utf8: String,
}

/// Caption entries from a `json3` timed-text body. An empty body means the
/// language has no captions.
pub fn captions_from_json3(body: &str) -> Result<Vec<CaptionEntry>> {
  if body.trim().is_empty() {
    return Ok(Vec::new());
  }

  let timed: TimedText = serde_json::from_str(body).context("Caption response is not timed text")?;
  let entries = timed
    .events
    .into_iter()
    .filter_map(|event| {
      let text: String = event.segs.iter().map(|seg| seg.utf8.as_str()).collect();
      let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
      (!text.is_empty()).then(|| CaptionEntry {
        start: event.t_start_ms as f64 / 1000.0,
        duration: event.d_duration_ms as f64 / 1000.0,
        text,
      })
    })
    .collect();

  Ok(entries)
}

/// Save captions as a raw transcript file
pub fn save_raw_transcript(path: &Path, entries: &[CaptionEntry]) -> Result<()> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent)
      .with_context(|| format!("Failed to create directory {}", parent.display()))?;
  }
  let content = serde_json::to_string_pretty(entries)?;
  fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn load_raw_transcript(path: &Path) -> Result<Vec<CaptionEntry>> {
  let content = fs::read_to_string(path)
    .with_context(|| format!("Failed to read transcript {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("Transcript {} is not a caption list", path.display()))
}

/// Caption texts joined with single spaces
pub fn full_text(entries: &[CaptionEntry]) -> String {
  entries.iter().map(|entry| entry.text.as_str()).collect::<Vec<_>>().join(" ")
}

pub fn extraction_prompt(transcript_text: &str) -> String {
  format!(
    r#"Carefully analyze the following Hindi transcript and extract ACTUAL, SPECIFIC sections:

CRITICAL INSTRUCTIONS:
- Analyse the script and fix it before attempting extraction
- DO NOT use placeholders like "..." or "…"
- Adjust the conversation text based on the transcript
- Introduction should include the setting, environment or scenery of what follows.
- The flow of the conversation should be in natural hindi language
- Use proper punctuation to format the sections.

Section Definitions:
1. Introduction: The FIRST, MOST INITIAL context-setting phrase (max 15-20 words)
2. Dialogue: The conversational part of the transcript, on which the question is asked.
3. Question: The question or questions being asked in the transcript.
4. Help/Clues: Any clues if provided to guess the answer.
5. Answer: The answer to the questions being asked.

MANDATORY FORMAT:
{{
    "introduction": "first words",
    "dialogue": "conversation text",
    "question": "question from transcript",
    "help_clues": null or "SPECIFIC context",
    "answer": "answer"
}}

Transcript Text:
{transcript_text}

FINAL WARNING:
- Do not use Generic or placeholder text
- Try to provide as much information as possible
- Keep the response format to exactly match what is described.
- Be PRECISE and CONCRETE"#
  )
}

/// Ask the model to structure `transcript_text`. A failed call yields the
/// all-empty record rather than an error.
pub fn structure_transcript(generator: &dyn TextGenerator, transcript_text: &str) -> StructuredTranscript {
  let response = generator
    .generate(&extraction_prompt(transcript_text), &GenerationConfig::default())
    .unwrap_or_else(|e| {
      tracing::warn!(error = %e, "transcript extraction failed");
      String::new()
    });

  parser::parse(&response).record
}

/// Pretty JSON with non-ASCII text kept as-is
pub fn save_structured(path: &Path, record: &StructuredTranscript) -> Result<()> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent)
      .with_context(|| format!("Failed to create directory {}", parent.display()))?;
  }
  let content = serde_json::to_string_pretty(record)?;
  fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

/// Structure every `*.json` transcript in `transcript_dir` into
/// `output_dir/<stem>_structured.json`
pub fn process_transcripts(
  generator: &dyn TextGenerator,
  transcript_dir: &Path,
  output_dir: &Path,
) -> Result<Vec<PathBuf>> {
  fs::create_dir_all(output_dir)
    .with_context(|| format!("Failed to create directory {}", output_dir.display()))?;

  let mut written = Vec::new();
  for path in json_files(transcript_dir)? {
    let entries = load_raw_transcript(&path)?;
    let record = structure_transcript(generator, &full_text(&entries));

    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let output = output_dir.join(format!("{stem}{STRUCTURED_SUFFIX}"));
    save_structured(&output, &record)?;

    bentley::verbose!("Processed {} -> {}", path.display(), output.display());
    written.push(output);
  }

  Ok(written)
}

/// Save under a fresh `transcript_<8 hex>_structured.json` name
pub fn save_to_library(dir: &Path, record: &StructuredTranscript) -> Result<PathBuf> {
  let id = Uuid::new_v4().simple().to_string();
  let path = dir.join(format!("transcript_{}{STRUCTURED_SUFFIX}", &id[..8]));
  save_structured(&path, record)?;
  Ok(path)
}

/// Read every `*.json` file in `dir`; unreadable or malformed files are
/// skipped with a warning. A missing directory reads as empty.
pub fn read_structured_transcripts(dir: &Path) -> Result<Vec<TranscriptDocument>> {
  if !dir.exists() {
    return Ok(Vec::new());
  }

  let mut documents = Vec::new();
  for path in json_files(dir)? {
    let record = fs::read_to_string(&path).map_err(anyhow::Error::from).and_then(|content| {
      serde_json::from_str::<StructuredTranscript>(&content).map_err(anyhow::Error::from)
    });

    match record {
      Ok(record) => documents.push(TranscriptDocument::from_structured(&record, &path)),
      Err(e) => bentley::warn!("Skipping {}: {}", path.display(), e),
    }
  }

  Ok(documents)
}

/// `*.json` files directly inside `dir`, sorted by name
fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
  let mut files = Vec::new();
  for entry in fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))? {
    let path = entry?.path();
    if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
      files.push(path);
    }
  }
  files.sort();
  Ok(files)
}
