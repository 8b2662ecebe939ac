//! Listening-comprehension exercise generation
//!
//! [`ExerciseBuilder::build`] always returns a usable [`ExerciseRecord`]. The
//! staged path ([`ExerciseBuilder::try_build`]) reports which stage failed as
//! an [`ExerciseError`]; `build` swaps any failure for [`fallback_exercise`].

use clap::ValueEnum;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::generation::{GenerationConfig, GenerationError, TextGenerator};
use crate::options::{self, OPTION_COUNT};
use crate::parser::{self, ParsedResponse, StructuredTranscript, INTRODUCTION_LIMIT};

/// Conversation settings an exercise can be drawn from
pub const TOPICS: [&str; 10] = [
  "Everyday conversations",
  "Office dialogues",
  "Social situations",
  "Educational discussions",
  "Travel and tourism",
  "Family and relationships",
  "Technology and innovation",
  "Environment and nature",
  "Health and wellness",
  "Art and culture",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum Difficulty {
  #[value(alias = "शुरुआती")]
  Beginner,
  #[default]
  #[value(alias = "मध्यम")]
  Intermediate,
  #[value(alias = "उन्नत")]
  Advanced,
}

/// Language guidance for one difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyProfile {
  pub complexity: &'static str,
  pub sentence_structure: &'static str,
  pub language_level: &'static str,
}

impl Difficulty {
  /// Parse an English or Hindi label; anything unrecognised is Intermediate
  pub fn from_label(label: &str) -> Self {
    match label.trim().to_lowercase().as_str() {
      "beginner" | "शुरुआती" => Difficulty::Beginner,
      "advanced" | "उन्नत" => Difficulty::Advanced,
      _ => Difficulty::Intermediate,
    }
  }

  pub fn hindi_label(&self) -> &'static str {
    match self {
      Difficulty::Beginner => "शुरुआती",
      Difficulty::Intermediate => "मध्यम",
      Difficulty::Advanced => "उन्नत",
    }
  }

  pub fn profile(&self) -> DifficultyProfile {
    match self {
      Difficulty::Beginner => DifficultyProfile {
        complexity: "Simple, basic vocabulary",
        sentence_structure: "Short, straightforward sentences",
        language_level: "Beginner level Hindi",
      },
      Difficulty::Intermediate => DifficultyProfile {
        complexity: "Moderate vocabulary, some idiomatic expressions",
        sentence_structure: "Mixed sentence lengths, some complex structures",
        language_level: "Intermediate level Hindi",
      },
      Difficulty::Advanced => DifficultyProfile {
        complexity: "Advanced vocabulary, nuanced expressions",
        sentence_structure: "Complex, varied sentence structures",
        language_level: "Advanced level Hindi",
      },
    }
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      Difficulty::Beginner => "Beginner",
      Difficulty::Intermediate => "Intermediate",
      Difficulty::Advanced => "Advanced",
    };
    f.write_str(label)
  }
}

#[derive(Debug, Error)]
pub enum ExerciseError {
  #[error("exercise generation failed: {0}")]
  Generation(#[from] GenerationError),
  #[error("model response contained no JSON object")]
  Unstructured,
  #[error("model response had no answer")]
  MissingAnswer,
  #[error("invalid options: {0}")]
  InvalidOptions(String),
}

/// A complete multiple-choice exercise.
///
/// Only constructible through [`ExerciseRecord::new`], so every value has
/// four distinct options with the answer among them exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExerciseRecord {
  introduction: String,
  dialogue: String,
  question: String,
  options: Vec<String>,
  answer: String,
}

impl ExerciseRecord {
  pub fn new(
    introduction: impl Into<String>,
    dialogue: impl Into<String>,
    question: impl Into<String>,
    options: Vec<String>,
    answer: impl Into<String>,
  ) -> Result<Self, ExerciseError> {
    let answer = answer.into();
    check_options(&options, &answer)?;

    Ok(Self {
      introduction: parser::truncate_chars(&introduction.into(), INTRODUCTION_LIMIT),
      dialogue: dialogue.into(),
      question: question.into(),
      options,
      answer,
    })
  }

  pub fn introduction(&self) -> &str {
    &self.introduction
  }

  pub fn dialogue(&self) -> &str {
    &self.dialogue
  }

  pub fn question(&self) -> &str {
    &self.question
  }

  pub fn options(&self) -> &[String] {
    &self.options
  }

  pub fn answer(&self) -> &str {
    &self.answer
  }

  pub fn is_correct(&self, selection: &str) -> bool {
    selection.trim() == self.answer
  }
}

fn check_options(options: &[String], answer: &str) -> Result<(), ExerciseError> {
  if options.len() != OPTION_COUNT {
    return Err(ExerciseError::InvalidOptions(format!(
      "expected {OPTION_COUNT} options, got {}",
      options.len()
    )));
  }

  let unique: HashSet<&str> = options.iter().map(String::as_str).collect();
  if unique.len() != options.len() {
    return Err(ExerciseError::InvalidOptions("options repeat".to_string()));
  }

  if !unique.contains(answer) {
    return Err(ExerciseError::InvalidOptions("answer is not among the options".to_string()));
  }

  Ok(())
}

/// The fixed Hindi exercise used whenever generation fails
pub fn fallback_exercise() -> ExerciseRecord {
  ExerciseRecord {
    introduction: "एक रोचक संवाद".to_string(),
    dialogue: "यह एक सामान्य संवाद है जो हिंदी सीखने में मदद करेगा।".to_string(),
    question: "इस संवाद का मुख्य विषय क्या है?".to_string(),
    options: ["शिक्षा", "यात्रा", "परिवार", "तकनीक"].map(String::from).to_vec(),
    answer: "शिक्षा".to_string(),
  }
}

/// Given topic, or a uniform draw from [`TOPICS`]
pub fn select_topic<R: Rng + ?Sized>(topic: Option<&str>, rng: &mut R) -> String {
  match topic.map(str::trim).filter(|t| !t.is_empty()) {
    Some(topic) => topic.to_string(),
    None => TOPICS.choose(rng).copied().unwrap_or(TOPICS[0]).to_string(),
  }
}

pub fn exercise_prompt(topic: &str, difficulty: Difficulty) -> String {
  let profile = difficulty.profile();
  format!(
    r#"Generate a structured Hindi language learning exercise:

Exercise Generation Guidelines:
- Context Topic: {topic}
- Difficulty Level: {difficulty}
- Language Complexity: {complexity}
- Sentence Structure: {structure}
- Language Level: {level}

MANDATORY OUTPUT FORMAT:
{{
    "introduction": "Brief context-setting phrase (15-20 words)",
    "dialogue": "Conversation text in natural Hindi",
    "question": "A specific comprehension or language question",
    "options": ["Option 1", "Option 2", "Option 3", "Option 4"],
    "answer": "Correct answer from the options"
}}

CRITICAL INSTRUCTIONS:
- Use natural, conversational Hindi
- Ensure cultural authenticity
- Create engaging, contextually relevant content
- Avoid generic or placeholder text"#,
    complexity = profile.complexity,
    structure = profile.sentence_structure,
    level = profile.language_level,
  )
}

/// Accept only a decoded object with a non-empty answer
pub fn validate(parsed: ParsedResponse) -> Result<StructuredTranscript, ExerciseError> {
  if !parsed.is_structured() {
    return Err(ExerciseError::Unstructured);
  }
  if parsed.record.answer.is_empty() {
    return Err(ExerciseError::MissingAnswer);
  }
  Ok(parsed.record)
}

pub struct ExerciseBuilder<'a> {
  generator: &'a dyn TextGenerator,
  config: GenerationConfig,
}

impl<'a> ExerciseBuilder<'a> {
  pub fn new(generator: &'a dyn TextGenerator) -> Self {
    Self { generator, config: GenerationConfig::default() }
  }

  pub fn with_config(mut self, config: GenerationConfig) -> Self {
    self.config = config;
    self
  }

  /// Build an exercise, falling back to [`fallback_exercise`] on any failure
  pub fn build(&self, topic: Option<&str>, difficulty: Difficulty) -> ExerciseRecord {
    self.build_with_rng(topic, difficulty, &mut rand::rng())
  }

  pub fn build_with_rng<R: Rng + ?Sized>(
    &self,
    topic: Option<&str>,
    difficulty: Difficulty,
    rng: &mut R,
  ) -> ExerciseRecord {
    match self.try_build(topic, difficulty, rng) {
      Ok(record) => record,
      Err(e) => {
        tracing::warn!(error = %e, "using fallback exercise");
        fallback_exercise()
      }
    }
  }

  /// Run every stage, stopping at the first failure
  pub fn try_build<R: Rng + ?Sized>(
    &self,
    topic: Option<&str>,
    difficulty: Difficulty,
    rng: &mut R,
  ) -> Result<ExerciseRecord, ExerciseError> {
    let topic = select_topic(topic, rng);
    tracing::debug!(topic = %topic, difficulty = %difficulty, "generating exercise");

    let response = self.generator.generate(&exercise_prompt(&topic, difficulty), &self.config)?;
    let record = validate(parser::parse(&response))?;
    fill_options(record, self.generator, rng)
  }
}

/// Turn a structured transcript into an exercise on its own question and
/// answer. Fails when the transcript has no answer.
pub fn exercise_from_transcript<R: Rng + ?Sized>(
  record: &StructuredTranscript,
  generator: &dyn TextGenerator,
  rng: &mut R,
) -> Result<ExerciseRecord, ExerciseError> {
  if record.answer.is_empty() {
    return Err(ExerciseError::MissingAnswer);
  }
  fill_options(record.clone(), generator, rng)
}

/// Keep decoded options when they already form a valid set, otherwise
/// synthesize a new one around the answer
fn fill_options<R: Rng + ?Sized>(
  record: StructuredTranscript,
  generator: &dyn TextGenerator,
  rng: &mut R,
) -> Result<ExerciseRecord, ExerciseError> {
  let options = match record.options {
    Some(options) if check_options(&options, &record.answer).is_ok() => options,
    _ => options::synthesize(&record.answer, generator, rng).to_vec(),
  };

  ExerciseRecord::new(record.introduction, record.dialogue, record.question, options, record.answer)
}
