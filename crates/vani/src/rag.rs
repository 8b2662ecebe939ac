//! Retrieval-grounded answers and quiz assembly

use serde::Serialize;

use crate::exercise::{Difficulty, ExerciseBuilder, ExerciseRecord};
use crate::generation::{GenerationConfig, TextGenerator};
use crate::index::{IndexError, SearchResult, TranscriptIndex};

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_QUIZ_TOPIC: &str = "General Language Learning";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedContext {
  pub query: String,
  pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quiz {
  pub topic: String,
  pub questions: Vec<ExerciseRecord>,
}

pub struct RagAssistant<'a> {
  index: &'a TranscriptIndex,
  generator: &'a dyn TextGenerator,
  config: GenerationConfig,
}

impl<'a> RagAssistant<'a> {
  pub fn new(index: &'a TranscriptIndex, generator: &'a dyn TextGenerator) -> Self {
    Self { index, generator, config: GenerationConfig::default() }
  }

  pub fn with_config(mut self, config: GenerationConfig) -> Self {
    self.config = config;
    self
  }

  /// Answer `query` from the `top_k` closest transcripts. `None` when the
  /// model call failed; retrieval errors propagate.
  pub fn answer(&self, query: &str, top_k: usize) -> Result<Option<String>, IndexError> {
    let context = self.retrieve_context(query, top_k)?;
    Ok(self.generate_grounded(query, &context))
  }

  pub fn retrieve_context(&self, query: &str, top_k: usize) -> Result<RetrievedContext, IndexError> {
    let results = self.index.query(query, top_k)?;
    tracing::debug!(query, results = results.len(), "retrieved context");
    Ok(RetrievedContext { query: query.to_string(), results })
  }

  /// Like [`RagAssistant::answer`], reusing an already retrieved context
  /// when one is given
  pub fn answer_with_context(
    &self,
    query: &str,
    context: Option<RetrievedContext>,
  ) -> Result<Option<String>, IndexError> {
    let context = match context {
      Some(context) => context,
      None => self.retrieve_context(query, DEFAULT_TOP_K)?,
    };
    Ok(self.generate_grounded(query, &context))
  }

  /// `n` exercises at intermediate difficulty
  pub fn build_quiz(&self, topic: Option<&str>, n: usize) -> Quiz {
    let builder = ExerciseBuilder::new(self.generator).with_config(self.config);
    let questions = (0..n).map(|_| builder.build(topic, Difficulty::Intermediate)).collect();

    Quiz { topic: topic.unwrap_or(DEFAULT_QUIZ_TOPIC).to_string(), questions }
  }

  fn generate_grounded(&self, query: &str, context: &RetrievedContext) -> Option<String> {
    let prompt = grounded_prompt(query, &context.results);
    match self.generator.generate(&prompt, &self.config) {
      Ok(answer) => Some(answer),
      Err(e) => {
        tracing::warn!(error = %e, "grounded answer failed");
        None
      }
    }
  }
}

pub fn grounded_prompt(query: &str, results: &[SearchResult]) -> String {
  let grounding = serde_json::to_string_pretty(results).unwrap_or_else(|_| "[]".to_string());
  format!(
    "Context: {grounding}

Query: {query}

Using the provided context, generate a comprehensive and informative response that directly addresses the query."
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::exercise::fallback_exercise;
  use crate::generation::{GenerationError, MockTextGenerator};
  use crate::index::HashingEmbedder;
  use crate::transcript::TranscriptDocument;
  use mockall::predicate::{always, function};

  fn index_with(titles: &[&str]) -> TranscriptIndex {
    let mut index = TranscriptIndex::in_memory("t", Box::new(HashingEmbedder::default()));
    let documents: Vec<TranscriptDocument> = titles
      .iter()
      .map(|title| TranscriptDocument {
        title: title.to_string(),
        content: format!("{title} के बारे में बातचीत"),
        ..TranscriptDocument::default()
      })
      .collect();
    index.ingest(&documents).unwrap();
    index
  }

  #[test]
  fn test_answer_is_grounded_in_results() {
    let index = index_with(&["मौसम", "खाना"]);
    let mut generator = MockTextGenerator::new();
    generator
      .expect_generate()
      .with(
        function(|prompt: &str| {
          prompt.contains("Query: आज मौसम कैसा है?") && prompt.contains("\"document_text\"")
        }),
        always(),
      )
      .times(1)
      .returning(|_, _| Ok("धूप है".to_string()));

    let assistant = RagAssistant::new(&index, &generator);
    assert_eq!(assistant.answer("आज मौसम कैसा है?", 1).unwrap().as_deref(), Some("धूप है"));
  }

  #[test]
  fn test_failed_generation_is_none() {
    let index = index_with(&["मौसम"]);
    let failing = |_: &str, _: &GenerationConfig| Err::<String, _>(GenerationError::EmptyResponse);
    let assistant = RagAssistant::new(&index, &failing);
    assert_eq!(assistant.answer("मौसम", DEFAULT_TOP_K).unwrap(), None);
  }

  #[test]
  fn test_retrieve_context_limits_results() {
    let index = index_with(&["एक", "दो", "तीन", "चार"]);
    let failing = |_: &str, _: &GenerationConfig| Err::<String, _>(GenerationError::EmptyResponse);
    let context = RagAssistant::new(&index, &failing).retrieve_context("दो", 2).unwrap();
    assert_eq!(context.query, "दो");
    assert_eq!(context.results.len(), 2);
    assert_eq!(context.results[0].metadata.title, "दो");
  }

  #[test]
  fn test_given_context_skips_retrieval() {
    let index = index_with(&["मौसम"]);
    let echo = |prompt: &str, _: &GenerationConfig| Ok::<_, GenerationError>(prompt.to_string());
    let assistant = RagAssistant::new(&index, &echo);

    let empty = RetrievedContext { query: "q".to_string(), results: Vec::new() };
    let answer = assistant.answer_with_context("q", Some(empty)).unwrap().unwrap();
    assert!(answer.starts_with("Context: []"));

    let retrieved = assistant.answer_with_context("मौसम", None).unwrap().unwrap();
    assert!(retrieved.contains("transcript_0"));
  }

  #[test]
  fn test_quiz_defaults_and_size() {
    let index = index_with(&[]);
    let failing = |_: &str, _: &GenerationConfig| Err::<String, _>(GenerationError::EmptyResponse);
    let assistant = RagAssistant::new(&index, &failing);

    let quiz = assistant.build_quiz(None, 3);
    assert_eq!(quiz.topic, "General Language Learning");
    assert_eq!(quiz.questions, vec![fallback_exercise(); 3]);

    assert_eq!(assistant.build_quiz(Some("Travel"), 0).topic, "Travel");
  }
}
