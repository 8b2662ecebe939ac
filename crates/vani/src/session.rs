//! Per-user interactive state for the chat and practice loops

use serde::Serialize;

use crate::exercise::ExerciseRecord;
use crate::generation::{GenerationConfig, TextGenerator};
use crate::parser::StructuredTranscript;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
  pub role: Role,
  pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerFeedback {
  Correct,
  Incorrect { correct_answer: String },
  NoExercise,
}

#[derive(Debug, Default)]
pub struct Session {
  pub messages: Vec<ChatMessage>,
  pub current_exercise: Option<ExerciseRecord>,
  pub transcript: Option<String>,
  pub structured: Option<StructuredTranscript>,
}

impl Session {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record the user's message and the model's reply, if there is one
  pub fn send_message(&mut self, generator: &dyn TextGenerator, text: &str) -> Option<String> {
    self.messages.push(ChatMessage { role: Role::User, content: text.to_string() });

    match generator.generate(text, &GenerationConfig::default()) {
      Ok(reply) => {
        self.messages.push(ChatMessage { role: Role::Assistant, content: reply.clone() });
        Some(reply)
      }
      Err(e) => {
        tracing::warn!(error = %e, "chat reply failed");
        None
      }
    }
  }

  pub fn clear_chat(&mut self) {
    self.messages.clear();
  }

  pub fn start_exercise(&mut self, exercise: ExerciseRecord) {
    self.current_exercise = Some(exercise);
  }

  pub fn check_answer(&self, selection: &str) -> AnswerFeedback {
    match &self.current_exercise {
      None => AnswerFeedback::NoExercise,
      Some(exercise) if exercise.is_correct(selection) => AnswerFeedback::Correct,
      Some(exercise) => AnswerFeedback::Incorrect { correct_answer: exercise.answer().to_string() },
    }
  }
}

/// Devanagari characters and total characters in `text`
pub fn character_counts(text: &str) -> (usize, usize) {
  let hindi = text.chars().filter(|c| ('\u{0900}'..='\u{097F}').contains(c)).count();
  (hindi, text.chars().count())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::exercise::fallback_exercise;
  use crate::generation::{GenerationError, MockTextGenerator};

  #[test]
  fn test_chat_history_records_both_sides() {
    let mut generator = MockTextGenerator::new();
    generator.expect_generate().returning(|_, _| Ok("नमस्ते!".to_string()));

    let mut session = Session::new();
    assert_eq!(session.send_message(&generator, "hello").as_deref(), Some("नमस्ते!"));
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.messages[0].role, Role::User);
    assert_eq!(session.messages[1].content, "नमस्ते!");

    session.clear_chat();
    assert!(session.messages.is_empty());
  }

  #[test]
  fn test_failed_reply_keeps_user_message() {
    let failing = |_: &str, _: &GenerationConfig| Err::<String, _>(GenerationError::EmptyResponse);
    let mut session = Session::new();
    assert_eq!(session.send_message(&failing, "hello"), None);
    assert_eq!(session.messages.len(), 1);
  }

  #[test]
  fn test_answer_feedback() {
    let mut session = Session::new();
    assert_eq!(session.check_answer("शिक्षा"), AnswerFeedback::NoExercise);

    session.start_exercise(fallback_exercise());
    assert_eq!(session.check_answer(" शिक्षा "), AnswerFeedback::Correct);
    assert_eq!(
      session.check_answer("यात्रा"),
      AnswerFeedback::Incorrect { correct_answer: "शिक्षा".to_string() }
    );
  }

  #[test]
  fn test_character_counts() {
    assert_eq!(character_counts("नमस्ते hi"), (6, 9));
    assert_eq!(character_counts(""), (0, 0));
  }
}
