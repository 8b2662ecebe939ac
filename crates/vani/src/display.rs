use colored::*;

use crate::exercise::ExerciseRecord;
use crate::index::SearchResult;
use crate::rag::Quiz;

const EXCERPT_CHARS: usize = 200;

pub fn print_exercise(exercise: &ExerciseRecord) {
  println!("{}", exercise.introduction().bold());
  println!();
  println!("{}", exercise.dialogue());
  println!();
  println!("{} {}", "प्रश्न:".cyan().bold(), exercise.question());
  for (number, option) in exercise.options().iter().enumerate() {
    println!("  {}. {}", (number + 1).to_string().yellow(), option);
  }
}

pub fn print_quiz(quiz: &Quiz) {
  println!("{} {}", "Quiz:".bold(), quiz.topic.cyan());
  for (number, question) in quiz.questions.iter().enumerate() {
    println!();
    println!("{}", format!("Question {}", number + 1).bold().underline());
    print_exercise(question);
    println!("  {} {}", "answer:".dimmed(), question.answer().green());
  }
}

pub fn print_results(results: &[SearchResult]) {
  if results.is_empty() {
    println!("No matching transcripts");
    return;
  }

  for result in results {
    println!(
      "{} {} {}",
      result.id.yellow(),
      result.metadata.title.bold(),
      format!("(distance {:.4})", result.distance).dimmed()
    );
    println!("  {}", excerpt(&result.document_text));
  }
}

fn excerpt(text: &str) -> String {
  if text.chars().count() <= EXCERPT_CHARS {
    return text.to_string();
  }
  let head: String = text.chars().take(EXCERPT_CHARS).collect();
  format!("{head}...")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_excerpt_cuts_on_characters() {
    assert_eq!(excerpt("छोटा"), "छोटा");

    let long = "क".repeat(250);
    let cut = excerpt(&long);
    assert_eq!(cut.chars().count(), 203);
    assert!(cut.ends_with("..."));
  }
}
