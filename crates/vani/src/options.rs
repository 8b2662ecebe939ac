//! Multiple-choice option sets built around a known answer

use rand::seq::SliceRandom;
use rand::Rng;

use crate::generation::{GenerationConfig, TextGenerator};

/// Options shown per question
pub const OPTION_COUNT: usize = 4;

/// Incorrect options needed alongside the answer
pub const DISTRACTOR_COUNT: usize = OPTION_COUNT - 1;

pub fn distractor_prompt(answer: &str) -> String {
  format!(
    "Generate {DISTRACTOR_COUNT} plausible but incorrect options for the following answer in Hindi:

Correct Answer: {answer}

Guidelines:
- Create options that sound similar but are incorrect
- Ensure options are in Hindi
- Make sure the correct answer is not repeated
- Options should be concise
- Write one option per line"
  )
}

/// Four options containing `answer` exactly once, in random order.
///
/// Distractors come from one call to `source`. A failed call, or a response
/// with fewer than three usable lines, yields [`fallback_options`] instead.
pub fn synthesize<G, R>(answer: &str, source: &G, rng: &mut R) -> [String; OPTION_COUNT]
where
  G: TextGenerator + ?Sized,
  R: Rng + ?Sized,
{
  let response = match source.generate(&distractor_prompt(answer), &GenerationConfig::default()) {
    Ok(response) => response,
    Err(e) => {
      tracing::warn!(error = %e, "distractor generation failed, using placeholder options");
      return fallback_options(answer, rng);
    }
  };

  let distractors = parse_distractors(&response, answer);
  let [first, second, third] = match <[String; DISTRACTOR_COUNT]>::try_from(distractors) {
    Ok(distractors) => distractors,
    Err(found) => {
      tracing::warn!(usable = found.len(), "too few distractors, using placeholder options");
      return fallback_options(answer, rng);
    }
  };

  shuffled([first, second, third, answer.to_string()], rng)
}

/// "Incorrect version N of X" placeholders plus the answer, shuffled
pub fn fallback_options<R: Rng + ?Sized>(answer: &str, rng: &mut R) -> [String; OPTION_COUNT] {
  shuffled(
    [
      format!("Incorrect version 1 of {answer}"),
      format!("Incorrect version 2 of {answer}"),
      format!("Incorrect version 3 of {answer}"),
      answer.to_string(),
    ],
    rng,
  )
}

/// Usable distractor lines from a model response, at most three
pub fn parse_distractors(response: &str, answer: &str) -> Vec<String> {
  let answer = answer.trim();
  let mut distractors: Vec<String> = Vec::with_capacity(DISTRACTOR_COUNT);

  for line in response.lines() {
    let candidate = strip_list_marker(line.trim());
    if candidate.is_empty() || candidate == answer || distractors.iter().any(|d| d == candidate) {
      continue;
    }
    distractors.push(candidate.to_string());
    if distractors.len() == DISTRACTOR_COUNT {
      break;
    }
  }

  distractors
}

/// Drop a leading `1.`, `2)`, `-` or `*` marker
fn strip_list_marker(line: &str) -> &str {
  if let Some(rest) = line.strip_prefix(['-', '*', '•']) {
    return rest.trim_start();
  }

  let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
  if digits > 0 {
    if let Some(rest) = line[digits..].strip_prefix(['.', ')']) {
      return rest.trim_start();
    }
  }

  line
}

fn shuffled<R: Rng + ?Sized>(mut options: [String; OPTION_COUNT], rng: &mut R) -> [String; OPTION_COUNT] {
  options.shuffle(rng);
  options
}
