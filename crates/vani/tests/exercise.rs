use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::Cell;

use vani::exercise::{fallback_exercise, Difficulty, ExerciseBuilder, ExerciseRecord};
use vani::generation::{GenerationConfig, GenerationError};
use vani::options;

fn assert_well_formed(record: &ExerciseRecord) {
  assert_eq!(record.options().len(), 4, "{record:?}");
  let hits = record.options().iter().filter(|o| o.as_str() == record.answer()).count();
  assert_eq!(hits, 1, "{record:?}");
}

/// Replies with `responses` in order, then repeats the last one
fn scripted(
  responses: Vec<Result<&'static str, GenerationError>>,
) -> impl Fn(&str, &GenerationConfig) -> Result<String, GenerationError> {
  let call = Cell::new(0usize);
  move |_: &str, _: &GenerationConfig| {
    let i = call.get().min(responses.len() - 1);
    call.set(call.get() + 1);
    match &responses[i] {
      Ok(text) => Ok(text.to_string()),
      Err(_) => Err(GenerationError::EmptyResponse),
    }
  }
}

#[test]
fn test_every_output_is_well_formed() {
  let exercise_replies = [
    r#"{"introduction": "i", "dialogue": "d", "question": "q", "options": ["क", "ख", "ग", "घ"], "answer": "ग"}"#,
    r#"{"dialogue": "d", "question": "q", "options": ["क", "ख"], "answer": "क"}"#,
    r#"{"dialogue": "d", "question": "q", "options": ["क", "क", "ख", "ग"], "answer": "क"}"#,
    r#"{"dialogue": "d", "question": "q", "options": ["क", "ख", "ग", "घ"], "answer": "ङ"}"#,
    r#"{"dialogue": "d", "question": "q", "answer": "च"}"#,
    r#"```json {"question": "q", "answer": "छ"} ```"#,
    "no json at all",
    "",
  ];
  let distractor_replies = ["एक\nदो\nतीन", "केवल एक", "", "1. एक\n2. एक\n3. दो"];

  let mut rng = StdRng::seed_from_u64(11);
  for exercise_reply in exercise_replies {
    for distractor_reply in distractor_replies {
      let generator = scripted(vec![Ok(exercise_reply), Ok(distractor_reply)]);
      let record = ExerciseBuilder::new(&generator).build_with_rng(None, Difficulty::Intermediate, &mut rng);
      assert_well_formed(&record);
    }
  }
}

#[test]
fn test_synthesized_options_for_any_source() {
  let sources = [
    scripted(vec![Ok("a\nb\nc")]),
    scripted(vec![Ok("a\nb\nc\nd\ne")]),
    scripted(vec![Ok("X\nX\nX")]),
    scripted(vec![Ok("")]),
    scripted(vec![Err(GenerationError::EmptyResponse)]),
  ];

  let mut rng = StdRng::seed_from_u64(3);
  for source in &sources {
    let options = options::synthesize("X", source, &mut rng);
    assert_eq!(options.len(), 4);
    assert_eq!(options.iter().filter(|o| o.as_str() == "X").count(), 1);
  }
}

#[test]
fn test_five_distractor_lines_give_three() {
  let source = scripted(vec![Ok("पहला\nदूसरा\nतीसरा\nचौथा\nपाँचवाँ")]);
  let options = options::synthesize("X", &source, &mut StdRng::seed_from_u64(9));

  let mut sorted = options.to_vec();
  sorted.sort();
  let mut expected = vec!["X", "पहला", "दूसरा", "तीसरा"];
  expected.sort();
  assert_eq!(sorted, expected);
}

#[test]
fn test_forced_error_gives_fixed_fallback() {
  let generator = scripted(vec![Err(GenerationError::EmptyResponse)]);
  let record = ExerciseBuilder::new(&generator).build(Some("Travel and tourism"), Difficulty::Advanced);

  assert_eq!(record, fallback_exercise());
  assert_eq!(record.introduction(), "एक रोचक संवाद");
  assert_eq!(record.options(), ["शिक्षा", "यात्रा", "परिवार", "तकनीक"]);
  assert_eq!(record.answer(), "शिक्षा");
}

#[test]
fn test_hindi_label_selects_profile() {
  let seen = Cell::new(false);
  let generator = |prompt: &str, _: &GenerationConfig| {
    seen.set(prompt.contains("Difficulty Level: Beginner") && prompt.contains("Beginner level Hindi"));
    Err::<String, _>(GenerationError::EmptyResponse)
  };

  ExerciseBuilder::new(&generator).build(None, Difficulty::from_label("शुरुआती"));
  assert!(seen.get());
}
