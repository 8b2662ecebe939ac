use vani::parser::{self, Strategy, StructuredTranscript};

const REQUIRED_KEYS: [&str; 5] = ["introduction", "dialogue", "question", "help_clues", "answer"];

fn keys_present(record: &StructuredTranscript) -> bool {
  let value = serde_json::to_value(record).unwrap();
  REQUIRED_KEYS.iter().all(|key| value.get(key).is_some())
}

#[test]
fn test_malformed_inputs_never_lose_keys() {
  let inputs = [
    "",
    "   \n\t",
    "{",
    "}",
    "{\"introduction\": \"अधूरा",
    "```json\n{\"dialogue\": \"x\",\n```",
    "The model forgot to answer in JSON.",
    "यह केवल गद्य है, कोई संरचना नहीं।",
    "[\"not\", \"an\", \"object\"]",
    "null",
    "42",
    "{\"introduction\": null, \"dialogue\": [1, 2], \"answer\": {\"nested\": true}}",
  ];

  for raw in inputs {
    let parsed = parser::parse(raw);
    assert!(keys_present(&parsed.record), "missing keys for {raw:?}");
  }
}

#[test]
fn test_fenced_exercise_is_recovered_exactly() {
  let raw = "```json\n{\"introduction\":\"a\",\"dialogue\":\"b\",\"question\":\"c\",\"answer\":\"d\"}\n```";
  let parsed = parser::parse(raw);

  assert!(parsed.is_structured());
  assert_eq!(parsed.record.introduction, "a");
  assert_eq!(parsed.record.dialogue, "b");
  assert_eq!(parsed.record.question, "c");
  assert_eq!(parsed.record.help_clues, None);
  assert_eq!(parsed.record.answer, "d");
}

#[test]
fn test_long_introduction_is_cut_to_100_characters() {
  let introduction: String = "बहुत लंबा परिचय ".chars().cycle().take(250).collect();
  let raw = serde_json::json!({ "introduction": introduction, "answer": "x" }).to_string();

  let parsed = parser::parse(&raw);
  assert_eq!(parsed.strategy, Strategy::Direct);
  assert_eq!(parsed.record.introduction.chars().count(), 100);
  assert!(introduction.starts_with(&parsed.record.introduction));
}

#[test]
fn test_reply_with_commentary_around_json() {
  let raw = r#"Sure! Here is the structured transcript:

{
  "introduction": "रेलवे स्टेशन पर",
  "dialogue": "यात्री: अगली ट्रेन कब है?",
  "question": "यात्री क्या जानना चाहता है?",
  "help_clues": "समय सारणी",
  "answer": "अगली ट्रेन का समय"
}

Let me know if you need anything else."#;

  let parsed = parser::parse(raw);
  assert_eq!(parsed.strategy, Strategy::BraceSpan);
  assert_eq!(parsed.record.help_clues.as_deref(), Some("समय सारणी"));
  assert_eq!(parsed.record.answer, "अगली ट्रेन का समय");
}

#[test]
fn test_placeholders_are_stripped_from_values() {
  let raw = r#"{"introduction": "…", "dialogue": "राम... श्याम", "question": "''", "answer": "हाँ"}"#;
  let record = parser::parse(raw).record;

  assert_eq!(record.introduction, "");
  assert_eq!(record.dialogue, "राम श्याम");
  assert_eq!(record.question, "");
  assert_eq!(record.answer, "हाँ");
}

#[test]
fn test_default_record_mirrors_raw_text() {
  let raw = "कोई JSON नहीं";
  let parsed = parser::parse(raw);

  assert_eq!(parsed.strategy, Strategy::Default);
  assert_eq!(parsed.record, parser::default_record(raw));
  assert_eq!(parsed.record.introduction, raw);
}

#[test]
fn test_fenced_prose_without_braces_is_cleaned() {
  let parsed = parser::parse("  ```\nयह एक संवाद है...\n```  ");

  assert_eq!(parsed.strategy, Strategy::Default);
  assert_eq!(parsed.record.dialogue, "यह एक संवाद है");
  assert_eq!(parsed.record.answer, "यह एक संवाद है");
  assert_eq!(parsed.record.introduction, "यह एक संवाद है");
  assert_eq!(parsed.record.question, "");
  assert_eq!(parsed.record.help_clues, None);
}
