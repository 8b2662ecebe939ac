//! Handlers behind the `vani` subcommands

use anyhow::{anyhow, Context, Result};
use colored::*;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::display;
use crate::exercise::{exercise_from_transcript, Difficulty, ExerciseBuilder, ExerciseRecord};
use crate::generation::{GenerationConfig, OpenRouterClient, TextGenerator, Unavailable};
use crate::index::TranscriptIndex;
use crate::rag::RagAssistant;
use crate::session::{character_counts, AnswerFeedback, Session};
use crate::transcript::{self, CaptionClient};

/// The configured chat client, or a stand-in that always fails so callers
/// take their fallback paths
pub fn generator(config: &Config) -> Box<dyn TextGenerator> {
  match OpenRouterClient::from_env(&config.generation) {
    Ok(client) => {
      bentley::verbose!("Using model {}", client.model());
      Box::new(client)
    }
    Err(e) => {
      bentley::warn!("{e}; generated content will use fallbacks");
      Box::new(Unavailable::new(e.to_string()))
    }
  }
}

fn generation_config(config: &Config) -> GenerationConfig {
  GenerationConfig::with_temperature(config.generation.temperature)
}

fn open_index(config: &Config) -> Result<TranscriptIndex> {
  let index = TranscriptIndex::from_config(config).context("Failed to open transcript index")?;
  if !index.is_persistent() {
    bentley::warn!("Index is in memory only; nothing will be saved");
  }
  bentley::verbose!("Index at {} holds {} transcripts", index.location(), index.len());
  Ok(index)
}

/// Download captions for `url` into `<dir>/<video id>.json`
pub fn fetch(config: &Config, url: &str, dir: Option<PathBuf>) -> Result<()> {
  let id = transcript::video_id(url).ok_or_else(|| anyhow!("Invalid YouTube URL: {url}"))?;
  let dir = match dir {
    Some(dir) => dir,
    None => config.transcripts_dir()?,
  };

  let client = CaptionClient::new(&config.captions.base_url, Duration::from_secs(config.captions.timeout_secs))?;
  let entries = client.fetch(url)?;

  let path = dir.join(format!("{id}.json"));
  transcript::save_raw_transcript(&path, &entries)?;
  bentley::success!("Saved {} captions to {}", entries.len(), path.display());
  Ok(())
}

/// Structure raw caption files into `<output>/<stem>_structured.json`
pub fn structure(config: &Config, transcripts: &Path, output: &Path) -> Result<()> {
  let generator = generator(config);
  let written = transcript::process_transcripts(generator.as_ref(), transcripts, output)?;

  bentley::success!("Structured {} transcripts into {}", written.len(), output.display());
  Ok(())
}

/// Index every structured transcript in `dir` (the library by default)
pub fn index(config: &Config, dir: Option<PathBuf>, reset: bool) -> Result<()> {
  let dir = match dir {
    Some(dir) => dir,
    None => config.structured_dir()?,
  };

  let mut index = open_index(config)?;
  if reset && !index.reset() {
    bentley::warn!("Could not reset the index; adding to existing transcripts");
  }

  let documents = transcript::read_structured_transcripts(&dir)?;
  if documents.is_empty() {
    bentley::info!("No structured transcripts found in {}", dir.display());
    return Ok(());
  }

  let added = index.ingest(&documents)?;
  let skipped = documents.len() - added;
  bentley::success!("Indexed {} transcripts ({} total)", added, index.len());
  if skipped > 0 {
    bentley::warn!("{} transcripts were skipped as already indexed; use --reset to rebuild", skipped);
  }
  Ok(())
}

pub fn search(config: &Config, terms: &[String], k: usize) -> Result<()> {
  let index = open_index(config)?;
  let results = index.query(&terms.join(" "), k)?;
  display::print_results(&results);
  Ok(())
}

pub fn ask(config: &Config, question: &[String], k: usize) -> Result<()> {
  let index = open_index(config)?;
  let generator = generator(config);
  let assistant = RagAssistant::new(&index, generator.as_ref()).with_config(generation_config(config));

  match assistant.answer(&question.join(" "), k)? {
    Some(answer) => println!("{answer}"),
    None => bentley::error!("No answer could be generated"),
  }
  Ok(())
}

pub fn exercise(config: &Config, topic: Option<&str>, difficulty: Difficulty) -> Result<()> {
  let generator = generator(config);
  let builder = ExerciseBuilder::new(generator.as_ref()).with_config(generation_config(config));

  let exercise = builder.build(topic, difficulty);
  display::print_exercise(&exercise);
  println!();
  println!("{} {}", "उत्तर:".green().bold(), exercise.answer());
  Ok(())
}

pub fn quiz(config: &Config, topic: Option<&str>, questions: usize) -> Result<()> {
  let index = open_index(config)?;
  let generator = generator(config);
  let assistant = RagAssistant::new(&index, generator.as_ref()).with_config(generation_config(config));

  display::print_quiz(&assistant.build_quiz(topic, questions));
  Ok(())
}

pub fn reset(config: &Config) -> Result<()> {
  let mut index = open_index(config)?;
  if index.reset() {
    bentley::success!("Index cleared");
  } else {
    bentley::error!("Failed to clear the index at {}", index.location());
  }
  Ok(())
}

/// Interactive chat on stdin
pub fn chat(config: &Config) -> Result<()> {
  let generator = generator(config);
  let library = config.structured_dir()?;
  let stdin = std::io::stdin();
  run_chat(generator.as_ref(), &library, &mut Session::new(), stdin.lock())
}

/// Chat loop. Lines starting with `/` are commands: `/clear`, `/load <raw
/// transcript>`, `/stats`, `/exercise`, `/answer <number or text>`, `/quit`.
pub fn run_chat<R: BufRead>(
  generator: &dyn TextGenerator,
  library: &Path,
  session: &mut Session,
  input: R,
) -> Result<()> {
  println!("{}", "हिंदी चैट: /load <file>, /stats, /exercise, /answer <n>, /clear, /quit".dimmed());
  prompt("> ")?;

  for line in input.lines() {
    let line = line?;
    let text = line.trim();

    match text.split_once(' ').map_or((text, ""), |(command, arg)| (command, arg.trim())) {
      ("", _) => {}
      ("/quit", _) => break,
      ("/clear", _) => {
        session.clear_chat();
        bentley::info!("Chat cleared");
      }
      ("/load", path) => load_transcript(generator, library, session, Path::new(path))?,
      ("/stats", _) => match &session.transcript {
        Some(text) => {
          let (hindi, total) = character_counts(text);
          bentley::info!("Transcript: {} characters, {} Hindi", total, hindi);
        }
        None => bentley::warn!("No transcript loaded; use /load <file>"),
      },
      ("/exercise", _) => transcript_exercise(generator, session),
      ("/answer", selection) => report_answer(session, selection),
      _ => match session.send_message(generator, text) {
        Some(reply) => println!("{reply}"),
        None => bentley::error!("No reply from the model"),
      },
    }
    prompt("> ")?;
  }

  Ok(())
}

/// Structure a raw transcript into the session and save it to the library
fn load_transcript(
  generator: &dyn TextGenerator,
  library: &Path,
  session: &mut Session,
  path: &Path,
) -> Result<()> {
  let entries = match transcript::load_raw_transcript(path) {
    Ok(entries) => entries,
    Err(e) => {
      bentley::error!("{e:#}");
      return Ok(());
    }
  };

  let text = transcript::full_text(&entries);
  bentley::info!("Loaded {} captions", entries.len());

  let structured = transcript::structure_transcript(generator, &text);
  let saved = transcript::save_to_library(library, &structured)?;
  bentley::success!("Saved structured transcript to {}", saved.display());

  session.transcript = Some(text);
  session.structured = Some(structured);
  Ok(())
}

/// Start an exercise on the loaded transcript's own question and answer
fn transcript_exercise(generator: &dyn TextGenerator, session: &mut Session) {
  let Some(structured) = &session.structured else {
    bentley::warn!("No transcript loaded; use /load <file>");
    return;
  };

  match exercise_from_transcript(structured, generator, &mut rand::rng()) {
    Ok(exercise) => {
      display::print_exercise(&exercise);
      session.start_exercise(exercise);
    }
    Err(e) => bentley::error!("Cannot build an exercise from this transcript: {e}"),
  }
}

fn report_answer(session: &Session, selection: &str) {
  let selection = match &session.current_exercise {
    Some(exercise) => option_for(exercise, selection),
    None => selection,
  };

  match session.check_answer(selection) {
    AnswerFeedback::Correct => bentley::success!("सही उत्तर!"),
    AnswerFeedback::Incorrect { correct_answer } => {
      bentley::warn!("गलत उत्तर. सही उत्तर: {}", correct_answer)
    }
    AnswerFeedback::NoExercise => bentley::warn!("No exercise in progress; use /exercise"),
  }
}

/// An option number (1-based) resolves to that option; anything else is
/// taken as the answer text
fn option_for<'a>(exercise: &'a ExerciseRecord, selection: &'a str) -> &'a str {
  selection
    .parse::<usize>()
    .ok()
    .and_then(|n| n.checked_sub(1))
    .and_then(|i| exercise.options().get(i))
    .map_or(selection, String::as_str)
}

/// Interactive practice on stdin
pub fn practice(config: &Config, difficulty: Difficulty) -> Result<()> {
  let generator = generator(config);
  let builder = ExerciseBuilder::new(generator.as_ref()).with_config(generation_config(config));
  let stdin = std::io::stdin();
  run_practice(&builder, difficulty, &mut Session::new(), stdin.lock())?;
  Ok(())
}

/// Practice loop: one exercise per round, answered by option number or text;
/// `q` ends the session. Returns the number answered correctly.
pub fn run_practice<R: BufRead>(
  builder: &ExerciseBuilder,
  difficulty: Difficulty,
  session: &mut Session,
  input: R,
) -> Result<usize> {
  let mut correct = 0;
  let mut lines = input.lines();

  loop {
    session.start_exercise(builder.build(None, difficulty));
    let Some(exercise) = &session.current_exercise else { break };
    display::print_exercise(exercise);
    prompt("उत्तर (1-4, q to quit): ")?;

    let Some(line) = lines.next() else { break };
    let line = line?;
    let selection = line.trim();
    if selection.eq_ignore_ascii_case("q") {
      break;
    }

    match session.check_answer(option_for(exercise, selection)) {
      AnswerFeedback::Correct => {
        correct += 1;
        bentley::success!("सही उत्तर!");
      }
      AnswerFeedback::Incorrect { correct_answer } => {
        bentley::warn!("गलत उत्तर. सही उत्तर: {}", correct_answer);
      }
      AnswerFeedback::NoExercise => break,
    }
    println!();
  }

  bentley::info!("{} correct", correct);
  Ok(correct)
}

fn prompt(text: &str) -> Result<()> {
  print!("{text}");
  std::io::stdout().flush()?;
  Ok(())
}
