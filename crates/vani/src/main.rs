use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use vani::commands;
use vani::config::Config;
use vani::exercise::Difficulty;
use vani::rag::DEFAULT_TOP_K;

#[derive(Parser)]
#[command(name = "vani")]
#[command(about = "Vani - Hindi listening practice\nStructure transcripts, search them, and practise with generated exercises")]
#[command(version)]
struct Cli {
  /// Show debug output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Download a video's captions as a raw transcript
  Fetch {
    /// YouTube watch, youtu.be, embed or /v/ URL
    url: String,
    /// Output directory (defaults to <home>/transcripts)
    #[arg(short, long)]
    dir: Option<PathBuf>,
  },
  /// Structure raw caption files with the language model
  Structure {
    /// Directory of raw transcript JSON files
    transcripts: PathBuf,
    /// Directory for the structured output
    output: PathBuf,
  },
  /// Add structured transcripts to the search index
  Index {
    /// Directory of structured transcripts (defaults to the library)
    #[arg(short, long)]
    dir: Option<PathBuf>,
    /// Clear the index before adding
    #[arg(short, long)]
    reset: bool,
  },
  /// Find the transcripts closest to a query
  Search {
    /// Search terms (space-separated)
    #[arg(required = true)]
    terms: Vec<String>,
    /// Number of results
    #[arg(short, default_value_t = DEFAULT_TOP_K)]
    k: usize,
  },
  /// Answer a question from indexed transcripts
  Ask {
    #[arg(required = true)]
    question: Vec<String>,
    /// Number of transcripts to ground the answer in
    #[arg(short, default_value_t = DEFAULT_TOP_K)]
    k: usize,
  },
  /// Generate one exercise
  Exercise {
    /// Conversation topic (random when omitted)
    #[arg(short, long)]
    topic: Option<String>,
    #[arg(short, long, value_enum, default_value_t = Difficulty::Intermediate)]
    difficulty: Difficulty,
  },
  /// Generate a quiz of intermediate exercises
  Quiz {
    #[arg(short, long)]
    topic: Option<String>,
    /// Number of questions
    #[arg(short = 'n', long, default_value_t = 5)]
    questions: usize,
  },
  /// Remove every transcript from the index
  Reset,
  /// Chat with the model; /load structures a raw transcript
  Chat,
  /// Answer generated exercises interactively
  Practice {
    #[arg(short, long, value_enum, default_value_t = Difficulty::Intermediate)]
    difficulty: Difficulty,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  bentley::init(cli.verbose);

  let config = Config::load()?;

  match cli.command {
    Commands::Fetch { url, dir } => {
      commands::fetch(&config, &url, dir)?;
    }
    Commands::Structure { transcripts, output } => {
      commands::structure(&config, &transcripts, &output)?;
    }
    Commands::Index { dir, reset } => {
      commands::index(&config, dir, reset)?;
    }
    Commands::Search { terms, k } => {
      commands::search(&config, &terms, k)?;
    }
    Commands::Ask { question, k } => {
      commands::ask(&config, &question, k)?;
    }
    Commands::Exercise { topic, difficulty } => {
      commands::exercise(&config, topic.as_deref(), difficulty)?;
    }
    Commands::Quiz { topic, questions } => {
      commands::quiz(&config, topic.as_deref(), questions)?;
    }
    Commands::Reset => {
      commands::reset(&config)?;
    }
    Commands::Chat => {
      commands::chat(&config)?;
    }
    Commands::Practice { difficulty } => {
      commands::practice(&config, difficulty)?;
    }
  }

  Ok(())
}
