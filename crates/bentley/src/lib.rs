//! Prefixed terminal logging for the vani tools.
//!
//! User-facing status lines go to stderr with a short colored prefix
//! (`[info]`, `[warn]`, `[error]`, `[sccs]`, `[verb]`), one prefix per line of a
//! multi-line message. Library diagnostics go through `tracing`; [`init`]
//! installs the subscriber that prints them.
//!
//! ```no_run
//! bentley::init(false);
//! bentley::info!("indexed {} transcripts", 3);
//! bentley::verbose!("only shown with --verbose");
//! ```

use colored::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Enable verbose output and install the tracing subscriber.
///
/// `RUST_LOG` wins over the built-in filter when it is set. Calling this more
/// than once only updates the verbosity switch.
pub fn init(verbose: bool) {
  set_verbose(verbose);

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if verbose {
      EnvFilter::new("vani=debug,warn")
    } else {
      EnvFilter::new("vani=warn,error")
    }
  });

  let _ = tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
    .with(filter)
    .try_init();
}

pub fn set_verbose(verbose: bool) {
  VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
  VERBOSE.load(Ordering::Relaxed)
}

/// Write every line of a message to stderr
pub fn log(message: &str) {
  for line in message.lines() {
    eprintln!("{line}");
  }
}

/// Pad a colored prefix so message bodies line up across levels
fn format_prefix(color: Color, prefix: &str) -> String {
  let padding = 7usize.saturating_sub(prefix.len() + 2);
  format!("[{}]{:<padding$}", prefix.color(color).bold(), "")
}

/// Prefix each line of `message`; empty messages still produce one line
pub fn prefixed_lines(color: Color, prefix: &str, message: &str) -> Vec<String> {
  let prefix = format_prefix(color, prefix);
  if message.is_empty() {
    return vec![prefix];
  }
  message.lines().map(|line| format!("{prefix} {line}")).collect()
}

fn emit(color: Color, prefix: &str, message: &str) {
  for line in prefixed_lines(color, prefix, message) {
    log(&line);
  }
}

/// General progress information
pub fn info(message: &str) {
  emit(Color::Blue, "info", message);
}

/// Something the user should look at, work continued
pub fn warn(message: &str) {
  emit(Color::Yellow, "warn", message);
}

/// An operation failed
pub fn error(message: &str) {
  emit(Color::Red, "error", message);
}

/// An operation completed
pub fn success(message: &str) {
  emit(Color::Green, "sccs", message);
}

/// Detail that is only printed when verbose output is enabled
pub fn verbose(message: &str) {
  if is_verbose() {
    emit(Color::Cyan, "verb", message);
  }
}

#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => {
    $crate::info(&format!($($arg)*))
  };
}

#[macro_export]
macro_rules! warn {
  ($($arg:tt)*) => {
    $crate::warn(&format!($($arg)*))
  };
}

#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => {
    $crate::error(&format!($($arg)*))
  };
}

#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => {
    $crate::success(&format!($($arg)*))
  };
}

#[macro_export]
macro_rules! verbose {
  ($($arg:tt)*) => {
    $crate::verbose(&format!($($arg)*))
  };
}
