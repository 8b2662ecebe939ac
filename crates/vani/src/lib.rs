//! Vani - Hindi listening-comprehension practice from video transcripts
//!
//! Raw captions are structured by a language model, indexed for semantic
//! search, and turned into multiple-choice exercises and quizzes.

pub mod commands;
pub mod config;
pub mod display;
pub mod exercise;
pub mod generation;
pub mod index;
pub mod options;
pub mod parser;
pub mod rag;
pub mod session;
pub mod transcript;
