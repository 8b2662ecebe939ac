//! Semantic search over structured transcripts
//!
//! [`TranscriptIndex`] embeds each transcript's title and content, keeps the
//! vectors in a [`VectorStore`], and answers nearest-neighbour queries ranked
//! by squared Euclidean distance. A collection remembers which embedder filled
//! it; querying or ingesting with a different one is an error rather than a
//! silently meaningless ranking.

pub mod distance;
pub mod embedding;
#[cfg(feature = "neural")]
pub mod onnx;
pub mod store;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::Config;
use crate::transcript::TranscriptDocument;
use embedding::{Embedder, EmbedderIdentity};
use store::{Collection, FileStore, MemoryStore, VectorStore};

pub use distance::squared_l2;
pub use embedding::{HashingEmbedder, RemoteEmbedder};
#[cfg(feature = "neural")]
pub use onnx::OnnxEmbedder;

#[derive(Debug, Error)]
pub enum IndexError {
  #[error("index I/O failed at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("index file {path} is corrupt: {message}")]
  Corrupt { path: PathBuf, message: String },
  #[error("failed to serialize index: {0}")]
  Serialize(#[from] serde_json::Error),
  #[error("embedding failed: {0}")]
  Embedding(String),
  #[error("collection was built with {stored}, but the configured embedder is {current}")]
  EmbedderMismatch { stored: EmbedderIdentity, current: EmbedderIdentity },
  #[error("expected a {expected}-dimensional embedding, got {actual}")]
  DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
  pub title: String,
  pub source: String,
  pub timestamp: String,
}

/// One stored transcript. Created at ingestion and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
  pub id: String,
  pub embedding: Vec<f32>,
  pub metadata: DocumentMetadata,
  pub document_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
  pub id: String,
  pub document_text: String,
  pub metadata: DocumentMetadata,
  pub distance: f32,
}

pub struct TranscriptIndex {
  embedder: Box<dyn Embedder>,
  store: Box<dyn VectorStore>,
}

impl TranscriptIndex {
  pub fn new(embedder: Box<dyn Embedder>, store: Box<dyn VectorStore>) -> Self {
    Self { embedder, store }
  }

  /// Open the persistent collection in `dir`, or fall back to a volatile one
  /// when it cannot be opened
  pub fn open(dir: &Path, collection: &str, embedder: Box<dyn Embedder>) -> Self {
    match FileStore::open(dir, collection) {
      Ok(store) => Self::new(embedder, Box::new(store)),
      Err(e) => {
        tracing::warn!(error = %e, "persistent index unavailable, using in-memory index");
        Self::in_memory(collection, embedder)
      }
    }
  }

  pub fn in_memory(collection: &str, embedder: Box<dyn Embedder>) -> Self {
    Self::new(embedder, Box::new(MemoryStore::new(collection)))
  }

  /// Index described by the configuration's embedding and index settings
  pub fn from_config(config: &Config) -> Result<Self, IndexError> {
    let embedder = embedding::from_settings(&config.embedding)?;
    let collection = &config.index.collection;

    match config.index_dir() {
      Ok(dir) => Ok(Self::open(&dir, collection, embedder)),
      Err(e) => {
        tracing::warn!(error = %e, "no index directory, using in-memory index");
        Ok(Self::in_memory(collection, embedder))
      }
    }
  }

  /// Embed and store a batch of transcripts; returns how many were added.
  ///
  /// Ids are `transcript_<position in batch>`. An id that is already stored
  /// is skipped, so a second batch without a reset adds nothing for
  /// positions the first batch used.
  pub fn ingest(&mut self, transcripts: &[TranscriptDocument]) -> Result<usize, IndexError> {
    self.check_embedder()?;
    if transcripts.is_empty() {
      return Ok(0);
    }

    let mut collection = self.store.collection().clone();
    if collection.embedder.is_none() {
      collection.embedder = Some(EmbedderIdentity::of(self.embedder.as_ref()));
    }

    let mut added = 0;
    for (ordinal, transcript) in transcripts.iter().enumerate() {
      let id = format!("transcript_{ordinal}");
      if collection.contains(&id) {
        tracing::warn!(id = %id, title = %transcript.title, "id already indexed, skipping");
        continue;
      }

      let document_text = format!("{} {}", transcript.title, transcript.content);
      let embedding = self.embed_checked(&document_text)?;
      collection.documents.push(IndexedDocument {
        id,
        embedding,
        metadata: DocumentMetadata {
          title: transcript.title.clone(),
          source: transcript.source.clone(),
          timestamp: transcript.timestamp.clone(),
        },
        document_text,
      });
      added += 1;
    }

    if added > 0 {
      self.store.replace(collection)?;
    }
    tracing::debug!(added, total = self.len(), "ingested transcripts");
    Ok(added)
  }

  /// Up to `k` stored documents closest to `text`, nearest first
  pub fn query(&self, text: &str, k: usize) -> Result<Vec<SearchResult>, IndexError> {
    self.check_embedder()?;
    if k == 0 || self.is_empty() {
      return Ok(Vec::new());
    }

    let query = self.embed_checked(text)?;
    let mut results: Vec<SearchResult> = self
      .store
      .collection()
      .documents
      .iter()
      .map(|doc| SearchResult {
        id: doc.id.clone(),
        document_text: doc.document_text.clone(),
        metadata: doc.metadata.clone(),
        distance: squared_l2(&query, &doc.embedding),
      })
      .collect();

    results.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));
    results.truncate(k);
    Ok(results)
  }

  /// Drop every document. Returns false when the empty collection could not
  /// be written.
  pub fn reset(&mut self) -> bool {
    let name = self.store.collection().name.clone();
    match self.store.replace(Collection::new(&name)) {
      Ok(()) => true,
      Err(e) => {
        tracing::warn!(error = %e, "failed to reset index");
        false
      }
    }
  }

  pub fn len(&self) -> usize {
    self.store.collection().documents.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn is_persistent(&self) -> bool {
    self.store.is_persistent()
  }

  pub fn location(&self) -> String {
    self.store.location()
  }

  pub fn embedder_identity(&self) -> EmbedderIdentity {
    EmbedderIdentity::of(self.embedder.as_ref())
  }

  fn check_embedder(&self) -> Result<(), IndexError> {
    let current = self.embedder_identity();
    match &self.store.collection().embedder {
      Some(stored) if *stored != current => {
        Err(IndexError::EmbedderMismatch { stored: stored.clone(), current })
      }
      _ => Ok(()),
    }
  }

  fn embed_checked(&self, text: &str) -> Result<Vec<f32>, IndexError> {
    let vector = self.embedder.embed(text)?;
    let expected = self.embedder.dimension();
    if vector.len() != expected {
      return Err(IndexError::DimensionMismatch { expected, actual: vector.len() });
    }
    Ok(vector)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use embedding::MockEmbedder;

  fn transcript(title: &str, content: &str) -> TranscriptDocument {
    TranscriptDocument {
      title: title.to_string(),
      content: content.to_string(),
      ..TranscriptDocument::default()
    }
  }

  fn mock_embedder(name: &'static str, dimension: usize) -> MockEmbedder {
    let mut embedder = MockEmbedder::new();
    embedder.expect_name().returning(move || name.to_string());
    embedder.expect_dimension().return_const(dimension);
    embedder
  }

  #[test]
  fn test_ids_follow_batch_order() {
    let mut index = TranscriptIndex::in_memory("t", Box::new(HashingEmbedder::new(32)));
    let added = index.ingest(&[transcript("एक", "पहला"), transcript("दो", "दूसरा")]).unwrap();
    assert_eq!(added, 2);

    let ids: Vec<String> = index.query("एक", 5).unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"transcript_0".to_string()));
    assert!(ids.contains(&"transcript_1".to_string()));
  }

  #[test]
  fn test_second_batch_collides() {
    let mut index = TranscriptIndex::in_memory("t", Box::new(HashingEmbedder::new(32)));
    index.ingest(&[transcript("a", "b")]).unwrap();
    assert_eq!(index.ingest(&[transcript("c", "d"), transcript("e", "f")]).unwrap(), 1);
    assert_eq!(index.len(), 2);
  }

  #[test]
  fn test_document_text_joins_title_and_content() {
    let mut index = TranscriptIndex::in_memory("t", Box::new(HashingEmbedder::new(32)));
    index.ingest(&[transcript("शीर्षक", "संवाद उत्तर")]).unwrap();
    let result = &index.query("शीर्षक", 1).unwrap()[0];
    assert_eq!(result.document_text, "शीर्षक संवाद उत्तर");
    assert_eq!(result.metadata.title, "शीर्षक");
  }

  #[test]
  fn test_results_sorted_and_limited() {
    let mut index = TranscriptIndex::in_memory("t", Box::new(HashingEmbedder::default()));
    index
      .ingest(&[
        transcript("railway station", "ticket counter queue"),
        transcript("kitchen", "cooking dal"),
        transcript("market", "buying vegetables"),
      ])
      .unwrap();

    let results = index.query("railway station ticket", 2).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].metadata.title, "railway station");
    assert!(results[0].distance <= results[1].distance);
    assert!(index.query("anything", 0).unwrap().is_empty());
  }

  #[test]
  fn test_empty_index_query() {
    let index = TranscriptIndex::in_memory("t", Box::new(HashingEmbedder::default()));
    assert!(index.query("कुछ भी", 3).unwrap().is_empty());
  }

  #[test]
  fn test_embedder_mismatch_is_an_error() {
    let mut index = TranscriptIndex::in_memory("t", Box::new(HashingEmbedder::new(8)));
    index.ingest(&[transcript("a", "b")]).unwrap();

    let collection = index.store.collection().clone();
    let mut other = TranscriptIndex::in_memory("t", Box::new(mock_embedder("other", 8)));
    other.store.replace(collection).unwrap();

    assert!(matches!(other.query("a", 1), Err(IndexError::EmbedderMismatch { .. })));
    assert!(matches!(other.ingest(&[transcript("c", "d")]), Err(IndexError::EmbedderMismatch { .. })));
  }

  #[test]
  fn test_wrong_dimension_is_an_error() {
    let mut embedder = mock_embedder("short", 4);
    embedder.expect_embed().returning(|_| Ok(vec![1.0, 0.0]));

    let mut index = TranscriptIndex::in_memory("t", Box::new(embedder));
    let err = index.ingest(&[transcript("a", "b")]).unwrap_err();
    assert!(matches!(err, IndexError::DimensionMismatch { expected: 4, actual: 2 }));
    assert!(index.is_empty());
  }

  #[test]
  fn test_embedding_failure_propagates() {
    let mut embedder = mock_embedder("flaky", 4);
    embedder.expect_embed().returning(|_| Err(IndexError::Embedding("offline".to_string())));

    let mut index = TranscriptIndex::in_memory("t", Box::new(embedder));
    assert!(matches!(index.ingest(&[transcript("a", "b")]), Err(IndexError::Embedding(_))));
  }

  #[test]
  fn test_reset_empties_collection() {
    let mut index = TranscriptIndex::in_memory("t", Box::new(HashingEmbedder::new(8)));
    index.ingest(&[transcript("a", "b")]).unwrap();
    assert!(index.reset());
    assert!(index.is_empty());
    assert_eq!(index.ingest(&[transcript("c", "d")]).unwrap(), 1);
  }
}
