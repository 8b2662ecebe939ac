//! Storage backends for indexed documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::embedding::EmbedderIdentity;
use super::{IndexError, IndexedDocument};

/// Everything persisted for one named collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub embedder: Option<EmbedderIdentity>,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub documents: Vec<IndexedDocument>,
}

impl Collection {
  pub fn new(name: &str) -> Self {
    Self { name: name.to_string(), embedder: None, created_at: Utc::now(), documents: Vec::new() }
  }

  pub fn contains(&self, id: &str) -> bool {
    self.documents.iter().any(|doc| doc.id == id)
  }
}

/// Holds one collection and commits whole-collection replacements
pub trait VectorStore {
  fn collection(&self) -> &Collection;

  /// Replace the stored collection; on error the previous state is kept
  fn replace(&mut self, collection: Collection) -> Result<(), IndexError>;

  fn is_persistent(&self) -> bool;

  fn location(&self) -> String;
}

/// Volatile store, lost when the process exits
#[derive(Debug, Clone)]
pub struct MemoryStore {
  collection: Collection,
}

impl MemoryStore {
  pub fn new(name: &str) -> Self {
    Self { collection: Collection::new(name) }
  }
}

impl VectorStore for MemoryStore {
  fn collection(&self) -> &Collection {
    &self.collection
  }

  fn replace(&mut self, collection: Collection) -> Result<(), IndexError> {
    self.collection = collection;
    Ok(())
  }

  fn is_persistent(&self) -> bool {
    false
  }

  fn location(&self) -> String {
    "memory".to_string()
  }
}

/// A collection kept in `<dir>/<name>.json`
#[derive(Debug)]
pub struct FileStore {
  path: PathBuf,
  collection: Collection,
}

impl FileStore {
  /// Open an existing collection file or create an empty one.
  ///
  /// Fails when the directory cannot be written or the file does not parse.
  pub fn open(dir: &Path, name: &str) -> Result<Self, IndexError> {
    fs::create_dir_all(dir).map_err(|source| IndexError::Io { path: dir.to_path_buf(), source })?;
    let path = dir.join(format!("{name}.json"));

    if path.exists() {
      let content =
        fs::read_to_string(&path).map_err(|source| IndexError::Io { path: path.clone(), source })?;
      let collection: Collection = serde_json::from_str(&content)
        .map_err(|e| IndexError::Corrupt { path: path.clone(), message: e.to_string() })?;
      tracing::debug!(path = %path.display(), documents = collection.documents.len(), "opened collection");
      return Ok(Self { path, collection });
    }

    let collection = Collection::new(name);
    write_atomically(&path, &collection)?;
    tracing::debug!(path = %path.display(), "created collection");
    Ok(Self { path, collection })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl VectorStore for FileStore {
  fn collection(&self) -> &Collection {
    &self.collection
  }

  fn replace(&mut self, collection: Collection) -> Result<(), IndexError> {
    write_atomically(&self.path, &collection)?;
    self.collection = collection;
    Ok(())
  }

  fn is_persistent(&self) -> bool {
    true
  }

  fn location(&self) -> String {
    self.path.display().to_string()
  }
}

/// Write to a sibling temp file, then rename over the target
fn write_atomically(path: &Path, collection: &Collection) -> Result<(), IndexError> {
  let content = serde_json::to_string(collection)?;
  let tmp = path.with_extension("json.tmp");

  fs::write(&tmp, content).map_err(|source| IndexError::Io { path: tmp.clone(), source })?;
  fs::rename(&tmp, path).map_err(|source| IndexError::Io { path: path.to_path_buf(), source })
}
