//! Project persistence
//!
//! The workspace is stored as an opaque JSON value. Nothing here looks
//! inside it: the envelope only records when it was saved and a content
//! hash so a damaged file is noticed on load.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

/// Storage key of the current project format
pub const PROJECT_KEY: &str = "block-platform.project.v1";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed project file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected project key '{0}'")]
    KeyMismatch(String),

    #[error("content hash mismatch: expected {expected}, computed {actual}")]
    HashMismatch { expected: String, actual: String },
}

/// Save and restore a workspace value
pub trait ProjectStorage {
    fn save(&mut self, workspace: &Value) -> Result<(), StorageError>;

    /// The last saved workspace, or `None` when nothing has been saved
    fn load(&self) -> Result<Option<Value>, StorageError>;
}

/* ===================== Envelope ===================== */

/// On-disk wrapper around a saved workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEnvelope {
    pub key: String,
    pub saved_at: DateTime<Utc>,
    pub content_hash: String,
    pub workspace: Value,
}

impl ProjectEnvelope {
    pub fn new(workspace: Value) -> Result<Self, StorageError> {
        Ok(Self {
            key: PROJECT_KEY.to_string(),
            saved_at: Utc::now(),
            content_hash: content_hash(&workspace)?,
            workspace,
        })
    }

    /// Check the key and hash, then hand back the workspace
    pub fn into_workspace(self) -> Result<Value, StorageError> {
        if self.key != PROJECT_KEY {
            return Err(StorageError::KeyMismatch(self.key));
        }
        let actual = content_hash(&self.workspace)?;
        if actual != self.content_hash {
            return Err(StorageError::HashMismatch {
                expected: self.content_hash,
                actual,
            });
        }
        Ok(self.workspace)
    }
}

/// SHA-256 of the compact JSON form, hex encoded
pub fn content_hash(workspace: &Value) -> Result<String, StorageError> {
    let bytes = serde_json::to_vec(workspace)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/* ===================== File Storage ===================== */

/// Stores the project envelope in a single JSON file
#[derive(Debug, Clone)]
pub struct FileProjectStorage {
    path: PathBuf,
}

impl FileProjectStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ProjectStorage for FileProjectStorage {
    fn save(&mut self, workspace: &Value) -> Result<(), StorageError> {
        let envelope = ProjectEnvelope::new(workspace.clone())?;
        let json = serde_json::to_string_pretty(&envelope)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        fs::write(&self.path, json).map_err(|e| self.io_error(e))?;

        info!(path = %self.path.display(), hash = %envelope.content_hash, "project saved");
        Ok(())
    }

    fn load(&self) -> Result<Option<Value>, StorageError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no saved project");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let envelope: ProjectEnvelope = serde_json::from_str(&text)?;
        debug!(path = %self.path.display(), saved_at = %envelope.saved_at, "project loaded");
        envelope.into_workspace().map(Some)
    }
}

/* ===================== Memory Storage ===================== */

/// Keeps the envelope in memory; for hosts without a filesystem and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryProjectStorage {
    saved: Option<ProjectEnvelope>,
}

impl MemoryProjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn envelope(&self) -> Option<&ProjectEnvelope> {
        self.saved.as_ref()
    }
}

impl ProjectStorage for MemoryProjectStorage {
    fn save(&mut self, workspace: &Value) -> Result<(), StorageError> {
        self.saved = Some(ProjectEnvelope::new(workspace.clone())?);
        Ok(())
    }

    fn load(&self) -> Result<Option<Value>, StorageError> {
        self.saved
            .clone()
            .map(ProjectEnvelope::into_workspace)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> Value {
        json!({
            "blocks": { "languageVersion": 0, "blocks": [{ "type": "bp_start", "id": "s", "x": 10, "y": 20 }] },
            "variables": [{ "name": "score", "id": "v1" }]
        })
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileProjectStorage::new(dir.path().join("nested/project.json"));

        assert_eq!(storage.load().unwrap(), None);
        storage.save(&sample()).unwrap();
        assert_eq!(storage.load().unwrap(), Some(sample()));

        let raw: Value = serde_json::from_str(&fs::read_to_string(storage.path()).unwrap()).unwrap();
        assert_eq!(raw["key"], PROJECT_KEY);
        assert_eq!(raw["content_hash"].as_str().unwrap().len(), 64);
        assert!(raw["saved_at"].is_string());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileProjectStorage::new(dir.path().join("project.json"));

        storage.save(&sample()).unwrap();
        storage.save(&json!({})).unwrap();
        assert_eq!(storage.load().unwrap(), Some(json!({})));
    }

    #[test]
    fn test_tampered_workspace_detected() {
        let dir = TempDir::new().unwrap();
        let mut storage = FileProjectStorage::new(dir.path().join("project.json"));
        storage.save(&sample()).unwrap();

        let mut raw: Value = serde_json::from_str(&fs::read_to_string(storage.path()).unwrap()).unwrap();
        raw["workspace"]["variables"][0]["name"] = json!("lives");
        fs::write(storage.path(), raw.to_string()).unwrap();

        assert!(matches!(storage.load(), Err(StorageError::HashMismatch { .. })));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let mut envelope = ProjectEnvelope::new(sample()).unwrap();
        envelope.key = "block-platform.project.v0".into();
        assert!(matches!(
            envelope.into_workspace(),
            Err(StorageError::KeyMismatch(key)) if key.ends_with("v0")
        ));
    }

    #[test]
    fn test_garbage_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("project.json");
        fs::write(&path, "not json").unwrap();

        let storage = FileProjectStorage::new(path);
        assert!(matches!(storage.load(), Err(StorageError::Json(_))));
    }

    #[test]
    fn test_hash_ignores_key_order() {
        let a = json!({ "a": 1, "b": [1, 2] });
        let b = json!({ "b": [1, 2], "a": 1 });
        assert_eq!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
        assert_ne!(content_hash(&a).unwrap(), content_hash(&json!({ "a": 2 })).unwrap());
    }

    #[test]
    fn test_memory_storage() {
        let mut storage = MemoryProjectStorage::new();
        assert_eq!(storage.load().unwrap(), None);

        storage.save(&sample()).unwrap();
        assert_eq!(storage.load().unwrap(), Some(sample()));
        assert_eq!(storage.envelope().unwrap().key, PROJECT_KEY);
    }
}
