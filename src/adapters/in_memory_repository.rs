//! In-memory checkpoint repository for testing.
//!
//! This adapter provides a pure in-memory implementation of
//! CheckpointRepository, so training runs can be tested without touching the
//! file system.

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
};

use crate::{Result, error::Error, ports::CheckpointRepository, training::Checkpoint};

/// In-memory repository for testing.
///
/// Checkpoints are stored MessagePack-encoded in a shared HashMap keyed by
/// path.
///
/// # Examples
///
/// ```
/// use std::path::Path;
///
/// use pursuit::{
///     adapters::InMemoryRepository, ports::CheckpointRepository, training::Checkpoint,
///     vector::Vector,
/// };
///
/// let repo = InMemoryRepository::new();
/// let checkpoint = Checkpoint::new(3, 250.0, Vector::from(vec![0.5, -0.5]));
///
/// // Save to "memory" (not disk)
/// repo.save(&checkpoint, Path::new("policy.csv"))?;
///
/// // Load from "memory"
/// let loaded = repo.load(Path::new("policy.csv"))?;
/// assert_eq!(loaded, checkpoint);
/// # Ok::<(), pursuit::Error>(())
/// ```
///
/// # Thread Safety
///
/// All clones share the same underlying storage, so a clone kept by a test
/// sees everything a trainer saved through its own copy.
#[derive(Clone)]
pub struct InMemoryRepository {
    storage: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    saves: Arc<Mutex<usize>>,
}

impl InMemoryRepository {
    /// Create a new empty in-memory repository.
    pub fn new() -> Self {
        Self {
            storage: Arc::new(Mutex::new(HashMap::new())),
            saves: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of distinct paths currently stored.
    pub fn count(&self) -> usize {
        self.storage.lock().unwrap().len()
    }

    /// Number of save calls so far, overwrites included.
    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }

    /// Clear all stored checkpoints.
    pub fn clear(&self) {
        self.storage.lock().unwrap().clear();
        *self.saves.lock().unwrap() = 0;
    }

    /// Check if a checkpoint exists at the given path.
    pub fn contains(&self, path: &Path) -> bool {
        let key = path.to_string_lossy().to_string();
        self.storage.lock().unwrap().contains_key(&key)
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckpointRepository for InMemoryRepository {
    fn save(&self, checkpoint: &Checkpoint, path: &Path) -> Result<()> {
        let key = path.to_string_lossy().to_string();

        let bytes = rmp_serde::to_vec(checkpoint).map_err(|e| Error::SerializationContext {
            operation: "serialize checkpoint for in-memory storage".to_string(),
            message: e.to_string(),
        })?;

        self.storage.lock().unwrap().insert(key, bytes);
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<Checkpoint> {
        let key = path.to_string_lossy().to_string();
        let storage = self.storage.lock().unwrap();

        let bytes = storage.get(&key).ok_or_else(|| Error::Io {
            operation: format!("load checkpoint from in-memory storage at {path:?}"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "key not found in memory"),
        })?;

        rmp_serde::from_slice(bytes).map_err(|e| Error::SerializationContext {
            operation: "deserialize checkpoint from in-memory storage".to_string(),
            message: e.to_string(),
        })
    }
}
