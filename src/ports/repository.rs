//! Repository port for checkpoint persistence.
//!
//! This module defines the trait boundary between the training loop and the
//! storage of parameter checkpoints.

use std::path::Path;

use crate::{Result, training::Checkpoint};

/// Port for persisting and loading parameter checkpoints.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
///
/// use pursuit::{ports::CheckpointRepository, training::Checkpoint};
///
/// fn persist<R: CheckpointRepository>(repo: &R, checkpoint: &Checkpoint) -> pursuit::Result<()> {
///     repo.save(checkpoint, Path::new("policy.csv"))
/// }
/// ```
pub trait CheckpointRepository: Send {
    /// Save a checkpoint, replacing whatever was stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the location cannot be written.
    fn save(&self, checkpoint: &Checkpoint, path: &Path) -> Result<()>;

    /// Load the checkpoint stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is stored there or the content is not a
    /// valid checkpoint.
    fn load(&self, path: &Path) -> Result<Checkpoint>;
}
