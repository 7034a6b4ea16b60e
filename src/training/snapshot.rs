//! Resumable training state
//!
//! The checkpoint only stores the best parameters. A snapshot additionally
//! keeps what the adaptive step sizes need to continue where a run stopped.
//! Snapshots are written as MessagePack.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, vector::Vector};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSnapshot {
    pub version: u32,
    pub iteration: usize,
    pub best_evaluation: f64,
    pub best_parameters: Vector,
    pub current_parameters: Vector,
    pub step_sizes: Vector,
    pub previous_gradient: Vector,
}

impl TrainingSnapshot {
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|source| Error::Io {
            operation: format!("create file {path:?}"),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        rmp_serde::encode::write(&mut writer, self).map_err(|e| Error::SerializationContext {
            operation: "serialize training snapshot to MessagePack".to_string(),
            message: e.to_string(),
        })?;
        writer.flush().map_err(|source| Error::Io {
            operation: format!("write file {path:?}"),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::Io {
            operation: format!("open file {path:?}"),
            source,
        })?;
        let snapshot: Self = rmp_serde::decode::from_read(BufReader::new(file)).map_err(|e| {
            Error::SerializationContext {
                operation: "deserialize training snapshot from MessagePack".to_string(),
                message: e.to_string(),
            }
        })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::CheckpointFormat {
                context: path.display().to_string(),
                message: format!("unsupported snapshot version {}", snapshot.version),
            });
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn snapshot_survives_disk() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("run.snapshot");
        let snapshot = TrainingSnapshot {
            version: SNAPSHOT_VERSION,
            iteration: 7,
            best_evaluation: 1234.5,
            best_parameters: Vector::from(vec![0.1, -0.2]),
            current_parameters: Vector::from(vec![0.15, -0.25]),
            step_sizes: Vector::from(vec![1e-3, 2e-4]),
            previous_gradient: Vector::from(vec![3.0, -1.0]),
        };
        snapshot.save(&path).unwrap();
        assert_eq!(TrainingSnapshot::load(&path).unwrap(), snapshot);
    }

    #[test]
    fn missing_snapshot_is_an_io_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let err = TrainingSnapshot::load(&temp_dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
