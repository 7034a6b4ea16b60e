//! Ports (trait boundaries) for external dependencies.
//!
//! This module defines the interfaces between the training core and the
//! outside world. The game engine, the policies being trained, progress
//! reporting and checkpoint storage are all reached through these traits and
//! implemented by adapters elsewhere in the crate.

pub mod maze;
pub mod observer;
pub mod policy;
pub mod repository;

pub use maze::{MazeQuery, Simulation};
pub use observer::TrainingObserver;
pub use policy::{AdversaryMoves, Objective, Parameterized, ParameterizedPolicy, Policy};
pub use repository::CheckpointRepository;
