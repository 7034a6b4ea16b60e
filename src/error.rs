//! Error types for the pursuit crate

use thiserror::Error;

use crate::maze::{Direction, NodeIndex};

/// Main error type for the pursuit crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid move: {direction:?} is not traversable from node {node}")]
    InvalidMove { node: NodeIndex, direction: Direction },

    #[error("invalid move: direction must not be neutral (node {node})")]
    NeutralDirection { node: NodeIndex },

    #[error("invalid move: {direction:?} is blocked at node {node} and no turn continues it")]
    NoTurnAvailable { node: NodeIndex, direction: Direction },

    #[error("node {node} is out of bounds (maze has {node_count} nodes)")]
    InvalidNode { node: NodeIndex, node_count: usize },

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("invalid maze layout: {message}")]
    InvalidLayout { message: String },

    #[error("unknown layout '{name}'. Expected one of: {expected}")]
    UnknownLayout { name: String, expected: String },

    #[error("no legal moves available at node {node}")]
    NoLegalMoves { node: NodeIndex },

    #[error("adversary policy returned {got} moves for {expected} adversaries")]
    AdversaryMoveCount { expected: usize, got: usize },

    #[error("playout {trial} exceeded its time budget after {steps} steps")]
    PlayoutTimeout { trial: usize, steps: usize },

    #[error("{failed} of {total} playouts failed; first failure: {first}")]
    PlayoutFailures {
        failed: usize,
        total: usize,
        first: String,
    },

    #[error("failed to build worker pool: {message}")]
    WorkerPool { message: String },

    #[error("invalid checkpoint '{context}': {message}")]
    CheckpointFormat { context: String, message: String },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to {operation}: {message}")]
    SerializationContext { operation: String, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("progress bar template error: {message}")]
    ProgressBarTemplate { message: String },

    #[error("invalid opponent '{input}'. Expected one of: {expected}")]
    ParseOpponent { input: String, expected: String },
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}
