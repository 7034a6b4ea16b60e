//! CLI infrastructure for the pursuit trainer
//!
//! This module provides the command-line interface for training policies,
//! evaluating checkpoints and inspecting feature vectors.

pub mod commands;
pub mod output;
