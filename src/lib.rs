//! Pursuit-avoidance agent trained by finite-difference policy gradient
//!
//! This crate provides:
//! - A feature engine that turns a maze position and a candidate move into a
//!   fixed-size vector (safe-path search, distances, pill and vulnerability
//!   state)
//! - A linear value-function policy over those features
//! - Concurrent Monte-Carlo evaluation of a policy against adversaries
//! - Gradient estimation by least-squares regression over random
//!   perturbations, with sign-adaptive per-parameter step sizes
//! - A training loop that persists the best parameters it has seen
//! - A compact reference maze simulation to train and test against

pub mod adapters;
pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod maze;
pub mod policy;
pub mod ports;
pub mod training;
pub mod vector;

pub use error::{Error, Result};
