//! Trainable agent policies

pub mod linear;

pub use linear::LinearPolicy;
