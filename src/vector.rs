//! Fixed-dimension real vectors
//!
//! Parameters, feature vectors, gradients and step sizes are all plain
//! `Vector`s. Values are owned and cloned across ownership boundaries;
//! binary operations reject operands of different dimension.

use std::ops::Index;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Owned vector of `f64` values with a fixed dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    values: Vec<f64>,
}

impl Vector {
    /// Zero vector of the given dimension.
    pub fn zeros(dimension: usize) -> Self {
        Self::filled(dimension, 0.0)
    }

    /// Vector with every entry set to `value`.
    pub fn filled(dimension: usize, value: f64) -> Self {
        Self {
            values: vec![value; dimension],
        }
    }

    /// Vector whose entries are drawn uniformly from `[min, max)`.
    pub fn random<R: Rng + ?Sized>(dimension: usize, min: f64, max: f64, rng: &mut R) -> Self {
        let values = (0..dimension)
            .map(|_| {
                if max > min {
                    rng.random_range(min..max)
                } else {
                    min
                }
            })
            .collect();
        Self { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.values
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    fn check_dimension(&self, other: &Vector) -> Result<()> {
        if self.dimension() != other.dimension() {
            return Err(Error::DimensionMismatch {
                expected: self.dimension(),
                got: other.dimension(),
            });
        }
        Ok(())
    }

    /// Dot product.
    pub fn dot(&self, other: &Vector) -> Result<f64> {
        self.check_dimension(other)?;
        Ok(self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| a * b)
            .sum())
    }

    /// Element-wise sum, returned as a new vector.
    pub fn add(&self, other: &Vector) -> Result<Vector> {
        self.check_dimension(other)?;
        Ok(Vector {
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| a + b)
                .collect(),
        })
    }

    /// Multiply every entry by `factor`.
    pub fn scale(&self, factor: f64) -> Vector {
        Vector {
            values: self.values.iter().map(|v| v * factor).collect(),
        }
    }

    /// Euclidean length.
    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }
}

impl From<Vec<f64>> for Vector {
    fn from(values: Vec<f64>) -> Self {
        Self { values }
    }
}

impl From<&[f64]> for Vector {
    fn from(values: &[f64]) -> Self {
        Self {
            values: values.to_vec(),
        }
    }
}

impl Index<usize> for Vector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.values[index]
    }
}
