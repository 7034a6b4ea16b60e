//! Finite-difference gradient estimation
//!
//! The objective is evaluated at the current parameters and at `R` randomly
//! perturbed copies. The gradient is the least-squares solution `g` of
//! `Δ ≈ D g`, where the rows of `D` are the perturbations and `Δ` the changes
//! in evaluation, computed through the normal equations `(DᵗD)⁻¹ Dᵗ Δ`.

use nalgebra::{DMatrix, DVector};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    ports::{Objective, Parameterized},
    vector::Vector,
};

/// Smallest accepted ratio between the extreme singular values of `DᵗD`.
const CONDITION_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientConfig {
    /// Number of perturbations `R`. Raised to the parameter dimension when
    /// smaller so that `DᵗD` can have full rank.
    pub perturbations: usize,
    pub perturbation_min: f64,
    pub perturbation_max: f64,
    pub seed: u64,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            perturbations: 16,
            perturbation_min: 0.0,
            perturbation_max: 0.05,
            seed: 0,
        }
    }
}

impl GradientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.perturbations == 0 {
            return Err(Error::InvalidConfiguration {
                message: "gradient.perturbations must be positive".to_string(),
            });
        }
        let (lo, hi) = (self.perturbation_min, self.perturbation_max);
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(Error::InvalidConfiguration {
                message: format!("gradient perturbation range [{lo}, {hi}) is empty or not finite"),
            });
        }
        Ok(())
    }

    /// Perturbations actually drawn for a policy of the given dimension.
    pub fn runs_for(&self, dimension: usize) -> usize {
        self.perturbations.max(dimension)
    }
}

/// Result of one estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientEstimate {
    pub gradient: Vector,
    /// Evaluation at the unperturbed parameters.
    pub baseline: f64,
    /// Evaluation change per perturbation.
    pub deltas: Vec<f64>,
    /// True when the regression was ill-conditioned and the zero vector was returned.
    pub singular: bool,
}

#[derive(Debug, Clone)]
pub struct GradientEstimator {
    config: GradientConfig,
    rng: StdRng,
}

impl GradientEstimator {
    pub fn new(config: GradientConfig) -> Result<Self> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &GradientConfig {
        &self.config
    }

    /// Estimate the gradient of `objective` at the policy's parameters.
    ///
    /// The policy's parameters are restored before returning, on success and
    /// on error alike.
    pub fn estimate<P, O>(&mut self, policy: &mut P, objective: &O) -> Result<GradientEstimate>
    where
        P: Parameterized + ?Sized,
        O: Objective<P> + ?Sized,
    {
        let origin = policy.parameters();
        let dimension = origin.dimension();
        let baseline = objective.evaluate(policy)?;

        let runs = self.config.runs_for(dimension);
        let perturbations: Vec<Vector> = (0..runs)
            .map(|_| {
                Vector::random(
                    dimension,
                    self.config.perturbation_min,
                    self.config.perturbation_max,
                    &mut self.rng,
                )
            })
            .collect();

        let deltas = sample_deltas(policy, objective, &origin, baseline, &perturbations);
        policy.set_parameters(origin)?;
        let deltas = deltas?;

        let (gradient, singular) = solve_least_squares(&perturbations, &deltas)?;
        Ok(GradientEstimate {
            gradient,
            baseline,
            deltas,
            singular,
        })
    }
}

fn sample_deltas<P, O>(
    policy: &mut P,
    objective: &O,
    origin: &Vector,
    baseline: f64,
    perturbations: &[Vector],
) -> Result<Vec<f64>>
where
    P: Parameterized + ?Sized,
    O: Objective<P> + ?Sized,
{
    let mut deltas = Vec::with_capacity(perturbations.len());
    for perturbation in perturbations {
        policy.set_parameters(origin.add(perturbation)?)?;
        deltas.push(objective.evaluate(policy)? - baseline);
    }
    Ok(deltas)
}

/// Least-squares `g` with `deltas ≈ perturbations · g`.
///
/// Returns the zero vector and `true` when `DᵗD` is singular or badly
/// conditioned, or when the solution is not finite.
///
/// # Errors
///
/// [`Error::DimensionMismatch`] if the perturbations differ in dimension or
/// their count differs from the number of deltas.
pub fn solve_least_squares(perturbations: &[Vector], deltas: &[f64]) -> Result<(Vector, bool)> {
    if perturbations.len() != deltas.len() {
        return Err(Error::DimensionMismatch {
            expected: perturbations.len(),
            got: deltas.len(),
        });
    }
    let dimension = perturbations.first().map_or(0, Vector::dimension);
    if let Some(bad) = perturbations.iter().find(|p| p.dimension() != dimension) {
        return Err(Error::DimensionMismatch {
            expected: dimension,
            got: bad.dimension(),
        });
    }
    let zero = Vector::zeros(dimension);
    if dimension == 0 {
        return Ok((zero, true));
    }
    if deltas.iter().all(|&d| d == 0.0) {
        return Ok((zero, false));
    }

    let d = DMatrix::from_fn(perturbations.len(), dimension, |r, c| perturbations[r][c]);
    let delta = DVector::from_column_slice(deltas);
    let dt = d.transpose();
    let gram = &dt * &d;

    let singular_values = gram.singular_values();
    let largest = singular_values.max();
    let smallest = singular_values.min();
    if !(largest > 0.0) || smallest / largest < CONDITION_TOLERANCE {
        return Ok((zero, true));
    }

    let Some(inverse) = gram.try_inverse() else {
        return Ok((zero, true));
    };
    let solution = inverse * (dt * delta);
    if solution.iter().any(|v| !v.is_finite()) {
        return Ok((zero, true));
    }
    Ok((Vector::from(solution.as_slice()), false))
}
