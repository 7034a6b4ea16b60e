//! Sign-based adaptive step sizes
//!
//! Each parameter has its own step size. It grows when the gradient keeps
//! its sign between iterations and shrinks when the sign flips. The update
//! moves every parameter by its step size in the direction of the current
//! gradient's sign; the gradient magnitude is ignored.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, vector::Vector};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepSizeConfig {
    pub initial: f64,
    pub min: f64,
    pub max: f64,
    pub grow: f64,
    pub shrink: f64,
}

impl Default for StepSizeConfig {
    fn default() -> Self {
        Self {
            initial: 1.0,
            min: 1e-7,
            max: 1e-2,
            grow: 1.2,
            shrink: 0.5,
        }
    }
}

impl StepSizeConfig {
    pub fn validate(&self) -> Result<()> {
        let message = if !(self.min > 0.0 && self.min <= self.max && self.max.is_finite()) {
            format!("step sizes need 0 < min <= max, got [{}, {}]", self.min, self.max)
        } else if !(self.initial > 0.0 && self.initial.is_finite()) {
            format!("initial step size must be positive, got {}", self.initial)
        } else if !(self.grow > 1.0 && self.grow.is_finite()) {
            format!("grow factor must exceed 1, got {}", self.grow)
        } else if !(self.shrink > 0.0 && self.shrink < 1.0) {
            format!("shrink factor must be in (0, 1), got {}", self.shrink)
        } else {
            return Ok(());
        };
        Err(Error::InvalidConfiguration { message })
    }

    fn clamp(&self, step: f64) -> f64 {
        step.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone)]
pub struct StepSizeController {
    config: StepSizeConfig,
    steps: Vector,
}

impl StepSizeController {
    pub fn new(config: StepSizeConfig, dimension: usize) -> Result<Self> {
        config.validate()?;
        let steps = Vector::filled(dimension, config.clamp(config.initial));
        Ok(Self { config, steps })
    }

    /// Continue from previously saved step sizes, clamped to the configured range.
    pub fn from_steps(config: StepSizeConfig, steps: Vector) -> Result<Self> {
        config.validate()?;
        let steps = steps.iter().map(|s| config.clamp(s)).collect::<Vec<_>>().into();
        Ok(Self { config, steps })
    }

    pub fn config(&self) -> &StepSizeConfig {
        &self.config
    }

    pub fn steps(&self) -> &Vector {
        &self.steps
    }

    pub fn mean_step(&self) -> f64 {
        self.steps.mean()
    }

    /// Adapt the step sizes to the sign agreement of the two gradients and
    /// return the parameter update.
    pub fn adapt(&mut self, previous: &Vector, current: &Vector) -> Result<Vector> {
        let dimension = self.steps.dimension();
        for gradient in [previous, current] {
            if gradient.dimension() != dimension {
                return Err(Error::DimensionMismatch {
                    expected: dimension,
                    got: gradient.dimension(),
                });
            }
        }

        let mut steps = Vec::with_capacity(dimension);
        let mut update = Vec::with_capacity(dimension);
        for ((step, prev), curr) in self.steps.iter().zip(previous.iter()).zip(current.iter()) {
            let agreement = prev * curr;
            let step = if agreement > 0.0 {
                self.config.clamp(step * self.config.grow)
            } else if agreement < 0.0 {
                self.config.clamp(step * self.config.shrink)
            } else {
                step
            };
            let delta = if curr > 0.0 {
                step
            } else if curr < 0.0 {
                -step
            } else {
                0.0
            };
            steps.push(step);
            update.push(delta);
        }
        self.steps = Vector::from(steps);
        Ok(Vector::from(update))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StepSizeConfig {
        StepSizeConfig {
            initial: 1e-3,
            ..StepSizeConfig::default()
        }
    }

    #[test]
    fn initial_step_is_clamped() {
        let controller = StepSizeController::new(StepSizeConfig::default(), 3).unwrap();
        assert!(controller.steps().iter().all(|s| s == 1e-2));
    }

    #[test]
    fn grow_shrink_and_hold() {
        let mut controller = StepSizeController::new(config(), 3).unwrap();
        let previous = Vector::from(vec![1.0, 1.0, 0.0]);
        let current = Vector::from(vec![2.0, -3.0, 5.0]);
        let update = controller.adapt(&previous, &current).unwrap();

        assert_eq!(controller.steps()[0], 1e-3 * 1.2);
        assert_eq!(controller.steps()[1], 1e-3 * 0.5);
        assert_eq!(controller.steps()[2], 1e-3);
        assert_eq!(update.as_slice(), &[1e-3 * 1.2, -1e-3 * 0.5, 1e-3]);
    }

    #[test]
    fn zero_gradient_gives_zero_update() {
        let mut controller = StepSizeController::new(config(), 2).unwrap();
        let update = controller
            .adapt(&Vector::zeros(2), &Vector::zeros(2))
            .unwrap();
        assert!(update.is_zero());
    }

    #[test]
    fn steps_stay_in_bounds() {
        let cfg = config();
        let mut controller = StepSizeController::new(cfg.clone(), 2).unwrap();
        let up = Vector::from(vec![1.0, 1.0]);
        let down = Vector::from(vec![-1.0, 1.0]);
        for _ in 0..200 {
            controller.adapt(&up, &up).unwrap();
            assert!(controller.steps().iter().all(|s| s >= cfg.min && s <= cfg.max));
        }
        for i in 0..200 {
            let (prev, curr) = if i % 2 == 0 { (&up, &down) } else { (&down, &up) };
            controller.adapt(prev, curr).unwrap();
            assert!(controller.steps().iter().all(|s| s >= cfg.min && s <= cfg.max));
        }
        assert_eq!(controller.steps()[0], cfg.min);
        assert_eq!(controller.steps()[1], cfg.max);
    }

    #[test]
    fn mismatched_gradient_is_rejected() {
        let mut controller = StepSizeController::new(config(), 2).unwrap();
        assert!(matches!(
            controller.adapt(&Vector::zeros(3), &Vector::zeros(2)),
            Err(Error::DimensionMismatch { expected: 2, got: 3 })
        ));
    }
}
