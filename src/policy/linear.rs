//! Linear value-function policy

use std::time::Instant;

use rand::Rng;

use crate::{
    Error, Result,
    features::{FEATURE_DIM, FeatureExtractor, schema},
    maze::{Direction, Game},
    ports::{MazeQuery, Parameterized, ParameterizedPolicy, Policy},
    vector::Vector,
};

/// Scores every legal move with `parameters · features(move)` and takes the
/// highest. The move made last tick is considered first and wins ties.
#[derive(Debug, Clone)]
pub struct LinearPolicy {
    name: String,
    parameters: Vector,
    extractor: FeatureExtractor,
}

impl LinearPolicy {
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] unless `parameters` has [`FEATURE_DIM`] entries.
    pub fn new(parameters: Vector, extractor: FeatureExtractor) -> Result<Self> {
        check_dimension(&parameters)?;
        Ok(Self {
            name: "linear".to_string(),
            parameters,
            extractor,
        })
    }

    /// Hand-tuned starting point: stay safe, keep distance from threats,
    /// head for pills.
    pub fn initial(extractor: FeatureExtractor) -> Self {
        let mut weights = vec![0.0; FEATURE_DIM];
        weights[schema::SAFE_PATH_LENGTH] = 1.0;
        weights[schema::SAFE_PATH_COUNT] = 0.5;
        weights[schema::PILL_DENSITY] = 0.2;
        weights[schema::PILL_DISTANCE] = -0.5;
        weights[schema::POWER_PILL_DISTANCE] = -0.05;
        weights[schema::THREAT_DISTANCE] = 0.3;
        weights[schema::VULNERABLE_DISTANCE] = -0.2;
        weights[schema::COMPLETABLE] = 0.5;
        weights[schema::REVERSAL] = -0.01;
        weights[schema::BASE_DIM + 2] = 0.3;
        Self {
            name: "linear".to_string(),
            parameters: Vector::from(weights),
            extractor,
        }
    }

    /// Parameters drawn uniformly from `[-1, 1)`.
    pub fn random<R: Rng + ?Sized>(extractor: FeatureExtractor, rng: &mut R) -> Self {
        Self {
            name: "linear".to_string(),
            parameters: Vector::random(FEATURE_DIM, -1.0, 1.0, rng),
            extractor,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Estimated value of taking `direction` in `state`.
    pub fn value<G: MazeQuery + ?Sized>(&self, state: &G, direction: Direction) -> Result<f64> {
        let features = self
            .extractor
            .features(state, state.agent_node(), direction)?;
        self.parameters.dot(&features)
    }

    /// Highest-valued move, or the best found so far once `deadline` passes.
    pub fn best_move<G: MazeQuery + ?Sized>(
        &self,
        state: &G,
        deadline: Option<Instant>,
    ) -> Result<Direction> {
        let node = state.agent_node();
        let last = state.agent_last_direction();
        let mut candidates = state.possible_directions(node);
        if candidates.is_empty() {
            return Err(Error::NoLegalMoves { node });
        }
        if let Some(index) = candidates.iter().position(|&d| d == last) {
            candidates.swap(0, index);
        }

        let mut best: Option<(Direction, f64)> = None;
        for direction in candidates {
            if best.is_some() && deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            let value = self.value(state, direction)?;
            if best.is_none_or(|(_, best_value)| value > best_value) {
                best = Some((direction, value));
            }
        }
        best.map(|(direction, _)| direction)
            .ok_or(Error::NoLegalMoves { node })
    }
}

fn check_dimension(parameters: &Vector) -> Result<()> {
    if parameters.dimension() != FEATURE_DIM {
        return Err(Error::DimensionMismatch {
            expected: FEATURE_DIM,
            got: parameters.dimension(),
        });
    }
    Ok(())
}

impl Policy<Game> for LinearPolicy {
    fn select_move(&mut self, state: &Game, deadline: Option<Instant>) -> Result<Direction> {
        self.best_move(state, deadline)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn fork(&self, _seed: u64) -> Box<dyn Policy<Game>> {
        Box::new(self.clone())
    }
}

impl Parameterized for LinearPolicy {
    fn parameters(&self) -> Vector {
        self.parameters.clone()
    }

    fn set_parameters(&mut self, parameters: Vector) -> Result<()> {
        check_dimension(&parameters)?;
        self.parameters = parameters;
        Ok(())
    }

    fn dimension(&self) -> usize {
        self.parameters.dimension()
    }
}

impl ParameterizedPolicy<Game> for LinearPolicy {
    fn copy(&self) -> Box<dyn ParameterizedPolicy<Game>> {
        Box::new(self.clone())
    }
}
