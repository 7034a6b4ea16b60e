//! Policy port - abstraction over move-selecting controllers
//!
//! Every controller, trainable or not, implements [`Policy`]. Controllers
//! whose behaviour is determined by a parameter vector additionally
//! implement [`Parameterized`], which is all the gradient estimator and the
//! training loop ever touch. Opponents stay plain policies.

use std::time::Instant;

use crate::{Result, maze::Direction, vector::Vector};

/// One move per adversary, in adversary order.
pub type AdversaryMoves = Vec<Direction>;

/// Move-selection capability.
///
/// `M` is the kind of move produced: a single [`Direction`] for the agent,
/// [`AdversaryMoves`] for the opposing side.
///
/// # Examples
///
/// ```no_run
/// use std::time::Instant;
///
/// use pursuit::{maze::{Direction, Game}, ports::Policy};
///
/// struct AlwaysLeft;
///
/// impl Policy<Game> for AlwaysLeft {
///     fn select_move(&mut self, _state: &Game, _deadline: Option<Instant>) -> pursuit::Result<Direction> {
///         Ok(Direction::Left)
///     }
///
///     fn name(&self) -> &str {
///         "always-left"
///     }
///
///     fn fork(&self, _seed: u64) -> Box<dyn Policy<Game>> {
///         Box::new(AlwaysLeft)
///     }
/// }
/// ```
pub trait Policy<G: ?Sized, M = Direction>: Send {
    /// Choose a move for the given state.
    ///
    /// A policy that is still deliberating when `deadline` passes should
    /// return the best move found so far.
    fn select_move(&mut self, state: &G, deadline: Option<Instant>) -> Result<M>;

    /// Name used in reports.
    fn name(&self) -> &str;

    /// Independent copy for one playout worker.
    ///
    /// Randomised policies reseed the copy from `seed` so that playouts are
    /// reproducible regardless of scheduling; deterministic policies ignore it.
    fn fork(&self, seed: u64) -> Box<dyn Policy<G, M>>;
}

/// Access to a policy's trainable parameter vector.
pub trait Parameterized {
    /// Copy of the current parameters.
    fn parameters(&self) -> Vector;

    /// Replace the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DimensionMismatch`] if the dimension differs
    /// from the current one.
    fn set_parameters(&mut self, parameters: Vector) -> Result<()>;

    fn dimension(&self) -> usize {
        self.parameters().dimension()
    }
}

/// A trainable policy.
pub trait ParameterizedPolicy<G: ?Sized>: Policy<G> + Parameterized {
    fn copy(&self) -> Box<dyn ParameterizedPolicy<G>>;
}

/// Scalar evaluation of a policy; higher is better.
pub trait Objective<P: ?Sized> {
    fn evaluate(&self, policy: &P) -> Result<f64>;
}

impl<P: ?Sized, F> Objective<P> for F
where
    F: Fn(&P) -> Result<f64>,
{
    fn evaluate(&self, policy: &P) -> Result<f64> {
        self(policy)
    }
}
