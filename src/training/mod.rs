//! Policy-gradient training
//!
//! [`PolicyEvaluator`] scores a policy by Monte-Carlo playouts,
//! [`GradientEstimator`] turns evaluations of perturbed parameters into a
//! gradient, [`StepSizeController`] adapts per-parameter step sizes and
//! [`Trainer`] ties them together and keeps the best parameters persisted.

pub mod checkpoint;
pub mod evaluator;
pub mod gradient;
pub mod observers;
pub mod snapshot;
pub mod step_size;
pub mod trainer;

pub use checkpoint::{CHECKPOINT_VERSION, Checkpoint};
pub use evaluator::{
    AccumulatedScore, EvaluationConfig, EvaluationReport, MonteCarloObjective, PolicyEvaluator,
};
pub use gradient::{GradientConfig, GradientEstimate, GradientEstimator, solve_least_squares};
pub use observers::{
    IterationRecord, JsonlObserver, MetricsObserver, MetricsSummary, ProgressObserver,
};
pub use snapshot::{SNAPSHOT_VERSION, TrainingSnapshot};
pub use step_size::{StepSizeConfig, StepSizeController};
pub use trainer::{IterationReport, Trainer, TrainingPhase, TrainingStart, TrainingSummary};
