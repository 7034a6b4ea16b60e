//! Observer port - abstraction for training observation and reporting
//!
//! Observers receive the scalar progress of a training run without the
//! training loop knowing where that progress ends up (a progress bar, a
//! JSONL log, an in-memory history for tests).

use crate::{
    Result,
    training::{IterationReport, TrainingStart, TrainingSummary},
};

/// Observer trait for monitoring training
///
/// # Event Sequence
///
/// 1. `on_training_start` - once, after the initial evaluation
/// 2. `on_iteration` - after every completed iteration
/// 3. `on_training_end` - once, when a bounded run finishes
///
/// # Examples
///
/// ```no_run
/// use pursuit::{ports::TrainingObserver, training::IterationReport};
///
/// struct CountingObserver {
///     iterations: usize,
/// }
///
/// impl TrainingObserver for CountingObserver {
///     fn on_iteration(&mut self, _report: &IterationReport) -> pursuit::Result<()> {
///         self.iterations += 1;
///         Ok(())
///     }
/// }
/// ```
pub trait TrainingObserver: Send {
    /// Called once the initial parameters have been evaluated.
    fn on_training_start(&mut self, _start: &TrainingStart) -> Result<()> {
        Ok(())
    }

    /// Called after each iteration with its evaluation results.
    fn on_iteration(&mut self, _report: &IterationReport) -> Result<()> {
        Ok(())
    }

    /// Called when a bounded run stops.
    fn on_training_end(&mut self, _summary: &TrainingSummary) -> Result<()> {
        Ok(())
    }
}
