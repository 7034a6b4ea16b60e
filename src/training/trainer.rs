//! The training loop
//!
//! ```text
//! Init -> Evaluate -> EstimateGradient -> AdaptSteps -> ApplyUpdate
//!      -> EvaluateUpdated -> [Checkpoint] -> Evaluate -> ...
//! ```
//!
//! `Init` evaluates the starting parameters and persists them. Afterwards
//! every iteration persists the parameters only when their evaluation beats
//! the best one seen so far, so the stored checkpoint always holds the
//! parameters behind [`Trainer::best_evaluation`].

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use serde::{Deserialize, Serialize};

use super::{
    checkpoint::Checkpoint,
    gradient::{GradientConfig, GradientEstimator},
    snapshot::{SNAPSHOT_VERSION, TrainingSnapshot},
    step_size::{StepSizeConfig, StepSizeController},
};
use crate::{
    Error, Result,
    ports::{CheckpointRepository, Objective, Parameterized, TrainingObserver},
    vector::Vector,
};

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingPhase {
    Init,
    Evaluate,
    EstimateGradient,
    AdaptSteps,
    ApplyUpdate,
    EvaluateUpdated,
    Checkpoint,
}

/// Reported once the starting point is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingStart {
    pub initial_evaluation: f64,
    pub dimension: usize,
    /// Iteration the run starts counting from; non-zero after a resume.
    pub iteration: usize,
    pub checkpoint_path: PathBuf,
}

/// Outcome of one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationReport {
    pub iteration: usize,
    /// Evaluation before the update, measured by the gradient estimator.
    pub baseline_evaluation: f64,
    /// Evaluation after the update.
    pub evaluation: f64,
    pub best_evaluation: f64,
    pub checkpointed: bool,
    pub gradient_norm: f64,
    pub mean_step_size: f64,
    pub singular: bool,
    pub parameters: Vector,
}

/// Outcome of a bounded run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub iterations: usize,
    pub initial_evaluation: f64,
    pub best_evaluation: f64,
    pub final_evaluation: f64,
    pub checkpoints_written: usize,
}

/// Finite-difference policy-gradient trainer.
pub struct Trainer<P, O> {
    policy: P,
    objective: O,
    estimator: GradientEstimator,
    steps: StepSizeController,
    previous_gradient: Vector,
    best: Option<(f64, Vector)>,
    last_evaluation: Option<f64>,
    iteration: usize,
    phase: TrainingPhase,
    checkpoints_written: usize,
    started: bool,
    repository: Box<dyn CheckpointRepository>,
    checkpoint_path: PathBuf,
    snapshot_path: Option<PathBuf>,
    observers: Vec<Box<dyn TrainingObserver>>,
}

impl<P, O> Trainer<P, O>
where
    P: Parameterized,
    O: Objective<P>,
{
    pub fn new(
        policy: P,
        objective: O,
        gradient: GradientConfig,
        step_size: StepSizeConfig,
        repository: Box<dyn CheckpointRepository>,
        checkpoint_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let dimension = policy.dimension();
        Ok(Self {
            estimator: GradientEstimator::new(gradient)?,
            steps: StepSizeController::new(step_size, dimension)?,
            previous_gradient: Vector::zeros(dimension),
            policy,
            objective,
            best: None,
            last_evaluation: None,
            iteration: 0,
            phase: TrainingPhase::Init,
            checkpoints_written: 0,
            started: false,
            repository,
            checkpoint_path: checkpoint_path.into(),
            snapshot_path: None,
            observers: Vec::new(),
        })
    }

    /// Rewrite a resumable snapshot at `path` after every iteration, so an
    /// interrupted run loses at most the iteration in progress.
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn TrainingObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn TrainingObserver>) {
        self.observers.push(observer);
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn into_policy(self) -> P {
        self.policy
    }

    pub fn objective(&self) -> &O {
        &self.objective
    }

    pub fn phase(&self) -> TrainingPhase {
        self.phase
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn best_evaluation(&self) -> Option<f64> {
        self.best.as_ref().map(|(value, _)| *value)
    }

    pub fn best_parameters(&self) -> Option<&Vector> {
        self.best.as_ref().map(|(_, parameters)| parameters)
    }

    pub fn step_sizes(&self) -> &Vector {
        self.steps.steps()
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    /// Evaluate the starting parameters and persist them as the first best.
    pub fn initialize(&mut self) -> Result<TrainingStart> {
        self.phase = TrainingPhase::Init;
        let evaluation = self.objective.evaluate(&self.policy)?;
        let parameters = self.policy.parameters();
        self.persist(evaluation, &parameters)?;
        self.best = Some((evaluation, parameters));
        self.last_evaluation = Some(evaluation);
        self.phase = TrainingPhase::Evaluate;
        self.announce_start(evaluation)
    }

    fn announce_start(&mut self, initial_evaluation: f64) -> Result<TrainingStart> {
        let start = TrainingStart {
            initial_evaluation,
            dimension: self.policy.dimension(),
            iteration: self.iteration,
            checkpoint_path: self.checkpoint_path.clone(),
        };
        for observer in &mut self.observers {
            observer.on_training_start(&start)?;
        }
        self.started = true;
        Ok(start)
    }

    /// Run one full iteration, initialising first if needed.
    pub fn step(&mut self) -> Result<IterationReport> {
        if self.best.is_none() {
            self.initialize()?;
        }

        self.phase = TrainingPhase::EstimateGradient;
        let estimate = self.estimator.estimate(&mut self.policy, &self.objective)?;

        self.phase = TrainingPhase::AdaptSteps;
        let update = self.steps.adapt(&self.previous_gradient, &estimate.gradient)?;
        self.previous_gradient = estimate.gradient.clone();

        self.phase = TrainingPhase::ApplyUpdate;
        let updated = self.policy.parameters().add(&update)?;
        self.policy.set_parameters(updated)?;

        self.phase = TrainingPhase::EvaluateUpdated;
        let evaluation = self.objective.evaluate(&self.policy)?;
        self.last_evaluation = Some(evaluation);
        self.iteration += 1;

        let previous_best = self.best_evaluation().unwrap_or(f64::NEG_INFINITY);
        let checkpointed = evaluation > previous_best;
        if checkpointed {
            self.phase = TrainingPhase::Checkpoint;
            let parameters = self.policy.parameters();
            self.persist(evaluation, &parameters)?;
            self.best = Some((evaluation, parameters));
        }
        self.phase = TrainingPhase::Evaluate;

        let report = IterationReport {
            iteration: self.iteration,
            baseline_evaluation: estimate.baseline,
            evaluation,
            best_evaluation: self.best_evaluation().unwrap_or(evaluation),
            checkpointed,
            gradient_norm: estimate.gradient.norm(),
            mean_step_size: self.steps.mean_step(),
            singular: estimate.singular,
            parameters: self.policy.parameters(),
        };
        if let Some(path) = &self.snapshot_path
            && let Some(snapshot) = self.snapshot()
        {
            snapshot.save(path)?;
        }
        for observer in &mut self.observers {
            observer.on_iteration(&report)?;
        }
        Ok(report)
    }

    /// Iterate until `stop` is raised or `max_iterations` more iterations
    /// have run. With no limit the loop only ends through `stop`.
    pub fn run(&mut self, max_iterations: Option<usize>, stop: &AtomicBool) -> Result<TrainingSummary> {
        let initial_evaluation = match self.best_evaluation() {
            None => self.initialize()?.initial_evaluation,
            Some(best) => {
                let current = self.last_evaluation.unwrap_or(best);
                if !self.started {
                    self.announce_start(current)?;
                }
                current
            }
        };

        let mut completed = 0;
        while !stop.load(Ordering::SeqCst) && max_iterations.is_none_or(|max| completed < max) {
            self.step()?;
            completed += 1;
        }

        let summary = TrainingSummary {
            iterations: completed,
            initial_evaluation,
            best_evaluation: self.best_evaluation().unwrap_or(initial_evaluation),
            final_evaluation: self.last_evaluation.unwrap_or(initial_evaluation),
            checkpoints_written: self.checkpoints_written,
        };
        for observer in &mut self.observers {
            observer.on_training_end(&summary)?;
        }
        Ok(summary)
    }

    /// Everything needed to continue this run later.
    pub fn snapshot(&self) -> Option<TrainingSnapshot> {
        let (best_evaluation, best_parameters) = self.best.clone()?;
        Some(TrainingSnapshot {
            version: SNAPSHOT_VERSION,
            iteration: self.iteration,
            best_evaluation,
            best_parameters,
            current_parameters: self.policy.parameters(),
            step_sizes: self.steps.steps().clone(),
            previous_gradient: self.previous_gradient.clone(),
        })
    }

    /// Continue from a snapshot instead of initialising.
    ///
    /// The snapshot's best parameters are written to the checkpoint path,
    /// which may differ from the one the snapshot was taken with.
    pub fn resume(&mut self, snapshot: TrainingSnapshot) -> Result<()> {
        let dimension = self.policy.dimension();
        for vector in [
            &snapshot.best_parameters,
            &snapshot.current_parameters,
            &snapshot.step_sizes,
            &snapshot.previous_gradient,
        ] {
            if vector.dimension() != dimension {
                return Err(Error::DimensionMismatch {
                    expected: dimension,
                    got: vector.dimension(),
                });
            }
        }
        self.policy.set_parameters(snapshot.current_parameters)?;
        self.steps = StepSizeController::from_steps(self.steps.config().clone(), snapshot.step_sizes)?;
        self.previous_gradient = snapshot.previous_gradient;
        self.iteration = snapshot.iteration;
        self.persist(snapshot.best_evaluation, &snapshot.best_parameters)?;
        self.best = Some((snapshot.best_evaluation, snapshot.best_parameters));
        self.last_evaluation = None;
        self.started = false;
        self.phase = TrainingPhase::Evaluate;
        Ok(())
    }

    fn persist(&mut self, evaluation: f64, parameters: &Vector) -> Result<()> {
        let checkpoint = Checkpoint::new(self.iteration, evaluation, parameters.clone());
        self.repository.save(&checkpoint, &self.checkpoint_path)?;
        self.checkpoints_written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::adapters::InMemoryRepository;

    struct Point {
        parameters: Vector,
    }

    impl Parameterized for Point {
        fn parameters(&self) -> Vector {
            self.parameters.clone()
        }

        fn set_parameters(&mut self, parameters: Vector) -> Result<()> {
            if parameters.dimension() != self.parameters.dimension() {
                return Err(Error::DimensionMismatch {
                    expected: self.parameters.dimension(),
                    got: parameters.dimension(),
                });
            }
            self.parameters = parameters;
            Ok(())
        }
    }

    const TARGET: [f64; 3] = [0.5, -0.5, 0.2];

    fn hill(point: &Point) -> Result<f64> {
        Ok(-point
            .parameters
            .iter()
            .zip(TARGET)
            .map(|(p, t)| (p - t) * (p - t))
            .sum::<f64>())
    }

    fn trainer(
        repo: &InMemoryRepository,
    ) -> Trainer<Point, fn(&Point) -> Result<f64>> {
        Trainer::new(
            Point {
                parameters: Vector::zeros(3),
            },
            hill as fn(&Point) -> Result<f64>,
            GradientConfig {
                seed: 5,
                ..GradientConfig::default()
            },
            StepSizeConfig::default(),
            Box::new(repo.clone()),
            "best.csv",
        )
        .unwrap()
    }

    #[test]
    fn initial_parameters_are_persisted() {
        let repo = InMemoryRepository::new();
        let mut trainer = trainer(&repo);
        let start = trainer.initialize().unwrap();

        assert_eq!(repo.saves(), 1);
        let stored = repo.load(Path::new("best.csv")).unwrap();
        assert_eq!(stored.parameters, Vector::zeros(3));
        assert_eq!(stored.evaluation, Some(start.initial_evaluation));
        assert_eq!(trainer.phase(), TrainingPhase::Evaluate);
    }

    #[test]
    fn best_never_decreases_and_matches_checkpoint() {
        let repo = InMemoryRepository::new();
        let mut trainer = trainer(&repo);
        let mut best = f64::NEG_INFINITY;
        for _ in 0..20 {
            let report = trainer.step().unwrap();
            assert!(report.best_evaluation >= best);
            assert!(report.best_evaluation >= report.evaluation);
            best = report.best_evaluation;

            let stored = repo.load(Path::new("best.csv")).unwrap();
            assert_eq!(Some(&stored.parameters), trainer.best_parameters());
            assert_eq!(stored.evaluation, trainer.best_evaluation());
        }
        assert_eq!(trainer.iteration(), 20);
    }

    #[test]
    fn climbs_a_smooth_objective() {
        let repo = InMemoryRepository::new();
        let mut trainer = trainer(&repo);
        let stop = AtomicBool::new(false);
        let summary = trainer.run(Some(30), &stop).unwrap();

        assert_eq!(summary.iterations, 30);
        assert!(summary.best_evaluation > summary.initial_evaluation);
        assert_eq!(summary.checkpoints_written, repo.saves());
    }

    #[test]
    fn stop_flag_ends_the_run() {
        let repo = InMemoryRepository::new();
        let mut trainer = trainer(&repo);
        let stop = AtomicBool::new(true);
        let summary = trainer.run(None, &stop).unwrap();

        assert_eq!(summary.iterations, 0);
        assert_eq!(repo.saves(), 1);
    }

    #[test]
    fn resume_restores_progress() {
        let repo = InMemoryRepository::new();
        let mut first = trainer(&repo);
        for _ in 0..4 {
            first.step().unwrap();
        }
        let snapshot = first.snapshot().unwrap();

        let mut second = trainer(&repo);
        second.resume(snapshot.clone()).unwrap();
        assert_eq!(second.iteration(), 4);
        assert_eq!(second.best_evaluation(), Some(snapshot.best_evaluation));
        assert_eq!(second.step_sizes(), &snapshot.step_sizes);
        assert_eq!(second.policy().parameters(), snapshot.current_parameters);

        let report = second.step().unwrap();
        assert_eq!(report.iteration, 5);
        assert!(report.best_evaluation >= snapshot.best_evaluation);
    }

    #[test]
    fn resume_writes_best_to_a_new_checkpoint_path() {
        let repo = InMemoryRepository::new();
        let mut first = trainer(&repo);
        for _ in 0..3 {
            first.step().unwrap();
        }
        let snapshot = first.snapshot().unwrap();

        let fresh = InMemoryRepository::new();
        let mut second = trainer(&fresh);
        second.resume(snapshot.clone()).unwrap();

        let stored = fresh.load(Path::new("best.csv")).unwrap();
        assert_eq!(stored.parameters, snapshot.best_parameters);
        assert_eq!(stored.evaluation, Some(snapshot.best_evaluation));
        assert_eq!(stored.iteration, 3);
    }

    #[test]
    fn snapshot_is_rewritten_every_iteration() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("run.snapshot");
        let repo = InMemoryRepository::new();
        let mut trainer = trainer(&repo).with_snapshot_path(&path);

        for expected in 1..=3 {
            trainer.step().unwrap();
            let saved = TrainingSnapshot::load(&path).unwrap();
            assert_eq!(saved.iteration, expected);
            assert_eq!(Some(saved.best_evaluation), trainer.best_evaluation());
        }
    }

    #[test]
    fn resume_rejects_other_dimensions() {
        let repo = InMemoryRepository::new();
        let mut trainer = trainer(&repo);
        let snapshot = TrainingSnapshot {
            version: SNAPSHOT_VERSION,
            iteration: 1,
            best_evaluation: 0.0,
            best_parameters: Vector::zeros(2),
            current_parameters: Vector::zeros(2),
            step_sizes: Vector::zeros(2),
            previous_gradient: Vector::zeros(2),
        };
        assert!(matches!(
            trainer.resume(snapshot),
            Err(Error::DimensionMismatch { expected: 3, got: 2 })
        ));
    }
}
