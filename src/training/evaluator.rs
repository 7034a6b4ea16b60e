//! Concurrent Monte-Carlo evaluation of a policy
//!
//! Each call fans out one playout per trial on a bounded rayon pool and
//! blocks until all of them have finished. Trial seeds come from a single
//! seeded stream, so the same `(policy, opponent, trials, seed)` always
//! produces the same scores.

use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::{
    Error, Result,
    maze::OpponentKind,
    ports::{AdversaryMoves, Objective, Policy, Simulation},
};

/// Playout settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Playouts per evaluation.
    pub trials: usize,
    /// Seed of the stream the per-trial seeds are drawn from.
    pub seed: u64,
    /// A playout that has not ended after this many ticks is scored as is.
    pub step_ceiling: usize,
    /// Worker threads; defaults to the number of CPUs.
    pub workers: Option<usize>,
    /// Wall-clock budget for a single playout.
    pub playout_timeout_secs: u64,
    /// Per-move thinking budget handed to the policies as a deadline.
    pub move_budget_ms: Option<u64>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            trials: 50,
            seed: 0,
            step_ceiling: 3000,
            workers: None,
            playout_timeout_secs: 60,
            move_budget_ms: None,
        }
    }
}

impl EvaluationConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(Error::InvalidConfiguration {
                message: message.to_string(),
            })
        };
        if self.trials == 0 {
            return invalid("evaluation.trials must be positive");
        }
        if self.step_ceiling == 0 {
            return invalid("evaluation.step_ceiling must be positive");
        }
        if self.workers == Some(0) {
            return invalid("evaluation.workers must be positive when set");
        }
        if self.playout_timeout_secs == 0 {
            return invalid("evaluation.playout_timeout_secs must be positive");
        }
        Ok(())
    }
}

/// Sum of terminal scores shared by the playouts of one evaluation.
#[derive(Debug, Default)]
pub struct AccumulatedScore {
    total: Mutex<i64>,
}

impl AccumulatedScore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, score: i64) {
        *self.total.lock().unwrap() += score;
    }

    pub fn total(&self) -> i64 {
        *self.total.lock().unwrap()
    }
}

/// Outcome of one evaluation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub trials: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: i64,
    pub max: i64,
    /// Terminal score of every playout, in trial order.
    pub scores: Vec<i64>,
}

struct PlayoutJob<G> {
    trial: usize,
    game_seed: u64,
    agent: Box<dyn Policy<G>>,
    opponent: Box<dyn Policy<G, AdversaryMoves>>,
}

/// Runs playouts of games produced by `new_game` on a bounded worker pool.
pub struct PolicyEvaluator<F> {
    config: EvaluationConfig,
    pool: ThreadPool,
    new_game: F,
}

impl<F> std::fmt::Debug for PolicyEvaluator<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEvaluator")
            .field("config", &self.config)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl<F> PolicyEvaluator<F> {
    /// # Errors
    ///
    /// Fails on an invalid configuration or if the pool cannot be started.
    pub fn new(config: EvaluationConfig, new_game: F) -> Result<Self> {
        config.validate()?;
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("playout-{i}"));
        if let Some(workers) = config.workers {
            builder = builder.num_threads(workers);
        }
        let pool = builder.build().map_err(|e| Error::WorkerPool {
            message: e.to_string(),
        })?;
        Ok(Self {
            config,
            pool,
            new_game,
        })
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Mean terminal score over `trials` playouts.
    pub fn evaluate<G, P, O>(
        &self,
        policy: &P,
        opponent: &O,
        trials: usize,
        seed: u64,
    ) -> Result<f64>
    where
        F: Fn(u64) -> G + Sync,
        G: Simulation,
        P: Policy<G> + ?Sized,
        O: Policy<G, AdversaryMoves> + ?Sized,
    {
        Ok(self.evaluate_detailed(policy, opponent, trials, seed)?.mean)
    }

    /// Like [`Self::evaluate`], with the spread and every individual score.
    ///
    /// # Errors
    ///
    /// [`Error::PlayoutFailures`] if any playout failed or ran out of time;
    /// the successful playouts are discarded in that case.
    pub fn evaluate_detailed<G, P, O>(
        &self,
        policy: &P,
        opponent: &O,
        trials: usize,
        seed: u64,
    ) -> Result<EvaluationReport>
    where
        F: Fn(u64) -> G + Sync,
        G: Simulation,
        P: Policy<G> + ?Sized,
        O: Policy<G, AdversaryMoves> + ?Sized,
    {
        if trials == 0 {
            return Err(Error::InvalidConfiguration {
                message: "trials must be positive".to_string(),
            });
        }

        let mut seeds = StdRng::seed_from_u64(seed);
        let jobs: Vec<PlayoutJob<G>> = (0..trials)
            .map(|trial| PlayoutJob {
                trial,
                game_seed: seeds.random(),
                agent: policy.fork(seeds.random()),
                opponent: opponent.fork(seeds.random()),
            })
            .collect();

        let accumulated = AccumulatedScore::new();
        let results: Vec<Result<i64>> = self.pool.install(|| {
            jobs.into_par_iter()
                .map(|job| {
                    let score = self.playout(job)?;
                    accumulated.add(score);
                    Ok(score)
                })
                .collect()
        });

        let total = results.len();
        let mut scores = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(score) => scores.push(score),
                Err(e) => failures.push(e),
            }
        }
        if let Some(first) = failures.first() {
            return Err(Error::PlayoutFailures {
                failed: failures.len(),
                total,
                first: first.to_string(),
            });
        }

        let mean = accumulated.total() as f64 / trials as f64;
        let as_f64: Vec<f64> = scores.iter().map(|&s| s as f64).collect();
        let std_dev = if as_f64.len() > 1 {
            as_f64.iter().std_dev()
        } else {
            0.0
        };
        Ok(EvaluationReport {
            trials,
            mean,
            std_dev: if std_dev.is_finite() { std_dev } else { 0.0 },
            min: scores.iter().copied().min().unwrap_or(0),
            max: scores.iter().copied().max().unwrap_or(0),
            scores,
        })
    }

    fn playout<G>(&self, job: PlayoutJob<G>) -> Result<i64>
    where
        F: Fn(u64) -> G,
        G: Simulation,
    {
        let PlayoutJob {
            trial,
            game_seed,
            mut agent,
            mut opponent,
        } = job;
        let started = Instant::now();
        let budget = Duration::from_secs(self.config.playout_timeout_secs);
        let move_budget = self.config.move_budget_ms.map(Duration::from_millis);

        let mut game = (self.new_game)(game_seed);
        let mut steps = 0;
        while !game.is_terminal() && steps < self.config.step_ceiling {
            if started.elapsed() > budget {
                return Err(Error::PlayoutTimeout { trial, steps });
            }
            let deadline = move_budget.map(|b| Instant::now() + b);
            let agent_move = agent.select_move(&game, deadline)?;
            let adversary_moves = opponent.select_move(&game, deadline)?;
            game.advance(agent_move, &adversary_moves)?;
            steps += 1;
        }
        Ok(game.score())
    }
}

/// Mean Monte-Carlo score against a fixed opponent, as an [`Objective`].
///
/// Every call uses the same seed, so differences between calls come from the
/// policy alone.
pub struct MonteCarloObjective<F> {
    evaluator: PolicyEvaluator<F>,
    opponent: OpponentKind,
}

impl<F> MonteCarloObjective<F> {
    pub fn new(evaluator: PolicyEvaluator<F>, opponent: OpponentKind) -> Self {
        Self {
            evaluator,
            opponent,
        }
    }

    pub fn evaluator(&self) -> &PolicyEvaluator<F> {
        &self.evaluator
    }

    pub fn opponent(&self) -> OpponentKind {
        self.opponent
    }

    pub fn report<G, P>(&self, policy: &P) -> Result<EvaluationReport>
    where
        F: Fn(u64) -> G + Sync,
        G: Simulation + 'static,
        P: Policy<G> + ?Sized,
    {
        let config = self.evaluator.config();
        let opponent = self.opponent.build::<G>(config.seed);
        self.evaluator
            .evaluate_detailed(policy, opponent.as_ref(), config.trials, config.seed)
    }
}

impl<F, G, P> Objective<P> for MonteCarloObjective<F>
where
    F: Fn(u64) -> G + Sync,
    G: Simulation + 'static,
    P: Policy<G> + ?Sized,
{
    fn evaluate(&self, policy: &P) -> Result<f64> {
        Ok(self.report(policy)?.mean)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        features::FeatureExtractor,
        maze::{ChasingAdversaries, Direction, Game, Maze, RandomAdversaries},
        policy::LinearPolicy,
        ports::MazeQuery,
    };

    fn evaluator(trials: usize) -> PolicyEvaluator<impl Fn(u64) -> Game + Sync> {
        let maze = Arc::new(Maze::builtin("lattice").unwrap());
        let config = EvaluationConfig {
            trials,
            step_ceiling: 200,
            workers: Some(2),
            ..EvaluationConfig::default()
        };
        PolicyEvaluator::new(config, move |seed| Game::new(maze.clone(), seed)).unwrap()
    }

    #[test]
    fn same_seed_same_mean() {
        let evaluator = evaluator(6);
        let policy = LinearPolicy::initial(FeatureExtractor::default());
        let opponent = RandomAdversaries::new(0);
        let a = evaluator.evaluate(&policy, &opponent, 6, 17).unwrap();
        let b = evaluator.evaluate(&policy, &opponent, 6, 17).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn mean_is_sum_over_trials() {
        let evaluator = evaluator(5);
        let policy = LinearPolicy::initial(FeatureExtractor::default());
        let opponent = RandomAdversaries::new(0);
        let report = evaluator
            .evaluate_detailed(&policy, &opponent, 5, 3)
            .unwrap();
        assert_eq!(report.scores.len(), 5);
        let sum: i64 = report.scores.iter().sum();
        assert_eq!(report.mean, sum as f64 / 5.0);
        assert!(report.min <= report.max);
    }

    /// Replays the playouts of one evaluation one after another on this thread.
    fn serial_scores(
        policy: &LinearPolicy,
        opponent: &ChasingAdversaries,
        trials: usize,
        seed: u64,
    ) -> Vec<i64> {
        let maze = Arc::new(Maze::builtin("lattice").unwrap());
        let mut seeds = StdRng::seed_from_u64(seed);
        (0..trials)
            .map(|_| {
                let mut game = Game::new(maze.clone(), seeds.random());
                let mut agent = Policy::<Game>::fork(policy, seeds.random());
                let mut adversaries =
                    Policy::<Game, AdversaryMoves>::fork(opponent, seeds.random());
                let mut steps = 0;
                while !game.is_terminal() && steps < 200 {
                    let agent_move = agent.select_move(&game, None).unwrap();
                    let moves = adversaries.select_move(&game, None).unwrap();
                    game.advance(agent_move, &moves).unwrap();
                    steps += 1;
                }
                game.score()
            })
            .collect()
    }

    #[test]
    fn pooled_mean_matches_serial_recomputation() {
        let evaluator = evaluator(6);
        let policy = LinearPolicy::initial(FeatureExtractor::default());
        let opponent = ChasingAdversaries::new(0);
        let report = evaluator
            .evaluate_detailed(&policy, &opponent, 6, 41)
            .unwrap();

        let serial = serial_scores(&policy, &opponent, 6, 41);
        let expected = serial.iter().sum::<i64>() as f64 / 6.0;
        assert_eq!(report.scores, serial);
        assert_eq!(report.mean, expected);
    }

    struct Broken;

    impl Policy<Game> for Broken {
        fn select_move(&mut self, state: &Game, _deadline: Option<Instant>) -> Result<Direction> {
            Err(Error::NoLegalMoves {
                node: state.agent_node(),
            })
        }

        fn name(&self) -> &str {
            "broken"
        }

        fn fork(&self, _seed: u64) -> Box<dyn Policy<Game>> {
            Box::new(Broken)
        }
    }

    #[test]
    fn playout_errors_are_aggregated() {
        let evaluator = evaluator(4);
        let opponent = RandomAdversaries::new(0);
        let err = evaluator.evaluate(&Broken, &opponent, 4, 0).unwrap_err();
        assert!(matches!(
            err,
            Error::PlayoutFailures {
                failed: 4,
                total: 4,
                ..
            }
        ));
    }

    #[test]
    fn accumulator_sums_concurrent_adds() {
        let accumulated = AccumulatedScore::new();
        (0..100i64).into_par_iter().for_each(|i| accumulated.add(i));
        assert_eq!(accumulated.total(), 4950);
    }

    #[test]
    fn zero_trials_is_rejected() {
        assert!(
            PolicyEvaluator::new(
                EvaluationConfig {
                    trials: 0,
                    ..EvaluationConfig::default()
                },
                |seed| Game::new(Arc::new(Maze::builtin("ring").unwrap()), seed),
            )
            .is_err()
        );
    }
}
