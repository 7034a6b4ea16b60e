//! Train command - improve a linear policy by finite-difference policy gradient

use std::{path::PathBuf, sync::atomic::AtomicBool};

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use super::{RunArgs, game_factory, load_policy};
use crate::{
    adapters::CsvCheckpointRepository,
    cli::output::{format_values, print_kv, print_section, print_stats_table},
    features::FeatureExtractor,
    ports::Parameterized,
    training::{
        JsonlObserver, MonteCarloObjective, PolicyEvaluator, ProgressObserver, Trainer,
        TrainingSnapshot,
    },
};

#[derive(Parser, Debug)]
#[command(about = "Train a policy", allow_negative_numbers = true)]
pub struct TrainArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Iterations to run; trains until the process is stopped when omitted
    #[arg(long, short = 'n')]
    pub iterations: Option<usize>,

    /// Where the best parameters are kept
    #[arg(long, default_value = "policy.csv")]
    pub checkpoint: PathBuf,

    /// Start from the parameters in this checkpoint
    #[arg(long)]
    pub init_from: Option<PathBuf>,

    /// Continue a run from a snapshot written with --snapshot
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// Keep a resumable snapshot here, rewritten after every iteration
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Optional file for per-iteration JSONL records
    #[arg(long)]
    pub jsonl: Option<PathBuf>,

    /// Include the parameter vector in every JSONL record
    #[arg(long, default_value_t = false)]
    pub log_parameters: bool,

    /// Hide the progress bar
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

pub fn execute(args: TrainArgs) -> Result<()> {
    if args.init_from.is_some() && args.resume.is_some() {
        return Err(anyhow!(
            "Cannot use both --init-from and --resume. Choose one starting point."
        ));
    }

    let config = args.run.resolve()?;
    let extractor = FeatureExtractor::new(config.safety);
    let policy = load_policy(args.init_from.as_ref(), extractor)?;

    let evaluator = PolicyEvaluator::new(config.evaluation.clone(), game_factory(&config)?)
        .context("starting playout workers")?;
    let objective = MonteCarloObjective::new(evaluator, config.opponent);

    let mut trainer = Trainer::new(
        policy,
        objective,
        config.gradient.clone(),
        config.step_size.clone(),
        Box::new(CsvCheckpointRepository::new()),
        args.checkpoint.clone(),
    )?;

    if let Some(path) = &args.snapshot {
        trainer = trainer.with_snapshot_path(path);
    }
    if let Some(path) = &args.resume {
        let snapshot = TrainingSnapshot::load(path)
            .with_context(|| format!("loading snapshot {}", path.display()))?;
        trainer
            .resume(snapshot)
            .with_context(|| format!("resuming from {}", path.display()))?;
    }
    if !args.quiet {
        trainer.add_observer(Box::new(ProgressObserver::new(args.iterations)));
    }
    if let Some(path) = &args.jsonl {
        let observer = JsonlObserver::new(path)
            .with_context(|| format!("opening {}", path.display()))?
            .with_parameters(args.log_parameters);
        trainer.add_observer(Box::new(observer));
    }

    print_section("Training");
    print_kv("Layout", &config.layout);
    print_kv("Opponent", config.opponent.as_str());
    print_kv("Trials", &config.evaluation.trials.to_string());
    print_kv(
        "Perturbations",
        &config
            .gradient
            .runs_for(trainer.policy().dimension())
            .to_string(),
    );
    print_kv("Checkpoint", &args.checkpoint.display().to_string());
    match args.iterations {
        Some(n) => print_kv("Iterations", &n.to_string()),
        None => print_kv("Iterations", "unbounded"),
    }
    if let Some(path) = &args.snapshot {
        print_kv("Snapshot", &path.display().to_string());
    }

    let stop = AtomicBool::new(false);
    let summary = trainer.run(args.iterations, &stop)?;

    if let Some(path) = &args.snapshot {
        let snapshot = trainer
            .snapshot()
            .ok_or_else(|| anyhow!("training never started; nothing to snapshot"))?;
        snapshot
            .save(path)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
    }

    print_section("Training Summary");
    print_stats_table(&[
        ("Iterations", summary.iterations.to_string()),
        ("Initial evaluation", format!("{:.2}", summary.initial_evaluation)),
        ("Final evaluation", format!("{:.2}", summary.final_evaluation)),
        ("Best evaluation", format!("{:.2}", summary.best_evaluation)),
        ("Checkpoints written", summary.checkpoints_written.to_string()),
    ]);
    if let Some(best) = trainer.best_parameters() {
        print_kv("Best parameters", &format_values(best.as_slice()));
    }
    Ok(())
}
