//! Evaluate command - score a checkpoint by Monte-Carlo playouts

use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use super::{RunArgs, game_factory, load_policy};
use crate::{
    cli::output::{print_kv, print_section, print_stats_table},
    config::TrainerConfig,
    features::FeatureExtractor,
    training::{EvaluationReport, MonteCarloObjective, PolicyEvaluator},
};

#[derive(Parser, Debug)]
#[command(about = "Evaluate a policy checkpoint")]
pub struct EvaluateArgs {
    /// Checkpoint to evaluate; the built-in starting policy when omitted
    pub checkpoint: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunArgs,

    /// Export results as JSON
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct EvaluationExport<'a> {
    checkpoint: Option<String>,
    layout: &'a str,
    opponent: &'a str,
    seed: u64,
    report: &'a EvaluationReport,
}

pub fn execute(args: EvaluateArgs) -> Result<()> {
    let config = args.run.resolve()?;
    let report = evaluate(&config, args.checkpoint.as_ref())?;

    print_section("Evaluation");
    match &args.checkpoint {
        Some(path) => print_kv("Checkpoint", &path.display().to_string()),
        None => print_kv("Checkpoint", "built-in starting policy"),
    }
    print_kv("Layout", &config.layout);
    print_kv("Opponent", config.opponent.as_str());
    print_stats_table(&[
        ("Trials", report.trials.to_string()),
        ("Mean score", format!("{:.2}", report.mean)),
        ("Std deviation", format!("{:.2}", report.std_dev)),
        ("Min score", report.min.to_string()),
        ("Max score", report.max.to_string()),
    ]);

    if let Some(path) = &args.export {
        let export = EvaluationExport {
            checkpoint: args.checkpoint.as_ref().map(|p| p.display().to_string()),
            layout: &config.layout,
            opponent: config.opponent.as_str(),
            seed: config.evaluation.seed,
            report: &report,
        };
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(file, &export)?;
        println!("\nResults exported to: {}", path.display());
    }
    Ok(())
}

/// Detailed evaluation of a checkpoint under `config`.
pub fn evaluate(config: &TrainerConfig, checkpoint: Option<&PathBuf>) -> Result<EvaluationReport> {
    let policy = load_policy(checkpoint, FeatureExtractor::new(config.safety))?;
    let evaluator = PolicyEvaluator::new(config.evaluation.clone(), game_factory(config)?)
        .context("starting playout workers")?;
    let objective = MonteCarloObjective::new(evaluator, config.opponent);
    objective
        .report(&policy)
        .context("evaluating policy")
}
