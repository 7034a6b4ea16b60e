//! pursuit CLI - train and inspect maze pursuit-avoidance policies
//!
//! This CLI provides a unified interface for:
//! - Training a linear policy by finite-difference policy gradient
//! - Evaluating saved checkpoints against the adversaries
//! - Inspecting the feature vectors the policy scores

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pursuit")]
#[command(version, about = "Policy-gradient trainer for a maze pursuit-avoidance agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a policy, keeping the best parameters in a checkpoint
    Train(Box<pursuit::cli::commands::train::TrainArgs>),

    /// Evaluate a checkpoint against the adversaries
    Evaluate(pursuit::cli::commands::evaluate::EvaluateArgs),

    /// Print the features of each legal move in a position
    Features(pursuit::cli::commands::features::FeaturesArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Train(args) => pursuit::cli::commands::train::execute(*args),
        Commands::Evaluate(args) => pursuit::cli::commands::evaluate::execute(args),
        Commands::Features(args) => pursuit::cli::commands::features::execute(args),
    }
}
