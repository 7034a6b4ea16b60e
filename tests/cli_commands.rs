//! Command-line workflows: train, resume, evaluate

use std::fs;

use clap::Parser;
use pursuit::{
    adapters::CsvCheckpointRepository,
    cli::commands::{
        evaluate::{self, EvaluateArgs},
        features::{self, FeaturesArgs},
        train::{self, TrainArgs},
    },
    ports::CheckpointRepository,
    training::{IterationRecord, TrainingSnapshot},
};
use tempfile::TempDir;

const QUICK: [&str; 10] = [
    "--layout",
    "lattice",
    "--trials",
    "2",
    "--seed",
    "3",
    "--workers",
    "2",
    "--step-ceiling",
    "40",
];

fn records(path: &std::path::Path) -> Vec<IterationRecord> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn train_then_resume_then_evaluate() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let checkpoint = temp_dir.path().join("policy.csv");
    let snapshot = temp_dir.path().join("run.snapshot");
    let first_log = temp_dir.path().join("first.jsonl");
    let second_log = temp_dir.path().join("second.jsonl");

    let paths = [
        "--checkpoint".to_string(),
        checkpoint.display().to_string(),
        "--snapshot".to_string(),
        snapshot.display().to_string(),
        "--jsonl".to_string(),
        first_log.display().to_string(),
    ];
    let mut argv = vec!["train", "--quiet", "--iterations", "1"];
    argv.extend(QUICK);
    argv.extend(paths.iter().map(String::as_str));
    train::execute(TrainArgs::try_parse_from(&argv).unwrap()).unwrap();

    let stored = CsvCheckpointRepository::new().load(&checkpoint).unwrap();
    assert!(stored.evaluation.is_some());
    let saved = TrainingSnapshot::load(&snapshot).unwrap();
    assert_eq!(saved.iteration, 1);
    assert_eq!(saved.best_evaluation, stored.evaluation.unwrap());

    let first = records(&first_log);
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].iteration, 0);
    assert_eq!(first[1].iteration, 1);

    let paths = [
        "--checkpoint".to_string(),
        checkpoint.display().to_string(),
        "--resume".to_string(),
        snapshot.display().to_string(),
        "--jsonl".to_string(),
        second_log.display().to_string(),
    ];
    let mut argv = vec!["train", "--quiet", "--iterations", "1"];
    argv.extend(QUICK);
    argv.extend(paths.iter().map(String::as_str));
    train::execute(TrainArgs::try_parse_from(&argv).unwrap()).unwrap();

    let second = records(&second_log);
    assert_eq!(second.last().unwrap().iteration, 2);
    assert!(second.last().unwrap().best_evaluation >= saved.best_evaluation);

    let export = temp_dir.path().join("evaluation.json");
    let checkpoint_arg = checkpoint.display().to_string();
    let export_arg = export.display().to_string();
    let mut argv = vec!["evaluate"];
    argv.push(checkpoint_arg.as_str());
    argv.extend(QUICK);
    argv.extend(["--export", export_arg.as_str()]);
    evaluate::execute(EvaluateArgs::try_parse_from(&argv).unwrap()).unwrap();

    let exported: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&export).unwrap()).unwrap();
    assert_eq!(exported["report"]["trials"], 2);
    assert_eq!(exported["layout"], "lattice");
}

#[test]
fn init_from_and_resume_are_exclusive() {
    let args = TrainArgs::try_parse_from([
        "train",
        "--init-from",
        "a.csv",
        "--resume",
        "b.snapshot",
    ])
    .unwrap();
    assert!(train::execute(args).is_err());
}

#[test]
fn unknown_opponent_is_a_parse_error() {
    assert!(TrainArgs::try_parse_from(["train", "--opponent", "clairvoyant"]).is_err());
}

#[test]
fn features_command_prints_json() {
    let mut argv = vec!["features", "--json", "--ticks", "3"];
    argv.extend(QUICK);
    features::execute(FeaturesArgs::try_parse_from(&argv).unwrap()).unwrap();
}
