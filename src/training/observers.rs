//! Training observers
//!
//! Observers collect progress without the training loop knowing about
//! output formats.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::{Arc, Mutex},
};

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use super::trainer::{IterationReport, TrainingStart, TrainingSummary};
use crate::{Error, Result, ports::TrainingObserver};

/// Progress spinner - shows iteration, latest and best evaluation
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
    limit: Option<usize>,
}

impl ProgressObserver {
    /// `limit` turns the spinner into a bar when the run length is known.
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            progress_bar: None,
            limit,
        }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TrainingObserver for ProgressObserver {
    fn on_training_start(&mut self, start: &TrainingStart) -> Result<()> {
        let (pb, template) = match self.limit {
            Some(limit) => (
                ProgressBar::new(limit as u64),
                "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} iterations {msg}",
            ),
            None => (
                ProgressBar::new_spinner(),
                "[{elapsed_precise}] {spinner} iteration {pos} {msg}",
            ),
        };
        let style = match self.limit {
            Some(_) => ProgressStyle::default_bar(),
            None => ProgressStyle::default_spinner(),
        };
        pb.set_style(
            style
                .template(template)
                .map_err(|e| Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );
        pb.set_message(format!("best {:.1}", start.initial_evaluation));
        self.progress_bar = Some(pb);
        Ok(())
    }

    fn on_iteration(&mut self, report: &IterationReport) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.inc(1);
            let marker = if report.checkpointed { " *" } else { "" };
            pb.set_message(format!(
                "eval {:.1} best {:.1}{marker}",
                report.evaluation, report.best_evaluation
            ));
        }
        Ok(())
    }

    fn on_training_end(&mut self, summary: &TrainingSummary) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message(format!("best {:.1}", summary.best_evaluation));
        }
        Ok(())
    }
}

/// Summary of recorded iterations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub iterations: usize,
    pub initial_evaluation: Option<f64>,
    pub best_evaluation: Option<f64>,
    pub last_evaluation: Option<f64>,
    pub checkpoints: usize,
    pub singular_estimates: usize,
}

#[derive(Debug, Default)]
struct MetricsState {
    start: Option<TrainingStart>,
    reports: Vec<IterationReport>,
}

/// Metrics observer - keeps every report in memory
///
/// Clones share the same history, so a clone kept outside the trainer can
/// read what the boxed observer recorded.
#[derive(Debug, Clone, Default)]
pub struct MetricsObserver {
    state: Arc<Mutex<MetricsState>>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<IterationReport> {
        self.state.lock().unwrap().reports.clone()
    }

    /// Evaluation after every iteration, in order.
    pub fn evaluations(&self) -> Vec<f64> {
        self.state
            .lock()
            .unwrap()
            .reports
            .iter()
            .map(|r| r.evaluation)
            .collect()
    }

    pub fn summary(&self) -> MetricsSummary {
        let state = self.state.lock().unwrap();
        MetricsSummary {
            iterations: state.reports.len(),
            initial_evaluation: state.start.as_ref().map(|s| s.initial_evaluation),
            best_evaluation: state
                .reports
                .last()
                .map(|r| r.best_evaluation)
                .or(state.start.as_ref().map(|s| s.initial_evaluation)),
            last_evaluation: state.reports.last().map(|r| r.evaluation),
            checkpoints: state.reports.iter().filter(|r| r.checkpointed).count(),
            singular_estimates: state.reports.iter().filter(|r| r.singular).count(),
        }
    }
}

impl TrainingObserver for MetricsObserver {
    fn on_training_start(&mut self, start: &TrainingStart) -> Result<()> {
        self.state.lock().unwrap().start = Some(start.clone());
        Ok(())
    }

    fn on_iteration(&mut self, report: &IterationReport) -> Result<()> {
        self.state.lock().unwrap().reports.push(report.clone());
        Ok(())
    }
}

/// One line of the JSONL log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub evaluation: f64,
    pub best_evaluation: f64,
    pub checkpointed: bool,
    pub gradient_norm: f64,
    pub mean_step_size: f64,
    pub singular: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<f64>>,
}

/// JSONL observer - one JSON object per iteration
///
/// The start of the run is written as iteration 0.
pub struct JsonlObserver {
    writer: BufWriter<File>,
    include_parameters: bool,
}

impl JsonlObserver {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::Io {
            operation: format!("create file {path:?}"),
            source,
        })?;
        Ok(Self {
            writer: BufWriter::new(file),
            include_parameters: false,
        })
    }

    /// Also log the full parameter vector of every iteration.
    pub fn with_parameters(mut self, include: bool) -> Self {
        self.include_parameters = include;
        self
    }

    fn write(&mut self, record: &IterationRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        writeln!(&mut self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl TrainingObserver for JsonlObserver {
    fn on_training_start(&mut self, start: &TrainingStart) -> Result<()> {
        self.write(&IterationRecord {
            iteration: start.iteration,
            evaluation: start.initial_evaluation,
            best_evaluation: start.initial_evaluation,
            checkpointed: start.iteration == 0,
            gradient_norm: 0.0,
            mean_step_size: 0.0,
            singular: false,
            parameters: None,
        })
    }

    fn on_iteration(&mut self, report: &IterationReport) -> Result<()> {
        let parameters = self
            .include_parameters
            .then(|| report.parameters.as_slice().to_vec());
        self.write(&IterationRecord {
            iteration: report.iteration,
            evaluation: report.evaluation,
            best_evaluation: report.best_evaluation,
            checkpointed: report.checkpointed,
            gradient_norm: report.gradient_norm,
            mean_step_size: report.mean_step_size,
            singular: report.singular,
            parameters,
        })
    }
}
