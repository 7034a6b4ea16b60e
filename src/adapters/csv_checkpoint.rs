//! CSV checkpoint repository.
//!
//! Checkpoints are small, human-readable text files:
//!
//! ```text
//! pursuit-checkpoint,1
//! iteration,12
//! evaluation,1843.5
//! parameters,0.013,-0.2,...
//! ```
//!
//! Values are written with Rust's shortest round-trip formatting, so reading
//! a checkpoint back reproduces the exact parameters. A file holding a single
//! bare comma-separated vector is accepted as a parameters-only checkpoint.

use std::{fs::File, path::Path};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::{
    Error, Result,
    ports::CheckpointRepository,
    training::{CHECKPOINT_VERSION, Checkpoint},
    vector::Vector,
};

const MAGIC: &str = "pursuit-checkpoint";

/// Stores checkpoints as versioned CSV records.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
///
/// use pursuit::{
///     adapters::CsvCheckpointRepository, ports::CheckpointRepository, training::Checkpoint,
///     vector::Vector,
/// };
///
/// let repo = CsvCheckpointRepository::new();
/// let checkpoint = Checkpoint::new(0, 120.0, Vector::from(vec![0.1, -0.3]));
/// repo.save(&checkpoint, Path::new("policy.csv"))?;
/// let loaded = repo.load(Path::new("policy.csv"))?;
/// assert_eq!(loaded.parameters, checkpoint.parameters);
/// # Ok::<(), pursuit::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvCheckpointRepository;

impl CsvCheckpointRepository {
    pub fn new() -> Self {
        Self
    }
}

fn format_error(path: &Path, message: impl Into<String>) -> Error {
    Error::CheckpointFormat {
        context: path.display().to_string(),
        message: message.into(),
    }
}

fn parse_values<'a>(path: &Path, fields: impl Iterator<Item = &'a str>) -> Result<Vec<f64>> {
    fields
        .map(|field| {
            let field = field.trim();
            field
                .parse::<f64>()
                .map_err(|_| format_error(path, format!("`{field}` is not a number")))
        })
        .collect()
}

fn single_value<'a>(path: &Path, record: &'a StringRecord, key: &str) -> Result<&'a str> {
    match (record.get(1), record.len()) {
        (Some(value), 2) => Ok(value.trim()),
        _ => Err(format_error(path, format!("`{key}` takes exactly one value"))),
    }
}

impl CheckpointRepository for CsvCheckpointRepository {
    fn save(&self, checkpoint: &Checkpoint, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|source| Error::Io {
            operation: format!("create file {path:?}"),
            source,
        })?;
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(file);

        writer.write_record([MAGIC, checkpoint.version.to_string().as_str()])?;
        writer.write_record(["iteration", checkpoint.iteration.to_string().as_str()])?;
        if let Some(evaluation) = checkpoint.evaluation {
            writer.write_record(["evaluation", evaluation.to_string().as_str()])?;
        }
        let mut parameters = vec!["parameters".to_string()];
        parameters.extend(checkpoint.parameters.iter().map(|v| v.to_string()));
        writer.write_record(&parameters)?;

        writer.flush().map_err(|source| Error::Io {
            operation: format!("write file {path:?}"),
            source,
        })
    }

    fn load(&self, path: &Path) -> Result<Checkpoint> {
        let file = File::open(path).map_err(|source| Error::Io {
            operation: format!("open file {path:?}"),
            source,
        })?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);
        let records = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;

        let Some(first) = records.first() else {
            return Err(format_error(path, "file is empty"));
        };
        let head = first.get(0).unwrap_or_default().trim();

        if head != MAGIC {
            // Bare vector written by older tools.
            if records.len() != 1 {
                return Err(format_error(path, "missing `pursuit-checkpoint` header"));
            }
            let values = parse_values(path, first.iter())?;
            return Ok(Checkpoint::parameters_only(Vector::from(values)));
        }

        let version: u32 = single_value(path, first, MAGIC)?
            .parse()
            .map_err(|_| format_error(path, "version is not a number"))?;
        if version != CHECKPOINT_VERSION {
            return Err(format_error(
                path,
                format!("unsupported checkpoint version {version}"),
            ));
        }

        let mut iteration = 0;
        let mut evaluation = None;
        let mut parameters = None;
        for record in &records[1..] {
            match record.get(0).map(str::trim) {
                Some("iteration") => {
                    iteration = single_value(path, record, "iteration")?
                        .parse()
                        .map_err(|_| format_error(path, "iteration is not a number"))?;
                }
                Some("evaluation") => {
                    let value = single_value(path, record, "evaluation")?;
                    evaluation = Some(
                        value
                            .parse::<f64>()
                            .map_err(|_| format_error(path, "evaluation is not a number"))?,
                    );
                }
                Some("parameters") => {
                    parameters = Some(parse_values(path, record.iter().skip(1))?);
                }
                Some(other) => {
                    return Err(format_error(path, format!("unknown record `{other}`")));
                }
                None => {}
            }
        }

        let parameters =
            parameters.ok_or_else(|| format_error(path, "missing `parameters` record"))?;
        Ok(Checkpoint {
            version,
            iteration,
            evaluation,
            parameters: Vector::from(parameters),
        })
    }
}
