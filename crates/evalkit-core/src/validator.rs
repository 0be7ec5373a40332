//! Replay-and-compare validation of result log records.
//!
//! Each record is replayed in a fresh environment built for its benchmark.
//! A record passes when the replay completes and, if it carries a reward,
//! the replayed episode reward is within [`REWARD_TOLERANCE`] of it.
//! `walltime` is never compared: it only describes the original run.

use std::fmt;
use std::io::{Read, Write};
use std::time::Instant;

use thiserror::Error;

use evalkit_log::{parse_records, BenchmarkUri, EvaluationRecord, LogError};

use crate::env::{close_environment, Dataset, EnvironmentBackend};
use crate::metrics::METRICS;
use crate::obs::emit_record_validated;

/// Default maximum `|replayed - recorded|` for a reward to match.
pub const REWARD_TOLERANCE: f64 = 1e-4;

/// Prefix of a passing output line.
pub const PASS_MARKER: &str = "✅";

/// Prefix of a failing output line.
pub const FAIL_MARKER: &str = "❌";

/// Whole-stream failures. Per-record failures are [`ValidationOutcome::Fail`].
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("Failed to parse input: {0}")]
    Parse(#[source] LogError),

    #[error("No inputs to validate")]
    NoInputs,

    #[error("failed to write validation output: {0}")]
    Output(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Pass,
    Fail { reason: String },
}

/// Outcome of replaying one record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordValidation {
    pub benchmark: BenchmarkUri,
    pub outcome: ValidationOutcome,
    pub recorded_reward: Option<f64>,
    pub actual_reward: Option<f64>,
    /// Replay duration in seconds.
    pub walltime: f64,
}

impl RecordValidation {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, ValidationOutcome::Pass)
    }
}

impl fmt::Display for RecordValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            ValidationOutcome::Pass => write!(
                f,
                "{PASS_MARKER}  {}  {:.3}s",
                self.benchmark.short_name(),
                self.walltime
            ),
            ValidationOutcome::Fail { reason } => {
                write!(f, "{FAIL_MARKER}  {}  {reason}", self.benchmark.short_name())
            }
        }
    }
}

/// Per-record outcomes of a validation run, in input order.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub results: Vec<RecordValidation>,
}

impl ValidationReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    /// True when every record passed.
    pub fn success(&self) -> bool {
        self.failed() == 0
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Validated {} results: {} passed, {} failed",
            self.total(),
            self.passed(),
            self.failed()
        )
    }
}

/// Replays records against an environment backend.
pub struct Validator<'a> {
    backend: &'a dyn EnvironmentBackend,
    dataset: Option<&'a dyn Dataset>,
    tolerance: f64,
}

impl<'a> Validator<'a> {
    pub fn new(backend: &'a dyn EnvironmentBackend) -> Self {
        Self {
            backend,
            dataset: None,
            tolerance: REWARD_TOLERANCE,
        }
    }

    /// Additionally require every benchmark to belong to `dataset`.
    pub fn with_dataset(mut self, dataset: &'a dyn Dataset) -> Self {
        self.dataset = Some(dataset);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Replay one record. Never fails: replay errors become a failed outcome.
    pub async fn validate_record(&self, record: &EvaluationRecord) -> RecordValidation {
        let started = Instant::now();
        let (outcome, actual_reward) = self.replay(record).await;
        let validation = RecordValidation {
            benchmark: record.benchmark.clone(),
            outcome,
            recorded_reward: record.reward,
            actual_reward,
            walltime: started.elapsed().as_secs_f64(),
        };

        METRICS.inc_records_validated(validation.passed());
        emit_record_validated(
            validation.benchmark.as_str(),
            validation.passed(),
            validation.walltime,
        );
        validation
    }

    async fn replay(&self, record: &EvaluationRecord) -> (ValidationOutcome, Option<f64>) {
        if let Some(dataset) = self.dataset {
            if !dataset.contains(&record.benchmark) {
                return (
                    fail(format!(
                        "Benchmark is not a member of dataset {}",
                        dataset.name()
                    )),
                    None,
                );
            }
        }

        if let Some(expected) = record.reward {
            if !self.backend.has_reward() {
                return (no_reward(expected), None);
            }
        }

        let mut env = match self.backend.make(&record.benchmark).await {
            Ok(env) => env,
            Err(e) => return (fail(format!("Replay failed: {e}")), None),
        };
        let replayed = env.apply_commandline(&record.commandline).await;
        let actual = env.episode_reward();
        close_environment(env).await;

        if let Err(e) = replayed {
            return (fail(format!("Replay failed: {e}")), actual);
        }

        let outcome = match (record.reward, actual) {
            (None, _) => ValidationOutcome::Pass,
            (Some(expected), None) => no_reward(expected),
            (Some(expected), Some(received)) => {
                if (received - expected).abs() <= self.tolerance {
                    ValidationOutcome::Pass
                } else {
                    fail(format!(
                        "Expected reward {expected:.4} but received reward {received:.4}"
                    ))
                }
            }
        };
        (outcome, actual)
    }

    /// Validate `records` in order, writing one line per record to `out`.
    pub async fn validate_records<W: Write>(
        &self,
        records: &[EvaluationRecord],
        out: &mut W,
    ) -> Result<ValidationReport, ValidateError> {
        if records.is_empty() {
            return Err(ValidateError::NoInputs);
        }

        let mut report = ValidationReport::default();
        for record in records {
            let validation = self.validate_record(record).await;
            writeln!(out, "{validation}")?;
            report.results.push(validation);
        }
        out.flush()?;
        Ok(report)
    }

    /// Parse a complete CSV record stream and validate it.
    ///
    /// Nothing is written to `out` unless the whole stream parses. Bytes that
    /// are not UTF-8 are a parse failure.
    pub async fn validate_input<W: Write>(
        &self,
        input: &[u8],
        out: &mut W,
    ) -> Result<ValidationReport, ValidateError> {
        let records = parse_records(input).map_err(ValidateError::Parse)?;
        self.validate_records(&records, out).await
    }
}

fn fail(reason: String) -> ValidationOutcome {
    ValidationOutcome::Fail { reason }
}

fn no_reward(expected: f64) -> ValidationOutcome {
    fail(format!(
        "Expected reward {expected:.4} but the environment provides no reward"
    ))
}

/// Read a whole record stream from `path`, or from stdin when `path` is `-`.
///
/// The bytes are returned undecoded; decoding is left to the parser.
pub fn read_input(path: &str) -> std::io::Result<Vec<u8>> {
    if path == "-" {
        let mut input = Vec::new();
        std::io::stdin().read_to_end(&mut input)?;
        Ok(input)
    } else {
        std::fs::read(path)
    }
}
