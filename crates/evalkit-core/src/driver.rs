//! Resumable evaluation driver.
//!
//! Pulls at most `max_benchmarks` identifiers from a dataset, runs the policy
//! `repetitions` times on each in a fresh environment, and appends one row
//! per run to the result log. With `resume`, repetitions already present in
//! the log are skipped, so every earlier log is a prefix of every later one.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use evalkit_log::{BenchmarkUri, EvaluationRecord, LogWriter, ResumeState};

use crate::env::{close_environment, Dataset, EnvironmentBackend, Policy};
use crate::error::{EvalError, Result};
use crate::metrics::METRICS;
use crate::obs::{
    emit_eval_finished, emit_eval_started, emit_log_resumed, emit_run_recorded, session_span,
};
use crate::validator::{ValidationOutcome, Validator, REWARD_TOLERANCE};

/// Log path used when none is given.
pub const DEFAULT_LOGFILE: &str = "results.csv";

/// Parameters of one evaluation session.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalConfig {
    /// Desired repetitions per benchmark. Must be > 0.
    pub repetitions: usize,

    /// Upper bound on identifiers drawn from the dataset. Must be > 0.
    pub max_benchmarks: usize,

    pub logfile: PathBuf,

    /// Build on an existing log instead of truncating it.
    pub resume: bool,

    /// Replay each row right after writing it; abort on mismatch.
    pub validate: bool,

    pub tolerance: f64,
}

impl EvalConfig {
    pub fn new(logfile: impl Into<PathBuf>) -> Self {
        Self {
            repetitions: 1,
            max_benchmarks: 100,
            logfile: logfile.into(),
            resume: false,
            validate: true,
            tolerance: REWARD_TOLERANCE,
        }
    }

    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn with_max_benchmarks(mut self, max_benchmarks: usize) -> Self {
        self.max_benchmarks = max_benchmarks;
        self
    }

    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LOGFILE)
    }
}

/// One run appended to the log during this session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub benchmark: BenchmarkUri,
    /// Zero-based repetition index of this run for its benchmark.
    pub repetition: usize,
    pub reward: Option<f64>,
    pub commandline: String,
    pub walltime: f64,
}

/// What an evaluation session did.
#[derive(Debug, Clone)]
pub struct EvalSummary {
    pub session_id: Uuid,
    pub logfile: PathBuf,
    /// Identifiers drawn from the dataset (including fully resumed ones).
    pub benchmarks_visited: usize,
    /// Repetitions skipped because the log already held them.
    pub runs_resumed: usize,
    /// Runs executed and appended by this session, in log order.
    pub runs: Vec<RunOutcome>,
}

impl EvalSummary {
    pub fn runs_executed(&self) -> usize {
        self.runs.len()
    }

    pub fn total_walltime(&self) -> f64 {
        self.runs.iter().map(|r| r.walltime).sum()
    }

    /// Mean reward over runs that produced one.
    pub fn mean_reward(&self) -> Option<f64> {
        let rewards: Vec<f64> = self.runs.iter().filter_map(|r| r.reward).collect();
        if rewards.is_empty() {
            None
        } else {
            Some(rewards.iter().sum::<f64>() / rewards.len() as f64)
        }
    }
}

/// Evaluate `policy` on the first `config.max_benchmarks` benchmarks of
/// `dataset`, appending one record per run to `config.logfile`.
///
/// # Panics
///
/// When `config.repetitions` or `config.max_benchmarks` is zero. This is a
/// caller error and is raised before the log is touched.
///
/// # Errors
///
/// Environment, policy and log errors abort the session; rows written
/// before the failure stay in the log. With `config.validate`, a row that
/// does not replay to its recorded reward aborts with
/// [`EvalError::ValidationFailed`].
pub async fn evaluate(
    policy: &mut dyn Policy,
    backend: &dyn EnvironmentBackend,
    dataset: &dyn Dataset,
    config: &EvalConfig,
) -> Result<EvalSummary> {
    assert!(
        config.repetitions > 0,
        "repetitions per benchmark must be > 0, got {}",
        config.repetitions
    );
    assert!(
        config.max_benchmarks > 0,
        "max_benchmarks must be > 0, got {}",
        config.max_benchmarks
    );

    let session_id = Uuid::new_v4();
    run_session(session_id, policy, backend, dataset, config)
        .instrument(session_span(&session_id.to_string()))
        .await
}

async fn run_session(
    session_id: Uuid,
    policy: &mut dyn Policy,
    backend: &dyn EnvironmentBackend,
    dataset: &dyn Dataset,
    config: &EvalConfig,
) -> Result<EvalSummary> {
    let started = Instant::now();
    let session = session_id.to_string();
    emit_eval_started(
        &session,
        backend.id(),
        dataset.name(),
        policy.name(),
        config.repetitions,
        config.max_benchmarks,
    );

    let (mut writer, mut resume) = open_log(&config.logfile, config.resume)?;
    let validator = Validator::new(backend).with_tolerance(config.tolerance);

    let mut benchmarks_visited = 0;
    let mut runs_resumed = 0;
    let mut runs = Vec::new();

    for benchmark in dataset.benchmarks().take(config.max_benchmarks) {
        benchmarks_visited += 1;
        let already = resume.claim(&benchmark, config.repetitions);
        runs_resumed += already;
        METRICS.add_runs_resumed(already as u64);

        for repetition in already..config.repetitions {
            let record = run_once(policy, backend, &benchmark)
                .instrument(info_span!("evalkit.run", benchmark = %benchmark, repetition))
                .await?;
            writer.write(&record)?;

            let walltime = record.walltime.unwrap_or_default();
            METRICS.inc_runs_executed();
            emit_run_recorded(benchmark.as_str(), repetition, record.reward, walltime);

            if config.validate {
                let validation = validator.validate_record(&record).await;
                if let ValidationOutcome::Fail { reason } = validation.outcome {
                    return Err(EvalError::ValidationFailed { benchmark, reason });
                }
            }

            runs.push(RunOutcome {
                benchmark: benchmark.clone(),
                repetition,
                reward: record.reward,
                commandline: record.commandline,
                walltime,
            });
        }
    }

    emit_eval_finished(
        &session,
        writer.rows_written(),
        runs_resumed,
        started.elapsed().as_millis() as u64,
    );

    Ok(EvalSummary {
        session_id,
        logfile: config.logfile.clone(),
        benchmarks_visited,
        runs_resumed,
        runs,
    })
}

fn open_log(logfile: &Path, resume: bool) -> Result<(LogWriter, ResumeState)> {
    if resume {
        if let Some(state) = ResumeState::load(logfile)? {
            emit_log_resumed(&logfile.display().to_string(), state.rows());
            return Ok((LogWriter::append(logfile)?, state));
        }
        info!(logfile = %logfile.display(), "no existing log to resume, starting fresh");
    }
    Ok((LogWriter::create(logfile)?, ResumeState::default()))
}

/// Run `policy` once in a fresh environment and build its log row.
async fn run_once(
    policy: &mut dyn Policy,
    backend: &dyn EnvironmentBackend,
    benchmark: &BenchmarkUri,
) -> Result<EvaluationRecord> {
    let mut env = backend.make(benchmark).await?;

    let started = Instant::now();
    let outcome = policy.run(env.as_mut()).await;
    let walltime = started.elapsed().as_secs_f64();

    let record = match outcome {
        Ok(()) => Ok(EvaluationRecord {
            benchmark: benchmark.clone(),
            reward: env.episode_reward(),
            commandline: env.commandline(),
            walltime: Some(walltime),
        }),
        Err(e) => Err(EvalError::Policy {
            policy: policy.name().to_string(),
            benchmark: benchmark.clone(),
            message: e.to_string(),
        }),
    };
    close_environment(env).await;
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_config_builder() {
        let config = EvalConfig::new("out/log.csv")
            .with_repetitions(3)
            .with_max_benchmarks(2)
            .with_resume(true)
            .with_validation(false)
            .with_tolerance(0.5);

        assert_eq!(config.repetitions, 3);
        assert_eq!(config.max_benchmarks, 2);
        assert!(config.resume);
        assert!(!config.validate);
        assert_eq!(config.tolerance, 0.5);
        assert_eq!(config.logfile, PathBuf::from("out/log.csv"));
    }

    #[test]
    fn test_eval_config_defaults() {
        let config = EvalConfig::default();
        assert_eq!(config.repetitions, 1);
        assert!(config.validate);
        assert!(!config.resume);
        assert_eq!(config.tolerance, REWARD_TOLERANCE);
        assert_eq!(config.logfile, PathBuf::from(DEFAULT_LOGFILE));
    }

    #[test]
    fn test_summary_aggregates() {
        let run = |reward: Option<f64>, walltime: f64| RunOutcome {
            benchmark: BenchmarkUri::from("benchmark://d/a"),
            repetition: 0,
            reward,
            commandline: "opt  input.bc -o output.bc".to_string(),
            walltime,
        };
        let summary = EvalSummary {
            session_id: Uuid::new_v4(),
            logfile: PathBuf::from("results.csv"),
            benchmarks_visited: 3,
            runs_resumed: 0,
            runs: vec![run(Some(4.0), 0.5), run(None, 0.25), run(Some(2.0), 0.25)],
        };

        assert_eq!(summary.runs_executed(), 3);
        assert_eq!(summary.total_walltime(), 1.0);
        assert_eq!(summary.mean_reward(), Some(3.0));
    }

    #[test]
    fn test_summary_without_rewards() {
        let summary = EvalSummary {
            session_id: Uuid::new_v4(),
            logfile: PathBuf::from("results.csv"),
            benchmarks_visited: 0,
            runs_resumed: 0,
            runs: Vec::new(),
        };
        assert_eq!(summary.mean_reward(), None);
    }
}
