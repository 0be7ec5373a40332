//! Structured observability hooks for evaluation and validation.
//!
//! This module provides:
//! - A session-scoped tracing span via `session_span`
//! - Emission functions for lifecycle events: session start/finish, run
//!   recorded, log resumed, record validated, environment close failure
//!
//! Events go to stderr through the subscriber from [`crate::init_tracing`];
//! filter with `RUST_LOG`.

use tracing::{debug, info};

/// Span tagging every event of one evaluation session.
///
/// Attach it to the session future with `Instrument::instrument` rather than
/// entering it, so the guard is never held across an `.await`.
pub fn session_span(session_id: &str) -> tracing::Span {
    tracing::info_span!("evalkit.session", session_id = %session_id)
}

/// Emit event: evaluation session started.
pub fn emit_eval_started(
    session_id: &str,
    env: &str,
    dataset: &str,
    policy: &str,
    repetitions: usize,
    max_benchmarks: usize,
) {
    info!(
        event = "eval.started",
        session_id = %session_id,
        env = %env,
        dataset = %dataset,
        policy = %policy,
        repetitions = repetitions,
        max_benchmarks = max_benchmarks,
    );
}

/// Emit event: an existing log was rescanned and will be appended to.
pub fn emit_log_resumed(logfile: &str, rows: usize) {
    info!(event = "eval.resumed", logfile = %logfile, rows = rows);
}

/// Emit event: one run appended to the log.
pub fn emit_run_recorded(benchmark: &str, repetition: usize, reward: Option<f64>, walltime: f64) {
    info!(
        event = "eval.run_recorded",
        benchmark = %benchmark,
        repetition = repetition,
        reward = reward,
        walltime = walltime,
    );
}

/// Emit event: evaluation session finished.
pub fn emit_eval_finished(session_id: &str, runs_executed: usize, runs_resumed: usize, duration_ms: u64) {
    info!(
        event = "eval.finished",
        session_id = %session_id,
        runs_executed = runs_executed,
        runs_resumed = runs_resumed,
        duration_ms = duration_ms,
    );
}

/// Emit event: one record replayed and compared.
pub fn emit_record_validated(benchmark: &str, passed: bool, walltime: f64) {
    debug!(
        event = "validate.record",
        benchmark = %benchmark,
        passed = passed,
        walltime = walltime,
    );
}

/// Emit event: releasing an environment failed (warning level).
pub fn emit_env_close_error(benchmark: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "env.close_error", benchmark = %benchmark, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_span_create() {
        let span = session_span("test-session-id");
        let _entered = span.enter();
    }

    #[test]
    fn test_emitters_without_subscriber() {
        emit_eval_started("s", "codesize-sim-v0", "cbench-sim-v0", "null", 1, 1);
        emit_run_recorded("benchmark://cbench-sim-v0/sha", 0, None, 0.1);
        emit_eval_finished("s", 1, 0, 3);
        emit_env_close_error("benchmark://cbench-sim-v0/sha", &"already closed");
    }
}
