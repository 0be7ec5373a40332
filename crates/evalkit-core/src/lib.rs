//! Evalkit Core Library
//!
//! Evaluates a policy against a suite of benchmarks with a resumable result
//! log, and re-validates logged results by replaying them.
//!
//! - [`driver`]: bounded, resumable evaluation loop
//! - [`validator`]: replay-and-compare over a record stream
//! - [`env`]: capability traits for environment backends, datasets and policies
//! - [`sim`]: deterministic reference backend

pub mod driver;
pub mod env;
pub mod error;
pub mod metrics;
pub mod obs;
pub mod policy;
pub mod reporting;
pub mod sim;
pub mod telemetry;
pub mod validator;

pub use driver::{evaluate, EvalConfig, EvalSummary, RunOutcome, DEFAULT_LOGFILE};
pub use env::{close_environment, Dataset, Environment, EnvironmentBackend, Policy, StepResult};
pub use error::{EvalError, Result};
pub use policy::{make_policy, HashedRandomPolicy, NullPolicy, SequentialPolicy, POLICIES};
pub use reporting::{
    write_eval_results_json, EvalResultsArtifact, EvalSummaryArtifact, RunResultArtifact,
};
pub use sim::{make_backend, make_dataset, SimBackend, DATASETS, ENVIRONMENTS};
pub use validator::{
    read_input, RecordValidation, ValidateError, ValidationOutcome, ValidationReport, Validator,
    FAIL_MARKER, PASS_MARKER, REWARD_TOLERANCE,
};

pub use evalkit_log::{BenchmarkUri, EvaluationRecord, LogError, LogWriter, ResumeState};

pub use metrics::METRICS;
pub use obs::{
    emit_env_close_error, emit_eval_finished, emit_eval_started, emit_log_resumed,
    emit_record_validated, emit_run_recorded, session_span,
};
pub use telemetry::init_tracing;

/// Evalkit version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
