//! Error taxonomy for evaluation and replay.

use evalkit_log::{BenchmarkUri, LogError};

/// Errors produced while driving or replaying environments.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("result log error: {0}")]
    Log(#[from] LogError),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("unknown dataset: {0}")]
    UnknownDataset(String),

    #[error("unknown policy: {0}")]
    UnknownPolicy(String),

    #[error("environment error on {benchmark}: {message}")]
    Environment {
        benchmark: BenchmarkUri,
        message: String,
    },

    #[error("invalid action {action}, action space has {size} actions")]
    InvalidAction { action: usize, size: usize },

    #[error("invalid commandline: {0}")]
    InvalidCommandline(String),

    #[error("policy {policy} failed on {benchmark}: {message}")]
    Policy {
        policy: String,
        benchmark: BenchmarkUri,
        message: String,
    },

    #[error("validation failed for {benchmark}: {reason}")]
    ValidationFailed {
        benchmark: BenchmarkUri,
        reason: String,
    },
}

impl EvalError {
    pub fn environment(benchmark: &BenchmarkUri, message: impl Into<String>) -> Self {
        EvalError::Environment {
            benchmark: benchmark.clone(),
            message: message.into(),
        }
    }
}

/// Result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_error_display() {
        let err = EvalError::UnknownEnvironment("llvm-v0".to_string());
        assert!(err.to_string().contains("unknown environment"));

        let err = EvalError::environment(&BenchmarkUri::from("benchmark://d/x"), "boom");
        let msg = err.to_string();
        assert!(msg.contains("benchmark://d/x"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn test_validation_failed_error() {
        let err = EvalError::ValidationFailed {
            benchmark: BenchmarkUri::from("benchmark://d/x"),
            reason: "Expected reward 1.0000 but received reward 0.0000".to_string(),
        };
        assert!(err.to_string().contains("validation failed"));
        assert!(err.to_string().contains("Expected reward 1.0000"));
    }

    #[test]
    fn test_log_error_converts() {
        let err: EvalError = LogError::MissingColumn {
            column: "benchmark".to_string(),
        }
        .into();
        assert!(matches!(err, EvalError::Log(_)));
    }
}
