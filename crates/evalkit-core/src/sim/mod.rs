//! Deterministic reference backend: a simulated code-size optimisation task.
//!
//! Programs are identified by benchmark URIs; actions are optimisation
//! passes; the reward (when enabled) is the instruction count removed so
//! far. Everything is derived from SHA-256, so replays are exact.

pub mod dataset;
pub mod env;
pub mod passes;

pub use dataset::{CbenchSimDataset, GeneratedSimDataset, CBENCH_SIM_BENCHMARKS};
pub use env::{SimBackend, SimEnvironment};

use crate::env::Dataset;
use crate::error::{EvalError, Result};

/// Environment ids accepted by [`make_backend`].
pub const ENVIRONMENTS: [&str; 2] = ["codesize-sim-v0", "codesize-sim-ic-v0"];

/// Dataset names accepted by [`make_dataset`].
pub const DATASETS: [&str; 2] = [CbenchSimDataset::NAME, GeneratedSimDataset::NAME];

/// Resolve an environment id to a backend.
pub fn make_backend(id: &str) -> Result<SimBackend> {
    match id {
        "codesize-sim-v0" => Ok(SimBackend::unrewarded()),
        "codesize-sim-ic-v0" => Ok(SimBackend::instruction_count()),
        other => Err(EvalError::UnknownEnvironment(other.to_string())),
    }
}

/// Resolve a dataset name.
pub fn make_dataset(name: &str) -> Result<Box<dyn Dataset>> {
    match name {
        CbenchSimDataset::NAME => Ok(Box::new(CbenchSimDataset)),
        GeneratedSimDataset::NAME => Ok(Box::new(GeneratedSimDataset)),
        other => Err(EvalError::UnknownDataset(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvironmentBackend;

    #[test]
    fn test_registry_resolves_every_listed_name() {
        for id in ENVIRONMENTS {
            assert_eq!(make_backend(id).expect("backend").id(), id);
        }
        for name in DATASETS {
            assert_eq!(make_dataset(name).expect("dataset").name(), name);
        }
    }

    #[test]
    fn test_registry_rejects_unknown_names() {
        assert!(matches!(
            make_backend("llvm-v0"),
            Err(EvalError::UnknownEnvironment(_))
        ));
        assert!(matches!(
            make_dataset("cBench-v0"),
            Err(EvalError::UnknownDataset(_))
        ));
    }
}
