//! Capability traits for the collaborators the driver and validator consume.
//!
//! - `EnvironmentBackend`: constructs a fresh `Environment` per benchmark
//! - `Environment`: stateful episode that can be stepped or replayed
//! - `Dataset`: lazy, possibly infinite producer of benchmark identifiers
//! - `Policy`: the capability under evaluation
//!
//! Environments are scoped resources: acquired per run or per record and
//! released through [`close_environment`] on every path.

use async_trait::async_trait;

use evalkit_log::BenchmarkUri;

use crate::error::Result;
use crate::obs::emit_env_close_error;

/// Outcome of a single environment step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    /// Reward for this step; `None` when the environment has no reward space.
    pub reward: Option<f64>,
}

/// A stateful episode on one benchmark.
#[async_trait]
pub trait Environment: Send {
    /// Benchmark this episode runs on.
    fn benchmark(&self) -> &BenchmarkUri;

    /// Names of the actions accepted by [`Environment::step`], by index.
    fn action_space(&self) -> &[String];

    /// Apply one action.
    async fn step(&mut self, action: usize) -> Result<StepResult>;

    /// Cumulative reward of the episode so far, if the environment has a
    /// reward space.
    fn episode_reward(&self) -> Option<f64>;

    /// Replayable action trace of the episode so far.
    fn commandline(&self) -> String;

    /// Replay a recorded action trace from the current state.
    async fn apply_commandline(&mut self, commandline: &str) -> Result<()>;

    /// Release backend resources. Further use of the environment fails.
    async fn close(&mut self) -> Result<()>;
}

/// Constructs environments for benchmark identifiers.
#[async_trait]
pub trait EnvironmentBackend: Send + Sync {
    /// Environment id, e.g. `codesize-sim-ic-v0`.
    fn id(&self) -> &str;

    /// Whether environments from this backend produce rewards.
    fn has_reward(&self) -> bool;

    /// Build a fresh environment for `benchmark`.
    async fn make(&self, benchmark: &BenchmarkUri) -> Result<Box<dyn Environment>>;
}

/// Enumerates benchmark identifiers.
pub trait Dataset: Send + Sync {
    fn name(&self) -> &str;

    /// Lazily produce identifiers. Callers must bound consumption; the
    /// sequence may be infinite.
    fn benchmarks(&self) -> Box<dyn Iterator<Item = BenchmarkUri> + Send + '_>;

    /// Whether `benchmark` belongs to this dataset.
    fn contains(&self, benchmark: &BenchmarkUri) -> bool;
}

/// The capability under evaluation: drives an environment, returns nothing.
#[async_trait]
pub trait Policy: Send {
    fn name(&self) -> &str;

    async fn run(&mut self, env: &mut dyn Environment) -> Result<()>;
}

/// Close `env`, logging (not propagating) a close failure so it never masks
/// the outcome of the work done in the environment.
pub async fn close_environment(mut env: Box<dyn Environment>) {
    if let Err(e) = env.close().await {
        emit_env_close_error(env.benchmark().as_str(), &e);
    }
}
