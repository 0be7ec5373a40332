//! Built-in policies.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::env::{Environment, Policy};
use crate::error::{EvalError, Result};

/// Policy names accepted by [`make_policy`].
pub const POLICIES: [&str; 3] = ["null", "sequential", "random"];

/// Does nothing. Every run is a smoke test of environment setup and logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPolicy;

#[async_trait]
impl Policy for NullPolicy {
    fn name(&self) -> &str {
        "null"
    }

    async fn run(&mut self, _env: &mut dyn Environment) -> Result<()> {
        Ok(())
    }
}

/// Applies every action of the action space once, in index order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialPolicy;

#[async_trait]
impl Policy for SequentialPolicy {
    fn name(&self) -> &str {
        "sequential"
    }

    async fn run(&mut self, env: &mut dyn Environment) -> Result<()> {
        for action in 0..env.action_space().len() {
            env.step(action).await?;
        }
        Ok(())
    }
}

/// Takes `max_steps` pseudo-random actions.
///
/// Actions are drawn from SHA-256 of (seed, benchmark, step), so the same
/// seed yields the same trajectory on the same benchmark.
#[derive(Debug, Clone)]
pub struct HashedRandomPolicy {
    seed: u64,
    max_steps: usize,
}

impl HashedRandomPolicy {
    pub fn new(seed: u64, max_steps: usize) -> Self {
        Self { seed, max_steps }
    }

    fn pick(&self, benchmark: &str, step: usize, actions: usize) -> usize {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(benchmark.as_bytes());
        hasher.update((step as u64).to_le_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(bytes) % actions as u64) as usize
    }
}

#[async_trait]
impl Policy for HashedRandomPolicy {
    fn name(&self) -> &str {
        "random"
    }

    async fn run(&mut self, env: &mut dyn Environment) -> Result<()> {
        let actions = env.action_space().len();
        if actions == 0 {
            return Ok(());
        }
        let benchmark = env.benchmark().as_str().to_string();
        for step in 0..self.max_steps {
            let action = self.pick(&benchmark, step, actions);
            env.step(action).await?;
        }
        Ok(())
    }
}

/// Resolve a policy by name. `seed` and `max_steps` only affect `random`.
pub fn make_policy(name: &str, seed: u64, max_steps: usize) -> Result<Box<dyn Policy>> {
    match name {
        "null" => Ok(Box::new(NullPolicy)),
        "sequential" => Ok(Box::new(SequentialPolicy)),
        "random" => Ok(Box::new(HashedRandomPolicy::new(seed, max_steps))),
        other => Err(EvalError::UnknownPolicy(other.to_string())),
    }
}
