//! Simulated code-size environment and its backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use evalkit_log::BenchmarkUri;

use super::dataset::{CbenchSimDataset, GeneratedSimDataset};
use super::passes::{apply_pass, format_commandline, initial_instruction_count, parse_commandline, PASSES};
use crate::env::{Dataset, Environment, EnvironmentBackend, StepResult};
use crate::error::{EvalError, Result};

/// Live-environment bookkeeping shared by a backend and its environments.
#[derive(Debug, Default)]
struct EnvCounters {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// Backend for the `codesize-sim-*` environments.
#[derive(Debug, Clone)]
pub struct SimBackend {
    id: String,
    reward: bool,
    counters: Arc<EnvCounters>,
}

impl SimBackend {
    /// `codesize-sim-v0`: no reward space.
    pub fn unrewarded() -> Self {
        Self::new("codesize-sim-v0", false)
    }

    /// `codesize-sim-ic-v0`: reward is the instruction count reduction.
    pub fn instruction_count() -> Self {
        Self::new("codesize-sim-ic-v0", true)
    }

    fn new(id: &str, reward: bool) -> Self {
        Self {
            id: id.to_string(),
            reward,
            counters: Arc::new(EnvCounters::default()),
        }
    }

    /// Environments made by this backend and not yet released.
    pub fn live_environments(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst) - self.counters.closed.load(Ordering::SeqCst)
    }

    /// Environments made by this backend so far.
    pub fn environments_made(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    fn knows(benchmark: &BenchmarkUri) -> bool {
        CbenchSimDataset.contains(benchmark) || GeneratedSimDataset.contains(benchmark)
    }
}

#[async_trait]
impl EnvironmentBackend for SimBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn has_reward(&self) -> bool {
        self.reward
    }

    async fn make(&self, benchmark: &BenchmarkUri) -> Result<Box<dyn Environment>> {
        if !Self::knows(benchmark) {
            return Err(EvalError::environment(benchmark, "unknown benchmark"));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        debug!(env = %self.id, benchmark = %benchmark, "environment made");
        Ok(Box::new(SimEnvironment::new(
            benchmark.clone(),
            self.reward,
            self.counters.clone(),
        )))
    }
}

/// One episode of the simulated code-size task.
#[derive(Debug)]
pub struct SimEnvironment {
    benchmark: BenchmarkUri,
    action_space: Vec<String>,
    reward: bool,
    initial_count: u64,
    count: u64,
    applied: Vec<usize>,
    closed: bool,
    counters: Arc<EnvCounters>,
}

impl SimEnvironment {
    fn new(benchmark: BenchmarkUri, reward: bool, counters: Arc<EnvCounters>) -> Self {
        let initial_count = initial_instruction_count(benchmark.as_str());
        Self {
            benchmark,
            action_space: PASSES.iter().map(|p| p.to_string()).collect(),
            reward,
            initial_count,
            count: initial_count,
            applied: Vec::new(),
            closed: false,
            counters,
        }
    }

    /// Current instruction count.
    pub fn instruction_count(&self) -> u64 {
        self.count
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(EvalError::environment(&self.benchmark, "environment is closed"));
        }
        Ok(())
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Environment for SimEnvironment {
    fn benchmark(&self) -> &BenchmarkUri {
        &self.benchmark
    }

    fn action_space(&self) -> &[String] {
        &self.action_space
    }

    async fn step(&mut self, action: usize) -> Result<StepResult> {
        self.ensure_open()?;
        let pass = PASSES.get(action).ok_or(EvalError::InvalidAction {
            action,
            size: PASSES.len(),
        })?;

        let before = self.count;
        self.count = apply_pass(self.benchmark.as_str(), pass, before);
        self.applied.push(action);
        trace!(pass = %pass, before, after = self.count, "pass applied");

        Ok(StepResult {
            reward: self.reward.then(|| before as f64 - self.count as f64),
        })
    }

    fn episode_reward(&self) -> Option<f64> {
        self.reward.then(|| self.initial_count as f64 - self.count as f64)
    }

    fn commandline(&self) -> String {
        let passes: Vec<&str> = self.applied.iter().map(|i| PASSES[*i]).collect();
        format_commandline(&passes)
    }

    async fn apply_commandline(&mut self, commandline: &str) -> Result<()> {
        self.ensure_open()?;
        for action in parse_commandline(commandline)? {
            self.step(action).await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.release();
        debug!(benchmark = %self.benchmark, "environment closed");
        Ok(())
    }
}

impl Drop for SimEnvironment {
    fn drop(&mut self) {
        self.release();
    }
}
