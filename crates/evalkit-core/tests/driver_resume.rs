//! Resume and abort behaviour of the evaluation driver against the
//! simulated backend.
//!
//! Each earlier log must be a prefix of every later one, and configuration
//! errors must fire before the log is touched.

use std::path::Path;

use async_trait::async_trait;
use evalkit_core::sim::{CbenchSimDataset, GeneratedSimDataset};
use evalkit_core::{
    evaluate, BenchmarkUri, Dataset, Environment, EvalConfig, EvalError, EvalSummary, LogError,
    NullPolicy, Policy, SequentialPolicy, SimBackend, Validator,
};

async fn run(path: &Path, n: usize, max_benchmarks: usize) -> EvalSummary {
    let backend = SimBackend::instruction_count();
    let config = EvalConfig::new(path)
        .with_repetitions(n)
        .with_max_benchmarks(max_benchmarks)
        .with_resume(true);
    evaluate(&mut SequentialPolicy, &backend, &CbenchSimDataset, &config)
        .await
        .expect("evaluate")
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).expect("read log")
}

#[tokio::test]
async fn resumed_logs_extend_earlier_logs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("results.csv");

    let first = run(&log, 1, 1).await;
    let after_first = read(&log);
    assert_eq!(after_first.lines().count(), 2);
    assert_eq!(first.runs_executed(), 1);

    let second = run(&log, 1, 2).await;
    let after_second = read(&log);
    assert_eq!(after_second.lines().count(), 3);
    assert!(after_second.starts_with(&after_first));
    assert_eq!(second.runs_resumed, 1);
    assert_eq!(second.runs_executed(), 1);

    let third = run(&log, 2, 2).await;
    let after_third = read(&log);
    assert_eq!(after_third.lines().count(), 5);
    assert!(after_third.starts_with(&after_second));
    assert_eq!(third.runs_resumed, 2);
    assert_eq!(third.runs_executed(), 2);
    assert!(third.runs.iter().all(|r| r.repetition == 1));
}

#[tokio::test]
async fn converged_log_is_not_extended() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("results.csv");

    run(&log, 2, 2).await;
    let before = read(&log);
    let again = run(&log, 2, 2).await;

    assert_eq!(read(&log), before);
    assert_eq!(again.runs_executed(), 0);
    assert_eq!(again.runs_resumed, 4);
}

#[tokio::test]
async fn without_resume_the_log_is_truncated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("results.csv");
    run(&log, 2, 3).await;
    assert_eq!(read(&log).lines().count(), 7);

    let backend = SimBackend::instruction_count();
    let config = EvalConfig::new(&log).with_max_benchmarks(1);
    evaluate(&mut NullPolicy, &backend, &CbenchSimDataset, &config)
        .await
        .expect("evaluate");

    let content = read(&log);
    assert_eq!(content.lines().count(), 2);
    assert!(content.starts_with("benchmark,reward,commandline,walltime\n"));
}

#[tokio::test]
async fn infinite_dataset_is_bounded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("results.csv");
    let backend = SimBackend::unrewarded();
    let config = EvalConfig::new(&log).with_max_benchmarks(3);

    let summary = evaluate(&mut NullPolicy, &backend, &GeneratedSimDataset, &config)
        .await
        .expect("evaluate");

    assert_eq!(summary.benchmarks_visited, 3);
    assert_eq!(read(&log).lines().count(), 4);
    assert!(summary.runs.iter().all(|r| r.reward.is_none()));
    assert_eq!(backend.environments_made(), 6);
    assert_eq!(backend.live_environments(), 0);
}

#[tokio::test]
async fn driver_log_validates_cleanly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("results.csv");
    run(&log, 2, 4).await;

    let backend = SimBackend::instruction_count();
    let mut out = Vec::new();
    let report = Validator::new(&backend)
        .with_dataset(&CbenchSimDataset)
        .validate_input(read(&log).as_bytes(), &mut out)
        .await
        .expect("validate");

    assert_eq!(report.total(), 8);
    assert!(report.success());
    assert_eq!(String::from_utf8(out).expect("utf8").matches('✅').count(), 8);
}

#[tokio::test]
async fn resume_refuses_foreign_column_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("results.csv");
    let seeded = "benchmark,reward,walltime,commandline\n\
                  benchmark://cbench-sim-v0/adpcm,0.0,0.5,opt  input.bc -o output.bc\n";
    std::fs::write(&log, seeded).expect("seed");

    let backend = SimBackend::instruction_count();
    let config = EvalConfig::new(&log)
        .with_max_benchmarks(2)
        .with_resume(true);
    let err = evaluate(&mut SequentialPolicy, &backend, &CbenchSimDataset, &config)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EvalError::Log(LogError::UnexpectedHeader { .. })
    ));
    assert_eq!(read(&log), seeded);
    assert_eq!(backend.environments_made(), 0);

    let mut out = Vec::new();
    let report = Validator::new(&backend)
        .validate_input(seeded.as_bytes(), &mut out)
        .await
        .expect("validate");
    assert!(report.success());
}

#[test]
fn zero_repetitions_panic_before_log_io() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("results.csv");

    for (n, m) in [(0, 1), (1, 0)] {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        let config = EvalConfig::new(&log)
            .with_repetitions(n)
            .with_max_benchmarks(m)
            .with_resume(true);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let backend = SimBackend::instruction_count();
            rt.block_on(evaluate(&mut NullPolicy, &backend, &CbenchSimDataset, &config))
        }));
        assert!(result.is_err(), "({n}, {m}) should panic");
        assert!(!log.exists());
    }
}

/// Fails on every run after touching the environment.
struct FailingPolicy;

#[async_trait]
impl Policy for FailingPolicy {
    fn name(&self) -> &str {
        "failing"
    }

    async fn run(&mut self, env: &mut dyn Environment) -> evalkit_core::Result<()> {
        env.step(0).await?;
        Err(EvalError::environment(env.benchmark(), "policy gave up"))
    }
}

#[tokio::test]
async fn policy_error_aborts_and_releases_environment() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("results.csv");
    let backend = SimBackend::instruction_count();
    let config = EvalConfig::new(&log).with_max_benchmarks(5);

    let err = evaluate(&mut FailingPolicy, &backend, &CbenchSimDataset, &config)
        .await
        .unwrap_err();

    match err {
        EvalError::Policy { policy, benchmark, .. } => {
            assert_eq!(policy, "failing");
            assert_eq!(benchmark.short_name(), "cbench-sim-v0/adpcm");
        }
        other => panic!("Expected policy error, got {:?}", other),
    }
    assert_eq!(backend.environments_made(), 1);
    assert_eq!(backend.live_environments(), 0);
    assert_eq!(read(&log).lines().count(), 1);
}

/// Yields benchmarks the simulated backend does not know.
struct UnknownDataset;

impl Dataset for UnknownDataset {
    fn name(&self) -> &str {
        "unknown-v0"
    }

    fn benchmarks(&self) -> Box<dyn Iterator<Item = BenchmarkUri> + Send + '_> {
        Box::new(std::iter::repeat(BenchmarkUri::from("benchmark://unknown-v0/x")))
    }

    fn contains(&self, benchmark: &BenchmarkUri) -> bool {
        benchmark.dataset() == Some("unknown-v0")
    }
}

#[tokio::test]
async fn environment_error_propagates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = dir.path().join("results.csv");
    let backend = SimBackend::instruction_count();

    let err = evaluate(
        &mut NullPolicy,
        &backend,
        &UnknownDataset,
        &EvalConfig::new(&log),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, EvalError::Environment { .. }));
}
