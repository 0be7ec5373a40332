//! Evalkit CLI
//!
//! The `evalkit` command evaluates policies against benchmark suites and
//! re-validates the logged results.
//!
//! ## Commands
//!
//! - `eval`: run a policy over a dataset, appending rows to a CSV result log
//! - `validate`: replay a result log and print one pass/fail line per row

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};

use evalkit_core::{
    evaluate, make_backend, make_dataset, make_policy, read_input, write_eval_results_json,
    EvalConfig, EvalResultsArtifact, ValidateError, Validator, DATASETS, DEFAULT_LOGFILE,
    ENVIRONMENTS, METRICS, POLICIES, REWARD_TOLERANCE,
};

#[derive(Parser)]
#[command(name = "evalkit")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resumable policy evaluation and result validation", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a policy, appending one CSV row per run
    Eval {
        #[command(flatten)]
        backend: BackendArgs,

        /// Dataset providing benchmark identifiers
        #[arg(long, env = "EVALKIT_DATASET", default_value = "cbench-sim-v0",
              value_parser = PossibleValuesParser::new(DATASETS))]
        dataset: String,

        /// Policy to evaluate
        #[arg(long, default_value = "sequential", value_parser = PossibleValuesParser::new(POLICIES))]
        policy: String,

        /// Repetitions per benchmark
        #[arg(long = "n", default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        n: u64,

        /// Maximum number of benchmarks drawn from the dataset
        #[arg(long = "max_benchmarks", default_value_t = 100,
              value_parser = clap::value_parser!(u64).range(1..))]
        max_benchmarks: u64,

        /// Result log path
        #[arg(long, env = "EVALKIT_LOGFILE", default_value = DEFAULT_LOGFILE)]
        logfile: PathBuf,

        /// Skip repetitions already present in the log instead of truncating it
        #[arg(long)]
        resume: bool,

        /// Replay each row after writing it and abort on mismatch (default)
        #[arg(long, overrides_with = "novalidate")]
        validate: bool,

        /// Do not replay rows after writing them
        #[arg(long, overrides_with = "validate")]
        novalidate: bool,

        /// Seed for the random policy
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Steps taken by the random policy
        #[arg(long = "max_steps", default_value_t = 10)]
        max_steps: usize,

        /// Also write a JSON summary of the session to this path
        #[arg(long = "results_json")]
        results_json: Option<PathBuf>,
    },

    /// Replay result rows and print a pass/fail line for each
    Validate {
        #[command(flatten)]
        backend: BackendArgs,

        /// Result log to validate, or `-` for stdin
        #[arg(default_value = "-")]
        input: String,

        /// Require every benchmark to belong to this dataset
        #[arg(long, env = "EVALKIT_DATASET", value_parser = PossibleValuesParser::new(DATASETS))]
        dataset: Option<String>,
    },
}

#[derive(Args)]
struct BackendArgs {
    /// Environment used to run and replay benchmarks
    #[arg(long, env = "EVALKIT_ENV", default_value = "codesize-sim-ic-v0",
          value_parser = PossibleValuesParser::new(ENVIRONMENTS))]
    env: String,

    /// Maximum allowed difference between recorded and replayed rewards
    #[arg(long, default_value_t = REWARD_TOLERANCE, value_parser = parse_tolerance)]
    tolerance: f64,
}

fn parse_tolerance(s: &str) -> std::result::Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("tolerance must be a non-negative number, got {s}"))
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Keep stderr quiet unless asked; stdout carries the results
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    evalkit_core::init_tracing(cli.json, level);

    let result = match cli.command {
        Commands::Eval {
            backend,
            dataset,
            policy,
            n,
            max_benchmarks,
            logfile,
            resume,
            validate,
            novalidate,
            seed,
            max_steps,
            results_json,
        } => {
            let config = EvalConfig::new(logfile)
                .with_repetitions(usize::try_from(n)?)
                .with_max_benchmarks(usize::try_from(max_benchmarks)?)
                .with_resume(resume)
                .with_validation(validate || !novalidate)
                .with_tolerance(backend.tolerance);
            cmd_eval(
                &backend.env,
                &dataset,
                &policy,
                seed,
                max_steps,
                &config,
                results_json.as_deref(),
            )
            .await
        }
        Commands::Validate {
            backend,
            input,
            dataset,
        } => cmd_validate(&backend, &input, dataset.as_deref()).await,
    };

    METRICS.flush();
    result
}

/// Run the evaluation driver.
async fn cmd_eval(
    env: &str,
    dataset: &str,
    policy: &str,
    seed: u64,
    max_steps: usize,
    config: &EvalConfig,
    results_json: Option<&Path>,
) -> Result<ExitCode> {
    let backend = make_backend(env)?;
    let benchmarks = make_dataset(dataset)?;
    let mut policy_impl = make_policy(policy, seed, max_steps)?;

    let summary = evaluate(policy_impl.as_mut(), &backend, benchmarks.as_ref(), config)
        .await
        .with_context(|| format!("Evaluation of {} on {} failed", policy, dataset))?;

    println!(
        "Evaluated {} on {} benchmarks: {} runs executed, {} resumed",
        policy,
        summary.benchmarks_visited,
        summary.runs_executed(),
        summary.runs_resumed
    );
    if let Some(reward) = summary.mean_reward() {
        println!("Mean reward: {:.4}", reward);
    }
    println!("Results log: {}", summary.logfile.display());

    if let Some(path) = results_json {
        let artifact = EvalResultsArtifact::from_summary(&summary, env, dataset, policy)?;
        write_eval_results_json(path, &artifact)?;
        info!(path = %path.display(), "results artifact written");
        println!("Results JSON: {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}

/// Replay every record of `input` and report per-record outcomes.
async fn cmd_validate(
    backend_args: &BackendArgs,
    input: &str,
    dataset: Option<&str>,
) -> Result<ExitCode> {
    let backend = make_backend(&backend_args.env)?;
    let membership = dataset.map(make_dataset).transpose()?;
    let content = read_input(input).with_context(|| format!("Failed to read {}", input))?;

    let mut validator = Validator::new(&backend).with_tolerance(backend_args.tolerance);
    if let Some(dataset) = membership.as_deref() {
        validator = validator.with_dataset(dataset);
    }

    let mut stdout = std::io::stdout();
    match validator.validate_input(&content, &mut stdout).await {
        Ok(report) => {
            println!("{}", report.summary_line());
            Ok(if report.success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Err(e @ (ValidateError::Parse(_) | ValidateError::NoInputs)) => {
            eprintln!("{}", e);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}
