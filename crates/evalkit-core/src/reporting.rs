use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::driver::EvalSummary;

/// Schema version of the results artifact.
pub const RESULTS_SCHEMA_VERSION: &str = "1.0";

/// Single run in the persisted results artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunResultArtifact {
    pub benchmark: String,
    pub repetition: usize,
    pub reward: Option<f64>,
    pub commandline: String,
    pub walltime: f64,
}

/// Summary section of the results artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalSummaryArtifact {
    pub benchmarks_visited: usize,
    pub runs_executed: usize,
    pub runs_resumed: usize,
    pub total_walltime: f64,
    pub mean_reward: Option<f64>,
}

/// Machine-readable record of one evaluation session, written next to the
/// CSV log when `--results_json` is given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalResultsArtifact {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub session_id: Uuid,
    pub env: String,
    pub dataset: String,
    pub policy: String,
    pub logfile: PathBuf,
    /// SHA-256 of the complete log file after the session.
    pub log_digest: String,
    pub summary: EvalSummaryArtifact,
    pub runs: Vec<RunResultArtifact>,
}

impl EvalResultsArtifact {
    /// Build the artifact for a finished session, digesting its log file.
    pub fn from_summary(
        summary: &EvalSummary,
        env: &str,
        dataset: &str,
        policy: &str,
    ) -> Result<Self> {
        Ok(Self {
            schema_version: RESULTS_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            session_id: summary.session_id,
            env: env.to_string(),
            dataset: dataset.to_string(),
            policy: policy.to_string(),
            logfile: summary.logfile.clone(),
            log_digest: log_digest(&summary.logfile)?,
            summary: EvalSummaryArtifact {
                benchmarks_visited: summary.benchmarks_visited,
                runs_executed: summary.runs_executed(),
                runs_resumed: summary.runs_resumed,
                total_walltime: summary.total_walltime(),
                mean_reward: summary.mean_reward(),
            },
            runs: summary
                .runs
                .iter()
                .map(|run| RunResultArtifact {
                    benchmark: run.benchmark.to_string(),
                    repetition: run.repetition,
                    reward: run.reward,
                    commandline: run.commandline.clone(),
                    walltime: run.walltime,
                })
                .collect(),
        })
    }
}

/// Hex SHA-256 of the file at `path`.
pub fn log_digest(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("read {:?}", path))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Write the results artifact in pretty JSON format.
pub fn write_eval_results_json(path: &Path, artifact: &EvalResultsArtifact) -> Result<()> {
    let content = serde_json::to_string_pretty(artifact).context("serialize eval artifact")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RunOutcome;
    use evalkit_log::BenchmarkUri;
    use serde_json::json;

    fn summary(logfile: &Path) -> EvalSummary {
        EvalSummary {
            session_id: Uuid::parse_str("11111111-1111-1111-1111-111111111111")
                .expect("valid UUID"),
            logfile: logfile.to_path_buf(),
            benchmarks_visited: 2,
            runs_resumed: 1,
            runs: vec![RunOutcome {
                benchmark: BenchmarkUri::from_parts("cbench-sim-v0", "adpcm"),
                repetition: 0,
                reward: Some(12.0),
                commandline: "opt -dce input.bc -o output.bc".to_string(),
                walltime: 0.5,
            }],
        }
    }

    #[test]
    fn eval_results_schema_has_expected_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logfile = dir.path().join("results.csv");
        std::fs::write(&logfile, "benchmark,reward,commandline,walltime\n").expect("write log");

        let artifact = EvalResultsArtifact::from_summary(
            &summary(&logfile),
            "codesize-sim-ic-v0",
            "cbench-sim-v0",
            "sequential",
        )
        .expect("artifact");

        let raw = serde_json::to_value(&artifact).expect("serialize artifact");
        let obj = raw.as_object().expect("artifact object");
        for key in [
            "schema_version",
            "generated_at",
            "session_id",
            "env",
            "dataset",
            "policy",
            "logfile",
            "log_digest",
            "summary",
            "runs",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }

        assert_eq!(raw["summary"]["runs_executed"], json!(1));
        assert_eq!(raw["summary"]["runs_resumed"], json!(1));
        assert_eq!(raw["summary"]["mean_reward"], json!(12.0));
        assert_eq!(raw["runs"][0]["benchmark"], json!("benchmark://cbench-sim-v0/adpcm"));
        assert_eq!(artifact.log_digest.len(), 64);
    }

    #[test]
    fn log_digest_tracks_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        std::fs::write(&a, "benchmark,reward,commandline,walltime\n").expect("write");
        std::fs::write(&b, "benchmark,reward,commandline,walltime\n").expect("write");
        assert_eq!(log_digest(&a).expect("digest"), log_digest(&b).expect("digest"));

        std::fs::write(&b, "benchmark,commandline\n").expect("write");
        assert_ne!(log_digest(&a).expect("digest"), log_digest(&b).expect("digest"));
    }

    #[test]
    fn write_results_json_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logfile = dir.path().join("results.csv");
        std::fs::write(&logfile, "benchmark,reward,commandline,walltime\n").expect("write log");
        let artifact = EvalResultsArtifact::from_summary(&summary(&logfile), "e", "d", "p")
            .expect("artifact");

        let out = dir.path().join("eval_results.json");
        write_eval_results_json(&out, &artifact).expect("write json");
        let back: EvalResultsArtifact =
            serde_json::from_str(&std::fs::read_to_string(&out).expect("read")).expect("parse");
        assert_eq!(back, artifact);
    }

    #[test]
    fn missing_log_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(log_digest(&dir.path().join("absent.csv")).is_err());
    }
}
