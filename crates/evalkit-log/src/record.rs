//! Result log rows and CSV parsing.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LogError, Result};

/// URI scheme prefix carried by every benchmark identifier.
pub const BENCHMARK_SCHEME: &str = "benchmark://";

/// Header row written once at the top of every result log.
pub const LOG_HEADER: [&str; 4] = ["benchmark", "reward", "commandline", "walltime"];

/// Columns a record stream must name; `reward` and `walltime` are optional.
pub const REQUIRED_COLUMNS: [&str; 2] = ["benchmark", "commandline"];

/// Opaque benchmark identifier, e.g. `benchmark://cbench-sim-v0/dijkstra`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BenchmarkUri(String);

impl BenchmarkUri {
    pub fn new(uri: impl Into<String>) -> Self {
        BenchmarkUri(uri.into())
    }

    /// Build `benchmark://<dataset>/<name>`.
    pub fn from_parts(dataset: &str, name: &str) -> Self {
        BenchmarkUri(format!("{BENCHMARK_SCHEME}{dataset}/{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier without the scheme, as shown in validator output.
    pub fn short_name(&self) -> &str {
        self.0.strip_prefix(BENCHMARK_SCHEME).unwrap_or(&self.0)
    }

    /// Dataset component, `None` when the scheme or dataset is absent.
    pub fn dataset(&self) -> Option<&str> {
        let rest = self.0.strip_prefix(BENCHMARK_SCHEME)?;
        let dataset = rest.split('/').next()?;
        (!dataset.is_empty()).then_some(dataset)
    }

    /// Benchmark name within its dataset.
    pub fn name(&self) -> Option<&str> {
        let rest = self.0.strip_prefix(BENCHMARK_SCHEME)?;
        let (_, name) = rest.split_once('/')?;
        (!name.is_empty()).then_some(name)
    }
}

impl std::fmt::Display for BenchmarkUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BenchmarkUri {
    fn from(s: &str) -> Self {
        BenchmarkUri(s.to_string())
    }
}

impl From<String> for BenchmarkUri {
    fn from(s: String) -> Self {
        BenchmarkUri(s)
    }
}

/// One row of the result log. Immutable once appended.
///
/// Field order matches [`LOG_HEADER`]; the writer serialises rows without
/// headers and relies on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub benchmark: BenchmarkUri,

    /// Absent means the run was only smoke-tested.
    #[serde(default)]
    pub reward: Option<f64>,

    /// Replayable action trace.
    pub commandline: String,

    /// Seconds. Always written by the driver, optional when read back.
    #[serde(default)]
    pub walltime: Option<f64>,
}

impl EvaluationRecord {
    fn check(&self, line: u64) -> Result<()> {
        if let Some(walltime) = self.walltime {
            if !walltime.is_finite() || walltime < 0.0 {
                return Err(LogError::InvalidField {
                    line,
                    column: "walltime",
                    reason: format!("must be a non-negative number of seconds, got {walltime}"),
                });
            }
        }
        if self.benchmark.as_str().is_empty() {
            return Err(LogError::InvalidField {
                line,
                column: "benchmark",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Parse a complete CSV record stream.
///
/// Columns are matched by header name, in any order; extra columns are
/// ignored. An empty or whitespace-only stream yields no records. Any
/// structural problem fails the whole stream so callers never act on a
/// partial parse.
pub fn parse_records<R: Read>(input: R) -> Result<Vec<EvaluationRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::Headers)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    if headers.iter().all(str::is_empty) {
        // Whitespace-only stream
        for row in reader.records() {
            if row?.iter().any(|field| !field.trim().is_empty()) {
                return Err(LogError::MissingColumn {
                    column: REQUIRED_COLUMNS[0].to_string(),
                });
            }
        }
        return Ok(Vec::new());
    }
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(LogError::MissingColumn {
                column: column.to_string(),
            });
        }
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        let record: EvaluationRecord = row.deserialize(Some(&headers))?;
        record.check(line)?;
        records.push(record);
    }
    Ok(records)
}

/// Parse the result log at `path`.
pub fn read_log(path: &Path) -> Result<Vec<EvaluationRecord>> {
    let file = std::fs::File::open(path)?;
    parse_records(std::io::BufReader::new(file))
}
