//! Resume state derived from an existing result log.
//!
//! The log is the only source of truth: nothing besides the rows themselves
//! is persisted, and the state is recomputed by a linear scan at startup.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::error::{LogError, Result};
use crate::record::{parse_records, BenchmarkUri, EvaluationRecord, LOG_HEADER};

/// Repetitions already present in a log, per benchmark.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeState {
    completed: HashMap<BenchmarkUri, usize>,
    rows: usize,
}

impl ResumeState {
    /// Count occurrences of each benchmark in log order.
    pub fn from_records(records: &[EvaluationRecord]) -> Self {
        let mut completed: HashMap<BenchmarkUri, usize> = HashMap::new();
        for record in records {
            *completed.entry(record.benchmark.clone()).or_default() += 1;
        }
        Self {
            completed,
            rows: records.len(),
        }
    }

    /// Scan the log at `path`.
    ///
    /// Returns `None` when the file is missing or holds nothing but
    /// whitespace; such a log must be started over with a fresh header.
    /// A log whose header is not exactly [`LOG_HEADER`] is rejected, since
    /// appended rows are always written in that column order.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let content = match std::fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        check_header(&content)?;
        let records = parse_records(content.as_slice())?;
        let state = Self::from_records(&records);
        debug!(
            logfile = %path.display(),
            rows = state.rows,
            benchmarks = state.completed.len(),
            "rescanned result log"
        );
        Ok(Some(state))
    }

    /// Repetitions of `benchmark` not yet claimed.
    pub fn completed(&self, benchmark: &BenchmarkUri) -> usize {
        self.completed.get(benchmark).copied().unwrap_or(0)
    }

    /// Data rows found in the log.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Claim up to `wanted` already-logged repetitions of `benchmark`.
    ///
    /// Returns how many were satisfied by the log. Claimed repetitions are
    /// consumed, so a dataset that yields the same benchmark twice is only
    /// credited once for each logged row.
    pub fn claim(&mut self, benchmark: &BenchmarkUri, wanted: usize) -> usize {
        match self.completed.get_mut(benchmark) {
            Some(available) => {
                let used = (*available).min(wanted);
                *available -= used;
                used
            }
            None => 0,
        }
    }
}

fn check_header(content: &[u8]) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(content);
    let header = reader.headers()?;
    if header.iter().eq(LOG_HEADER.iter().copied()) {
        Ok(())
    } else {
        Err(LogError::UnexpectedHeader {
            found: header.iter().collect::<Vec<_>>().join(","),
            expected: LOG_HEADER.join(","),
        })
    }
}
