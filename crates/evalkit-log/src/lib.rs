//! Evalkit result log
//!
//! The persistence layer shared by the evaluation driver and the result
//! validator:
//! - `EvaluationRecord`: one row of the CSV result log
//! - `LogWriter`: append-only writer that flushes every row
//! - `ResumeState`: per-benchmark repetition counts rescanned from a log

pub mod error;
pub mod record;
pub mod resume;
pub mod writer;

pub use error::{LogError, Result};
pub use record::{
    parse_records, read_log, BenchmarkUri, EvaluationRecord, BENCHMARK_SCHEME, LOG_HEADER,
    REQUIRED_COLUMNS,
};
pub use resume::ResumeState;
pub use writer::LogWriter;
