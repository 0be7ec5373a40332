//! Append-only result log writer.
//!
//! Every row is flushed as soon as it is written, so a reader observing the
//! file mid-run (or after a crash) always sees a valid prefix of the run.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::record::{EvaluationRecord, LOG_HEADER};

/// Single-writer handle on a result log.
pub struct LogWriter {
    inner: csv::Writer<File>,
    rows_written: usize,
}

impl LogWriter {
    /// Create (or truncate) the log and write the header row.
    pub fn create(path: &Path) -> Result<Self> {
        ensure_parent_dir(path)?;
        let file = File::create(path)?;
        let mut writer = Self::from_file(file);
        writer.inner.write_record(LOG_HEADER)?;
        writer.inner.flush()?;
        debug!(logfile = %path.display(), "created result log");
        Ok(writer)
    }

    /// Open an existing log for appending. No header is written.
    pub fn append(path: &Path) -> Result<Self> {
        ensure_parent_dir(path)?;
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;
        terminate_last_line(&mut file)?;
        debug!(logfile = %path.display(), "appending to result log");
        Ok(Self::from_file(file))
    }

    fn from_file(file: File) -> Self {
        let inner = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);
        Self {
            inner,
            rows_written: 0,
        }
    }

    /// Append one record and flush it to disk.
    pub fn write(&mut self, record: &EvaluationRecord) -> Result<()> {
        self.inner.serialize(record)?;
        self.inner.flush()?;
        self.rows_written += 1;
        Ok(())
    }

    /// Rows appended through this handle (excludes the header).
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

// A hand-edited log may lack its final newline; appending must not glue the
// next row onto it.
fn terminate_last_line(file: &mut File) -> Result<()> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
        file.flush()?;
    }
    Ok(())
}
