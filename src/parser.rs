//! Transcript Reader
//!
//! Streams [`UsageRecord`]s out of a line-oriented transcript. Each physical line is
//! read as raw bytes and handed to [`parse_line`]; blank lines, lines that are not a
//! JSON object of the expected shape (including invalid UTF-8) and lines without a
//! usage block are skipped and only show up in [`ReadStats`]. Only genuine I/O
//! failures are reported as errors.
//!
//! A [`TranscriptReader`] is restartable: every call to [`TranscriptReader::records`]
//! reopens the file and starts from the first line.

use crate::models::{TranscriptLine, UsageRecord};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Trait for consumers driven by [`TranscriptReader::process`]
pub trait RecordProcessor {
    type Output;

    fn process_record(&mut self, record: UsageRecord) -> Result<()>;
    fn finalize(self) -> Result<Self::Output>;
}

/// Why a line did not produce a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Blank,
    Malformed,
    NoUsage,
}

/// Line accounting for one pass over a transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub lines: usize,
    pub records: usize,
    pub blank: usize,
    pub malformed: usize,
    pub without_usage: usize,
}

impl ReadStats {
    fn skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Blank => self.blank += 1,
            SkipReason::Malformed => self.malformed += 1,
            SkipReason::NoUsage => self.without_usage += 1,
        }
    }
}

/// Parse one physical line into a record.
pub fn parse_line(line: &[u8], line_number: usize) -> Result<UsageRecord, SkipReason> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Err(SkipReason::Blank);
    }

    let parsed: TranscriptLine =
        serde_json::from_slice(line).map_err(|_| SkipReason::Malformed)?;

    parsed.into_record(line_number).ok_or(SkipReason::NoUsage)
}

/// Lazy record sequence over any buffered reader.
pub struct Records<R> {
    reader: R,
    buf: Vec<u8>,
    line_number: usize,
    stats: ReadStats,
    done: bool,
}

impl<R: BufRead> Records<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(8 * 1024),
            line_number: 0,
            stats: ReadStats::default(),
            done: false,
        }
    }

    /// Counts for the lines consumed so far.
    pub fn stats(&self) -> ReadStats {
        self.stats
    }
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = Result<UsageRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            let read = match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(read) => read,
                Err(e) => {
                    self.done = true;
                    return Some(Err(anyhow::Error::new(e).context(format!(
                        "Failed to read transcript at line {}",
                        self.line_number + 1
                    ))));
                }
            };
            if read == 0 {
                self.done = true;
                debug!(
                    lines = self.stats.lines,
                    records = self.stats.records,
                    blank = self.stats.blank,
                    malformed = self.stats.malformed,
                    without_usage = self.stats.without_usage,
                    "Finished reading transcript"
                );
                break;
            }

            self.line_number += 1;
            self.stats.lines += 1;

            match parse_line(&self.buf, self.line_number) {
                Ok(record) => {
                    self.stats.records += 1;
                    return Some(Ok(record));
                }
                Err(reason) => {
                    trace!(line = self.line_number, ?reason, "Skipping line");
                    self.stats.skip(reason);
                }
            }
        }
        None
    }
}

/// Restartable reader bound to a transcript path.
#[derive(Debug, Clone)]
pub struct TranscriptReader {
    path: PathBuf,
}

impl TranscriptReader {
    /// Bind to `path`, failing if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start a fresh pass from the first line.
    pub fn records(&self) -> Result<Records<BufReader<File>>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open transcript: {}", self.path.display()))?;
        Ok(Records::from_reader(BufReader::new(file)))
    }

    /// Feed every record of a fresh pass to `processor`.
    pub fn process<P: RecordProcessor>(&self, mut processor: P) -> Result<P::Output> {
        for record in self.records()? {
            processor.process_record(record?)?;
        }
        processor.finalize()
    }
}

// Processor that collects all records into a Vec
pub struct CollectorProcessor {
    records: Vec<UsageRecord>,
}

impl Default for CollectorProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectorProcessor {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl RecordProcessor for CollectorProcessor {
    type Output = Vec<UsageRecord>;

    fn process_record(&mut self, record: UsageRecord) -> Result<()> {
        self.records.push(record);
        Ok(())
    }

    fn finalize(self) -> Result<Self::Output> {
        Ok(self.records)
    }
}
