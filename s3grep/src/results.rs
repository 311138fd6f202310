/// Values produced by a search run.
///
/// Workers create [`MatchRecord`]s and [`FetchFailure`]s and hand them to the
/// coordinator, which is the only writer of the output sinks. A record is moved
/// into the channel, so the worker keeps no reference to it once sent:
///
/// ```rust,ignore
/// let record = MatchRecord::new(object.key(), line_number, excerpt);
/// events.send(WorkerEvent::Match(record)).await?; // ownership transferred
/// ```
///
/// [`SearchSummary`] is what the coordinator returns once every worker is done.
use std::io::{self, Write};

use crate::errors::SearchError;

/// One matching line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// Key of the object the line belongs to
    pub key: String,
    /// 1-based line number within the object
    pub line_number: usize,
    /// Bounded window of the line around the match
    pub excerpt: Vec<u8>,
}

impl MatchRecord {
    pub fn new(key: impl Into<String>, line_number: usize, excerpt: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            line_number,
            excerpt: excerpt.into(),
        }
    }

    /// Writes `s3://<bucket>/<key> <line>:<excerpt>` and a newline.
    ///
    /// The excerpt bytes are written as-is, without any re-encoding.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W, bucket: &str) -> io::Result<()> {
        write!(out, "s3://{}/{} {}:", bucket, self.key, self.line_number)?;
        out.write_all(&self.excerpt)?;
        out.write_all(b"\n")
    }
}

/// An object that could not be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub key: String,
    pub message: String,
}

impl FetchFailure {
    pub fn new(key: impl Into<String>, error: &SearchError) -> Self {
        let message = match error {
            SearchError::FetchError { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self {
            key: key.into(),
            message,
        }
    }

    /// Writes `<error>:<key>` and a newline
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}:{}", self.message, self.key)
    }
}

/// Totals for a finished search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSummary {
    /// Objects returned by listing
    pub objects_listed: usize,
    /// Workers launched (one per chunk)
    pub workers: usize,
    /// Objects fetched and scanned, including empty ones
    pub objects_scanned: usize,
    /// Objects skipped because their body was empty
    pub empty_objects: usize,
    /// Objects whose fetch failed
    pub fetch_failures: usize,
    /// Matching lines printed
    pub total_matches: usize,
    /// Bytes downloaded and scanned
    pub bytes_scanned: u64,
}

impl SearchSummary {
    pub fn new() -> Self {
        Default::default()
    }

    /// Every listed object was either scanned or reported as a failure
    pub fn is_complete(&self) -> bool {
        self.objects_scanned + self.fetch_failures == self.objects_listed
    }
}
