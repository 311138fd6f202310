use memchr::memchr;
use memchr::memmem::{self, Finder};

use crate::errors::{SearchError, SearchResult};

/// Lines up to this many bytes are printed whole; longer lines are cut down to
/// a window around the match.
pub const MAX_EXCERPT_LENGTH: usize = 120;

/// Returns whether `pattern` occurs as a contiguous byte run in `line`.
///
/// With `ignore_case` both operands are ASCII upper-cased first. There is no
/// Unicode case folding.
pub fn contains(line: &[u8], pattern: &[u8], ignore_case: bool) -> bool {
    if ignore_case {
        memmem::find(&line.to_ascii_uppercase(), &pattern.to_ascii_uppercase()).is_some()
    } else {
        memmem::find(line, pattern).is_some()
    }
}

/// Window of `line` around the first (case-sensitive) occurrence of `pattern`.
///
/// Callers gate this with [`contains`]; if `pattern` does not occur the whole
/// line is returned.
pub fn excerpt<'a>(line: &'a [u8], pattern: &[u8]) -> &'a [u8] {
    match memmem::find(line, pattern) {
        Some(idx) => excerpt_at(line, idx, pattern.len()),
        None => line,
    }
}

/// Window of `line` around a match of `pattern_len` bytes starting at `idx`.
///
/// Short lines come back verbatim. Otherwise the window spans roughly
/// [`MAX_EXCERPT_LENGTH`] bytes centred on the match, widened or narrowed so
/// that it does not start or end inside a word. All arithmetic is on bytes, so
/// a multi-byte character may be split at either end.
pub fn excerpt_at(line: &[u8], idx: usize, pattern_len: usize) -> &[u8] {
    let len = line.len();
    if len <= MAX_EXCERPT_LENGTH {
        return line;
    }
    debug_assert!(idx + pattern_len <= len);

    let pad = MAX_EXCERPT_LENGTH.saturating_sub(pattern_len) / 2;

    // Only a single leading space is skipped.
    let mut from = idx.saturating_sub(pad);
    if line[from] == b' ' {
        from += 1;
    } else if from != 0 {
        if let Some(offset) = memchr(b' ', &line[from..]) {
            from += offset + 1;
        }
    }
    // Never start after the match itself.
    let from = from.min(idx);

    let mut to = (idx + pattern_len + pad).min(len);
    if to < len {
        to = memchr(b' ', &line[to..]).map_or(len, |offset| to + offset);
    }

    &line[from..to]
}

/// The search term of one invocation.
///
/// Built once and shared read-only by every worker. For case-insensitive
/// queries the upper-cased needle is computed here rather than per line.
#[derive(Debug, Clone)]
pub struct Query {
    pattern: Vec<u8>,
    ignore_case: bool,
    finder: Finder<'static>,
}

impl Query {
    /// Creates a query; the pattern must not be empty
    pub fn new(pattern: impl Into<Vec<u8>>, ignore_case: bool) -> SearchResult<Self> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(SearchError::config_error("query must not be empty"));
        }
        let needle = if ignore_case {
            pattern.to_ascii_uppercase()
        } else {
            pattern.clone()
        };
        Ok(Self {
            finder: Finder::new(&needle).into_owned(),
            pattern,
            ignore_case,
        })
    }

    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// Byte offset of the first match in `line`, honouring the case policy
    pub fn find(&self, line: &[u8]) -> Option<usize> {
        if self.ignore_case {
            // ASCII upper-casing keeps every byte in place, so offsets carry over.
            self.finder.find(&line.to_ascii_uppercase())
        } else {
            self.finder.find(line)
        }
    }

    pub fn contains(&self, line: &[u8]) -> bool {
        self.find(line).is_some()
    }

    /// Excerpt of `line` around its first match, or `None` if it does not match
    pub fn excerpt<'a>(&self, line: &'a [u8]) -> Option<&'a [u8]> {
        self.find(line)
            .map(|idx| excerpt_at(line, idx, self.pattern.len()))
    }
}
