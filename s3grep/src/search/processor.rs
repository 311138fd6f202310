use std::sync::Arc;
use tracing::trace;

use super::matcher::Query;
use crate::metrics::SearchMetrics;
use crate::results::MatchRecord;
use crate::store::{ObjectBody, ObjectRef};

/// Scans downloaded object bodies for the query
#[derive(Debug, Clone)]
pub struct ObjectProcessor {
    query: Arc<Query>,
    metrics: SearchMetrics,
}

impl ObjectProcessor {
    /// Creates a new ObjectProcessor for the given query
    pub fn new(query: Arc<Query>, metrics: SearchMetrics) -> Self {
        Self { query, metrics }
    }

    /// Gets the shared metrics
    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }

    /// Yields one record per matching line of `body`, in line order.
    ///
    /// Lines are split on `\n` only, so a trailing `\r` stays part of the line
    /// and a body ending in `\n` has a final empty line that is numbered like
    /// any other. Empty bodies yield nothing.
    pub fn scan<'a>(
        &'a self,
        object: &'a ObjectRef,
        body: &'a ObjectBody,
    ) -> impl Iterator<Item = MatchRecord> + 'a {
        trace!("Scanning {} ({} bytes)", object, body.len());
        self.metrics.record_object(body.len() as u64);

        let lines = (!body.is_empty())
            .then(|| body.as_bytes().split(|&b| b == b'\n'))
            .into_iter()
            .flatten();

        lines.enumerate().filter_map(move |(index, line)| {
            let excerpt = self.query.excerpt(line)?;
            self.metrics.record_match();
            Some(MatchRecord::new(object.key(), index + 1, excerpt))
        })
    }
}
