use std::fmt;
use std::io::Write;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::matcher::Query;
use super::partition::{default_worker_count, partition, Chunk};
use super::processor::ObjectProcessor;
use crate::errors::SearchResult;
use crate::metrics::SearchMetrics;
use crate::results::{FetchFailure, MatchRecord, SearchSummary};
use crate::store::ObjectClient;

/// Match records buffered between the workers and the printer before a
/// sending worker has to wait.
pub const MATCH_CHANNEL_CAPACITY: usize = 1024;

/// Lifecycle of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Listing,
    Dispatching,
    Draining,
    Done,
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchState::Listing => "listing",
            SearchState::Dispatching => "dispatching",
            SearchState::Draining => "draining",
            SearchState::Done => "done",
        };
        f.write_str(name)
    }
}

/// What a worker reports back on the match stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Match(MatchRecord),
    FetchFailed(FetchFailure),
}

/// Sends the worker's completion token when dropped, so the token goes out
/// exactly once however the worker ends, including by panic.
struct CompletionGuard {
    worker: usize,
    done: mpsc::UnboundedSender<usize>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let _ = self.done.send(self.worker);
    }
}

struct Worker {
    id: usize,
    client: Arc<dyn ObjectClient>,
    bucket: Arc<str>,
    processor: ObjectProcessor,
    events: mpsc::Sender<WorkerEvent>,
    _completion: CompletionGuard,
}

impl Worker {
    /// Fetches and scans every object of `chunk` in order
    async fn run(self, chunk: Chunk) {
        trace!("Worker {} starting with {} objects", self.id, chunk.len());
        for object in chunk {
            let event_sent = match self.client.fetch(&self.bucket, &object).await {
                Ok(body) => {
                    let mut sent = true;
                    for record in self.processor.scan(&object, &body) {
                        if self.events.send(WorkerEvent::Match(record)).await.is_err() {
                            sent = false;
                            break;
                        }
                    }
                    sent
                }
                Err(e) => {
                    let failure = FetchFailure::new(object.key(), &e);
                    debug!(
                        "Worker {}: failed to fetch {}: {}",
                        self.id, object, failure.message
                    );
                    self.processor.metrics().record_fetch_failure();
                    self.events
                        .send(WorkerEvent::FetchFailed(failure))
                        .await
                        .is_ok()
                }
            };
            if !event_sent {
                debug!("Worker {}: match stream closed, stopping", self.id);
                break;
            }
        }
        trace!("Worker {} finished", self.id);
    }
}

/// Runs one search: lists the bucket, fans the listing out to workers and
/// prints their matches as they arrive.
///
/// The output sinks are written by the coordinator only. Matches go to `out`
/// as `s3://<bucket>/<key> <line>:<excerpt>`; per-object fetch failures go to
/// `diagnostics` as `<error>:<key>`. Within one worker, records arrive in
/// object order and then line order; records of different workers interleave.
pub struct SearchCoordinator {
    client: Arc<dyn ObjectClient>,
    bucket: Arc<str>,
    prefix: String,
    query: Arc<Query>,
    worker_count: NonZeroUsize,
    state: SearchState,
}

impl SearchCoordinator {
    pub fn new(
        client: Arc<dyn ObjectClient>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        query: Query,
    ) -> Self {
        Self {
            client,
            bucket: Arc::from(bucket.into()),
            prefix: prefix.into(),
            query: Arc::new(query),
            worker_count: default_worker_count(),
            state: SearchState::Listing,
        }
    }

    /// Caps the number of concurrent workers
    pub fn with_workers(mut self, worker_count: NonZeroUsize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    fn transition(&mut self, next: SearchState) {
        debug!("Search state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Runs the search to completion.
    ///
    /// # Errors
    ///
    /// A failed listing is returned before any worker starts. Write errors on
    /// either sink also end the run. Fetch failures are not errors here; they
    /// are written to `diagnostics` and counted in the summary.
    pub async fn run<O, E>(&mut self, out: &mut O, diagnostics: &mut E) -> SearchResult<SearchSummary>
    where
        O: Write + ?Sized,
        E: Write + ?Sized,
    {
        if self.state != SearchState::Listing {
            self.transition(SearchState::Listing);
        }
        info!(
            "Searching s3://{}/{} for {:?}",
            self.bucket,
            self.prefix,
            String::from_utf8_lossy(self.query.pattern())
        );

        let objects = self.client.list(&self.bucket, &self.prefix).await?;
        debug!("Listed {} objects", objects.len());

        let mut summary = SearchSummary::new();
        summary.objects_listed = objects.len();

        self.transition(SearchState::Dispatching);
        let chunks = partition(objects, self.worker_count);
        summary.workers = chunks.len();
        debug!(
            "Dispatching {} objects to {} workers",
            summary.objects_listed, summary.workers
        );

        let metrics = SearchMetrics::new();
        let (events_tx, mut events_rx) = mpsc::channel(MATCH_CHANNEL_CAPACITY);
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let processor = ObjectProcessor::new(Arc::clone(&self.query), metrics.clone());

        let handles: Vec<JoinHandle<()>> = chunks
            .into_iter()
            .enumerate()
            .map(|(id, chunk)| {
                let worker = Worker {
                    id,
                    client: Arc::clone(&self.client),
                    bucket: Arc::clone(&self.bucket),
                    processor: processor.clone(),
                    events: events_tx.clone(),
                    _completion: CompletionGuard {
                        worker: id,
                        done: done_tx.clone(),
                    },
                };
                tokio::spawn(worker.run(chunk))
            })
            .collect();
        // Only the workers hold senders from here on.
        drop(events_tx);
        drop(done_tx);

        self.transition(SearchState::Draining);
        let mut finished = 0;
        while finished < summary.workers {
            tokio::select! {
                Some(event) = events_rx.recv() => {
                    self.emit(event, out, diagnostics, &mut summary)?;
                }
                Some(worker) = done_rx.recv() => {
                    finished += 1;
                    trace!("Worker {} done ({}/{})", worker, finished, summary.workers);
                }
                else => break,
            }
        }

        // Every worker has signalled, so nothing new can be sent; print what is buffered.
        events_rx.close();
        while let Some(event) = events_rx.recv().await {
            self.emit(event, out, diagnostics, &mut summary)?;
        }
        out.flush()?;
        diagnostics.flush()?;

        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Worker task ended abnormally: {}", e);
            }
        }

        metrics.apply_to(&mut summary);
        metrics.log_stats();
        self.transition(SearchState::Done);
        info!(
            "Search complete. Found {} matches in {} objects ({} fetch errors)",
            summary.total_matches, summary.objects_listed, summary.fetch_failures
        );

        Ok(summary)
    }

    fn emit<O, E>(
        &self,
        event: WorkerEvent,
        out: &mut O,
        diagnostics: &mut E,
        summary: &mut SearchSummary,
    ) -> SearchResult<()>
    where
        O: Write + ?Sized,
        E: Write + ?Sized,
    {
        match event {
            WorkerEvent::Match(record) => {
                record.write_to(out, &self.bucket)?;
                summary.total_matches += 1;
            }
            WorkerEvent::FetchFailed(failure) => failure.write_to(diagnostics)?,
        }
        Ok(())
    }
}
