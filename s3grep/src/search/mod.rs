//! The parallel search pipeline.
//!
//! ```text
//!  list ─▶ partition ─▶ worker 0 ─┐  fetch + scan, in chunk order
//!                       worker 1 ─┼─▶ match stream ─▶ coordinator ─▶ out / diagnostics
//!                       worker N ─┘  completion stream ─▶ (counts to N, then drains)
//! ```
//!
//! - [`matcher`]: substring test and excerpt window for one line
//! - [`partition`]: contiguous chunking of the listing, one chunk per worker
//! - [`processor`]: line splitting and match records for one object body
//! - [`coordinator`]: worker fan-out, printing and completion detection
pub mod coordinator;
pub mod engine;
pub mod matcher;
pub mod partition;
pub mod processor;

pub use coordinator::{SearchCoordinator, SearchState, WorkerEvent};
pub use engine::search;
pub use matcher::{contains, excerpt, Query, MAX_EXCERPT_LENGTH};
pub use partition::{default_worker_count, partition, Chunk};
pub use processor::ObjectProcessor;
