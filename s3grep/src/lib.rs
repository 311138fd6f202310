pub mod config;
pub mod errors;
pub mod metrics;
pub mod results;
pub mod search;
pub mod store;

pub use config::{SearchConfig, StoreConfig};
pub use errors::{SearchError, SearchResult};
pub use results::{FetchFailure, MatchRecord, SearchSummary};
pub use search::{search, Query, SearchCoordinator};
pub use store::{connect, ObjectClient, ObjectRef};
