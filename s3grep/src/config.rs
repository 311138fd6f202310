use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{SearchError, SearchResult};
use crate::search::matcher::Query;
use crate::search::partition::default_worker_count;

/// Configuration for one search invocation.
///
/// # Configuration Locations
///
/// Values are layered in order of increasing precedence:
/// 1. Global `$CONFIG_DIR/s3grep/config.yaml`
/// 2. Local `.s3grep.yaml` in the current directory
/// 3. A file given with `--config` (must exist)
/// 4. Command-line flags, applied with [`SearchConfig::merge_with_cli`]
///
/// # Configuration Format
///
/// ```yaml
/// # Default bucket and key prefix
/// bucket: "my-logs"
/// prefix: "app/2024/"
///
/// # ASCII case-insensitive matching
/// ignore_case: false
///
/// # Concurrent workers (default: CPU cores - 1, at least 1)
/// worker_count: 4
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
///
/// store:
///   region: "eu-west-1"
///   profile: "readonly"
///   endpoint_url: "http://localhost:9000"
///   force_path_style: true
///   # Serve buckets from <local_dir>/<bucket> instead of S3
///   local_dir: "/srv/mirror"
/// ```
///
/// The query itself only ever comes from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Bucket to search
    #[serde(default)]
    pub bucket: String,

    /// Only objects whose key starts with this are searched; empty means all
    #[serde(default)]
    pub prefix: String,

    /// Literal text to search for
    #[serde(skip)]
    pub query: String,

    /// Compare ASCII letters case-insensitively
    #[serde(default)]
    pub ignore_case: bool,

    /// Number of concurrent workers.
    /// Defaults to CPU cores minus one if not specified
    #[serde(default)]
    pub worker_count: Option<NonZeroUsize>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Object store connection settings
    #[serde(default)]
    pub store: StoreConfig,
}

/// Where and how objects are read from.
///
/// Anything left unset falls back to the ambient AWS environment
/// (`AWS_REGION`, `AWS_PROFILE`, shared config files, instance metadata).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub profile: Option<String>,

    /// Custom endpoint for S3-compatible stores
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Address buckets as `<endpoint>/<bucket>` rather than `<bucket>.<endpoint>`
    #[serde(default)]
    pub force_path_style: bool,

    /// Read buckets from this local directory instead of S3
    #[serde(default)]
    pub local_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: String::new(),
            query: String::new(),
            ignore_case: false,
            worker_count: None,
            log_level: default_log_level(),
            store: StoreConfig::default(),
        }
    }
}

impl SearchConfig {
    /// Loads configuration from the default locations, plus `config_path` when given
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            dirs::config_dir().map(|p| p.join("s3grep/config.yaml")),
            Some(PathBuf::from(".s3grep.yaml")),
        ];
        for path in defaults.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli_config: SearchConfig) -> Self {
        // CLI values take precedence over config file values
        if !cli_config.bucket.is_empty() {
            self.bucket = cli_config.bucket;
        }
        if !cli_config.prefix.is_empty() {
            self.prefix = cli_config.prefix;
        }
        self.query = cli_config.query;
        if cli_config.ignore_case {
            self.ignore_case = true;
        }
        if cli_config.worker_count.is_some() {
            self.worker_count = cli_config.worker_count;
        }
        if cli_config.log_level != default_log_level() {
            self.log_level = cli_config.log_level;
        }

        let store = cli_config.store;
        if store.region.is_some() {
            self.store.region = store.region;
        }
        if store.profile.is_some() {
            self.store.profile = store.profile;
        }
        if store.endpoint_url.is_some() {
            self.store.endpoint_url = store.endpoint_url;
        }
        if store.force_path_style {
            self.store.force_path_style = true;
        }
        if store.local_dir.is_some() {
            self.store.local_dir = store.local_dir;
        }
        self
    }

    /// Checks the settings a search cannot start without
    pub fn validate(&self) -> SearchResult<()> {
        if self.bucket.is_empty() {
            return Err(SearchError::config_error("a bucket is required (--bucket)"));
        }
        if self.query.is_empty() {
            return Err(SearchError::config_error("query must not be empty"));
        }
        Ok(())
    }

    /// Workers to launch: the configured count, or CPU cores minus one
    pub fn workers(&self) -> NonZeroUsize {
        self.worker_count.unwrap_or_else(default_worker_count)
    }

    /// Builds the query shared by every worker
    pub fn build_query(&self) -> SearchResult<Query> {
        Query::new(self.query.as_bytes(), self.ignore_case)
    }
}
