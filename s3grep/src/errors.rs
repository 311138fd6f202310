/// Error types for s3grep.
///
/// Errors fall into two groups:
///
/// 1. **Fatal** errors stop an invocation before any worker is started:
///    a bad configuration ([`SearchError::ConfigError`], [`SearchError::ConfigFile`])
///    or a failed enumeration of the bucket ([`SearchError::ListError`]).
///
/// 2. **Per-object** errors ([`SearchError::FetchError`], [`SearchError::MissingKey`])
///    are reported next to the key they belong to and never abort the run:
///    ```rust,ignore
///    match client.fetch(bucket, &object).await {
///        Ok(body) => scan(&body),
///        Err(e) => report(format!("{}:{}", e, object.key())),
///    }
///    ```
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] config::ConfigError),
    #[error("Failed to list s3://{bucket}/{prefix}: {message}")]
    ListError {
        bucket: String,
        prefix: String,
        message: String,
    },
    #[error("Failed to fetch {key}: {message}")]
    FetchError { key: String, message: String },
    #[error("Object has no key")]
    MissingKey,
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SearchError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn list_error(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ListError {
            bucket: bucket.into(),
            prefix: prefix.into(),
            message: message.into(),
        }
    }

    pub fn fetch_error(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchError {
            key: key.into(),
            message: message.into(),
        }
    }
}
