use std::io::Write;
use std::sync::Arc;
use tracing::debug;

use super::coordinator::SearchCoordinator;
use crate::config::SearchConfig;
use crate::errors::SearchResult;
use crate::results::SearchSummary;
use crate::store::ObjectClient;

/// Runs the search described by `config` against `client`.
///
/// Matches are written to `out` and per-object fetch failures to
/// `diagnostics`. The configuration is validated first, so an empty bucket or
/// query fails before anything is listed.
pub async fn search<O, E>(
    client: Arc<dyn ObjectClient>,
    config: &SearchConfig,
    out: &mut O,
    diagnostics: &mut E,
) -> SearchResult<SearchSummary>
where
    O: Write + ?Sized,
    E: Write + ?Sized,
{
    config.validate()?;
    let query = config.build_query()?;
    let workers = config.workers();
    debug!("Using up to {} workers", workers);

    let mut coordinator =
        SearchCoordinator::new(client, config.bucket.as_str(), config.prefix.as_str(), query)
            .with_workers(workers);
    coordinator.run(out, diagnostics).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SearchError;
    use crate::store::MemoryObjectClient;
    use std::num::NonZeroUsize;

    #[tokio::test]
    async fn test_search_with_config() {
        let client = MemoryObjectClient::new();
        client.put("B", "a", "The Quick Brown Fox");

        let config = SearchConfig {
            bucket: "B".to_string(),
            query: "QUICK".to_string(),
            ignore_case: true,
            worker_count: NonZeroUsize::new(1),
            ..SearchConfig::default()
        };

        let (mut out, mut err) = (Vec::new(), Vec::new());
        let summary = search(Arc::new(client), &config, &mut out, &mut err)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "s3://B/a 1:The Quick Brown Fox\n");
        assert_eq!(summary.total_matches, 1);
    }

    #[tokio::test]
    async fn test_search_rejects_invalid_config() {
        let config = SearchConfig {
            query: "x".to_string(),
            ..SearchConfig::default()
        };
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let result = search(
            Arc::new(MemoryObjectClient::new()),
            &config,
            &mut out,
            &mut err,
        )
        .await;
        assert!(matches!(result, Err(SearchError::ConfigError(_))));
    }
}
