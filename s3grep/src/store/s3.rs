use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{ProvideCredentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use tracing::{debug, trace};

use super::{ObjectBody, ObjectClient, ObjectRef};
use crate::config::StoreConfig;
use crate::errors::{SearchError, SearchResult};

const DEFAULT_REGION: &str = "us-east-1";

/// [`ObjectClient`] backed by the AWS SDK.
///
/// Credentials, region and endpoint are resolved from the ambient AWS
/// environment (env vars, shared config files, instance metadata), with the
/// explicit overrides from [`StoreConfig`] applied on top.
#[derive(Clone, Debug)]
pub struct S3ObjectClient {
    client: Client,
}

impl S3ObjectClient {
    /// Wraps an already configured SDK client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the ambient AWS environment and `store` overrides
    pub async fn from_config(store: &StoreConfig) -> SearchResult<Self> {
        let region = RegionProviderChain::first_try(store.region.clone().map(Region::new))
            .or_default_provider()
            .or_else(DEFAULT_REGION);

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
        if let Some(profile) = &store.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &store.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        // The default chain is always installed; only resolving it tells
        // whether any credentials exist.
        let provider = sdk_config.credentials_provider().ok_or_else(|| {
            SearchError::config_error("no AWS credentials provider is configured")
        })?;
        provider.provide_credentials().await.map_err(|e| {
            SearchError::config_error(format!(
                "AWS credentials could not be resolved: {}",
                DisplayErrorContext(&e)
            ))
        })?;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(store.force_path_style)
            .build();
        debug!(
            "S3 client ready (region: {:?}, endpoint: {:?})",
            sdk_config.region(),
            store.endpoint_url
        );
        Ok(Self::new(Client::from_conf(s3_config)))
    }
}

#[async_trait]
impl ObjectClient for S3ObjectClient {
    async fn list(&self, bucket: &str, prefix: &str) -> SearchResult<Vec<ObjectRef>> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;
        loop {
            let mut req = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
            if let Some(token) = continuation_token.take() {
                req = req.continuation_token(token);
            }
            let resp = req.send().await.map_err(|e| {
                SearchError::list_error(bucket, prefix, DisplayErrorContext(&e).to_string())
            })?;

            // Keyless entries are kept so that fetch can report them.
            objects.extend(
                resp.contents()
                    .iter()
                    .map(|obj| ObjectRef::new(obj.key().unwrap_or_default())),
            );
            trace!("Listed page, {} objects so far", objects.len());

            match resp.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(objects)
    }

    async fn fetch(&self, bucket: &str, object: &ObjectRef) -> SearchResult<ObjectBody> {
        if !object.has_key() {
            return Err(SearchError::MissingKey);
        }

        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(object.key())
            .send()
            .await
            .map_err(|e| {
                SearchError::fetch_error(object.key(), DisplayErrorContext(&e).to_string())
            })?;
        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| SearchError::fetch_error(object.key(), e.to_string()))?;

        Ok(ObjectBody::new(data.into_bytes()))
    }
}
