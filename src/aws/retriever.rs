//! Facet retrieval and per-bucket aggregation
//!
//! The retriever asks the store for every facet of a bucket
//! concurrently, retries throttled queries with exponential backoff, and
//! merges the answers into one `BucketConfig`. Any facet failure aborts
//! the aggregate for that bucket and surfaces as a `RetrievalError`
//! naming the bucket and the facet.

use crate::aws::error::{FacetError, RetrievalError};
use crate::aws::store::BucketStore;
use crate::model::BucketConfig;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Region assumed when the provider reports no location constraint
pub const DEFAULT_REGION: &str = "us-east-1";

/// Bounded exponential backoff for throttled facet queries
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per query, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::DEFAULT_RETRY_ATTEMPTS,
            base_delay: Duration::from_millis(200),
        }
    }
}

pub struct FacetRetriever {
    store: Arc<dyn BucketStore>,
    retry: RetryPolicy,
}

impl FacetRetriever {
    pub fn new(store: Arc<dyn BucketStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(store: Arc<dyn BucketStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// All bucket names in the account
    pub async fn list_buckets(&self) -> Result<Vec<String>, RetrievalError> {
        self.with_retry(|| self.store.list_buckets())
            .await
            .map_err(RetrievalError::Listing)
    }

    /// Resolved region of a bucket, normalizing the provider's empty
    /// location constraint to the default region
    pub async fn fetch_region(&self, bucket: &str) -> Result<String, RetrievalError> {
        let region = self.facet(bucket, "region", || self.store.bucket_region(bucket)).await?;
        Ok(match region {
            Some(region) if !region.is_empty() => region,
            _ => DEFAULT_REGION.to_string(),
        })
    }

    /// Build the full aggregate for one bucket.
    ///
    /// All ten queries run concurrently; the first failure cancels the
    /// rest and becomes the bucket's error.
    pub async fn fetch(&self, bucket: &str) -> Result<BucketConfig, RetrievalError> {
        let (
            region,
            policy,
            lifecycle_rules,
            tags,
            cors_rules,
            logging,
            acceleration,
            versioning,
            encryption,
            notifications,
        ) = tokio::try_join!(
            self.fetch_region(bucket),
            self.facet(bucket, "policy", || self.store.bucket_policy(bucket)),
            self.facet(bucket, "lifecycle", || self.store.lifecycle_rules(bucket)),
            self.facet(bucket, "tags", || self.store.bucket_tags(bucket)),
            self.facet(bucket, "cors", || self.store.cors_rules(bucket)),
            self.facet(bucket, "logging", || self.store.bucket_logging(bucket)),
            self.facet(bucket, "acceleration", || {
                self.store.acceleration_status(bucket)
            }),
            self.facet(bucket, "versioning", || {
                self.store.versioning_status(bucket)
            }),
            self.facet(bucket, "encryption", || self.store.bucket_encryption(bucket)),
            self.facet(bucket, "notifications", || {
                self.store.bucket_notifications(bucket)
            }),
        )?;

        let mut config = BucketConfig::new(bucket, region);
        config.policy = policy;
        config.lifecycle_rules = lifecycle_rules;
        config.tags = tags.map(|tags| tags.into_iter().collect());
        config.cors_rules = cors_rules;
        config.logging = logging;
        config.acceleration = acceleration;
        config.versioning = versioning;
        config.encryption = encryption;
        config.notifications = notifications;
        Ok(config)
    }

    async fn facet<T, F, Fut>(
        &self,
        bucket: &str,
        facet: &'static str,
        query: F,
    ) -> Result<T, RetrievalError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, FacetError>>,
    {
        self.with_retry(query)
            .await
            .map_err(|source| RetrievalError::Facet {
                bucket: bucket.to_string(),
                facet,
                source,
            })
    }

    async fn with_retry<T, F, Fut>(&self, query: F) -> Result<T, FacetError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, FacetError>>,
    {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        let mut delay = self.retry.base_delay;

        loop {
            match query().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::store::MockBucketStore;
    use crate::model::VersioningStatus;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_facets_stay_absent() {
        let store = Arc::new(MockBucketStore::new(vec!["empty-bucket"]));
        let retriever = FacetRetriever::new(store);

        let config = retriever.fetch("empty-bucket").await.unwrap();

        assert_eq!(config.name, "empty-bucket");
        assert!(config.policy.is_none());
        assert!(config.tags.is_none());
        assert!(config.versioning.is_none());
        assert!(config.notifications.is_none());
    }

    #[tokio::test]
    async fn test_empty_location_constraint_resolves_to_default_region() {
        let mut store = MockBucketStore::new(vec!["b"]);
        store.region = Some(String::new());
        let retriever = FacetRetriever::new(Arc::new(store));

        let config = retriever.fetch("b").await.unwrap();
        assert_eq!(config.region, DEFAULT_REGION);
    }

    #[tokio::test]
    async fn test_fetch_merges_present_facets() {
        let mut store = MockBucketStore::new(vec!["b"]);
        store.region = Some("eu-central-1".to_string());
        store.policy = Some(json!({"Version": "2012-10-17"}));
        store.tags = Some(vec![
            ("team".to_string(), "data".to_string()),
            ("env".to_string(), "prod".to_string()),
        ]);
        store.versioning = Some(VersioningStatus::Enabled);
        let retriever = FacetRetriever::new(Arc::new(store));

        let config = retriever.fetch("b").await.unwrap();

        assert_eq!(config.region, "eu-central-1");
        assert_eq!(config.policy, Some(json!({"Version": "2012-10-17"})));
        let tags = config.tags.unwrap();
        assert_eq!(
            tags.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["env", "team"]
        );
        assert_eq!(config.versioning, Some(VersioningStatus::Enabled));
    }

    #[tokio::test]
    async fn test_throttled_facet_recovers_within_retry_budget() {
        let mut store = MockBucketStore::new(vec!["b"]);
        store.policy = Some(json!({"Version": "2012-10-17"}));
        store.policy_throttles.store(2, Ordering::SeqCst);
        let store = Arc::new(store);
        let retriever = FacetRetriever::with_retry_policy(store.clone(), fast_retry(3));

        let config = retriever.fetch("b").await.unwrap();

        assert!(config.policy.is_some());
        assert_eq!(store.policy_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_throttling_beyond_budget_surfaces_as_facet_error() {
        let mut store = MockBucketStore::new(vec!["b"]);
        store.policy_throttles.store(10, Ordering::SeqCst);
        let retriever = FacetRetriever::with_retry_policy(Arc::new(store), fast_retry(2));

        let err = retriever.fetch("b").await.unwrap_err();

        match err {
            RetrievalError::Facet { bucket, facet, source } => {
                assert_eq!(bucket, "b");
                assert_eq!(facet, "policy");
                assert!(source.is_retryable());
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_denied_bucket_fails_without_masquerading_as_absent() {
        let mut store = MockBucketStore::new(vec!["b"]);
        store.denied_bucket = Some("b".to_string());
        let retriever = FacetRetriever::new(Arc::new(store));

        let err = retriever.fetch("b").await.unwrap_err();
        assert_eq!(err.bucket(), Some("b"));
        assert!(err.to_string().contains("AccessDenied"));
    }
}
