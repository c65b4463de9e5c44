//! Provider boundary for bucket configuration queries
//!
//! `BucketStore` is the seam between the retriever and the S3 API. Each
//! facet method returns `Ok(None)` when the provider reports the
//! facet-specific "no such configuration" condition, `Ok(Some(..))` when
//! the facet exists, and `Err` for everything else. Classification
//! happens here, by error code, so a permission denial or a throttled
//! request can never masquerade as a disabled feature.

use crate::aws::convert;
use crate::aws::error::FacetError;
use crate::model::{AccelerateStatus, LoggingConfig, VersioningStatus};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::types::{BucketAccelerateStatus, BucketVersioningStatus};
use aws_sdk_s3::Client;
use serde_json::Value;

/// Async facade over the per-bucket provider queries
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// All bucket names in the account
    async fn list_buckets(&self) -> Result<Vec<String>, FacetError>;

    /// Raw location constraint; `None` or an empty string means the
    /// provider's default region
    async fn bucket_region(&self, bucket: &str) -> Result<Option<String>, FacetError>;

    /// Parsed access-policy document
    async fn bucket_policy(&self, bucket: &str) -> Result<Option<Value>, FacetError>;

    /// Lifecycle rules in provider order
    async fn lifecycle_rules(&self, bucket: &str) -> Result<Option<Vec<Value>>, FacetError>;

    /// Bucket tags as key/value pairs
    async fn bucket_tags(&self, bucket: &str)
        -> Result<Option<Vec<(String, String)>>, FacetError>;

    /// CORS rules in provider order
    async fn cors_rules(&self, bucket: &str) -> Result<Option<Vec<Value>>, FacetError>;

    /// Server access logging target
    async fn bucket_logging(&self, bucket: &str) -> Result<Option<LoggingConfig>, FacetError>;

    /// Transfer acceleration status
    async fn acceleration_status(&self, bucket: &str)
        -> Result<Option<AccelerateStatus>, FacetError>;

    /// Versioning status
    async fn versioning_status(&self, bucket: &str)
        -> Result<Option<VersioningStatus>, FacetError>;

    /// Server-side encryption configuration document
    async fn bucket_encryption(&self, bucket: &str) -> Result<Option<Value>, FacetError>;

    /// Event notification configuration document
    async fn bucket_notifications(&self, bucket: &str) -> Result<Option<Value>, FacetError>;
}

/// `BucketStore` implementation over a shared S3 client.
///
/// The client is constructed once per run and reused for every query;
/// there is no global client state.
pub struct S3BucketStore {
    client: Client,
}

impl S3BucketStore {
    /// Build the client from the default credential/region chain, with
    /// an optional region override
    pub async fn connect(region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let config = loader.load().await;
        Self {
            client: Client::new(&config),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

/// Map an SDK error into the facet taxonomy, treating the given error
/// codes as the facet's "not configured" signal.
fn absent_or_error<T, E, R>(
    err: SdkError<E, R>,
    absent_codes: &[&str],
) -> Result<Option<T>, FacetError>
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    if let Some(code) = err.code() {
        if absent_codes.contains(&code) {
            return Ok(None);
        }
    }
    Err(facet_error(err))
}

fn facet_error<E, R>(err: SdkError<E, R>) -> FacetError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().map(str::to_owned);
    let message = err.message().map(str::to_owned);
    FacetError::from_parts(code, message, DisplayErrorContext(err).to_string())
}

#[async_trait]
impl BucketStore for S3BucketStore {
    async fn list_buckets(&self) -> Result<Vec<String>, FacetError> {
        let out = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(facet_error)?;
        Ok(out
            .buckets
            .unwrap_or_default()
            .into_iter()
            .filter_map(|bucket| bucket.name)
            .collect())
    }

    async fn bucket_region(&self, bucket: &str) -> Result<Option<String>, FacetError> {
        let out = self
            .client
            .get_bucket_location()
            .bucket(bucket)
            .send()
            .await
            .map_err(facet_error)?;
        Ok(out
            .location_constraint
            .map(|constraint| constraint.as_str().to_string()))
    }

    async fn bucket_policy(&self, bucket: &str) -> Result<Option<Value>, FacetError> {
        match self.client.get_bucket_policy().bucket(bucket).send().await {
            Ok(out) => match out.policy {
                Some(raw) => {
                    let doc = serde_json::from_str(&raw)
                        .map_err(|err| FacetError::Decode(format!("policy document: {}", err)))?;
                    Ok(Some(doc))
                }
                None => Ok(None),
            },
            Err(err) => absent_or_error(err, &["NoSuchBucketPolicy"]),
        }
    }

    async fn lifecycle_rules(&self, bucket: &str) -> Result<Option<Vec<Value>>, FacetError> {
        match self
            .client
            .get_bucket_lifecycle_configuration()
            .bucket(bucket)
            .send()
            .await
        {
            Ok(out) => Ok(out.rules.map(|rules| {
                rules
                    .into_iter()
                    .map(convert::lifecycle_rule_json)
                    .collect()
            })),
            Err(err) => absent_or_error(err, &["NoSuchLifecycleConfiguration"]),
        }
    }

    async fn bucket_tags(
        &self,
        bucket: &str,
    ) -> Result<Option<Vec<(String, String)>>, FacetError> {
        match self.client.get_bucket_tagging().bucket(bucket).send().await {
            Ok(out) => {
                if out.tag_set.is_empty() {
                    return Ok(None);
                }
                Ok(Some(
                    out.tag_set
                        .into_iter()
                        .map(|tag| (tag.key, tag.value))
                        .collect(),
                ))
            }
            Err(err) => absent_or_error(err, &["NoSuchTagSet"]),
        }
    }

    async fn cors_rules(&self, bucket: &str) -> Result<Option<Vec<Value>>, FacetError> {
        match self.client.get_bucket_cors().bucket(bucket).send().await {
            Ok(out) => Ok(out
                .cors_rules
                .map(|rules| rules.into_iter().map(convert::cors_rule_json).collect())),
            Err(err) => absent_or_error(err, &["NoSuchCORSConfiguration"]),
        }
    }

    async fn bucket_logging(&self, bucket: &str) -> Result<Option<LoggingConfig>, FacetError> {
        let out = self
            .client
            .get_bucket_logging()
            .bucket(bucket)
            .send()
            .await
            .map_err(facet_error)?;
        Ok(out.logging_enabled.map(|logging| LoggingConfig {
            target_bucket: logging.target_bucket,
            target_prefix: logging.target_prefix,
        }))
    }

    async fn acceleration_status(
        &self,
        bucket: &str,
    ) -> Result<Option<AccelerateStatus>, FacetError> {
        let out = self
            .client
            .get_bucket_accelerate_configuration()
            .bucket(bucket)
            .send()
            .await
            .map_err(facet_error)?;
        Ok(match out.status {
            Some(BucketAccelerateStatus::Enabled) => Some(AccelerateStatus::Enabled),
            Some(BucketAccelerateStatus::Suspended) => Some(AccelerateStatus::Suspended),
            _ => None,
        })
    }

    async fn versioning_status(
        &self,
        bucket: &str,
    ) -> Result<Option<VersioningStatus>, FacetError> {
        let out = self
            .client
            .get_bucket_versioning()
            .bucket(bucket)
            .send()
            .await
            .map_err(facet_error)?;
        Ok(match out.status {
            Some(BucketVersioningStatus::Enabled) => Some(VersioningStatus::Enabled),
            Some(BucketVersioningStatus::Suspended) => Some(VersioningStatus::Suspended),
            _ => None,
        })
    }

    async fn bucket_encryption(&self, bucket: &str) -> Result<Option<Value>, FacetError> {
        match self
            .client
            .get_bucket_encryption()
            .bucket(bucket)
            .send()
            .await
        {
            Ok(out) => Ok(out
                .server_side_encryption_configuration
                .map(convert::encryption_json)),
            Err(err) => absent_or_error(err, &["ServerSideEncryptionConfigurationNotFoundError"]),
        }
    }

    async fn bucket_notifications(&self, bucket: &str) -> Result<Option<Value>, FacetError> {
        let out = self
            .client
            .get_bucket_notification_configuration()
            .bucket(bucket)
            .send()
            .await
            .map_err(facet_error)?;
        Ok(convert::notification_json(out))
    }
}

/// In-memory store for tests. Serves the same facet answers for every
/// bucket, with knobs for throttling and denial scenarios.
#[cfg(test)]
pub struct MockBucketStore {
    pub buckets: Vec<String>,
    pub region: Option<String>,
    pub policy: Option<Value>,
    pub lifecycle_rules: Option<Vec<Value>>,
    pub tags: Option<Vec<(String, String)>>,
    pub cors_rules: Option<Vec<Value>>,
    pub logging: Option<LoggingConfig>,
    pub acceleration: Option<AccelerateStatus>,
    pub versioning: Option<VersioningStatus>,
    pub encryption: Option<Value>,
    pub notifications: Option<Value>,
    /// Number of throttled responses the policy facet serves before
    /// answering normally
    pub policy_throttles: std::sync::atomic::AtomicU32,
    /// Count of policy queries issued, for retry assertions
    pub policy_calls: std::sync::atomic::AtomicU32,
    /// Every facet of this bucket answers with AccessDenied
    pub denied_bucket: Option<String>,
}

#[cfg(test)]
impl MockBucketStore {
    pub fn new(buckets: Vec<&str>) -> Self {
        Self {
            buckets: buckets.into_iter().map(String::from).collect(),
            region: None,
            policy: None,
            lifecycle_rules: None,
            tags: None,
            cors_rules: None,
            logging: None,
            acceleration: None,
            versioning: None,
            encryption: None,
            notifications: None,
            policy_throttles: std::sync::atomic::AtomicU32::new(0),
            policy_calls: std::sync::atomic::AtomicU32::new(0),
            denied_bucket: None,
        }
    }

    fn check_denied(&self, bucket: &str) -> Result<(), FacetError> {
        if self.denied_bucket.as_deref() == Some(bucket) {
            return Err(FacetError::Api {
                code: "AccessDenied".to_string(),
                message: "Access Denied".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[async_trait]
impl BucketStore for MockBucketStore {
    async fn list_buckets(&self) -> Result<Vec<String>, FacetError> {
        Ok(self.buckets.clone())
    }

    async fn bucket_region(&self, bucket: &str) -> Result<Option<String>, FacetError> {
        self.check_denied(bucket)?;
        Ok(self.region.clone())
    }

    async fn bucket_policy(&self, bucket: &str) -> Result<Option<Value>, FacetError> {
        use std::sync::atomic::Ordering;

        self.check_denied(bucket)?;
        self.policy_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.policy_throttles.load(Ordering::SeqCst);
        if remaining > 0 {
            self.policy_throttles.store(remaining - 1, Ordering::SeqCst);
            return Err(FacetError::Throttled {
                code: "SlowDown".to_string(),
            });
        }
        Ok(self.policy.clone())
    }

    async fn lifecycle_rules(&self, bucket: &str) -> Result<Option<Vec<Value>>, FacetError> {
        self.check_denied(bucket)?;
        Ok(self.lifecycle_rules.clone())
    }

    async fn bucket_tags(
        &self,
        bucket: &str,
    ) -> Result<Option<Vec<(String, String)>>, FacetError> {
        self.check_denied(bucket)?;
        Ok(self.tags.clone())
    }

    async fn cors_rules(&self, bucket: &str) -> Result<Option<Vec<Value>>, FacetError> {
        self.check_denied(bucket)?;
        Ok(self.cors_rules.clone())
    }

    async fn bucket_logging(&self, bucket: &str) -> Result<Option<LoggingConfig>, FacetError> {
        self.check_denied(bucket)?;
        Ok(self.logging.clone())
    }

    async fn acceleration_status(
        &self,
        bucket: &str,
    ) -> Result<Option<AccelerateStatus>, FacetError> {
        self.check_denied(bucket)?;
        Ok(self.acceleration)
    }

    async fn versioning_status(
        &self,
        bucket: &str,
    ) -> Result<Option<VersioningStatus>, FacetError> {
        self.check_denied(bucket)?;
        Ok(self.versioning)
    }

    async fn bucket_encryption(&self, bucket: &str) -> Result<Option<Value>, FacetError> {
        self.check_denied(bucket)?;
        Ok(self.encryption.clone())
    }

    async fn bucket_notifications(&self, bucket: &str) -> Result<Option<Value>, FacetError> {
        self.check_denied(bucket)?;
        Ok(self.notifications.clone())
    }
}
