//! Per-bucket configuration aggregate
//!
//! One `BucketConfig` describes everything the export needs to know about
//! a single bucket: its identity plus nine optionally-present
//! configuration facets. Every optional field is either a fully-populated
//! value or `None`, where `None` means the facet is not configured on the
//! bucket. A retrieval failure never materializes as `None`; it aborts
//! the aggregate for that bucket instead.

use serde_json::Value;
use std::collections::BTreeMap;

/// The merged, facet-complete description of one bucket.
///
/// Built once by the facet retriever, handed by reference to the
/// Terraform renderer, discarded after rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketConfig {
    /// Bucket name; also the basis of the Terraform resource label
    pub name: String,
    /// Resolved region; an empty location constraint normalizes to the
    /// default region before the aggregate is built
    pub region: String,
    /// Parsed access-policy document
    pub policy: Option<Value>,
    /// Lifecycle rules in provider order
    pub lifecycle_rules: Option<Vec<Value>>,
    /// Bucket tags; ordered map so rendering is deterministic
    pub tags: Option<BTreeMap<String, String>>,
    /// CORS rules in provider order
    pub cors_rules: Option<Vec<Value>>,
    /// Server access logging target
    pub logging: Option<LoggingConfig>,
    /// Transfer acceleration status
    pub acceleration: Option<AccelerateStatus>,
    /// Versioning status; never set for buckets that never had
    /// versioning enabled
    pub versioning: Option<VersioningStatus>,
    /// Server-side encryption configuration document
    pub encryption: Option<Value>,
    /// Event notification configuration document
    pub notifications: Option<Value>,
}

impl BucketConfig {
    /// Create an aggregate with every optional facet absent
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            policy: None,
            lifecycle_rules: None,
            tags: None,
            cors_rules: None,
            logging: None,
            acceleration: None,
            versioning: None,
            encryption: None,
            notifications: None,
        }
    }

    pub fn with_policy(mut self, policy: Value) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_lifecycle_rules(mut self, rules: Vec<Value>) -> Self {
        self.lifecycle_rules = Some(rules);
        self
    }

    pub fn with_tags<K, V>(mut self, tags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.tags = Some(
            tags.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn with_cors_rules(mut self, rules: Vec<Value>) -> Self {
        self.cors_rules = Some(rules);
        self
    }

    pub fn with_logging(mut self, target_bucket: impl Into<String>, target_prefix: impl Into<String>) -> Self {
        self.logging = Some(LoggingConfig {
            target_bucket: target_bucket.into(),
            target_prefix: target_prefix.into(),
        });
        self
    }

    pub fn with_acceleration(mut self, status: AccelerateStatus) -> Self {
        self.acceleration = Some(status);
        self
    }

    pub fn with_versioning(mut self, status: VersioningStatus) -> Self {
        self.versioning = Some(status);
        self
    }

    pub fn with_encryption(mut self, encryption: Value) -> Self {
        self.encryption = Some(encryption);
        self
    }

    pub fn with_notifications(mut self, notifications: Value) -> Self {
        self.notifications = Some(notifications);
        self
    }
}

/// Server access logging target of a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub target_bucket: String,
    pub target_prefix: String,
}

/// Transfer acceleration status as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelerateStatus {
    Enabled,
    Suspended,
}

impl AccelerateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "Enabled",
            Self::Suspended => "Suspended",
        }
    }
}

/// Versioning status as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersioningStatus {
    Enabled,
    Suspended,
}

impl VersioningStatus {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_aggregate_has_all_facets_absent() {
        let config = BucketConfig::new("my-bucket", "us-west-2");

        assert_eq!(config.name, "my-bucket");
        assert_eq!(config.region, "us-west-2");
        assert!(config.policy.is_none());
        assert!(config.lifecycle_rules.is_none());
        assert!(config.tags.is_none());
        assert!(config.cors_rules.is_none());
        assert!(config.logging.is_none());
        assert!(config.acceleration.is_none());
        assert!(config.versioning.is_none());
        assert!(config.encryption.is_none());
        assert!(config.notifications.is_none());
    }

    #[test]
    fn test_tags_deduplicate_and_sort_by_key() {
        let config = BucketConfig::new("b", "us-east-1").with_tags([
            ("team", "x"),
            ("env", "prod"),
            ("env", "staging"),
        ]);

        let tags = config.tags.unwrap();
        let keys: Vec<&str> = tags.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["env", "team"]);
        // Later duplicates win, matching provider tag-set semantics
        assert_eq!(tags["env"], "staging");
    }

    #[test]
    fn test_builder_populates_facets() {
        let config = BucketConfig::new("b", "us-east-1")
            .with_policy(json!({"Version": "2012-10-17"}))
            .with_logging("log-bucket", "logs/")
            .with_versioning(VersioningStatus::Suspended);

        assert!(config.policy.is_some());
        assert_eq!(config.logging.unwrap().target_bucket, "log-bucket");
        assert!(!config.versioning.unwrap().is_enabled());
    }
}
