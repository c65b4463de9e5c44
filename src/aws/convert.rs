//! Conversion of SDK facet types into provider-schema-shaped JSON
//!
//! The renderer embeds policy, lifecycle, encryption and notification
//! facets as serialized documents, so the store converts the SDK's
//! modeled types into `serde_json::Value` trees with the PascalCase keys
//! of the S3 API. serde_json keeps object keys ordered, which makes the
//! serialized documents deterministic.

use aws_sdk_s3::operation::get_bucket_notification_configuration::GetBucketNotificationConfigurationOutput;
use aws_sdk_s3::primitives::DateTime;
use aws_sdk_s3::types::{
    CorsRule, LambdaFunctionConfiguration, LifecycleRule, LifecycleRuleAndOperator,
    LifecycleRuleFilter, NotificationConfigurationFilter, QueueConfiguration,
    ServerSideEncryptionConfiguration, Tag, TopicConfiguration,
};
use serde_json::{Map, Value};

fn string(value: impl Into<String>) -> Value {
    Value::String(value.into())
}

fn string_list(values: Vec<String>) -> Value {
    Value::Array(values.into_iter().map(Value::String).collect())
}

// Lifecycle dates are serialized as epoch seconds; the rendered rule
// document is descriptive, not fed back to the provider.
fn date(value: DateTime) -> Value {
    Value::Number(value.secs().into())
}

fn tag_json(tag: Tag) -> Value {
    let mut doc = Map::new();
    doc.insert("Key".to_string(), string(tag.key));
    doc.insert("Value".to_string(), string(tag.value));
    Value::Object(doc)
}

pub(crate) fn lifecycle_rule_json(rule: LifecycleRule) -> Value {
    let mut doc = Map::new();
    if let Some(id) = rule.id {
        doc.insert("ID".to_string(), string(id));
    }
    doc.insert("Status".to_string(), string(rule.status.as_str()));
    if let Some(filter) = rule.filter {
        doc.insert("Filter".to_string(), lifecycle_filter_json(filter));
    }
    if let Some(expiration) = rule.expiration {
        let mut exp = Map::new();
        if let Some(d) = expiration.date {
            exp.insert("Date".to_string(), date(d));
        }
        if let Some(days) = expiration.days {
            exp.insert("Days".to_string(), Value::Number(days.into()));
        }
        if let Some(marker) = expiration.expired_object_delete_marker {
            exp.insert("ExpiredObjectDeleteMarker".to_string(), Value::Bool(marker));
        }
        doc.insert("Expiration".to_string(), Value::Object(exp));
    }
    if let Some(transitions) = rule.transitions {
        let list: Vec<Value> = transitions
            .into_iter()
            .map(|t| {
                let mut tr = Map::new();
                if let Some(d) = t.date {
                    tr.insert("Date".to_string(), date(d));
                }
                if let Some(days) = t.days {
                    tr.insert("Days".to_string(), Value::Number(days.into()));
                }
                if let Some(class) = t.storage_class {
                    tr.insert("StorageClass".to_string(), string(class.as_str()));
                }
                Value::Object(tr)
            })
            .collect();
        doc.insert("Transitions".to_string(), Value::Array(list));
    }
    if let Some(expiration) = rule.noncurrent_version_expiration {
        let mut exp = Map::new();
        if let Some(days) = expiration.noncurrent_days {
            exp.insert("NoncurrentDays".to_string(), Value::Number(days.into()));
        }
        if let Some(newer) = expiration.newer_noncurrent_versions {
            exp.insert("NewerNoncurrentVersions".to_string(), Value::Number(newer.into()));
        }
        doc.insert("NoncurrentVersionExpiration".to_string(), Value::Object(exp));
    }
    if let Some(transitions) = rule.noncurrent_version_transitions {
        let list: Vec<Value> = transitions
            .into_iter()
            .map(|t| {
                let mut tr = Map::new();
                if let Some(days) = t.noncurrent_days {
                    tr.insert("NoncurrentDays".to_string(), Value::Number(days.into()));
                }
                if let Some(newer) = t.newer_noncurrent_versions {
                    tr.insert("NewerNoncurrentVersions".to_string(), Value::Number(newer.into()));
                }
                if let Some(class) = t.storage_class {
                    tr.insert("StorageClass".to_string(), string(class.as_str()));
                }
                Value::Object(tr)
            })
            .collect();
        doc.insert("NoncurrentVersionTransitions".to_string(), Value::Array(list));
    }
    if let Some(abort) = rule.abort_incomplete_multipart_upload {
        let mut ab = Map::new();
        if let Some(days) = abort.days_after_initiation {
            ab.insert("DaysAfterInitiation".to_string(), Value::Number(days.into()));
        }
        doc.insert(
            "AbortIncompleteMultipartUpload".to_string(),
            Value::Object(ab),
        );
    }
    Value::Object(doc)
}

fn lifecycle_filter_json(filter: LifecycleRuleFilter) -> Value {
    let mut doc = Map::new();
    if let Some(prefix) = filter.prefix {
        doc.insert("Prefix".to_string(), string(prefix));
    }
    if let Some(tag) = filter.tag {
        doc.insert("Tag".to_string(), tag_json(tag));
    }
    if let Some(size) = filter.object_size_greater_than {
        doc.insert("ObjectSizeGreaterThan".to_string(), Value::Number(size.into()));
    }
    if let Some(size) = filter.object_size_less_than {
        doc.insert("ObjectSizeLessThan".to_string(), Value::Number(size.into()));
    }
    if let Some(and) = filter.and {
        doc.insert("And".to_string(), lifecycle_and_json(and));
    }
    Value::Object(doc)
}

fn lifecycle_and_json(and: LifecycleRuleAndOperator) -> Value {
    let mut doc = Map::new();
    if let Some(prefix) = and.prefix {
        doc.insert("Prefix".to_string(), string(prefix));
    }
    if let Some(tags) = and.tags {
        doc.insert(
            "Tags".to_string(),
            Value::Array(tags.into_iter().map(tag_json).collect()),
        );
    }
    if let Some(size) = and.object_size_greater_than {
        doc.insert("ObjectSizeGreaterThan".to_string(), Value::Number(size.into()));
    }
    if let Some(size) = and.object_size_less_than {
        doc.insert("ObjectSizeLessThan".to_string(), Value::Number(size.into()));
    }
    Value::Object(doc)
}

pub(crate) fn cors_rule_json(rule: CorsRule) -> Value {
    let mut doc = Map::new();
    if let Some(id) = rule.id {
        doc.insert("ID".to_string(), string(id));
    }
    if let Some(headers) = rule.allowed_headers {
        doc.insert("AllowedHeaders".to_string(), string_list(headers));
    }
    doc.insert("AllowedMethods".to_string(), string_list(rule.allowed_methods));
    doc.insert("AllowedOrigins".to_string(), string_list(rule.allowed_origins));
    if let Some(headers) = rule.expose_headers {
        doc.insert("ExposeHeaders".to_string(), string_list(headers));
    }
    if let Some(age) = rule.max_age_seconds {
        doc.insert("MaxAgeSeconds".to_string(), Value::Number(age.into()));
    }
    Value::Object(doc)
}

pub(crate) fn encryption_json(config: ServerSideEncryptionConfiguration) -> Value {
    let rules: Vec<Value> = config
        .rules
        .into_iter()
        .map(|rule| {
            let mut doc = Map::new();
            if let Some(default) = rule.apply_server_side_encryption_by_default {
                let mut by_default = Map::new();
                by_default.insert(
                    "SSEAlgorithm".to_string(),
                    string(default.sse_algorithm.as_str()),
                );
                if let Some(key) = default.kms_master_key_id {
                    by_default.insert("KMSMasterKeyID".to_string(), string(key));
                }
                doc.insert(
                    "ApplyServerSideEncryptionByDefault".to_string(),
                    Value::Object(by_default),
                );
            }
            if let Some(enabled) = rule.bucket_key_enabled {
                doc.insert("BucketKeyEnabled".to_string(), Value::Bool(enabled));
            }
            Value::Object(doc)
        })
        .collect();

    let mut doc = Map::new();
    doc.insert("Rules".to_string(), Value::Array(rules));
    Value::Object(doc)
}

/// Convert the notification configuration response, returning `None`
/// when no notification target is configured. The API reports an unset
/// configuration as an empty document rather than an error.
pub(crate) fn notification_json(out: GetBucketNotificationConfigurationOutput) -> Option<Value> {
    let topics: Vec<Value> = out
        .topic_configurations
        .unwrap_or_default()
        .into_iter()
        .map(topic_json)
        .collect();
    let queues: Vec<Value> = out
        .queue_configurations
        .unwrap_or_default()
        .into_iter()
        .map(queue_json)
        .collect();
    let lambdas: Vec<Value> = out
        .lambda_function_configurations
        .unwrap_or_default()
        .into_iter()
        .map(lambda_json)
        .collect();
    let event_bridge = out.event_bridge_configuration.is_some();

    if topics.is_empty() && queues.is_empty() && lambdas.is_empty() && !event_bridge {
        return None;
    }

    let mut doc = Map::new();
    if !topics.is_empty() {
        doc.insert("TopicConfigurations".to_string(), Value::Array(topics));
    }
    if !queues.is_empty() {
        doc.insert("QueueConfigurations".to_string(), Value::Array(queues));
    }
    if !lambdas.is_empty() {
        doc.insert(
            "LambdaFunctionConfigurations".to_string(),
            Value::Array(lambdas),
        );
    }
    if event_bridge {
        doc.insert(
            "EventBridgeConfiguration".to_string(),
            Value::Object(Map::new()),
        );
    }
    Some(Value::Object(doc))
}

fn topic_json(config: TopicConfiguration) -> Value {
    let mut doc = Map::new();
    if let Some(id) = config.id {
        doc.insert("Id".to_string(), string(id));
    }
    doc.insert("TopicArn".to_string(), string(config.topic_arn));
    doc.insert("Events".to_string(), events_json(config.events));
    if let Some(filter) = config.filter {
        doc.insert("Filter".to_string(), filter_json(filter));
    }
    Value::Object(doc)
}

fn queue_json(config: QueueConfiguration) -> Value {
    let mut doc = Map::new();
    if let Some(id) = config.id {
        doc.insert("Id".to_string(), string(id));
    }
    doc.insert("QueueArn".to_string(), string(config.queue_arn));
    doc.insert("Events".to_string(), events_json(config.events));
    if let Some(filter) = config.filter {
        doc.insert("Filter".to_string(), filter_json(filter));
    }
    Value::Object(doc)
}

fn lambda_json(config: LambdaFunctionConfiguration) -> Value {
    let mut doc = Map::new();
    if let Some(id) = config.id {
        doc.insert("Id".to_string(), string(id));
    }
    doc.insert(
        "LambdaFunctionArn".to_string(),
        string(config.lambda_function_arn),
    );
    doc.insert("Events".to_string(), events_json(config.events));
    if let Some(filter) = config.filter {
        doc.insert("Filter".to_string(), filter_json(filter));
    }
    Value::Object(doc)
}

fn events_json(events: Vec<aws_sdk_s3::types::Event>) -> Value {
    Value::Array(
        events
            .into_iter()
            .map(|event| string(event.as_str()))
            .collect(),
    )
}

fn filter_json(filter: NotificationConfigurationFilter) -> Value {
    let mut doc = Map::new();
    if let Some(key) = filter.key {
        let rules: Vec<Value> = key
            .filter_rules
            .unwrap_or_default()
            .into_iter()
            .map(|rule| {
                let mut r = Map::new();
                if let Some(name) = rule.name {
                    r.insert("Name".to_string(), string(name.as_str()));
                }
                if let Some(value) = rule.value {
                    r.insert("Value".to_string(), string(value));
                }
                Value::Object(r)
            })
            .collect();
        let mut key_doc = Map::new();
        key_doc.insert("FilterRules".to_string(), Value::Array(rules));
        doc.insert("Key".to_string(), Value::Object(key_doc));
    }
    Value::Object(doc)
}
