//! Terraform rendering of a bucket aggregate
//!
//! `render` is pure: one aggregate in, one self-contained Terraform text
//! block out. It never does I/O and never fails at runtime; a malformed
//! aggregate is a programming error and trips an assertion instead of
//! producing corrupt code.

use crate::model::BucketConfig;
use crate::terraform::hcl::{Block, Expr};
use serde_json::Value;

/// Derive the Terraform resource label for a bucket name.
///
/// Labels must start with a letter or underscore and may only contain
/// letters, digits, and underscores. The label is derived once and
/// reused for the bucket resource and every cross-reference.
pub fn resource_label(name: &str) -> String {
    let mut label = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            label.push(c);
        } else {
            label.push('_');
        }
    }
    match label.chars().next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => label,
        _ => format!("_{}", label),
    }
}

/// Render the Terraform text for one bucket.
///
/// Emits, in fixed order: the bucket resource, then a policy resource,
/// a lifecycle-configuration resource, and a notification resource
/// (each only when its facet is present), then the details output
/// block. Absent facets contribute zero bytes.
pub fn render(config: &BucketConfig) -> String {
    assert!(
        !config.name.is_empty(),
        "bucket aggregate is missing its name"
    );

    let label = resource_label(&config.name);
    let bucket_ref = format!("aws_s3_bucket.{}.id", label);
    let mut blocks = Vec::new();

    blocks.push(bucket_resource(config, &label));

    if let Some(policy) = &config.policy {
        blocks.push(
            Block::new("resource")
                .label("aws_s3_bucket_policy")
                .label(format!("{}_policy", label))
                .attr("bucket", Expr::raw(&bucket_ref))
                .attr(
                    "policy",
                    Expr::Heredoc {
                        tag: "POLICY",
                        body: json_pretty(policy),
                    },
                ),
        );
    }

    if let Some(rules) = &config.lifecycle_rules {
        blocks.push(
            Block::new("resource")
                .label("aws_s3_bucket_lifecycle_configuration")
                .label(format!("{}_lifecycle", label))
                .attr("bucket", Expr::raw(&bucket_ref))
                .attr(
                    "rule",
                    Expr::Heredoc {
                        tag: "LIFECYCLE",
                        body: json_pretty(&Value::Array(rules.clone())),
                    },
                ),
        );
    }

    if let Some(notifications) = &config.notifications {
        blocks.push(
            Block::new("resource")
                .label("aws_s3_bucket_notification")
                .label(format!("{}_notifications", label))
                .attr("bucket", Expr::raw(&bucket_ref))
                .attr(
                    "notification_configuration",
                    Expr::Heredoc {
                        tag: "NOTIFICATIONS",
                        body: json_pretty(notifications),
                    },
                ),
        );
    }

    blocks.push(
        Block::new("output")
            .label(format!("{}_details", label))
            .attr(
                "value",
                Expr::Call {
                    name: "jsonencode",
                    arg: Box::new(Expr::Map(vec![
                        ("bucket_name".to_string(), Expr::str(&config.name)),
                        ("region".to_string(), Expr::str(&config.region)),
                    ])),
                },
            ),
    );

    blocks
        .iter()
        .map(Block::render)
        .collect::<Vec<_>>()
        .join("\n")
}

fn bucket_resource(config: &BucketConfig, label: &str) -> Block {
    let mut block = Block::new("resource")
        .label("aws_s3_bucket")
        .label(label)
        .attr("bucket", Expr::str(&config.name));

    if let Some(tags) = &config.tags {
        // BTreeMap iteration is key-ordered, so tag order is stable
        block = block.attr(
            "tags",
            Expr::Map(
                tags.iter()
                    .map(|(k, v)| (k.clone(), Expr::str(v)))
                    .collect(),
            ),
        );
    }

    if let Some(rules) = &config.cors_rules {
        for rule in rules {
            block = block.block(cors_rule_block(rule));
        }
    }

    if let Some(logging) = &config.logging {
        block = block.block(
            Block::new("logging")
                .attr("target_bucket", Expr::str(&logging.target_bucket))
                .attr("target_prefix", Expr::str(&logging.target_prefix)),
        );
    }

    if let Some(acceleration) = &config.acceleration {
        block = block.attr("acceleration_status", Expr::str(acceleration.as_str()));
    }

    if let Some(versioning) = &config.versioning {
        block = block.block(
            Block::new("versioning").attr("enabled", Expr::Bool(versioning.is_enabled())),
        );
    }

    if let Some(encryption) = &config.encryption {
        block = block.attr(
            "server_side_encryption_configuration",
            Expr::Heredoc {
                tag: "ENCRYPTION",
                body: json_pretty(encryption),
            },
        );
    }

    block
}

/// Turn one CORS rule document into an inline `cors_rule` block
fn cors_rule_block(rule: &Value) -> Block {
    let mut block = Block::new("cors_rule");
    if let Some(id) = rule.get("ID").and_then(Value::as_str) {
        block = block.attr("id", Expr::str(id));
    }
    for (key, attr) in [
        ("AllowedHeaders", "allowed_headers"),
        ("AllowedMethods", "allowed_methods"),
        ("AllowedOrigins", "allowed_origins"),
        ("ExposeHeaders", "expose_headers"),
    ] {
        if let Some(values) = rule.get(key).and_then(Value::as_array) {
            block = block.attr(attr, string_list(values));
        }
    }
    if let Some(max_age) = rule.get("MaxAgeSeconds").and_then(Value::as_i64) {
        block = block.attr("max_age_seconds", Expr::Num(max_age));
    }
    block
}

fn string_list(values: &[Value]) -> Expr {
    Expr::List(
        values
            .iter()
            .filter_map(Value::as_str)
            .map(Expr::str)
            .collect(),
    )
}

/// Stable JSON encoding for heredoc bodies. Object keys are emitted in
/// sorted order, so re-rendering the same aggregate is byte-identical.
fn json_pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).expect("JSON value serialization cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccelerateStatus, VersioningStatus};
    use serde_json::json;

    #[test]
    fn test_minimal_aggregate_renders_one_resource_and_one_output() {
        let config = BucketConfig::new("my-bucket", "us-west-2");
        let rendered = render(&config);

        assert_eq!(rendered.matches("resource ").count(), 1);
        assert_eq!(rendered.matches("output ").count(), 1);
        assert!(rendered.contains("resource \"aws_s3_bucket\" \"my_bucket\""));
        assert!(rendered.contains("bucket = \"my-bucket\""));
        assert!(!rendered.contains("aws_s3_bucket_policy"));
        assert!(!rendered.contains("aws_s3_bucket_lifecycle_configuration"));
        assert!(!rendered.contains("aws_s3_bucket_notification"));
        // No empty conditional blocks either
        assert!(!rendered.contains("{}"));
    }

    #[test]
    fn test_output_block_exposes_bucket_name_and_region() {
        let config = BucketConfig::new("my-bucket", "us-west-2");
        let rendered = render(&config);

        assert!(rendered.contains("output \"my_bucket_details\""));
        assert!(rendered.contains("value = jsonencode({"));
        assert!(rendered.contains("bucket_name = \"my-bucket\""));
        assert!(rendered.contains("region = \"us-west-2\""));
    }

    #[test]
    fn test_render_is_deterministic() {
        let config = BucketConfig::new("b", "us-east-1")
            .with_tags([("team", "x"), ("env", "prod")])
            .with_policy(json!({"Version": "2012-10-17", "Statement": []}));

        assert_eq!(render(&config), render(&config));
    }

    #[test]
    fn test_policy_resource_references_the_bucket_label() {
        let config = BucketConfig::new("my-bucket", "us-east-1")
            .with_policy(json!({"Version": "2012-10-17"}));
        let rendered = render(&config);

        assert!(rendered.contains("resource \"aws_s3_bucket_policy\" \"my_bucket_policy\""));
        assert!(rendered.contains("bucket = aws_s3_bucket.my_bucket.id"));
        assert!(rendered.contains("policy = <<POLICY\n"));
        assert!(rendered.contains("\"Version\": \"2012-10-17\""));
    }

    #[test]
    fn test_lifecycle_and_notification_resources_share_the_label() {
        let config = BucketConfig::new("data-lake", "eu-west-1")
            .with_lifecycle_rules(vec![json!({"ID": "expire", "Status": "Enabled"})])
            .with_notifications(json!({"TopicConfigurations": []}));
        let rendered = render(&config);

        assert!(rendered
            .contains("resource \"aws_s3_bucket_lifecycle_configuration\" \"data_lake_lifecycle\""));
        assert!(rendered.contains("resource \"aws_s3_bucket_notification\" \"data_lake_notifications\""));
        assert_eq!(
            rendered.matches("bucket = aws_s3_bucket.data_lake.id").count(),
            2
        );
        assert!(rendered.contains("rule = <<LIFECYCLE\n"));
        assert!(rendered.contains("notification_configuration = <<NOTIFICATIONS\n"));
    }

    #[test]
    fn test_tags_render_exactly_once_in_key_order() {
        let config =
            BucketConfig::new("b", "us-east-1").with_tags([("team", "x"), ("env", "prod")]);
        let rendered = render(&config);

        let env = rendered.find("env = \"prod\"").unwrap();
        let team = rendered.find("team = \"x\"").unwrap();
        assert!(env < team);
        assert_eq!(rendered.matches("env = ").count(), 1);
        assert_eq!(rendered.matches("team = ").count(), 1);
    }

    #[test]
    fn test_cors_rules_become_inline_blocks() {
        let config = BucketConfig::new("b", "us-east-1").with_cors_rules(vec![json!({
            "AllowedMethods": ["GET", "PUT"],
            "AllowedOrigins": ["https://example.com"],
            "MaxAgeSeconds": 3000
        })]);
        let rendered = render(&config);

        assert!(rendered.contains("cors_rule {\n"));
        assert!(rendered.contains("allowed_methods = [\"GET\", \"PUT\"]"));
        assert!(rendered.contains("allowed_origins = [\"https://example.com\"]"));
        assert!(rendered.contains("max_age_seconds = 3000"));
    }

    #[test]
    fn test_inline_facets_render_inside_the_bucket_resource() {
        let config = BucketConfig::new("b", "us-east-1")
            .with_logging("log-bucket", "logs/")
            .with_acceleration(AccelerateStatus::Enabled)
            .with_versioning(VersioningStatus::Suspended)
            .with_encryption(json!({"Rules": []}));
        let rendered = render(&config);

        assert!(rendered.contains("logging {\n"));
        assert!(rendered.contains("target_bucket = \"log-bucket\""));
        assert!(rendered.contains("target_prefix = \"logs/\""));
        assert!(rendered.contains("acceleration_status = \"Enabled\""));
        assert!(rendered.contains("versioning {\n"));
        assert!(rendered.contains("enabled = false"));
        assert!(rendered.contains("server_side_encryption_configuration = <<ENCRYPTION\n"));
    }

    #[test]
    fn test_resource_label_sanitizes_bucket_names() {
        assert_eq!(resource_label("my-bucket"), "my_bucket");
        assert_eq!(resource_label("my.bucket.2"), "my_bucket_2");
        assert_eq!(resource_label("2024-logs"), "_2024_logs");
        assert_eq!(resource_label("plain"), "plain");
    }

    #[test]
    fn test_interpolated_strings_are_escaped() {
        let config = BucketConfig::new("b", "us-east-1").with_logging("log-bucket", "${weird}/");
        let rendered = render(&config);

        assert!(rendered.contains("target_prefix = \"$${weird}/\""));
    }

    #[test]
    #[should_panic(expected = "missing its name")]
    fn test_unnamed_aggregate_is_a_contract_violation() {
        render(&BucketConfig::new("", "us-east-1"));
    }
}
