use crate::aws::{FacetRetriever, RetrievalError, RetryPolicy, S3BucketStore};
use crate::config::RunConfig;
use crate::model::BucketConfig;
use crate::terraform;
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;

/// Handles the 'export' command - reconstructs Terraform code for every
/// bucket in the account
pub struct ExportCommand;

impl ExportCommand {
    /// Execute the export command
    pub fn execute(
        ctx: &crate::context::Context,
        output_path: Option<&str>,
        region: Option<&str>,
        concurrency: Option<usize>,
        config_path: Option<&str>,
    ) -> Result<()> {
        ctx.output.section("Export S3 Buckets to Terraform");

        let mut run_config = RunConfig::load(&*ctx.fs, config_path)?;
        run_config.apply_overrides(region, output_path, concurrency);

        let runtime =
            tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
        runtime.block_on(async {
            let store = S3BucketStore::connect(run_config.region.as_deref()).await;
            let retry = RetryPolicy {
                max_attempts: run_config.retry_attempts(),
                ..RetryPolicy::default()
            };
            let retriever = FacetRetriever::with_retry_policy(Arc::new(store), retry);
            Self::run(ctx, &retriever, &run_config).await
        })
    }

    async fn run(
        ctx: &crate::context::Context,
        retriever: &FacetRetriever,
        run_config: &RunConfig,
    ) -> Result<()> {
        let buckets = retriever
            .list_buckets()
            .await
            .context("Failed to list S3 buckets")?;

        ctx.output
            .info(&format!("Found {} bucket(s)", buckets.len()));
        ctx.output.blank();

        let (configs, failures) =
            Self::collect(retriever, buckets, run_config.concurrency()).await;

        for config in &configs {
            ctx.output
                .key_value(&config.name, &format!("Region: {}", config.region));
        }
        for failure in &failures {
            ctx.output.warning(&format!("Skipped: {}", failure));
        }

        let code = configs
            .iter()
            .map(terraform::render)
            .collect::<Vec<_>>()
            .join("\n");

        let output_file = run_config.output_file();
        ctx.fs
            .write(Path::new(output_file), &code)
            .with_context(|| format!("Failed to write {}", output_file))?;

        ctx.output.blank();
        ctx.output.success(&format!(
            "Terraform code for {} bucket(s) written to {}",
            configs.len(),
            output_file
        ));

        if !failures.is_empty() {
            anyhow::bail!("{} bucket(s) could not be exported", failures.len());
        }
        Ok(())
    }

    /// Fan out over the buckets with bounded parallelism and fan the
    /// results back in, sorted by bucket name so output order never
    /// depends on completion order. One bucket's failure never affects
    /// the others.
    async fn collect(
        retriever: &FacetRetriever,
        buckets: Vec<String>,
        concurrency: usize,
    ) -> (Vec<BucketConfig>, Vec<RetrievalError>) {
        let results: Vec<Result<BucketConfig, RetrievalError>> = stream::iter(buckets)
            .map(|bucket| async move { retriever.fetch(&bucket).await })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut configs = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(config) => configs.push(config),
                Err(err) => failures.push(err),
            }
        }
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        failures.sort_by(|a, b| a.bucket().cmp(&b.bucket()));
        (configs, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::MockBucketStore;
    use crate::context::Context as AppContext;
    use crate::traits::{MockFileSystem, MockOutput};
    use serde_json::json;
    use std::path::Path;

    #[tokio::test]
    async fn test_collect_sorts_results_by_bucket_name() {
        let store = MockBucketStore::new(vec!["zeta", "alpha", "mid"]);
        let retriever = FacetRetriever::new(Arc::new(store));

        let (configs, failures) = ExportCommand::collect(
            &retriever,
            vec!["zeta".to_string(), "alpha".to_string(), "mid".to_string()],
            8,
        )
        .await;

        assert!(failures.is_empty());
        let names: Vec<&str> = configs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_one_failing_bucket_does_not_corrupt_the_others() {
        let mut store = MockBucketStore::new(vec!["good", "bad"]);
        store.denied_bucket = Some("bad".to_string());
        store.policy = Some(json!({"Version": "2012-10-17"}));
        let retriever = FacetRetriever::new(Arc::new(store));

        let (configs, failures) = ExportCommand::collect(
            &retriever,
            vec!["good".to_string(), "bad".to_string()],
            2,
        )
        .await;

        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].name, "good");
        assert!(configs[0].policy.is_some());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].bucket(), Some("bad"));
    }

    #[tokio::test]
    async fn test_collect_with_zero_concurrency_still_progresses() {
        let store = MockBucketStore::new(vec!["only"]);
        let retriever = FacetRetriever::new(Arc::new(store));

        let (configs, failures) =
            ExportCommand::collect(&retriever, vec!["only".to_string()], 0).await;

        assert_eq!(configs.len(), 1);
        assert!(failures.is_empty());
    }

    #[tokio::test]
    async fn test_run_writes_terraform_for_every_bucket() {
        let store = MockBucketStore::new(vec!["one", "two"]);
        let retriever = FacetRetriever::new(Arc::new(store));

        let fs = Arc::new(MockFileSystem::new());
        let ctx = AppContext::test_with(fs.clone(), Arc::new(MockOutput::new()));

        ExportCommand::run(&ctx, &retriever, &RunConfig::default())
            .await
            .unwrap();

        let written = fs
            .get_file_contents(Path::new(crate::config::DEFAULT_OUTPUT_FILE))
            .unwrap();
        assert!(written.contains("resource \"aws_s3_bucket\" \"one\""));
        assert!(written.contains("resource \"aws_s3_bucket\" \"two\""));
        assert!(written.contains("output \"one_details\""));
    }

    #[tokio::test]
    async fn test_run_fails_but_still_writes_when_a_bucket_is_denied() {
        let mut store = MockBucketStore::new(vec!["good", "bad"]);
        store.denied_bucket = Some("bad".to_string());
        let retriever = FacetRetriever::new(Arc::new(store));

        let fs = Arc::new(MockFileSystem::new());
        let output = Arc::new(MockOutput::new());
        let ctx = AppContext::test_with(fs.clone(), output.clone());

        let result = ExportCommand::run(&ctx, &retriever, &RunConfig::default()).await;

        assert!(result.is_err());
        assert!(output.contains("Skipped"));
        let written = fs
            .get_file_contents(Path::new(crate::config::DEFAULT_OUTPUT_FILE))
            .unwrap();
        assert!(written.contains("resource \"aws_s3_bucket\" \"good\""));
        assert!(!written.contains("\"bad\""));
    }
}
