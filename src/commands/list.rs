use crate::aws::{FacetRetriever, RetryPolicy, S3BucketStore};
use crate::config::RunConfig;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Handles the 'list' command - shows the account's buckets and their
/// regions without generating anything
pub struct ListCommand;

impl ListCommand {
    /// Execute the list command
    pub fn execute(
        ctx: &crate::context::Context,
        region: Option<&str>,
        config_path: Option<&str>,
    ) -> Result<()> {
        ctx.output.section("Detected S3 Buckets");

        let mut run_config = RunConfig::load(&*ctx.fs, config_path)?;
        run_config.apply_overrides(region, None, None);

        let runtime =
            tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
        runtime.block_on(async {
            let store = S3BucketStore::connect(run_config.region.as_deref()).await;
            let retry = RetryPolicy {
                max_attempts: run_config.retry_attempts(),
                ..RetryPolicy::default()
            };
            let retriever = FacetRetriever::with_retry_policy(Arc::new(store), retry);
            Self::run(ctx, &retriever).await
        })
    }

    async fn run(ctx: &crate::context::Context, retriever: &FacetRetriever) -> Result<()> {
        let mut buckets = retriever
            .list_buckets()
            .await
            .context("Failed to list S3 buckets")?;
        buckets.sort();

        if buckets.is_empty() {
            ctx.output.info("No buckets found in this account");
            return Ok(());
        }

        for bucket in &buckets {
            match retriever.fetch_region(bucket).await {
                Ok(bucket_region) => {
                    ctx.output
                        .key_value(bucket, &format!("Region: {}", bucket_region));
                }
                Err(err) => {
                    ctx.output.warning(&format!("{}", err));
                }
            }
        }

        ctx.output.blank();
        ctx.output
            .info(&format!("{} bucket(s) total", buckets.len()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::MockBucketStore;
    use crate::context::Context as AppContext;
    use crate::traits::{MockFileSystem, MockOutput};

    #[tokio::test]
    async fn test_run_reports_each_bucket_with_its_region() {
        let mut store = MockBucketStore::new(vec!["beta", "alpha"]);
        store.region = Some("eu-west-1".to_string());
        let retriever = FacetRetriever::new(Arc::new(store));

        let output = Arc::new(MockOutput::new());
        let ctx = AppContext::test_with(Arc::new(MockFileSystem::new()), output.clone());

        ListCommand::run(&ctx, &retriever).await.unwrap();

        assert!(output.contains("alpha"));
        assert!(output.contains("beta"));
        assert!(output.contains("eu-west-1"));
        assert!(output.contains("2 bucket(s) total"));
    }

    #[tokio::test]
    async fn test_run_handles_an_empty_account() {
        let store = MockBucketStore::new(vec![]);
        let retriever = FacetRetriever::new(Arc::new(store));

        let output = Arc::new(MockOutput::new());
        let ctx = AppContext::test_with(Arc::new(MockFileSystem::new()), output.clone());

        ListCommand::run(&ctx, &retriever).await.unwrap();

        assert!(output.contains("No buckets found"));
    }
}
