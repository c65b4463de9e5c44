use crate::traits::FileSystem;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration file looked up in the working directory when no
/// explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = ".bucketform.yaml";

/// Default path of the generated Terraform file
pub const DEFAULT_OUTPUT_FILE: &str = "s3_buckets.tf";

/// Default number of buckets inspected in parallel
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default attempt budget for throttled facet queries
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Run configuration, typically loaded from .bucketform.yaml.
///
/// Every field is optional; CLI flags override file values and the
/// built-in defaults apply last.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunConfig {
    /// AWS region for the client
    pub region: Option<String>,
    /// Path of the generated Terraform file
    pub output: Option<String>,
    /// Maximum number of buckets inspected in parallel
    pub concurrency: Option<usize>,
    /// Attempt budget for throttled facet queries
    pub retry_attempts: Option<u32>,
}

impl RunConfig {
    /// Load configuration from an explicit path, or from the default
    /// file if it exists, or fall back to defaults.
    pub fn load(fs: &dyn FileSystem, path: Option<&str>) -> Result<Self> {
        let path = match path {
            Some(explicit) => Path::new(explicit).to_path_buf(),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if !fs.is_file(default) {
                    return Ok(Self::default());
                }
                default.to_path_buf()
            }
        };

        let content = fs.read_to_string(&path)?;
        let config: RunConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {:?}", path))?;

        Ok(config)
    }

    /// Apply CLI flag overrides on top of the file values
    pub fn apply_overrides(
        &mut self,
        region: Option<&str>,
        output: Option<&str>,
        concurrency: Option<usize>,
    ) {
        if let Some(region) = region {
            self.region = Some(region.to_string());
        }
        if let Some(output) = output {
            self.output = Some(output.to_string());
        }
        if let Some(concurrency) = concurrency {
            self.concurrency = Some(concurrency);
        }
    }

    /// Path of the generated Terraform file
    pub fn output_file(&self) -> &str {
        self.output.as_deref().unwrap_or(DEFAULT_OUTPUT_FILE)
    }

    /// Bucket fan-out width, never zero
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1)
    }

    /// Attempt budget for throttled facet queries, never zero
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockFileSystem;

    #[test]
    fn test_defaults_without_config_file() {
        let fs = MockFileSystem::new();
        let config = RunConfig::load(&fs, None).unwrap();

        assert_eq!(config.region, None);
        assert_eq!(config.output_file(), DEFAULT_OUTPUT_FILE);
        assert_eq!(config.concurrency(), DEFAULT_CONCURRENCY);
        assert_eq!(config.retry_attempts(), DEFAULT_RETRY_ATTEMPTS);
    }

    #[test]
    fn test_loads_default_config_file_when_present() {
        let fs = MockFileSystem::new();
        fs.add_file(
            Path::new(DEFAULT_CONFIG_FILE),
            "region: eu-west-1\noutput: infra/buckets.tf\nconcurrency: 8\n",
        );

        let config = RunConfig::load(&fs, None).unwrap();

        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.output_file(), "infra/buckets.tf");
        assert_eq!(config.concurrency(), 8);
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let fs = MockFileSystem::new();
        assert!(RunConfig::load(&fs, Some("missing.yaml")).is_err());
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let fs = MockFileSystem::new();
        fs.add_file(Path::new("broken.yaml"), "concurrency: [not a number");

        assert!(RunConfig::load(&fs, Some("broken.yaml")).is_err());
    }

    #[test]
    fn test_flags_override_file_values() {
        let fs = MockFileSystem::new();
        fs.add_file(
            Path::new(DEFAULT_CONFIG_FILE),
            "region: eu-west-1\noutput: file.tf\n",
        );

        let mut config = RunConfig::load(&fs, None).unwrap();
        config.apply_overrides(Some("us-west-2"), None, Some(2));

        assert_eq!(config.region.as_deref(), Some("us-west-2"));
        assert_eq!(config.output_file(), "file.tf");
        assert_eq!(config.concurrency(), 2);
    }

    #[test]
    fn test_concurrency_is_never_zero() {
        let config = RunConfig {
            concurrency: Some(0),
            ..Default::default()
        };
        assert_eq!(config.concurrency(), 1);
    }
}
