use anyhow::{Context, Result};
use std::path::Path;
#[cfg(test)]
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, RwLock},
};

/// Trait for filesystem operations to enable testing with mocks
pub trait FileSystem: Send + Sync {
    /// Read file contents as string
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Write string contents to file
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Check if path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a file
    fn is_file(&self, path: &Path) -> bool;
}

/// Real filesystem implementation using std::fs
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create parent directory: {:?}", parent))?;
            }
        }

        std::fs::write(path, contents).with_context(|| format!("Failed to write file: {:?}", path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Mock filesystem implementation for testing (in-memory)
#[cfg(test)]
pub struct MockFileSystem {
    files: Arc<RwLock<HashMap<PathBuf, String>>>,
}

#[cfg(test)]
impl MockFileSystem {
    /// Create new empty mock filesystem
    pub fn new() -> Self {
        Self {
            files: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Pre-populate a file before the code under test runs
    pub fn add_file(&self, path: &Path, contents: &str) {
        self.files
            .write()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_string());
    }

    /// Get captured file contents for testing assertions
    pub fn get_file_contents(&self, path: &Path) -> Option<String> {
        self.files.read().unwrap().get(path).cloned()
    }

    /// Check if file was written
    pub fn has_file(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
    }
}

#[cfg(test)]
impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Failed to read file: {:?}", path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.files
            .write()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.exists(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_filesystem_roundtrip() {
        let fs = MockFileSystem::new();
        let path = Path::new("out/s3_buckets.tf");

        assert!(!fs.exists(path));
        fs.write(path, "resource {}").unwrap();
        assert!(fs.is_file(path));
        assert_eq!(fs.read_to_string(path).unwrap(), "resource {}");
    }

    #[test]
    fn test_mock_filesystem_missing_file() {
        let fs = MockFileSystem::new();
        assert!(fs.read_to_string(Path::new("absent.yaml")).is_err());
    }

    #[test]
    fn test_real_filesystem_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/s3_buckets.tf");

        let fs = RealFileSystem;
        fs.write(&path, "resource \"aws_s3_bucket\" \"b\" {}\n").unwrap();

        assert!(fs.is_file(&path));
        assert!(fs.read_to_string(&path).unwrap().contains("aws_s3_bucket"));
    }
}
