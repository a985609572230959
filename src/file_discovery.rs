//! File discovery
//!
//! Expands CLI path arguments into the list of documents to validate:
//! files are taken as-is, directories are walked asynchronously with an
//! extension filter and optional include/exclude glob patterns. Discovered
//! paths are sorted so the batch input order (and with it every report) is
//! stable across runs.

use globset::{GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{InfraError, Result};

#[derive(Debug, Clone)]
pub struct FileDiscovery {
    extensions: Vec<String>,
    include_set: Option<GlobSet>,
    exclude_set: Option<GlobSet>,
}

impl FileDiscovery {
    pub fn new() -> Self {
        FileDiscovery {
            extensions: vec!["xml".to_string()],
            include_set: None,
            exclude_set: None,
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_include_patterns(mut self, patterns: Vec<String>) -> Result<Self> {
        self.include_set = build_glob_set(patterns)?;
        Ok(self)
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Result<Self> {
        self.exclude_set = build_glob_set(patterns)?;
        Ok(self)
    }

    /// Discover documents under `path` (file or directory). Directory
    /// results come back sorted.
    pub async fn discover_files(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let metadata = fs::metadata(path).await?;

        if metadata.is_file() {
            // Explicitly named files bypass the extension filter but still
            // honor excludes.
            if self.excluded(path) {
                return Ok(Vec::new());
            }
            return Ok(vec![path.to_path_buf()]);
        }

        let mut files = Vec::new();
        let mut pending = vec![path.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut read_dir = fs::read_dir(&dir).await?;
            while let Some(entry) = read_dir.next_entry().await? {
                let entry_path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(entry_path);
                } else if file_type.is_file() && self.should_process(&entry_path) {
                    files.push(entry_path);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn should_process(&self, path: &Path) -> bool {
        let extension_matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);
        if !extension_matches {
            return false;
        }
        if let Some(include) = &self.include_set {
            if !include.is_match(path) {
                return false;
            }
        }
        !self.excluded(path)
    }

    fn excluded(&self, path: &Path) -> bool {
        self.exclude_set
            .as_ref()
            .is_some_and(|set| set.is_match(path))
    }
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

fn build_glob_set(patterns: Vec<String>) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = globset::GlobBuilder::new(&pattern)
            .literal_separator(false)
            .build()
            .map_err(|e| InfraError::InvalidPattern {
                details: format!("'{pattern}': {e}"),
            })?;
        builder.add(glob);
    }
    let set = builder.build().map_err(|e| InfraError::InvalidPattern {
        details: e.to_string(),
    })?;
    Ok(Some(set))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "<root/>").unwrap();
        path
    }

    #[tokio::test]
    async fn test_discovers_matching_extensions_sorted() {
        let dir = tempfile::TempDir::new().unwrap();
        touch(dir.path(), "b.xml");
        touch(dir.path(), "a.xml");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "nested/c.xml");

        let discovery = FileDiscovery::new();
        let files = discovery.discover_files(dir.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["a.xml", "b.xml", "nested/c.xml"]);
    }

    #[tokio::test]
    async fn test_single_file_bypasses_extension_filter() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = touch(dir.path(), "data.cmdi");
        let discovery = FileDiscovery::new();
        let files = discovery.discover_files(&file).await.unwrap();
        assert_eq!(files, vec![file]);
    }

    #[tokio::test]
    async fn test_exclude_patterns() {
        let dir = tempfile::TempDir::new().unwrap();
        touch(dir.path(), "keep.xml");
        touch(dir.path(), "skip_me.xml");

        let discovery = FileDiscovery::new()
            .with_exclude_patterns(vec!["*skip_*".to_string()])
            .unwrap();
        let files = discovery.discover_files(dir.path()).await.unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("keep.xml"));
    }

    #[tokio::test]
    async fn test_custom_extensions() {
        let dir = tempfile::TempDir::new().unwrap();
        touch(dir.path(), "a.cmdi");
        touch(dir.path(), "b.xml");

        let discovery = FileDiscovery::new().with_extensions(vec!["cmdi".to_string()]);
        let files = discovery.discover_files(dir.path()).await.unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.cmdi"));
    }

    #[tokio::test]
    async fn test_missing_path_is_error() {
        let discovery = FileDiscovery::new();
        assert!(
            discovery
                .discover_files(Path::new("/nonexistent/dir"))
                .await
                .is_err()
        );
    }
}
