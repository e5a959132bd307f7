use anyhow::Result;
use futures::stream::{Stream, StreamExt};
use glob::glob;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::raster::{is_page_image, SourceDocument, SourceKind};

/// Configuration for source discovery behavior
#[derive(Debug, Clone)]
#[derive(Default)]
pub struct DiscoveryConfig {
    /// Whether to fail fast on first error or continue processing
    pub fail_fast: bool,
}

/// Result of source discovery validation
#[derive(Debug, Clone)]
pub struct SourceValidation {
    pub source: SourceDocument,
    pub error: Option<String>,
}

/// Discovers every source document recursively under the given root directory:
/// `*.pdf` files, and directories that directly contain scanned page images.
///
/// # Arguments
/// * `root_dir` - Root directory to search recursively
/// * `config` - Discovery configuration (fail_fast behavior)
///
/// # Returns
/// Stream of `SourceValidation` results in glob order
pub fn discover_sources(
    root_dir: impl AsRef<Path>,
    config: DiscoveryConfig,
) -> impl Stream<Item = Result<SourceValidation>> {
    let root_path = root_dir.as_ref().to_path_buf();

    futures::stream::unfold(
        DiscoveryState::new(root_path, config),
        |mut state| async move {
            state.next_source().await.map(|result| (result, state))
        }
    )
}

/// Internal state for source discovery iteration
struct DiscoveryState {
    root_dir: PathBuf,
    config: DiscoveryConfig,
    glob_iter: Option<glob::Paths>,
    /// Image-set directories already emitted
    seen_sets: HashSet<PathBuf>,
}

impl DiscoveryState {
    fn new(root_dir: PathBuf, config: DiscoveryConfig) -> Self {
        Self {
            root_dir,
            config,
            glob_iter: None,
            seen_sets: HashSet::new(),
        }
    }

    async fn next_source(&mut self) -> Option<Result<SourceValidation>> {
        if self.glob_iter.is_none() {
            let pattern = format!("{}/**/*", self.root_dir.display());
            debug!("Starting source discovery with pattern: {}", pattern);

            match glob(&pattern) {
                Ok(paths) => {
                    self.glob_iter = Some(paths);
                    info!("Source discovery initialized for root: {}", self.root_dir.display());
                }
                Err(e) => {
                    return Some(Err(anyhow::anyhow!("Failed to create glob pattern: {}", e)));
                }
            }
        }

        loop {
            let glob_iter = self.glob_iter.as_mut()?;
            match glob_iter.next() {
                Some(Ok(path)) => {
                    if let Some(source) = self.classify(&path) {
                        debug!("Found source: {}", source);
                        return Some(self.validate_source(source).await);
                    }
                }
                Some(Err(e)) => {
                    let error_msg = format!("Glob iteration error: {e}");
                    warn!("{}", error_msg);

                    if self.config.fail_fast {
                        return Some(Err(anyhow::anyhow!(error_msg)));
                    }
                }
                None => {
                    info!("Source discovery completed");
                    return None;
                }
            }
        }
    }

    /// Map a path to the document it belongs to, once per document
    fn classify(&mut self, path: &Path) -> Option<SourceDocument> {
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            return Some(SourceDocument::new(path, SourceKind::Pdf));
        }
        if is_page_image(path) {
            let dir = path.parent()?.to_path_buf();
            if self.seen_sets.insert(dir.clone()) {
                return Some(SourceDocument::new(dir, SourceKind::ImageSet));
            }
        }
        None
    }

    async fn validate_source(&self, source: SourceDocument) -> Result<SourceValidation> {
        debug!("Validating source: {}", source.path.display());

        match fs::metadata(&source.path).await {
            Ok(_) => Ok(SourceValidation { source, error: None }),
            Err(e) => {
                let error = format!("Cannot access source {}: {}", source.path.display(), e);
                warn!("{}", error);

                if self.config.fail_fast {
                    Err(anyhow::anyhow!(error))
                } else {
                    Ok(SourceValidation { source, error: Some(error) })
                }
            }
        }
    }
}

/// Collect all discovered sources into a Vec sorted by path
pub async fn collect_discovered_sources(
    root_dir: impl AsRef<Path>,
    config: DiscoveryConfig,
) -> Result<Vec<SourceValidation>> {
    let mut sources = Vec::new();
    let mut stream = Box::pin(discover_sources(root_dir, config));

    while let Some(result) = stream.next().await {
        sources.push(result?);
    }
    sources.sort_by(|a, b| a.source.path.cmp(&b.source.path));

    let valid_count = sources.iter().filter(|s| s.error.is_none()).count();
    let invalid_count = sources.len() - valid_count;

    if invalid_count > 0 {
        warn!("Found {} sources with validation issues", invalid_count);
    }

    info!("Source discovery summary: {} valid, {} invalid", valid_count, invalid_count);

    Ok(sources)
}

/// Convenience function returning only the accessible sources
/// WHY: Simplifies common use case for integration tests and external callers
pub async fn find_sources<P: AsRef<Path>>(root_dir: P) -> Result<Vec<SourceDocument>> {
    let validations = collect_discovered_sources(root_dir, DiscoveryConfig::default()).await?;

    Ok(validations
        .into_iter()
        .filter(|v| v.error.is_none())
        .map(|v| v.source)
        .collect())
}

/// Drop sources that live inside the output directory
///
/// Paths are compared after canonicalization, so a relative `out_dir` still matches sources
/// discovered under an absolute root. The output directory must already exist.
pub async fn exclude_output_dir(sources: Vec<SourceDocument>, out_dir: &Path) -> Vec<SourceDocument> {
    let out_dir = match fs::canonicalize(out_dir).await {
        Ok(path) => path,
        Err(e) => {
            warn!("Cannot resolve output directory {}: {}", out_dir.display(), e);
            return sources;
        }
    };

    let mut kept = Vec::with_capacity(sources.len());
    for source in sources {
        let inside = fs::canonicalize(&source.path)
            .await
            .is_ok_and(|path| path.starts_with(&out_dir));
        if inside {
            debug!("Ignoring output path {}", source.path.display());
        } else {
            kept.push(source);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> Result<PathBuf> {
        let file_path = dir.join(name);
        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file_path, content).await?;
        Ok(file_path)
    }

    #[tokio::test]
    async fn test_discover_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let sources = collect_discovered_sources(temp_dir.path(), DiscoveryConfig::default()).await.unwrap();
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn test_discover_pdfs_and_image_sets() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "1861-04-12.pdf", b"%PDF-1.4").await.unwrap();
        create_test_file(temp_dir.path(), "archive/1861-04-19.PDF", b"%PDF-1.4").await.unwrap();
        create_test_file(temp_dir.path(), "herald/page-001.png", b"png").await.unwrap();
        create_test_file(temp_dir.path(), "herald/page-002.png", b"png").await.unwrap();
        create_test_file(temp_dir.path(), "herald/page-003.jpg", b"jpg").await.unwrap();
        create_test_file(temp_dir.path(), "notes.txt", b"ignored").await.unwrap();

        let sources = find_sources(temp_dir.path()).await.unwrap();
        assert_eq!(sources.len(), 3);

        let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&"1861-04-12"));
        assert!(names.contains(&"1861-04-19"));
        assert!(names.contains(&"herald"));

        let herald = sources.iter().find(|s| s.name == "herald").unwrap();
        assert_eq!(herald.kind, SourceKind::ImageSet);
    }

    #[tokio::test]
    async fn test_sources_sorted_by_path() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "c.pdf", b"").await.unwrap();
        create_test_file(temp_dir.path(), "a.pdf", b"").await.unwrap();
        create_test_file(temp_dir.path(), "b/page-1.tif", b"").await.unwrap();

        let sources = find_sources(temp_dir.path()).await.unwrap();
        let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_output_dir_excluded_through_unnormalized_path() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("scans");
        create_test_file(&root, "herald/page-001.png", b"png").await.unwrap();
        create_test_file(&root, "out/herald/p01_c01.jpg", b"jpg").await.unwrap();

        let sources = find_sources(&root).await.unwrap();
        assert_eq!(sources.len(), 2);

        let out_dir = root.join("herald").join("..").join("out");
        let kept = exclude_output_dir(sources, &out_dir).await;
        let names: Vec<&str> = kept.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["herald"]);
        assert_eq!(kept[0].path, root.join("herald"));
    }

    #[tokio::test]
    async fn test_missing_output_dir_keeps_sources() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "a.pdf", b"").await.unwrap();

        let sources = find_sources(temp_dir.path()).await.unwrap();
        let kept = exclude_output_dir(sources, &temp_dir.path().join("absent")).await;
        assert_eq!(kept.len(), 1);
    }
}
