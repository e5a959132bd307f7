// WHY: Output layout and metadata helpers shared by the pipeline, CLI and tests.
// A document's metadata.json is written last, so its presence marks the document complete

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

use crate::detector::BoundaryList;
use crate::extractor::ColumnGeometry;
use crate::raster::SourceDocument;

pub const METADATA_FILE: &str = "metadata.json";
pub const ALL_METADATA_FILE: &str = "all_metadata.json";

/// One written column image and where it sits on its page
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ColumnEntry {
    /// Path of the written column image
    pub path: String,
    #[serde(flatten)]
    pub geometry: ColumnGeometry,
}

/// Segmentation outcome of one page
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PageMetadata {
    /// 1-based page number
    pub page_num: u32,
    pub boundaries: BoundaryList,
    pub used_fallback: bool,
    pub columns: Vec<ColumnEntry>,
}

/// Everything downstream recognition needs to map column text back onto a document
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DocumentMetadata {
    /// Document name, the PDF file stem or image-set directory name
    pub source: String,
    pub dpi: u32,
    /// Sorted by page number
    pub pages: Vec<PageMetadata>,
}

impl DocumentMetadata {
    pub fn new(source: impl Into<String>, dpi: u32) -> Self {
        Self {
            source: source.into(),
            dpi,
            pages: Vec::new(),
        }
    }

    /// Order pages by page number; workers finish out of order
    pub fn sort_pages(&mut self) {
        self.pages.sort_by_key(|p| p.page_num);
    }

    pub fn column_count(&self) -> usize {
        self.pages.iter().map(|p| p.columns.len()).sum()
    }

    pub fn fallback_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.used_fallback).count()
    }
}

/// Output directory for one document
pub fn document_output_dir(out_dir: &Path, source: &SourceDocument) -> PathBuf {
    out_dir.join(&source.name)
}

/// Metadata file path inside a document output directory
pub fn metadata_path(doc_dir: &Path) -> PathBuf {
    doc_dir.join(METADATA_FILE)
}

/// Batch-wide metadata file path
pub fn all_metadata_path(out_dir: &Path) -> PathBuf {
    out_dir.join(ALL_METADATA_FILE)
}

/// Check if a document has already been fully segmented
/// WHY: Core utility for incremental processing - check if work is already done
pub fn metadata_exists(out_dir: &Path, source: &SourceDocument) -> bool {
    metadata_path(&document_output_dir(out_dir, source)).exists()
}

/// File name of a column image, `p{page:02}_c{col:02}.jpg`
pub fn column_file_name(page_number: u32, column_index: usize) -> String {
    format!("p{page_number:02}_c{column_index:02}.jpg")
}

/// File name of a page debug composite
pub fn debug_file_name(page_number: u32) -> String {
    format!("p{page_number:02}_debug.png")
}

/// Write document metadata, marking the document complete
///
/// Written to a temporary name first so an interrupted run never leaves a partial file
/// that would count as complete.
pub async fn write_metadata(doc_dir: &Path, metadata: &DocumentMetadata) -> io::Result<PathBuf> {
    let path = metadata_path(doc_dir);
    let tmp_path = doc_dir.join(format!("{METADATA_FILE}.partial"));
    let content = serde_json::to_string_pretty(metadata).map_err(io::Error::other)?;
    tokio::fs::write(&tmp_path, content).await?;
    tokio::fs::rename(&tmp_path, &path).await?;
    Ok(path)
}

/// Read document metadata from a document output directory
///
/// # Example
/// ```no_run
/// use gutters::incremental::read_metadata;
/// let metadata = read_metadata("out/1861-04-12").expect("Failed to read metadata");
/// println!("{} pages at {} DPI", metadata.pages.len(), metadata.dpi);
/// ```
pub fn read_metadata<P: AsRef<Path>>(doc_dir: P) -> io::Result<DocumentMetadata> {
    let content = std::fs::read_to_string(metadata_path(doc_dir.as_ref()))?;
    serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Read document metadata (async version)
pub async fn read_metadata_async<P: AsRef<Path>>(doc_dir: P) -> io::Result<DocumentMetadata> {
    let content = tokio::fs::read_to_string(metadata_path(doc_dir.as_ref())).await?;
    serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write the batch index of every completed document, sorted by document name
pub async fn write_all_metadata(out_dir: &Path, documents: &mut [DocumentMetadata]) -> io::Result<PathBuf> {
    documents.sort_by(|a, b| a.source.cmp(&b.source));
    let path = all_metadata_path(out_dir);
    let content = serde_json::to_string_pretty(documents).map_err(io::Error::other)?;
    tokio::fs::write(&path, content).await?;
    Ok(path)
}
