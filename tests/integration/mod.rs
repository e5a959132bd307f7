// Integration test utilities and common code
// WHY: Centralized utilities avoid duplication across integration tests

#![allow(dead_code)]

pub mod fixtures;

use image::GrayImage;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test fixture helper: a scan root and a separate output directory
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub root_path: PathBuf,
    pub out_path: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with temporary directories
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path().join("scans");
        let out_path = temp_dir.path().join("out");
        fs::create_dir_all(&root_path).expect("Failed to create scan root");

        Self {
            temp_dir,
            root_path,
            out_path,
        }
    }

    /// Write a page image into an image-set directory under the scan root
    pub fn create_page_image<P: AsRef<Path>>(&self, relative_path: P, page: &GrayImage) -> PathBuf {
        let file_path = self.root_path.join(relative_path);

        // Create parent directories if needed
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        page.save(&file_path).expect("Failed to write page image");
        file_path
    }

    /// Write raw bytes under the scan root, for corrupt or non-image files
    pub fn create_raw_file<P: AsRef<Path>>(&self, relative_path: P, content: &[u8]) -> PathBuf {
        let file_path = self.root_path.join(relative_path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    /// Output directory of one document
    pub fn document_dir(&self, name: &str) -> PathBuf {
        self.out_path.join(name)
    }

    /// Parsed metadata.json of one document
    pub fn read_metadata(&self, name: &str) -> serde_json::Value {
        let content = fs::read_to_string(self.document_dir(name).join("metadata.json"))
            .expect("Failed to read metadata.json");
        serde_json::from_str(&content).expect("metadata.json is not valid JSON")
    }

    /// Parsed all_metadata.json of the batch
    pub fn read_all_metadata(&self) -> serde_json::Value {
        let content = fs::read_to_string(self.out_path.join("all_metadata.json"))
            .expect("Failed to read all_metadata.json");
        serde_json::from_str(&content).expect("all_metadata.json is not valid JSON")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
