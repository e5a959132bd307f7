use super::{check_page_number, RasterPage, Rasterizer, SourceDocument};
use crate::error::{Result, SegmentError};
use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use tracing::debug;

const PAGE_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff"];

/// Whether a path looks like a scanned page image
pub fn is_page_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| PAGE_IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Page images directly inside `dir`, ordered by file name
pub fn list_page_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut pages = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_page_image(&path) {
            pages.push(path);
        }
    }
    pages.sort();
    Ok(pages)
}

/// Rasterizer for directories of pre-scanned page images
///
/// Pages are stored at a native scan resolution; requesting another DPI rescales the page
/// so downstream stages see the same pixel density a PDF render would produce.
#[derive(Debug, Clone)]
pub struct ImageSetRasterizer {
    scan_dpi: u32,
}

impl ImageSetRasterizer {
    pub fn new(scan_dpi: u32) -> Self {
        Self { scan_dpi }
    }

    fn pages(&self, source: &SourceDocument) -> Result<Vec<PathBuf>> {
        let pages = list_page_images(&source.path)
            .map_err(|e| SegmentError::source_unavailable(&source.path, e))?;
        if pages.is_empty() {
            return Err(SegmentError::source_unavailable(&source.path, "no page images found"));
        }
        Ok(pages)
    }
}

impl Rasterizer for ImageSetRasterizer {
    fn page_count(&self, source: &SourceDocument) -> Result<u32> {
        Ok(self.pages(source)?.len() as u32)
    }

    fn rasterize(&self, source: &SourceDocument, page_number: u32, dpi: u32) -> Result<RasterPage> {
        let pages = self.pages(source)?;
        check_page_number(page_number, pages.len() as u32)?;
        let path = &pages[(page_number - 1) as usize];

        let image = image::open(path).map_err(|e| SegmentError::source_unavailable(path, e))?;

        let image = if dpi == self.scan_dpi {
            image
        } else {
            let scale = f64::from(dpi) / f64::from(self.scan_dpi);
            let width = ((f64::from(image.width()) * scale).round() as u32).max(1);
            let height = ((f64::from(image.height()) * scale).round() as u32).max(1);
            debug!(
                page = page_number,
                from = self.scan_dpi,
                to = dpi,
                "Rescaling {}x{} -> {}x{}",
                image.width(),
                image.height(),
                width,
                height
            );
            image.resize_exact(width, height, FilterType::Triangle)
        };

        Ok(RasterPage::new(image, page_number, dpi))
    }
}
