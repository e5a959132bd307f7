// WHY: pdfium renders scanned newspaper PDFs faithfully at arbitrary scale; it is optional
// because it needs the pdfium dynamic library at runtime

use super::{check_page_number, RasterPage, Rasterizer, SourceDocument};
use crate::error::{Result, SegmentError};
use pdfium_render::prelude::*;
use tracing::debug;

/// PDF points per inch
const POINTS_PER_INCH: f32 = 72.0;

/// Rasterizer backed by pdfium
#[derive(Debug, Default, Clone)]
pub struct PdfiumRasterizer;

impl PdfiumRasterizer {
    pub fn new() -> Self {
        Self
    }

    /// Bind pdfium from the working directory, else the system library; a missing library
    /// makes every PDF unavailable
    fn bind(source: &SourceDocument) -> Result<Pdfium> {
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map(Pdfium::new)
            .map_err(|e| SegmentError::source_unavailable(&source.path, e))
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn page_count(&self, source: &SourceDocument) -> Result<u32> {
        let pdfium = Self::bind(source)?;
        let document = pdfium
            .load_pdf_from_file(&source.path, None)
            .map_err(|e| SegmentError::source_unavailable(&source.path, e))?;
        Ok(u32::from(document.pages().len()))
    }

    fn rasterize(&self, source: &SourceDocument, page_number: u32, dpi: u32) -> Result<RasterPage> {
        // WHY: bindings are created per call so the rasterizer can be shared across workers
        let pdfium = Self::bind(source)?;
        let document = pdfium
            .load_pdf_from_file(&source.path, None)
            .map_err(|e| SegmentError::source_unavailable(&source.path, e))?;

        let page_count = u32::from(document.pages().len());
        check_page_number(page_number, page_count)?;
        let index = u16::try_from(page_number - 1)
            .map_err(|_| SegmentError::PageIndexOutOfRange { page: page_number, page_count })?;

        let page = document
            .pages()
            .get(index)
            .map_err(|e| SegmentError::source_unavailable(&source.path, e))?;

        let scale = dpi as f32 / POINTS_PER_INCH;
        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| SegmentError::source_unavailable(&source.path, e))?;
        let image = bitmap.as_image();

        debug!(page = page_number, dpi, "Rendered {}x{}", image.width(), image.height());
        Ok(RasterPage::new(image, page_number, dpi))
    }
}
