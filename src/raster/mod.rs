// WHY: Rasterization is the only I/O-bound step; hiding it behind a trait keeps detection
// and extraction pure and lets tests feed synthetic pages

use crate::error::Result;
use image::DynamicImage;
use std::fmt;
use std::path::PathBuf;

pub mod image_set;
#[cfg(feature = "pdf")]
pub mod pdf;

pub use image_set::{is_page_image, list_page_images, ImageSetRasterizer};
#[cfg(feature = "pdf")]
pub use pdf::PdfiumRasterizer;

/// One rasterized page, owned read-only by a single detection pass
#[derive(Debug, Clone)]
pub struct RasterPage {
    pub image: DynamicImage,
    /// 1-based page number matching physical page order
    pub page_number: u32,
    /// Resolution the page was rasterized at
    pub dpi: u32,
}

impl RasterPage {
    pub fn new(image: DynamicImage, page_number: u32, dpi: u32) -> Self {
        Self { image, page_number, dpi }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Size of the uncompressed pixel buffer in bytes
    pub fn raw_bytes(&self) -> u64 {
        u64::from(self.width())
            * u64::from(self.height())
            * u64::from(self.image.color().bytes_per_pixel())
    }
}

/// Kind of source a document was discovered as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Pdf,
    /// Directory of already-scanned page images
    ImageSet,
}

/// A source document whose pages are rasterized independently
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceDocument {
    /// Stable document name used for output directories and ordering
    pub name: String,
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl SourceDocument {
    pub fn new(path: impl Into<PathBuf>, kind: SourceKind) -> Self {
        let path = path.into();
        let name = match kind {
            SourceKind::Pdf => path.file_stem(),
            SourceKind::ImageSet => path.file_name(),
        }
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string());
        Self { name, path, kind }
    }
}

impl fmt::Display for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path.display())
    }
}

/// Turns source documents into raster pages
pub trait Rasterizer: Send + Sync {
    /// Number of pages in the document
    fn page_count(&self, source: &SourceDocument) -> Result<u32>;

    /// Rasterize one 1-based page at the given resolution
    fn rasterize(&self, source: &SourceDocument, page_number: u32, dpi: u32) -> Result<RasterPage>;
}

/// Dispatches on the source kind so one rasterizer serves a mixed batch
pub struct SourceRasterizer {
    image_set: ImageSetRasterizer,
    #[cfg(feature = "pdf")]
    pdf: PdfiumRasterizer,
}

impl SourceRasterizer {
    pub fn new(scan_dpi: u32) -> Self {
        Self {
            image_set: ImageSetRasterizer::new(scan_dpi),
            #[cfg(feature = "pdf")]
            pdf: PdfiumRasterizer::new(),
        }
    }

    #[cfg(not(feature = "pdf"))]
    fn pdf_unsupported(source: &SourceDocument) -> crate::error::SegmentError {
        crate::error::SegmentError::source_unavailable(
            &source.path,
            "PDF support not compiled in (enable the `pdf` feature)",
        )
    }
}

impl Rasterizer for SourceRasterizer {
    fn page_count(&self, source: &SourceDocument) -> Result<u32> {
        match source.kind {
            SourceKind::ImageSet => self.image_set.page_count(source),
            #[cfg(feature = "pdf")]
            SourceKind::Pdf => self.pdf.page_count(source),
            #[cfg(not(feature = "pdf"))]
            SourceKind::Pdf => Err(Self::pdf_unsupported(source)),
        }
    }

    fn rasterize(&self, source: &SourceDocument, page_number: u32, dpi: u32) -> Result<RasterPage> {
        match source.kind {
            SourceKind::ImageSet => self.image_set.rasterize(source, page_number, dpi),
            #[cfg(feature = "pdf")]
            SourceKind::Pdf => self.pdf.rasterize(source, page_number, dpi),
            #[cfg(not(feature = "pdf"))]
            SourceKind::Pdf => Err(Self::pdf_unsupported(source)),
        }
    }
}

/// Check a 1-based page number against a document's page count
pub(crate) fn check_page_number(page_number: u32, page_count: u32) -> Result<()> {
    if page_number == 0 || page_number > page_count {
        return Err(crate::error::SegmentError::PageIndexOutOfRange {
            page: page_number,
            page_count,
        });
    }
    Ok(())
}
