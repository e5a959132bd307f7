// WHY: Typed error kinds let the batch decide per error whether to skip a document,
// skip a page, or refuse to start

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while rasterizing, detecting, or extracting columns
#[derive(Error, Debug)]
pub enum SegmentError {
    /// Missing or corrupt source document; the whole document is skipped
    #[error("source unavailable: {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    /// Requested page lies outside the rasterized page range; only that page is skipped
    #[error("page {page} out of range (document has {page_count} pages)")]
    PageIndexOutOfRange { page: u32, page_count: u32 },

    /// Header/footer bands leave no rows to analyse
    #[error("empty region of interest: top {top} >= bottom {bottom} (page height {height})")]
    EmptyRoi { top: u32, bottom: u32, height: u32 },

    /// Boundary list was computed for a page of a different width
    #[error("boundary list ends at {last} but page is {width} pixels wide")]
    BoundaryMismatch { last: u32, width: u32 },

    #[error("invalid margin: {0}")]
    InvalidMargin(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SegmentError {
    pub fn source_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Configuration errors abort the whole batch, whether caught at startup or on a page
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::EmptyRoi { .. } | Self::InvalidMargin(_) | Self::InvalidConfig(_)
        )
    }

    /// Errors after which the remaining pages of the same document are abandoned
    pub fn abandons_document(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, SegmentError>;
