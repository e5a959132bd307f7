// WHY: Margins widen each crop so slanted or slightly mis-detected text is not truncated;
// neighbouring columns may overlap by up to left + right pixels

use crate::config::MarginPolicy;
use crate::detector::BoundaryList;
use crate::error::{Result, SegmentError};
use crate::raster::RasterPage;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// One cropped column of a page, handed to text recognition and never mutated afterwards
#[derive(Debug, Clone)]
pub struct ColumnRecord {
    /// 0-based, left to right
    pub index: usize,
    pub image: DynamicImage,
    pub x_start: u32,
    pub x_end: u32,
    pub width: u32,
    pub height: u32,
    /// 1-based page number of the source page
    pub page_number: u32,
    /// Name of the source document
    pub source: String,
}

impl ColumnRecord {
    /// Geometry without pixels, for metadata output
    pub fn geometry(&self) -> ColumnGeometry {
        ColumnGeometry {
            column_index: self.index,
            x_offset: self.x_start,
            x_end: self.x_end,
            width: self.width,
            height: self.height,
        }
    }
}

/// Column placement inside the full page, enough to map recognized text back to page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnGeometry {
    pub column_index: usize,
    pub x_offset: u32,
    pub x_end: u32,
    pub width: u32,
    pub height: u32,
}

/// Horizontal crop ranges for every column, margins applied and clamped to `[0, page_width]`
pub fn column_spans(boundaries: &BoundaryList, page_width: u32, margins: MarginPolicy) -> Vec<(u32, u32)> {
    let width = i64::from(page_width);
    let left = i64::from(margins.left());
    let right = i64::from(margins.right());
    boundaries
        .spans()
        .map(|(b0, b1)| {
            let x_start = (i64::from(b0) - left).clamp(0, width);
            let x_end = (i64::from(b1) + right).clamp(0, width);
            (x_start as u32, x_end as u32)
        })
        .collect()
}

/// Crop every column of a page
pub fn extract_columns(
    page: &RasterPage,
    boundaries: &BoundaryList,
    margins: MarginPolicy,
    source: &str,
) -> Result<Vec<ColumnRecord>> {
    margins.validate()?;
    if boundaries.width() != page.width() {
        return Err(SegmentError::BoundaryMismatch {
            last: boundaries.width(),
            width: page.width(),
        });
    }

    let height = page.height();
    let records = column_spans(boundaries, page.width(), margins)
        .into_iter()
        .enumerate()
        .map(|(index, (x_start, x_end))| {
            let width = x_end - x_start;
            ColumnRecord {
                index,
                image: page.image.crop_imm(x_start, 0, width, height),
                x_start,
                x_end,
                width,
                height,
                page_number: page.page_number,
                source: source.to_string(),
            }
        })
        .collect();
    Ok(records)
}
