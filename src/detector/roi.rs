use crate::config::DetectorConfig;
use crate::error::{Result, SegmentError};
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Vertical analysis band of a page, excluding header and footer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    /// First row inside the band
    pub top: u32,
    /// One past the last row inside the band
    pub bottom: u32,
}

impl Roi {
    /// Band for a page of `height` rows; page 1 uses the taller masthead fraction
    pub fn for_page(height: u32, page_number: u32, config: &DetectorConfig) -> Result<Self> {
        let header = config.header_fraction_for(page_number);
        let top = (f64::from(height) * header) as u32;
        let bottom = (f64::from(height) * (1.0 - config.footer_fraction)) as u32;
        if top >= bottom {
            return Err(SegmentError::EmptyRoi { top, bottom, height });
        }
        Ok(Self { top, bottom })
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Copy of the rows inside the band, full width
    pub fn crop(&self, mask: &GrayImage) -> GrayImage {
        image::imageops::crop_imm(mask, 0, self.top, mask.width(), self.height()).to_image()
    }
}
