// WHY: Every tunable lives in explicit config structs passed by value, so the detector stays
// a pure function of pixels and parameters and can be swept in tests

use crate::error::{Result, SegmentError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters of the column-boundary detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Expected number of print columns (a hint, not a hard constraint)
    pub expected_columns: u32,
    /// Header band excluded on the first page of a document, as a fraction of page height
    pub first_page_header_fraction: f64,
    /// Header band excluded on every later page
    pub header_fraction: f64,
    /// Footer band excluded on every page
    pub footer_fraction: f64,
    /// Height of the 1-pixel-wide structuring element isolating divider rules
    pub divider_kernel_height: u32,
    /// Width of the 1-pixel-tall structuring element smearing words together
    pub gutter_kernel_width: u32,
    /// Weight of the normalized divider-line signal in the combined score
    pub divider_weight: f64,
    /// Weight of the inverted gutter-whitespace signal in the combined score
    pub gutter_weight: f64,
    /// Minimum combined score for a peak to count as a boundary
    pub peak_min_height: f64,
    /// Minimum prominence of a peak over its surrounding minima
    pub peak_min_prominence: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            expected_columns: 5,
            // WHY: mastheads are only large on page 1; running headers are short
            first_page_header_fraction: 0.18,
            header_fraction: 0.05,
            footer_fraction: 0.02,
            divider_kernel_height: 100,
            gutter_kernel_width: 15,
            divider_weight: 0.7,
            gutter_weight: 0.3,
            peak_min_height: 0.1,
            peak_min_prominence: 0.05,
        }
    }
}

impl DetectorConfig {
    /// Header fraction that applies to a 1-based page number
    pub fn header_fraction_for(&self, page_number: u32) -> f64 {
        if page_number <= 1 {
            self.first_page_header_fraction
        } else {
            self.header_fraction
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.expected_columns == 0 {
            return Err(SegmentError::InvalidConfig("expected_columns must be at least 1".into()));
        }
        if self.divider_kernel_height == 0 || self.gutter_kernel_width == 0 {
            return Err(SegmentError::InvalidConfig(
                "structuring element sizes must be at least 1 pixel".into(),
            ));
        }
        for (name, fraction) in [
            ("first_page_header_fraction", self.first_page_header_fraction),
            ("header_fraction", self.header_fraction),
            ("footer_fraction", self.footer_fraction),
        ] {
            if !(0.0..1.0).contains(&fraction) {
                return Err(SegmentError::InvalidConfig(format!(
                    "{name} must lie in [0, 1), got {fraction}"
                )));
            }
        }
        // Checked against a nominal page; per-page rounding is re-checked during detection
        for header in [self.first_page_header_fraction, self.header_fraction] {
            if header >= 1.0 - self.footer_fraction {
                let height = 10_000u32;
                return Err(SegmentError::EmptyRoi {
                    top: (f64::from(height) * header) as u32,
                    bottom: (f64::from(height) * (1.0 - self.footer_fraction)) as u32,
                    height,
                });
            }
        }
        if self.divider_weight < 0.0 || self.gutter_weight < 0.0 {
            return Err(SegmentError::InvalidConfig("score weights must be non-negative".into()));
        }
        if self.peak_min_height < 0.0 || self.peak_min_prominence < 0.0 {
            return Err(SegmentError::InvalidConfig(
                "peak thresholds must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Parameters of the per-document resolution selector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Target raw page size in megabytes
    pub target_mb: f64,
    /// Resolution used to rasterize the probe page
    pub probe_dpi: u32,
    pub min_dpi: u32,
    pub max_dpi: u32,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            target_mb: 4.0,
            probe_dpi: 100,
            // WHY: OCR degrades below ~75 DPI; memory explodes above ~200 DPI on broadsheets
            min_dpi: 75,
            max_dpi: 200,
        }
    }
}

impl ResolutionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_mb.is_nan() || self.target_mb <= 0.0 {
            return Err(SegmentError::InvalidConfig("target_mb must be positive".into()));
        }
        if self.probe_dpi == 0 || self.min_dpi == 0 {
            return Err(SegmentError::InvalidConfig("resolutions must be positive".into()));
        }
        if self.min_dpi > self.max_dpi {
            return Err(SegmentError::InvalidConfig(format!(
                "min_dpi {} exceeds max_dpi {}",
                self.min_dpi, self.max_dpi
            )));
        }
        Ok(())
    }
}

/// Horizontal padding added around each detected column before cropping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginPolicy {
    Symmetric(i32),
    Asymmetric { left: i32, right: i32 },
}

impl Default for MarginPolicy {
    fn default() -> Self {
        MarginPolicy::Symmetric(10)
    }
}

impl MarginPolicy {
    pub fn left(&self) -> i32 {
        match *self {
            MarginPolicy::Symmetric(m) => m,
            MarginPolicy::Asymmetric { left, .. } => left,
        }
    }

    pub fn right(&self) -> i32 {
        match *self {
            MarginPolicy::Symmetric(m) => m,
            MarginPolicy::Asymmetric { right, .. } => right,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.left() < 0 || self.right() < 0 {
            return Err(SegmentError::InvalidMargin(format!(
                "margins must be non-negative (left {}, right {})",
                self.left(),
                self.right()
            )));
        }
        Ok(())
    }
}

/// Complete configuration of a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub detector: DetectorConfig,
    pub resolution: ResolutionConfig,
    pub margins: MarginPolicy,
    /// Native resolution of pre-rasterized page-image sets
    pub scan_dpi: u32,
    /// JPEG quality of written column images
    pub jpeg_quality: u8,
    /// Write the four-panel diagnostic image for every page
    pub debug: bool,
    /// Number of pages processed concurrently
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            resolution: ResolutionConfig::default(),
            margins: MarginPolicy::default(),
            scan_dpi: 300,
            jpeg_quality: 92,
            debug: false,
            workers: num_cpus::get(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("invalid TOML in {}", path.display()))?;
        Ok(config)
    }

    /// Validate every section; run once at startup before any page is touched
    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        self.resolution.validate()?;
        self.margins.validate()?;
        if self.scan_dpi == 0 {
            return Err(SegmentError::InvalidConfig("scan_dpi must be positive".into()));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(SegmentError::InvalidConfig("jpeg_quality must lie in 1..=100".into()));
        }
        if self.workers == 0 {
            return Err(SegmentError::InvalidConfig("workers must be at least 1".into()));
        }
        Ok(())
    }
}
