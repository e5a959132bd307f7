// WHY: Boundary detection is the algorithmic heart of the pipeline: binarize, restrict to the
// body band, build divider and gutter evidence, combine, and pick peaks

use crate::config::DetectorConfig;
use crate::error::{Result, SegmentError};
use crate::raster::RasterPage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub mod binarize;
pub mod morphology;
pub mod peaks;
pub mod roi;
pub mod signal;

pub use morphology::Rect;
pub use peaks::PeakCriteria;
pub use roi::Roi;
pub use signal::ScoreWeights;

/// Ordered column edges of one page: starts at 0, ends at the page width, strictly increasing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct BoundaryList(Vec<u32>);

impl BoundaryList {
    /// Validate edges: at least two, first 0, strictly increasing
    pub fn new(edges: Vec<u32>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(SegmentError::InvalidConfig(format!(
                "boundary list needs at least two edges, got {}",
                edges.len()
            )));
        }
        if edges[0] != 0 {
            return Err(SegmentError::InvalidConfig(format!(
                "boundary list must start at 0, starts at {}",
                edges[0]
            )));
        }
        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(SegmentError::InvalidConfig(format!(
                "boundary list must be strictly increasing: {edges:?}"
            )));
        }
        Ok(Self(edges))
    }

    /// Interior peaks framed by the page edges
    fn from_peaks(peaks: &[usize], width: u32) -> Self {
        let mut edges = Vec::with_capacity(peaks.len() + 2);
        edges.push(0);
        edges.extend(peaks.iter().map(|&p| p as u32).filter(|&p| p > 0 && p < width));
        edges.push(width);
        edges.dedup();
        Self(edges)
    }

    /// `columns` equal-width slices of `width`
    ///
    /// Pages narrower than the column count get one slice per pixel column.
    pub fn even_division(width: u32, columns: u32) -> Self {
        let columns = columns.clamp(1, width.max(1));
        let edges = (0..=columns)
            .map(|i| (u64::from(width) * u64::from(i) / u64::from(columns)) as u32)
            .collect();
        Self(edges)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Last edge, the width of the page this list was computed for
    pub fn width(&self) -> u32 {
        self.0[self.0.len() - 1]
    }

    pub fn column_count(&self) -> usize {
        self.0.len() - 1
    }

    /// Adjacent edge pairs, one per column, left to right
    pub fn spans(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.0.windows(2).map(|w| (w[0], w[1]))
    }
}

impl TryFrom<Vec<u32>> for BoundaryList {
    type Error = SegmentError;

    fn try_from(edges: Vec<u32>) -> Result<Self> {
        Self::new(edges)
    }
}

impl From<BoundaryList> for Vec<u32> {
    fn from(list: BoundaryList) -> Self {
        list.0
    }
}

/// Outcome of boundary detection on one page
#[derive(Debug, Clone)]
pub struct Detection {
    pub boundaries: BoundaryList,
    /// No qualifying peak was found and the page was divided evenly
    pub used_fallback: bool,
    pub roi: Roi,
    /// Accepted peak x-coordinates before framing with the page edges
    pub peaks: Vec<u32>,
    /// Combined score per x-coordinate
    pub combined: Vec<f64>,
}

/// Column-boundary detector; holds only its parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryDetector {
    config: DetectorConfig,
}

impl BoundaryDetector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect column boundaries of one raster page
    pub fn detect(&self, page: &RasterPage) -> Result<Detection> {
        detect_boundaries(page, self.config)
    }
}

/// Detect column boundaries with explicit parameters
pub fn detect_boundaries(page: &RasterPage, config: DetectorConfig) -> Result<Detection> {
    let width = page.width();
    let roi = Roi::for_page(page.height(), page.page_number, &config)?;

    let mask = binarize::ink_mask(&page.image);
    let body = roi.crop(&mask);
    drop(mask);

    let dividers = morphology::open(&body, Rect::vertical(config.divider_kernel_height));
    let divider_raw = signal::column_profile(&dividers);
    drop(dividers);

    let smeared = morphology::dilate(&body, Rect::horizontal(config.gutter_kernel_width));
    let gutter_raw = signal::column_profile(&smeared);
    drop(smeared);

    let weights = ScoreWeights {
        divider: config.divider_weight,
        gutter: config.gutter_weight,
    };
    let combined = signal::combined_score(&divider_raw, &gutter_raw, weights);

    let criteria = PeakCriteria {
        min_height: config.peak_min_height,
        min_prominence: config.peak_min_prominence,
        // WHY: spacing divisor is expected_columns + 2 while the fallback divides by
        // expected_columns; both are kept as tuned
        min_distance: (width / (config.expected_columns + 2)) as usize,
    };
    let peaks: Vec<u32> = peaks::find_peaks(&combined, &criteria)
        .into_iter()
        .map(|p| p as u32)
        .collect();

    let (boundaries, used_fallback) = if peaks.is_empty() {
        warn!(
            page = page.page_number,
            expected_columns = config.expected_columns,
            "No column boundaries detected, dividing page evenly"
        );
        (BoundaryList::even_division(width, config.expected_columns), true)
    } else {
        let idx: Vec<usize> = peaks.iter().map(|&p| p as usize).collect();
        (BoundaryList::from_peaks(&idx, width), false)
    };

    debug!(
        page = page.page_number,
        roi_top = roi.top,
        roi_bottom = roi.bottom,
        "Boundaries: {:?}",
        boundaries.as_slice()
    );

    Ok(Detection {
        boundaries,
        used_fallback,
        roi,
        peaks,
        combined,
    })
}
