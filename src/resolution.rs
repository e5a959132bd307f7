// WHY: One probe render at low resolution is enough to pick a document-wide DPI, because
// pixel count (and so raw size) scales with the square of linear resolution

use crate::config::ResolutionConfig;
use crate::error::Result;
use crate::raster::{RasterPage, Rasterizer, SourceDocument};
use tracing::{debug, info};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Raw pixel size of a rasterized page in megabytes
pub fn page_size_mb(page: &RasterPage) -> f64 {
    page.raw_bytes() as f64 / BYTES_PER_MB
}

/// Size a page measured at `probe_dpi` would occupy at `dpi`
pub fn estimate_size_mb(probe_mb: f64, probe_dpi: u32, dpi: u32) -> f64 {
    let ratio = f64::from(dpi) / f64::from(probe_dpi);
    probe_mb * ratio * ratio
}

/// DPI that brings the probe page to the target size, clamped to the configured bounds
pub fn solve_dpi(probe_mb: f64, config: &ResolutionConfig) -> u32 {
    if probe_mb.is_nan() || probe_mb <= 0.0 {
        return config.max_dpi;
    }
    let ideal = f64::from(config.probe_dpi) * (config.target_mb / probe_mb).sqrt();
    let clamped = ideal.round().clamp(f64::from(config.min_dpi), f64::from(config.max_dpi));
    clamped as u32
}

/// Pick the rasterization DPI for a whole document from its first page
///
/// Fails with `SourceUnavailable` when the probe render fails; the caller skips the document.
pub fn select_dpi(
    rasterizer: &dyn Rasterizer,
    source: &SourceDocument,
    config: &ResolutionConfig,
) -> Result<u32> {
    let probe = rasterizer.rasterize(source, 1, config.probe_dpi)?;
    let probe_mb = page_size_mb(&probe);
    drop(probe);

    let dpi = solve_dpi(probe_mb, config);
    debug!(
        document = %source.name,
        probe_mb,
        estimated_mb = estimate_size_mb(probe_mb, config.probe_dpi, dpi),
        "Resolution estimate"
    );
    info!(document = %source.name, dpi, "Selected rasterization resolution");
    Ok(dpi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SegmentError;
    use crate::raster::SourceKind;
    use image::{DynamicImage, RgbImage};

    /// Serves blank RGB pages sized like a broadsheet at any DPI
    struct BroadsheetRasterizer {
        inches: (f64, f64),
    }

    impl Rasterizer for BroadsheetRasterizer {
        fn page_count(&self, _source: &SourceDocument) -> Result<u32> {
            Ok(4)
        }

        fn rasterize(&self, _source: &SourceDocument, page_number: u32, dpi: u32) -> Result<RasterPage> {
            let w = (self.inches.0 * f64::from(dpi)) as u32;
            let h = (self.inches.1 * f64::from(dpi)) as u32;
            Ok(RasterPage::new(DynamicImage::ImageRgb8(RgbImage::new(w, h)), page_number, dpi))
        }
    }

    struct MissingRasterizer;

    impl Rasterizer for MissingRasterizer {
        fn page_count(&self, source: &SourceDocument) -> Result<u32> {
            Err(SegmentError::source_unavailable(&source.path, "missing"))
        }

        fn rasterize(&self, source: &SourceDocument, _page: u32, _dpi: u32) -> Result<RasterPage> {
            Err(SegmentError::source_unavailable(&source.path, "missing"))
        }
    }

    #[test]
    fn test_estimate_scales_quadratically() {
        assert!((estimate_size_mb(1.0, 100, 200) - 4.0).abs() < 1e-12);
        assert!((estimate_size_mb(2.0, 100, 50) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_solve_hits_target_inside_bounds() {
        let config = ResolutionConfig::default();
        // 1 MB at 100 DPI reaches 4 MB at 200 DPI
        assert_eq!(solve_dpi(1.0, &config), 200);
        // 2.56 MB at 100 DPI reaches 4 MB at 125 DPI
        assert_eq!(solve_dpi(2.56, &config), 125);
    }

    #[test]
    fn test_solve_clamps() {
        let config = ResolutionConfig::default();
        assert_eq!(solve_dpi(0.01, &config), 200);
        assert_eq!(solve_dpi(400.0, &config), 75);
        assert_eq!(solve_dpi(0.0, &config), 200);
        for probe_mb in [0.05, 0.3, 1.7, 6.0, 25.0, 1e6] {
            let dpi = solve_dpi(probe_mb, &config);
            assert!((75..=200).contains(&dpi), "probe {probe_mb} MB -> {dpi} DPI");
        }
    }

    #[test]
    fn test_select_dpi_for_broadsheet() {
        // 22 x 30 inch page at 100 DPI is 2200 x 3000 RGB, about 18.9 MB
        let rasterizer = BroadsheetRasterizer { inches: (22.0, 30.0) };
        let doc = SourceDocument::new("/scans/broadsheet.pdf", SourceKind::Pdf);
        let dpi = select_dpi(&rasterizer, &doc, &ResolutionConfig::default()).unwrap();
        assert_eq!(dpi, 75);

        let tabloid = BroadsheetRasterizer { inches: (4.0, 6.0) };
        let dpi = select_dpi(&tabloid, &doc, &ResolutionConfig::default()).unwrap();
        assert_eq!(dpi, 200);
    }

    #[test]
    fn test_select_dpi_missing_source() {
        let doc = SourceDocument::new("/scans/missing.pdf", SourceKind::Pdf);
        let err = select_dpi(&MissingRasterizer, &doc, &ResolutionConfig::default()).unwrap_err();
        assert!(matches!(err, SegmentError::SourceUnavailable { .. }));
    }
}
