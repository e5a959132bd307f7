// End-to-end boundary detection on synthetic pages with known layouts
// WHY: Divider-only, gutter-only and blank pages exercise each evidence source separately

use gutters::{detect_boundaries, BoundaryDetector, DetectorConfig, RasterPage};
use image::DynamicImage;

#[path = "integration/mod.rs"]
mod test_utils;
use test_utils::fixtures::{full_ruled_page, ruled_page, text_columns_page};

fn raster(img: image::GrayImage, page_number: u32) -> RasterPage {
    RasterPage::new(DynamicImage::ImageLuma8(img), page_number, 150)
}

/// Ruled broadsheet: vertical lines drive the boundaries
#[test]
fn test_ruled_broadsheet_five_columns() {
    let page = raster(full_ruled_page(2000, 3000, &[400, 800, 1200, 1600]), 1);
    let detection = detect_boundaries(&page, DetectorConfig::default()).expect("detection failed");

    assert!(!detection.used_fallback);
    assert_eq!(detection.boundaries.as_slice(), &[0, 400, 800, 1200, 1600, 2000]);
    assert_eq!(detection.roi.top, 540);
    assert_eq!(detection.roi.bottom, 2940);
}

/// Unruled page: whitespace gutters alone place boundaries at gutter centres
#[test]
fn test_whitespace_gutters_five_columns() {
    let page = raster(text_columns_page(5, 1200), 2);
    let detection = detect_boundaries(&page, DetectorConfig::default()).expect("detection failed");

    assert!(!detection.used_fallback);
    assert_eq!(detection.boundaries.as_slice(), &[0, 200, 400, 600, 800, 1000]);
}

/// Fewer real columns than expected: detection reports what is on the page
#[test]
fn test_three_column_page_with_five_expected() {
    let page = raster(text_columns_page(3, 900), 4);
    let detection = detect_boundaries(&page, DetectorConfig::default()).expect("detection failed");

    assert!(!detection.used_fallback);
    assert_eq!(detection.boundaries.as_slice(), &[0, 200, 400, 600]);
    assert_eq!(detection.boundaries.column_count(), 3);
}

/// Blank page: no evidence, so the page is divided evenly
#[test]
fn test_blank_page_even_division() {
    let page = raster(full_ruled_page(1000, 1400, &[]), 3);
    let detection = detect_boundaries(&page, DetectorConfig::default()).expect("detection failed");

    assert!(detection.used_fallback);
    assert_eq!(detection.boundaries.as_slice(), &[0, 200, 400, 600, 800, 1000]);
}

/// Rules confined to the masthead band only count on pages with a short header
#[test]
fn test_first_page_masthead_is_ignored() {
    // Rules cover y in [0, 300) of a 3000-pixel page: inside the 18% masthead band of page 1,
    // but 150 rows of them fall below the 5% header band of later pages
    let img = ruled_page(1500, 3000, &[250, 600, 900, 1250], 0..300);

    let first = detect_boundaries(&raster(img.clone(), 1), DetectorConfig::default()).unwrap();
    assert!(first.used_fallback);
    assert_eq!(first.boundaries.as_slice(), &[0, 300, 600, 900, 1200, 1500]);

    let later = detect_boundaries(&raster(img, 2), DetectorConfig::default()).unwrap();
    assert!(!later.used_fallback);
    assert_eq!(later.boundaries.as_slice(), &[0, 250, 600, 900, 1250, 1500]);
}

/// Short vertical strokes (letters, underlines) never count as dividers
#[test]
fn test_short_strokes_are_not_dividers() {
    let img = ruled_page(800, 1000, &[300], 400..480);
    let detection = detect_boundaries(&raster(img, 2), DetectorConfig::default()).unwrap();

    assert!(detection.peaks.iter().all(|&p| p.abs_diff(300) > 2));
}

/// Every boundary list starts at 0, ends at the width and strictly increases
#[test]
fn test_boundary_invariants_across_pages() {
    let detector = BoundaryDetector::new(DetectorConfig::default()).unwrap();
    let pages = [
        raster(full_ruled_page(640, 900, &[100, 101 + 60, 500]), 1),
        raster(text_columns_page(4, 700), 2),
        raster(full_ruled_page(7, 900, &[]), 5),
    ];
    for page in &pages {
        let detection = detector.detect(page).unwrap();
        let edges = detection.boundaries.as_slice();
        assert_eq!(edges[0], 0);
        assert_eq!(*edges.last().unwrap(), page.width());
        assert!(edges.windows(2).all(|w| w[0] < w[1]), "not increasing: {edges:?}");
    }
}
