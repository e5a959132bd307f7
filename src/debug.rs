// WHY: A single side-by-side composite per page is the fastest way to see why a page fell back
// or split a column: input, divider evidence, score profile, and the final cut lines

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use std::path::Path;

use crate::config::DetectorConfig;
use crate::detector::{binarize, morphology, Detection, Rect};
use crate::error::Result;
use crate::raster::RasterPage;

/// Panels taller than this are downscaled
pub const MAX_PANEL_HEIGHT: u32 = 1000;
/// White gap between panels
pub const PANEL_GAP: u32 = 8;

const BOUNDARY_COLOR: Rgb<u8> = Rgb([220, 30, 30]);
const ROI_COLOR: Rgb<u8> = Rgb([30, 90, 220]);
const PROFILE_COLOR: Rgb<u8> = Rgb([20, 20, 20]);
const THRESHOLD_COLOR: Rgb<u8> = Rgb([150, 150, 150]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Grayscale page panel
fn page_panel(page: &RasterPage) -> RgbImage {
    let gray = page.image.to_luma8();
    gray_to_rgb(&gray)
}

/// Opened divider mask placed back at its page position, ink drawn black
fn divider_panel(page: &RasterPage, detection: &Detection, config: &DetectorConfig) -> RgbImage {
    let mask = binarize::ink_mask(&page.image);
    let body = detection.roi.crop(&mask);
    let dividers = morphology::open(&body, Rect::vertical(config.divider_kernel_height));

    let mut canvas = GrayImage::from_pixel(page.width(), page.height(), Luma([255]));
    for (x, y, px) in dividers.enumerate_pixels() {
        if px[0] == binarize::INK {
            canvas.put_pixel(x, y + detection.roi.top, Luma([0]));
        }
    }
    gray_to_rgb(&canvas)
}

/// Combined score plotted across the page width, accepted peaks marked
fn profile_panel(page: &RasterPage, detection: &Detection, config: &DetectorConfig) -> RgbImage {
    let (width, height) = (page.width(), page.height());
    let mut plot = RgbImage::from_pixel(width, height, WHITE);
    let scale = (height.saturating_sub(1)) as f32;
    let y_of = |v: f64| scale * (1.0 - v as f32);

    let threshold = y_of(config.peak_min_height);
    draw_line_segment_mut(&mut plot, (0.0, threshold), (width as f32, threshold), THRESHOLD_COLOR);

    for (x, pair) in detection.combined.windows(2).enumerate() {
        draw_line_segment_mut(
            &mut plot,
            (x as f32, y_of(pair[0])),
            ((x + 1) as f32, y_of(pair[1])),
            PROFILE_COLOR,
        );
    }

    let radius = (width / 200).max(3) as i32;
    for &peak in &detection.peaks {
        let v = detection.combined.get(peak as usize).copied().unwrap_or(0.0);
        draw_filled_circle_mut(&mut plot, (peak as i32, y_of(v) as i32), radius, BOUNDARY_COLOR);
    }
    plot
}

/// Page with ROI band and column boundaries drawn over it
fn overlay_panel(page: &RasterPage, detection: &Detection) -> RgbImage {
    let mut overlay = page_panel(page);
    let (width, height) = (page.width(), page.height());

    for y in [detection.roi.top, detection.roi.bottom] {
        let y = y.min(height.saturating_sub(1)) as f32;
        draw_line_segment_mut(&mut overlay, (0.0, y), (width as f32, y), ROI_COLOR);
    }
    for &x in detection.boundaries.as_slice() {
        let x = x.min(width.saturating_sub(1)) as f32;
        draw_line_segment_mut(&mut overlay, (x, 0.0), (x, height as f32), BOUNDARY_COLOR);
    }
    overlay
}

fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        Rgb([v, v, v])
    })
}

fn fit_height(panel: RgbImage, height: u32) -> RgbImage {
    if panel.height() == height {
        return panel;
    }
    let width = (u64::from(panel.width()) * u64::from(height) / u64::from(panel.height().max(1))).max(1) as u32;
    imageops::resize(&panel, width, height, FilterType::Triangle)
}

/// Four panels side by side: page, divider mask, score profile, boundaries
pub fn render_debug(page: &RasterPage, detection: &Detection, config: &DetectorConfig) -> RgbImage {
    let height = page.height().clamp(1, MAX_PANEL_HEIGHT);
    let panels = [
        page_panel(page),
        divider_panel(page, detection, config),
        profile_panel(page, detection, config),
        overlay_panel(page, detection),
    ]
    .map(|p| fit_height(p, height));

    let total_width = panels.iter().map(|p| p.width()).sum::<u32>() + PANEL_GAP * (panels.len() as u32 - 1);
    let mut composite = RgbImage::from_pixel(total_width, height, WHITE);
    let mut x = 0i64;
    for panel in &panels {
        imageops::replace(&mut composite, panel, x, 0);
        x += i64::from(panel.width() + PANEL_GAP);
    }
    composite
}

/// Render and save the debug composite as PNG
pub fn write_debug(path: &Path, page: &RasterPage, detection: &Detection, config: &DetectorConfig) -> Result<()> {
    render_debug(page, detection, config).save(path)?;
    Ok(())
}
