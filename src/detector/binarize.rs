use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;

/// Mask value marking an ink pixel
pub const INK: u8 = 255;

/// Grayscale + Otsu global threshold, returning an ink mask (ink = 255, background = 0)
///
/// Pixels at or below the Otsu level are ink. A uniform page has no second class and
/// yields an empty mask.
pub fn ink_mask(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    ink_mask_from_gray(&gray)
}

pub fn ink_mask_from_gray(gray: &GrayImage) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (min, max) = gray
        .as_raw()
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &p| (lo.min(p), hi.max(p)));
    if width == 0 || height == 0 || min == max {
        return GrayImage::new(width, height);
    }

    let level = otsu_level(gray);
    GrayImage::from_fn(width, height, |x, y| {
        if gray.get_pixel(x, y)[0] <= level {
            Luma([INK])
        } else {
            Luma([0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dark_strokes_become_ink() {
        let mut gray = GrayImage::from_pixel(20, 10, Luma([240u8]));
        for y in 0..10 {
            gray.put_pixel(5, y, Luma([15]));
        }
        let mask = ink_mask_from_gray(&gray);
        assert_eq!(mask.get_pixel(5, 3)[0], INK);
        assert_eq!(mask.get_pixel(6, 3)[0], 0);
        assert_eq!(mask.pixels().filter(|p| p[0] == INK).count(), 10);
    }

    #[test]
    fn test_uniform_page_has_no_ink() {
        let white = GrayImage::from_pixel(16, 16, Luma([255u8]));
        assert!(ink_mask_from_gray(&white).pixels().all(|p| p[0] == 0));

        let grey = GrayImage::from_pixel(16, 16, Luma([90u8]));
        assert!(ink_mask_from_gray(&grey).pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_color_input_is_grayscaled() {
        let mut rgb = image::RgbImage::from_pixel(8, 8, image::Rgb([250, 245, 235]));
        rgb.put_pixel(2, 2, image::Rgb([10, 10, 30]));
        let mask = ink_mask(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(mask.get_pixel(2, 2)[0], INK);
        assert_eq!(mask.pixels().filter(|p| p[0] == INK).count(), 1);
    }
}
