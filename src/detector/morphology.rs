// WHY: Rectangular binary morphology is separable, so each pass is a running-count sweep
// along rows or columns instead of a full 2D window per pixel

use super::binarize::INK;
use image::GrayImage;

/// Rectangular structuring element anchored at its centre
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// One pixel wide, `height` tall: keeps long vertical strokes
    pub fn vertical(height: u32) -> Self {
        Self { width: 1, height }
    }

    /// `width` wide, one pixel tall: bridges gaps between words
    pub fn horizontal(width: u32) -> Self {
        Self { width, height: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Erode,
    Dilate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Rows,
    Columns,
}

/// Binary erosion; pixels beyond the border count as ink
pub fn erode(mask: &GrayImage, se: Rect) -> GrayImage {
    apply(mask, se, Op::Erode)
}

/// Binary dilation; pixels beyond the border count as background
pub fn dilate(mask: &GrayImage, se: Rect) -> GrayImage {
    apply(mask, se, Op::Dilate)
}

/// Erosion followed by dilation: keeps only ink regions that fully contain the element
pub fn open(mask: &GrayImage, se: Rect) -> GrayImage {
    dilate(&erode(mask, se), se)
}

fn apply(mask: &GrayImage, se: Rect, op: Op) -> GrayImage {
    let mut out = mask.clone();
    if se.width > 1 {
        out = sweep(&out, se.width as usize, Axis::Rows, op);
    }
    if se.height > 1 {
        out = sweep(&out, se.height as usize, Axis::Columns, op);
    }
    out
}

/// One 1D pass of length `k` along every row or column
fn sweep(mask: &GrayImage, k: usize, axis: Axis, op: Op) -> GrayImage {
    let (w, h) = (mask.width() as usize, mask.height() as usize);
    let src = mask.as_raw();
    let mut dst = vec![0u8; src.len()];

    let (lines, len) = match axis {
        Axis::Rows => (h, w),
        Axis::Columns => (w, h),
    };
    let index = |line: usize, pos: usize| match axis {
        Axis::Rows => line * w + pos,
        Axis::Columns => pos * w + line,
    };

    // Window around position i covers [i - before, i + after]; dilation uses the reflection
    let anchor = k / 2;
    let (before, after) = match op {
        Op::Erode => (anchor, k - 1 - anchor),
        Op::Dilate => (k - 1 - anchor, anchor),
    };

    let mut prefix = vec![0u32; len + 1];
    for line in 0..lines {
        for pos in 0..len {
            prefix[pos + 1] = prefix[pos] + u32::from(src[index(line, pos)] > 0);
        }
        for pos in 0..len {
            let lo = pos.saturating_sub(before);
            let hi = (pos + after).min(len - 1);
            let ink = prefix[hi + 1] - prefix[lo];
            let set = match op {
                Op::Erode => ink as usize == hi - lo + 1,
                Op::Dilate => ink > 0,
            };
            if set {
                dst[index(line, pos)] = INK;
            }
        }
    }

    GrayImage::from_raw(w as u32, h as u32, dst).unwrap_or_else(|| GrayImage::new(w as u32, h as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn ink_count(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p[0] == INK).count()
    }

    #[test]
    fn test_opening_keeps_long_vertical_rule() {
        let mut mask = GrayImage::new(30, 200);
        for y in 20..180 {
            mask.put_pixel(10, y, Luma([INK]));
        }
        // Short stroke, like a letter stem
        for y in 50..70 {
            mask.put_pixel(20, y, Luma([INK]));
        }

        let opened = open(&mask, Rect::vertical(100));
        assert_eq!(ink_count(&opened), 160);
        assert_eq!(opened.get_pixel(10, 20)[0], INK);
        assert_eq!(opened.get_pixel(10, 179)[0], INK);
        assert_eq!(opened.get_pixel(20, 60)[0], 0);
    }

    #[test]
    fn test_opening_drops_broken_rule() {
        let mut mask = GrayImage::new(5, 200);
        for y in (0..200).filter(|y| y % 60 != 0) {
            mask.put_pixel(2, y, Luma([INK]));
        }
        let opened = open(&mask, Rect::vertical(100));
        assert_eq!(ink_count(&opened), 0);
    }

    #[test]
    fn test_horizontal_dilation_bridges_word_gaps() {
        let mut mask = GrayImage::new(60, 1);
        mask.put_pixel(20, 0, Luma([INK]));
        mask.put_pixel(30, 0, Luma([INK]));

        let dilated = dilate(&mask, Rect::horizontal(15));
        // Each ink pixel spreads 7 pixels to either side
        for x in 13..=37 {
            assert_eq!(dilated.get_pixel(x, 0)[0], INK, "x = {x}");
        }
        assert_eq!(dilated.get_pixel(12, 0)[0], 0);
        assert_eq!(dilated.get_pixel(38, 0)[0], 0);
    }

    #[test]
    fn test_erosion_border_counts_as_ink() {
        let mask = GrayImage::from_pixel(4, 10, Luma([INK]));
        let eroded = erode(&mask, Rect::vertical(5));
        assert_eq!(ink_count(&eroded), 40);
    }

    #[test]
    fn test_unit_element_is_identity() {
        let mut mask = GrayImage::new(6, 6);
        mask.put_pixel(3, 2, Luma([INK]));
        let se = Rect { width: 1, height: 1 };
        assert_eq!(open(&mask, se), mask);
        assert_eq!(dilate(&mask, se), mask);
    }
}
