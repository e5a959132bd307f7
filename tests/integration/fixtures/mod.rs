// Synthetic newspaper pages with known column layouts
// WHY: Detection tests need pages whose correct boundaries are known exactly

use image::{GrayImage, Luma};

pub const PAPER: Luma<u8> = Luma([255]);
pub const INK: Luma<u8> = Luma([0]);

/// Blank page with 2-pixel vertical rules starting at each x in `rules`, spanning `rows`
pub fn ruled_page(width: u32, height: u32, rules: &[u32], rows: std::ops::Range<u32>) -> GrayImage {
    let mut img = GrayImage::from_pixel(width, height, PAPER);
    for &x in rules {
        for y in rows.clone() {
            img.put_pixel(x, y, INK);
            img.put_pixel(x + 1, y, INK);
        }
    }
    img
}

/// Full-height 2-pixel rules, the common case of ruled broadsheets
pub fn full_ruled_page(width: u32, height: u32, rules: &[u32]) -> GrayImage {
    ruled_page(width, height, rules, 0..height)
}

/// Page with `columns` text columns of width 200 and no rules
///
/// Column `c` carries text lines from x = 200c + 21 to at most x = 200c + 179, built from
/// 3-pixel-tall words separated by 4-pixel spaces on a 12-pixel line pitch. Line ends are
/// ragged by up to 15 pixels. The whitespace gutters are centred on multiples of 200.
pub fn text_columns_page(columns: u32, height: u32) -> GrayImage {
    let width = columns * 200;
    let mut img = GrayImage::from_pixel(width, height, PAPER);
    for c in 0..columns {
        let left = c * 200 + 21;
        for (row, y0) in (0..height.saturating_sub(3)).step_by(12).enumerate() {
            let last_ink = c * 200 + 179 - 5 * (row as u32 % 4);
            let mut x = left;
            let mut word = 0u32;
            while x <= last_ink {
                // Words of 9 to 17 pixels
                let word_end = (x + 9 + (word * 7 + row as u32) % 9).min(last_ink + 1);
                for wx in x..word_end {
                    for y in y0..y0 + 3 {
                        img.put_pixel(wx, y, INK);
                    }
                }
                x = word_end + 4;
                word += 1;
            }
            // The final word always reaches the line end
            for y in y0..y0 + 3 {
                img.put_pixel(last_ink, y, INK);
            }
        }
    }
    img
}

/// Bytes that carry a page-image extension but decode as nothing
pub const CORRUPT_PAGE: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png";
