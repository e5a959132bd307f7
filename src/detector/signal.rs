// WHY: Each signal step is a pure function over slices so it can be tested apart from
// peak detection

use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Relative weight of the two evidence sources in the combined score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub divider: f64,
    pub gutter: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self { divider: 0.7, gutter: 0.3 }
    }
}

/// Sum of ink intensity down each column of the mask
pub fn column_profile(mask: &GrayImage) -> Vec<f64> {
    let width = mask.width() as usize;
    let mut sums = vec![0u64; width];
    for row in mask.as_raw().chunks_exact(width.max(1)) {
        for (sum, &value) in sums.iter_mut().zip(row) {
            *sum += u64::from(value);
        }
    }
    sums.into_iter().map(|s| s as f64).collect()
}

/// Rescale to [0, 1] by the signal's own min and max; a flat signal maps to zeros
pub fn normalize(signal: &[f64]) -> Vec<f64> {
    let (min, max) = signal
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    if range.is_nan() || range <= 0.0 {
        return vec![0.0; signal.len()];
    }
    signal.iter().map(|&v| (v - min) / range).collect()
}

/// Map a [0, 1] signal to `1 - v`, so low ink density scores high
pub fn invert(signal: &[f64]) -> Vec<f64> {
    signal.iter().map(|&v| 1.0 - v).collect()
}

/// Weighted sum of the normalized divider signal and the inverted gutter signal
pub fn combine(divider: &[f64], gutter: &[f64], weights: ScoreWeights) -> Vec<f64> {
    debug_assert_eq!(divider.len(), gutter.len());
    divider
        .iter()
        .zip(gutter)
        .map(|(&d, &g)| weights.divider * d + weights.gutter * g)
        .collect()
}

/// Normalize both raw profiles, invert the gutter profile, and combine
pub fn combined_score(divider_raw: &[f64], gutter_raw: &[f64], weights: ScoreWeights) -> Vec<f64> {
    let divider = normalize(divider_raw);
    let gutter = invert(&normalize(gutter_raw));
    combine(&divider, &gutter, weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_column_profile_sums_intensity() {
        let mut mask = GrayImage::new(3, 4);
        mask.put_pixel(1, 0, Luma([255]));
        mask.put_pixel(1, 3, Luma([255]));
        mask.put_pixel(2, 2, Luma([255]));
        assert_eq!(column_profile(&mask), vec![0.0, 510.0, 255.0]);
    }

    #[test]
    fn test_normalize_range() {
        let norm = normalize(&[10.0, 20.0, 30.0]);
        assert_eq!(norm, vec![0.0, 0.5, 1.0]);
        assert!(normalize(&[4.0, 4.0]).iter().all(|&v| v == 0.0));
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn test_gutter_is_inverted() {
        // Low ink in the middle column is the gutter
        let score = combined_score(&[0.0, 0.0, 0.0], &[100.0, 0.0, 100.0], ScoreWeights::default());
        assert_eq!(score.len(), 3);
        assert!((score[1] - 0.3).abs() < 1e-12);
        assert_eq!(score[0], 0.0);
        assert_eq!(score[2], 0.0);
    }

    #[test]
    fn test_combined_values_bounded_by_weight_sum() {
        let divider = [0.0, 5.0, 90.0, 3.0, 0.0];
        let gutter = [40.0, 12.0, 2.0, 35.0, 50.0];
        let weights = ScoreWeights::default();
        for v in combined_score(&divider, &gutter, weights) {
            assert!((0.0..=weights.divider + weights.gutter + 1e-12).contains(&v));
        }
    }

    #[test]
    fn test_custom_weights() {
        let score = combine(&[1.0, 0.0], &[0.0, 1.0], ScoreWeights { divider: 0.5, gutter: 0.5 });
        assert_eq!(score, vec![0.5, 0.5]);
    }
}
