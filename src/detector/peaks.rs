// WHY: Peak acceptance needs three simultaneous constraints (height, separation, prominence);
// plateaus resolve to their middle so a flat whitespace gutter yields a centred boundary

/// Constraints a local maximum must satisfy to be accepted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakCriteria {
    pub min_height: f64,
    pub min_prominence: f64,
    /// Minimum horizontal distance between accepted peaks, in samples
    pub min_distance: usize,
}

/// Indices of local maxima, including the middle of flat plateaus
///
/// The first and last samples are never maxima, and a plateau touching either edge is
/// not a maximum either.
pub fn local_maxima(signal: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if signal.len() < 3 {
        return peaks;
    }
    let last = signal.len() - 1;
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                let left = i;
                let right = ahead - 1;
                peaks.push((left + right) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Drop peaks closer than `distance` to a higher peak; higher peaks are kept first
pub fn select_by_distance(peaks: &[usize], signal: &[f64], distance: usize) -> Vec<usize> {
    if distance <= 1 {
        return peaks.to_vec();
    }
    let mut keep = vec![true; peaks.len()];

    // Stable ascending order by height, visited from the highest
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| signal[peaks[a]].total_cmp(&signal[peaks[b]]));

    for &i in order.iter().rev() {
        if !keep[i] {
            continue;
        }
        let mut k = i;
        while k > 0 && peaks[i] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = i + 1;
        while k < peaks.len() && peaks[k] - peaks[i] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}

/// Height of a peak above the higher of its two bases
///
/// Each base is the lowest sample between the peak and the nearest strictly higher sample
/// on that side (or the signal edge).
pub fn prominence(signal: &[f64], peak: usize) -> f64 {
    let height = signal[peak];

    let mut left_min = height;
    for &v in signal[..=peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &signal[peak..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

/// Accepted peak indices in ascending order
pub fn find_peaks(signal: &[f64], criteria: &PeakCriteria) -> Vec<usize> {
    let candidates: Vec<usize> = local_maxima(signal)
        .into_iter()
        .filter(|&p| signal[p] >= criteria.min_height)
        .collect();
    let spaced = select_by_distance(&candidates, signal, criteria.min_distance);
    spaced
        .into_iter()
        .filter(|&p| prominence(signal, p) >= criteria.min_prominence)
        .collect()
}
