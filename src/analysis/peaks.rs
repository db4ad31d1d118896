/// Percentile used for the default peak threshold.
pub const DEFAULT_THRESHOLD_QUANTILE: f64 = 0.85;

/// `q`-quantile (0.0..=1.0) with linear interpolation between order
/// statistics at position `q * (n - 1)`. The lerp runs from the nearer end
/// so results are exact at the order statistics. `None` for an empty series.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let t = pos - lo as f64;

    let (a, b) = (sorted[lo], sorted[hi]);
    let diff = b - a;
    Some(if t >= 0.5 { b - diff * (1.0 - t) } else { a + diff * t })
}

/// Default threshold for a smoothed series.
pub fn default_threshold(smoothed: &[f64]) -> Option<f64> {
    quantile(smoothed, DEFAULT_THRESHOLD_QUANTILE)
}

/// Count rising edges of `value > threshold`.
///
/// The state before the first sample is "not above", so a series that
/// starts above the threshold opens with one peak.
pub fn count_rising_edges(values: &[f64], threshold: f64) -> usize {
    let mut prev_above = false;
    let mut peaks = 0;
    for &v in values {
        let above = v > threshold;
        if above && !prev_above {
            peaks += 1;
        }
        prev_above = above;
    }
    peaks
}
