// src/utils/stats.rs
//! Order statistics on window-sized vectors

/// Sorted copy using IEEE total ordering
fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    sorted
}

/// `p`-th percentile (0..=100) with linear interpolation between order statistics
///
/// Matches numpy's default method: rank `p / 100 * (n - 1)`.
/// Returns `None` for an empty slice.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(percentile_sorted(&sorted(values), p))
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
    }
}

/// Median, `None` for an empty slice
pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 50.0)
}

/// Median of absolute values
pub fn median_absolute(values: &[f64]) -> Option<f64> {
    let magnitudes: Vec<f64> = values.iter().map(|v| v.abs()).collect();
    median(&magnitudes)
}
