//! Summary statistics over sample lists

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Maximum value, 0 for an empty slice
pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

/// Percentile with linear interpolation between closest ranks
///
/// Sorts the samples and evaluates position `k = (n - 1) * p / 100`. When
/// `k` falls between two ranks the result is
/// `v[floor(k)] * (ceil(k) - k) + v[ceil(k)] * (k - floor(k))`.
/// Returns 0 for an empty slice.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let k = (sorted.len() - 1) as f64 * (p.clamp(0.0, 100.0) / 100.0);
    let lower = k.floor();
    let upper = k.ceil();
    if lower == upper {
        return sorted[k as usize];
    }
    sorted[lower as usize] * (upper - k) + sorted[upper as usize] * (k - lower)
}
