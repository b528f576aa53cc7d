//! Linear attribute quantization.

/// Quantize values to `bits` of precision and reconstruct them immediately.
///
/// Each value is mapped linearly from `[min, max]` onto `[0, 2^bits - 1]`,
/// rounded to the nearest step and mapped back. The reconstruction differs
/// from the input by at most [`max_error`]. If every value is equal, or the
/// range is not finite, the input is returned unchanged.
///
/// `bits` is clamped to `1..=31`.
#[must_use]
pub fn quantize(values: &[f64], bits: u32) -> Vec<f64> {
    let Some((min, max)) = min_max(values) else {
        return Vec::new();
    };

    let range = max - min;
    if range == 0.0 || !range.is_finite() {
        return values.to_vec();
    }

    let steps = step_count(bits);
    values
        .iter()
        .map(|&value| {
            let normalized = (value - min) / range;
            let level = (normalized * steps).round();
            (level / steps) * range + min
        })
        .collect()
}

/// Upper bound on the per-element error of [`quantize`] for this range.
#[must_use]
pub fn max_error(min: f64, max: f64, bits: u32) -> f64 {
    (max - min) / step_count(bits)
}

/// Minimum and maximum of a slice, ignoring NaN.
#[must_use]
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((min, max))
}

fn step_count(bits: u32) -> f64 {
    f64::from((1u32 << bits.clamp(1, 31)) - 1)
}
