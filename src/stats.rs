//! Summary statistics over latency samples.

/// Arithmetic mean, or `None` for an empty slice.
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Sample standard deviation with Bessel's correction (divisor `n - 1`).
///
/// A single sample has no spread and yields `0.0`; an empty slice yields
/// `None`.
pub fn sample_std_dev(samples: &[f64]) -> Option<f64> {
    let mean = mean(samples)?;

    if samples.len() < 2 {
        return Some(0.0);
    }

    let variance = samples
        .iter()
        .map(|sample| {
            let diff = sample - mean;
            diff * diff
        })
        .sum::<f64>()
        / (samples.len() - 1) as f64;

    Some(variance.sqrt())
}
