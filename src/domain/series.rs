// Sample series aggregation

/// Arithmetic mean of the samples; an empty series averages to 0.
///
/// Non-finite samples are not filtered, so a single NaN poisons the mean.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}
