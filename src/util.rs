/// Arithmetic mean, `None` for an empty sample.
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Population standard deviation, `None` for an empty sample.
pub fn std_dev(samples: &[f64]) -> Option<f64> {
    let m = mean(samples)?;
    let variance = samples
        .iter()
        .map(|value| {
            let diff = m - *value;
            diff * diff
        })
        .sum::<f64>()
        / samples.len() as f64;

    Some(variance.sqrt())
}
