//! Sample reduction.

/// Median and mean of one scenario's samples, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// The element at index `n / 2` of the ascending sort.
    pub median: f64,
    /// Arithmetic mean.
    pub mean: f64,
}

/// Reduce a sample set to its summary figures.
///
/// The median is the element at index `n / 2` of the ascending sort. For
/// even lengths that is the upper of the two middle elements, so
/// `[10.0, 20.0]` reduces to `20.0`. Scenario comparisons rely on this
/// convention staying fixed; do not change it to midpoint averaging.
///
/// # Panics
/// Panics if `samples` is empty.
#[must_use]
pub fn reduce(samples: &[f64]) -> Summary {
    assert!(!samples.is_empty(), "cannot reduce an empty sample set");
    let mut sorted = samples.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    let median = sorted[sorted.len() / 2];
    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    Summary { median, mean }
}
