//! Small numeric helpers shared by the DTW variants and the aggregator.

/// Euclidean distance between two equal-length vectors.
///
/// Extra components of the longer slice are ignored; callers validate
/// dimensions beforehand.
#[inline]
#[must_use]
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Arithmetic mean, `None` for an empty input.
#[must_use]
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Map a normalized alignment cost to a `[0, 100]` score.
///
/// `score = clamp(100 - normalized_cost * scale_factor, 0, 100)`, so the
/// score never increases as the cost grows.
#[inline]
#[must_use]
pub fn cost_to_score(normalized_cost: f64, scale_factor: f64) -> f64 {
    if normalized_cost.is_nan() {
        return 0.0;
    }
    (100.0 - normalized_cost * scale_factor).clamp(0.0, 100.0)
}
