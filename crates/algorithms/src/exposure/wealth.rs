//! Wealth index aggregates

use floodrisk_core::FeatureCollection;

/// Mean, minimum and maximum of a set of wealth samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WealthStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Aggregate wealth samples, skipping NaN.
///
/// `None` when no sample remains: an empty set is "no data", not zero.
pub fn wealth_stats(values: impl IntoIterator<Item = f64>) -> Option<WealthStats> {
    let mut count = 0usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for v in values.into_iter().filter(|v| !v.is_nan()) {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }

    (count > 0).then(|| WealthStats {
        mean: sum / count as f64,
        min,
        max,
        count,
    })
}

/// [`wealth_stats`] over the numeric `attribute` of every feature
pub fn layer_wealth_stats(fc: &FeatureCollection, attribute: &str) -> Option<WealthStats> {
    wealth_stats(fc.iter().filter_map(|f| f.get_f64(attribute)))
}
