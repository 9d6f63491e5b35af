//! Day-over-day change series derived from price and volume levels.

use ndarray::{Array1, ArrayView1};

/// Relative change `x_t / x_{t-1} - 1`.
///
/// The first value has no prior day and is `0.0`. Any step touching a `NaN`
/// level, or starting from a zero level, is `NaN`.
pub fn pct_change(levels: ArrayView1<f64>) -> Array1<f64> {
    let mut changes = Array1::zeros(levels.len());
    for t in 1..levels.len() {
        let prev = levels[t - 1];
        let current = levels[t];
        changes[t] = if prev.is_nan() || current.is_nan() || prev == 0.0 {
            f64::NAN
        } else {
            current / prev - 1.0
        };
    }
    changes
}

/// Volume relative to its trailing mean: `v_t / mean(v_{t-k}..v_{t-1}) - 1`.
///
/// With `lookback == 1` this is the plain day-over-day change. Early days with
/// fewer than `lookback` predecessors use the ones available; the first day
/// is `0.0`.
pub fn relative_volume_change(volumes: ArrayView1<f64>, lookback: usize) -> Array1<f64> {
    let lookback = lookback.max(1);
    let mut changes = Array1::zeros(volumes.len());
    for t in 1..volumes.len() {
        let start = t.saturating_sub(lookback);
        let trailing = volumes.slice(ndarray::s![start..t]);
        let base = trailing.sum() / trailing.len() as f64;
        let current = volumes[t];
        changes[t] = if base.is_nan() || current.is_nan() || base == 0.0 {
            f64::NAN
        } else {
            current / base - 1.0
        };
    }
    changes
}

/// Replaces every `NaN` with `value`.
pub fn fill_missing(series: &Array1<f64>, value: f64) -> Array1<f64> {
    series.mapv(|x| if x.is_nan() { value } else { x })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pct_change() {
        let prices = Array1::from(vec![100.0, 101.0, 99.99, f64::NAN, 50.0]);
        let changes = pct_change(prices.view());

        assert_eq!(changes[0], 0.0);
        assert_relative_eq!(changes[1], 0.01, epsilon = 1e-12);
        assert_relative_eq!(changes[2], -0.01, epsilon = 1e-12);
        assert!(changes[3].is_nan());
        assert!(changes[4].is_nan());
    }

    #[test]
    fn test_relative_volume_change_uses_available_history() {
        let volumes = Array1::from(vec![100.0, 200.0, 300.0, 300.0]);
        let changes = relative_volume_change(volumes.view(), 2);

        assert_eq!(changes[0], 0.0);
        // only one predecessor available
        assert_relative_eq!(changes[1], 1.0, epsilon = 1e-12);
        // mean(100, 200) = 150
        assert_relative_eq!(changes[2], 1.0, epsilon = 1e-12);
        // mean(200, 300) = 250
        assert_relative_eq!(changes[3], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_lookback_one_matches_pct_change() {
        let volumes = Array1::from(vec![10.0, 12.0, 9.0, 9.0, 18.0]);
        let a = relative_volume_change(volumes.view(), 1);
        let b = pct_change(volumes.view());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_fill_missing() {
        let series = Array1::from(vec![f64::NAN, 0.5, f64::NAN]);
        assert_eq!(fill_missing(&series, 0.0).to_vec(), vec![0.0, 0.5, 0.0]);
    }
}
