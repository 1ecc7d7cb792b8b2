//! Rolling standard deviation.
//!
//! Sample standard deviation over n closing prices (divides by n-1).
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n) / (n - 1))
//! Warmup: first (n-1) indices are invalid; n < 2 is never valid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

/// `(mean, sample stddev)` of a window with at least two values.
pub(crate) fn window_stats(window: &[f64]) -> (f64, f64) {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|c| {
            let diff = c - mean;
            diff * diff
        })
        .sum::<f64>()
        / (n - 1.0);
    (mean, variance.sqrt())
}

pub fn calculate_stddev(closes: &[f64], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(closes.len());
    let warmup = period.saturating_sub(1);

    for i in 0..closes.len() {
        if period >= 2 && i >= warmup {
            let (_, stddev) = window_stats(&closes[i + 1 - period..=i]);
            values.push(IndicatorPoint {
                valid: true,
                value: IndicatorValue::Simple(stddev),
            });
        } else {
            values.push(IndicatorSeries::invalid_point(IndicatorValue::Simple(0.0)));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Stddev(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stddev_warmup() {
        let series = calculate_stddev(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn stddev_constant_values() {
        let series = calculate_stddev(&[100.0; 5], 3);
        assert_eq!(series.simple_at(2), Some(0.0));
    }

    #[test]
    fn stddev_sample_known_values() {
        // mean 5, squared deviations sum 32, n-1 = 7
        let series = calculate_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8);
        let v = series.simple_at(7).unwrap();
        assert!((v - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn stddev_period_one_never_valid() {
        let series = calculate_stddev(&[1.0, 2.0, 3.0], 1);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn stddev_indicator_type() {
        assert_eq!(calculate_stddev(&[1.0], 5).indicator_type, IndicatorType::Stddev(5));
    }
}
