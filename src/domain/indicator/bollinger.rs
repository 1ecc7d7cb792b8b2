//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the sample standard deviation, see [`super::stddev`].
//! Warmup: first (period-1) indices are invalid.

use crate::domain::indicator::stddev::window_stats;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_bollinger(closes: &[f64], period: usize, std_dev: f64) -> IndicatorSeries {
    let mut values = Vec::with_capacity(closes.len());
    let warmup = period.saturating_sub(1);

    for i in 0..closes.len() {
        if period >= 2 && i >= warmup {
            let (middle, stddev) = window_stats(&closes[i + 1 - period..=i]);
            values.push(IndicatorPoint {
                valid: true,
                value: IndicatorValue::Bollinger {
                    upper: middle + std_dev * stddev,
                    middle,
                    lower: middle - std_dev * stddev,
                },
            });
        } else {
            values.push(IndicatorSeries::invalid_point(IndicatorValue::Bollinger {
                upper: 0.0,
                middle: 0.0,
                lower: 0.0,
            }));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::bollinger(period, std_dev),
        values,
    }
}
