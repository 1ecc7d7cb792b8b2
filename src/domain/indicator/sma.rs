//! Simple Moving Average.
//!
//! SMA(n)[i] = sum(C[i-j] for j in 0..n) / n
//! Warmup: first (n-1) indices are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_sma(closes: &[f64], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(closes.len());

    if period == 0 {
        values.resize(
            closes.len(),
            IndicatorSeries::invalid_point(IndicatorValue::Simple(0.0)),
        );
        return IndicatorSeries {
            indicator_type: IndicatorType::Sma(period),
            values,
        };
    }

    for i in 0..closes.len() {
        if i + 1 >= period {
            // Summed per window so each value is independent of earlier rounding.
            let mean = closes[i + 1 - period..=i].iter().sum::<f64>() / period as f64;
            values.push(IndicatorPoint {
                valid: true,
                value: IndicatorValue::Simple(mean),
            });
        } else {
            values.push(IndicatorSeries::invalid_point(IndicatorValue::Simple(0.0)));
        }
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
