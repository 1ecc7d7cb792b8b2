//! RSI (Relative Strength Index).
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n indices are invalid (need n price changes for the seed).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

pub fn calculate_rsi(closes: &[f64], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(closes.len());

    if period == 0 || closes.len() <= period {
        values.resize(
            closes.len(),
            IndicatorSeries::invalid_point(IndicatorValue::Simple(0.0)),
        );
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values,
        };
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    for _ in 0..period {
        values.push(IndicatorSeries::invalid_point(IndicatorValue::Simple(0.0)));
    }

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
    values.push(IndicatorPoint {
        valid: true,
        value: IndicatorValue::Simple(rsi_from_averages(avg_gain, avg_loss)),
    });

    for change_idx in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[change_idx]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[change_idx]) / period as f64;
        values.push(IndicatorPoint {
            valid: true,
            value: IndicatorValue::Simple(rsi_from_averages(avg_gain, avg_loss)),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}
