//! Indicator dispatch and caller-owned memoization.
//!
//! There is no global cache: a caller that reuses indicators across
//! strategies on the same series owns the [`IndicatorMap`] for that series.

use crate::domain::indicator::bollinger::calculate_bollinger;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::stddev::calculate_stddev;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use std::collections::HashMap;

pub fn calculate(closes: &[f64], indicator_type: IndicatorType) -> IndicatorSeries {
    match indicator_type {
        IndicatorType::Sma(period) => calculate_sma(closes, period),
        IndicatorType::Rsi(period) => calculate_rsi(closes, period),
        IndicatorType::Stddev(period) => calculate_stddev(closes, period),
        IndicatorType::Bollinger {
            period,
            std_dev_bits,
        } => calculate_bollinger(closes, period, f64::from_bits(std_dev_bits)),
    }
}

pub type IndicatorMap = HashMap<IndicatorType, IndicatorSeries>;

/// Computes each distinct indicator once over `closes`.
pub fn compute_indicators(closes: &[f64], indicator_types: &[IndicatorType]) -> IndicatorMap {
    let mut out = HashMap::with_capacity(indicator_types.len());
    for &indicator_type in indicator_types {
        out.entry(indicator_type)
            .or_insert_with(|| calculate(closes, indicator_type));
    }
    out
}
