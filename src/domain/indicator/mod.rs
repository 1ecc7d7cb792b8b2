//! Technical indicator implementations.
//!
//! Indicators are pure functions over an ordered close-price slice:
//! - `IndicatorPoint`: one index of an indicator series, `valid == false` during warmup
//! - `IndicatorValue`: the output shape (single value or band triple)
//! - `IndicatorType`: indicator identity + parameters, usable as a memo key
//! - `IndicatorSeries`: a full series aligned index-for-index with its input

pub mod bollinger;
pub mod rsi;
pub mod sma;
pub mod stddev;

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Bollinger { upper: f64, middle: f64, lower: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Rsi(usize),
    Stddev(usize),
    /// The multiplier is stored as raw `f64` bits so the key stays hashable.
    Bollinger { period: usize, std_dev_bits: u64 },
}

impl IndicatorType {
    pub fn bollinger(period: usize, std_dev: f64) -> Self {
        IndicatorType::Bollinger {
            period,
            std_dev_bits: std_dev.to_bits(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub(crate) fn invalid_point(value: IndicatorValue) -> IndicatorPoint {
        IndicatorPoint {
            valid: false,
            value,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index` for single-valued indicators, `None` during warmup.
    pub fn simple_at(&self, index: usize) -> Option<f64> {
        match self.values.get(index) {
            Some(IndicatorPoint {
                valid: true,
                value: IndicatorValue::Simple(v),
            }) => Some(*v),
            _ => None,
        }
    }

    /// `(upper, middle, lower)` at `index` for band indicators.
    pub fn bands_at(&self, index: usize) -> Option<(f64, f64, f64)> {
        match self.values.get(index) {
            Some(IndicatorPoint {
                valid: true,
                value:
                    IndicatorValue::Bollinger {
                        upper,
                        middle,
                        lower,
                    },
            }) => Some((*upper, *middle, *lower)),
            _ => None,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::Bollinger {
                period,
                std_dev_bits,
            } => write!(f, "BOLLINGER({},{})", period, f64::from_bits(*std_dev_bits)),
        }
    }
}
