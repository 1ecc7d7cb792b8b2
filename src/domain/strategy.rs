//! Strategy selection and parameters.
//!
//! Strategies form a closed set: adding one means adding a variant here and
//! an arm to every `match` on it, which the compiler enforces.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::calendar::DcaInterval;
use crate::domain::error::BacktestError;
use crate::domain::indicator::IndicatorType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "params", rename_all = "snake_case")]
pub enum StrategyParams {
    BuyAndHold,
    Dca {
        interval: DcaInterval,
        amount: f64,
    },
    MaCrossover {
        short_window: usize,
        long_window: usize,
    },
    Rsi {
        period: usize,
        oversold: f64,
        overbought: f64,
    },
    BollingerBands {
        window: usize,
        std_dev: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    BuyAndHold,
    Dca,
    MaCrossover,
    Rsi,
    BollingerBands,
}

impl StrategyKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "buy_and_hold" => Some(StrategyKind::BuyAndHold),
            "dca" => Some(StrategyKind::Dca),
            "ma_crossover" => Some(StrategyKind::MaCrossover),
            "rsi" => Some(StrategyKind::Rsi),
            "bollinger_bands" => Some(StrategyKind::BollingerBands),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StrategyKind::BuyAndHold => "buy_and_hold",
            StrategyKind::Dca => "dca",
            StrategyKind::MaCrossover => "ma_crossover",
            StrategyKind::Rsi => "rsi",
            StrategyKind::BollingerBands => "bollinger_bands",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl StrategyParams {
    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyParams::BuyAndHold => StrategyKind::BuyAndHold,
            StrategyParams::Dca { .. } => StrategyKind::Dca,
            StrategyParams::MaCrossover { .. } => StrategyKind::MaCrossover,
            StrategyParams::Rsi { .. } => StrategyKind::Rsi,
            StrategyParams::BollingerBands { .. } => StrategyKind::BollingerBands,
        }
    }

    /// True when the strategy deploys the caller's capital. DCA brings its
    /// own money on a schedule instead.
    pub fn uses_capital(&self) -> bool {
        !matches!(self, StrategyParams::Dca { .. })
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        match *self {
            StrategyParams::BuyAndHold => Ok(()),
            StrategyParams::Dca { amount, .. } => {
                if !(amount.is_finite() && amount > 0.0) {
                    return Err(BacktestError::invalid("dca amount must be positive"));
                }
                Ok(())
            }
            StrategyParams::MaCrossover {
                short_window,
                long_window,
            } => {
                if short_window == 0 {
                    return Err(BacktestError::invalid("short_window must be at least 1"));
                }
                if short_window >= long_window {
                    return Err(BacktestError::invalid(
                        "short_window must be less than long_window",
                    ));
                }
                Ok(())
            }
            StrategyParams::Rsi {
                period,
                oversold,
                overbought,
            } => {
                if period == 0 {
                    return Err(BacktestError::invalid("rsi period must be at least 1"));
                }
                if !(0.0..=100.0).contains(&oversold) || !(0.0..=100.0).contains(&overbought) {
                    return Err(BacktestError::invalid(
                        "rsi thresholds must be between 0 and 100",
                    ));
                }
                if oversold >= overbought {
                    return Err(BacktestError::invalid("oversold must be less than overbought"));
                }
                Ok(())
            }
            StrategyParams::BollingerBands { window, std_dev } => {
                if window < 2 {
                    return Err(BacktestError::invalid(
                        "bollinger window must be at least 2",
                    ));
                }
                if !(std_dev.is_finite() && std_dev > 0.0) {
                    return Err(BacktestError::invalid("bollinger std_dev must be positive"));
                }
                Ok(())
            }
        }
    }

    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        match *self {
            StrategyParams::BuyAndHold | StrategyParams::Dca { .. } => vec![],
            StrategyParams::MaCrossover {
                short_window,
                long_window,
            } => vec![IndicatorType::Sma(short_window), IndicatorType::Sma(long_window)],
            StrategyParams::Rsi { period, .. } => vec![IndicatorType::Rsi(period)],
            StrategyParams::BollingerBands { window, std_dev } => {
                vec![IndicatorType::bollinger(window, std_dev)]
            }
        }
    }
}
