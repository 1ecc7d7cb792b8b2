//! Performance metrics derived from an equity curve and trade log.
//!
//! A zero denominator never raises: the affected field is `None`
//! (or `0.0` for the ratio fields that are always reported).

use chrono::Datelike;
use serde::Serialize;

use super::account::EquityPoint;
use super::trade::{pair_round_trips, RoundTrip, TradeAction, TradeRecord};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub total_return: Option<f64>,
    pub cagr: Option<f64>,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub volatility: f64,
    pub calmar_ratio: Option<f64>,
    pub best_year: Option<f64>,
    pub worst_year: Option<f64>,
    pub recovery_days: Option<i64>,
    pub win_rate: Option<f64>,
    pub profit_factor: Option<f64>,
    pub time_in_market: f64,
}

impl PerformanceMetrics {
    /// `basis` is the money put in: initial capital, or total contributions
    /// for DCA.
    pub fn compute(equity_curve: &[EquityPoint], trades: &[TradeRecord], basis: f64) -> Self {
        let in_market = in_market_mask(equity_curve, trades);
        Self::from_curve(equity_curve, basis, &in_market)
            .with_round_trips(&pair_round_trips(trades))
    }

    /// Fills the trade-derived fields from completed round trips.
    pub fn with_round_trips(self, trips: &[RoundTrip]) -> Self {
        PerformanceMetrics {
            win_rate: win_rate(trips),
            profit_factor: profit_factor(trips),
            ..self
        }
    }

    /// Curve-only metrics. Trade-derived fields are left `None`; used for
    /// aggregate curves that have no single trade log.
    pub fn from_curve(equity_curve: &[EquityPoint], basis: f64, in_market: &[bool]) -> Self {
        let final_value = equity_curve.last().map(|p| p.value);

        let total_return = match final_value {
            Some(final_value) if basis > 0.0 => Some(final_value / basis - 1.0),
            _ => None,
        };

        let cagr = compute_cagr(equity_curve, basis);
        let drawdown = compute_drawdown(equity_curve);
        let (sharpe_ratio, volatility) = compute_risk_adjusted(equity_curve);

        let calmar_ratio = match cagr {
            Some(cagr) if drawdown.max_drawdown < 0.0 => Some(cagr / drawdown.max_drawdown.abs()),
            _ => None,
        };

        let (best_year, worst_year) = best_and_worst_year(equity_curve);

        let time_in_market = if in_market.is_empty() {
            0.0
        } else {
            in_market.iter().filter(|&&held| held).count() as f64 / in_market.len() as f64
        };

        PerformanceMetrics {
            total_return,
            cagr,
            sharpe_ratio,
            max_drawdown: drawdown.max_drawdown,
            volatility,
            calmar_ratio,
            best_year,
            worst_year,
            recovery_days: compute_recovery_days(equity_curve, &drawdown),
            win_rate: None,
            profit_factor: None,
            time_in_market,
        }
    }
}

/// Whether a position was open at the close of each equity date.
///
/// Every SELL liquidates the whole position, so the last trade on or before a
/// date decides it.
pub fn in_market_mask(equity_curve: &[EquityPoint], trades: &[TradeRecord]) -> Vec<bool> {
    let mut holding = false;
    let mut next = 0;

    equity_curve
        .iter()
        .map(|point| {
            while let Some(trade) = trades.get(next) {
                if trade.date > point.date {
                    break;
                }
                holding = trade.action == TradeAction::Buy;
                next += 1;
            }
            holding
        })
        .collect()
}

fn compute_cagr(equity_curve: &[EquityPoint], basis: f64) -> Option<f64> {
    let first = equity_curve.first()?;
    let last = equity_curve.last()?;
    if basis <= 0.0 {
        return None;
    }
    let days = (last.date - first.date).num_days();
    let growth = last.value / basis;
    if days <= 0 || growth <= 0.0 {
        return None;
    }
    Some(growth.powf(DAYS_PER_YEAR / days as f64) - 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Drawdown {
    max_drawdown: f64,
    peak_index: usize,
    trough_index: usize,
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> Drawdown {
    let mut result = Drawdown {
        max_drawdown: 0.0,
        peak_index: 0,
        trough_index: 0,
    };
    let Some(first) = equity_curve.first() else {
        return result;
    };

    let mut peak = first.value;
    let mut peak_index = 0;

    for (i, point) in equity_curve.iter().enumerate() {
        if point.value > peak {
            peak = point.value;
            peak_index = i;
        } else if peak > 0.0 {
            let dd = point.value / peak - 1.0;
            if dd < result.max_drawdown {
                result = Drawdown {
                    max_drawdown: dd,
                    peak_index,
                    trough_index: i,
                };
            }
        }
    }

    result
}

fn compute_recovery_days(equity_curve: &[EquityPoint], drawdown: &Drawdown) -> Option<i64> {
    if drawdown.max_drawdown >= 0.0 {
        return None;
    }
    let peak = equity_curve.get(drawdown.peak_index)?.value;
    let trough = equity_curve.get(drawdown.trough_index)?;

    equity_curve[drawdown.trough_index + 1..]
        .iter()
        .find(|p| p.value >= peak)
        .map(|p| (p.date - trough.date).num_days())
}

/// Simple day-over-day returns; a non-positive previous value yields 0.
pub fn daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].value;
            if prev > 0.0 {
                w[1].value / prev - 1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Annualized (sharpe, volatility) with a zero risk-free rate.
fn compute_risk_adjusted(equity_curve: &[EquityPoint]) -> (f64, f64) {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return (0.0, 0.0);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    let annualizer = TRADING_DAYS_PER_YEAR.sqrt();
    let sharpe = if stddev > 0.0 {
        mean / stddev * annualizer
    } else {
        0.0
    };

    (sharpe, stddev * annualizer)
}

/// Return of each calendar year, from its first to its last equity point.
/// Years with a single point are skipped.
pub fn yearly_returns(equity_curve: &[EquityPoint]) -> Vec<(i32, f64)> {
    let mut out = Vec::new();
    let mut start = 0;

    while start < equity_curve.len() {
        let year = equity_curve[start].date.year();
        let len = equity_curve[start..]
            .iter()
            .take_while(|p| p.date.year() == year)
            .count();
        let first = &equity_curve[start];
        let last = &equity_curve[start + len - 1];
        if len >= 2 && first.value > 0.0 {
            out.push((year, last.value / first.value - 1.0));
        }
        start += len;
    }

    out
}

fn best_and_worst_year(equity_curve: &[EquityPoint]) -> (Option<f64>, Option<f64>) {
    let (Some(first), Some(last)) = (equity_curve.first(), equity_curve.last()) else {
        return (None, None);
    };
    if (last.date - first.date).num_days() < 365 {
        return (None, None);
    }

    let returns = yearly_returns(equity_curve);
    let best = returns.iter().map(|&(_, r)| r).reduce(f64::max);
    let worst = returns.iter().map(|&(_, r)| r).reduce(f64::min);
    (best, worst)
}

fn win_rate(trips: &[RoundTrip]) -> Option<f64> {
    if trips.is_empty() {
        return None;
    }
    let wins = trips.iter().filter(|t| t.is_win()).count();
    Some(wins as f64 / trips.len() as f64)
}

fn profit_factor(trips: &[RoundTrip]) -> Option<f64> {
    let gross_loss: f64 = trips.iter().filter(|t| t.is_loss()).map(|t| -t.pnl).sum();
    if gross_loss <= 0.0 {
        return None;
    }
    let gross_profit: f64 = trips.iter().filter(|t| t.is_win()).map(|t| t.pnl).sum();
    Some(gross_profit / gross_loss)
}
