//! Weighted multi-symbol portfolio with optional periodic rebalancing.
//!
//! Rebalancing is segment composition: each segment is an independent engine
//! run per holding, started from that holding's target share of the previous
//! segment's ending total. Segment curves are concatenated; no engine state
//! carries across a boundary.
//!
//! DCA has no starting capital, so a DCA segment after the first buys its
//! carried share at the segment's opening price and then restarts the
//! contribution schedule from the segment start.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::account::EquityPoint;
use super::backtest::{simulate_segment, BacktestConfig, Simulation};
use super::calendar::{rebalance_boundaries, RebalanceInterval};
use super::cancel::CancelToken;
use super::error::BacktestError;
use super::metrics::{in_market_mask, PerformanceMetrics};
use super::price::{slice_range, PriceBasis};
use super::strategy::StrategyParams;
use super::symbol_data::{build_common_timeline, SymbolData};
use super::trade::{pair_round_trips, RoundTrip, TradeRecord};

pub const MIN_HOLDINGS: usize = 2;
pub const MAX_HOLDINGS: usize = 5;
pub const WEIGHT_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub weight: f64,
}

impl Holding {
    pub fn new(symbol: impl Into<String>, weight: f64) -> Self {
        Holding {
            symbol: symbol.into(),
            weight,
        }
    }
}

pub fn validate_holdings(holdings: &[Holding]) -> Result<(), BacktestError> {
    if !(MIN_HOLDINGS..=MAX_HOLDINGS).contains(&holdings.len()) {
        return Err(BacktestError::invalid(format!(
            "portfolio needs {} to {} holdings, got {}",
            MIN_HOLDINGS,
            MAX_HOLDINGS,
            holdings.len()
        )));
    }

    let mut seen = HashSet::new();
    for holding in holdings {
        if holding.symbol.trim().is_empty() {
            return Err(BacktestError::invalid("holding symbol must not be empty"));
        }
        if !seen.insert(holding.symbol.trim().to_uppercase()) {
            return Err(BacktestError::invalid(format!(
                "duplicate holding {}",
                holding.symbol
            )));
        }
        if !(holding.weight.is_finite() && holding.weight > 0.0 && holding.weight < 1.0) {
            return Err(BacktestError::invalid(format!(
                "weight for {} must be between 0 and 1, got {}",
                holding.symbol, holding.weight
            )));
        }
    }

    let total: f64 = holdings.iter().map(|h| h.weight).sum();
    // 1e-9 absorbs summation error at the tolerance edge.
    if (total - 1.0).abs() > WEIGHT_TOLERANCE + 1e-9 {
        return Err(BacktestError::invalid(format!(
            "holding weights must sum to 1.0 (+/- {}), got {:.4}",
            WEIGHT_TOLERANCE, total
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceSchedule {
    pub interval: RebalanceInterval,
}

impl RebalanceSchedule {
    pub fn new(interval: RebalanceInterval) -> Self {
        RebalanceSchedule { interval }
    }

    /// Inclusive `(start, end)` index ranges over `trading_days`, one per
    /// segment. A single segment when no boundary falls inside.
    pub fn segments(&self, trading_days: &[NaiveDate]) -> Vec<(usize, usize)> {
        if trading_days.is_empty() {
            return Vec::new();
        }
        let mut starts = vec![0];
        starts.extend(rebalance_boundaries(trading_days, self.interval));

        starts
            .iter()
            .enumerate()
            .map(|(k, &start)| {
                let end = starts
                    .get(k + 1)
                    .map_or(trading_days.len() - 1, |next| next - 1);
                (start, end)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingResult {
    pub symbol: String,
    pub weight: f64,
    pub allocated_capital: f64,
    pub total_invested: f64,
    pub final_value: f64,
    pub metrics: PerformanceMetrics,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioResult {
    #[serde(flatten)]
    pub strategy: StrategyParams,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub price_basis: PriceBasis,
    pub initial_capital: f64,
    pub rebalance: Option<RebalanceInterval>,
    pub rebalance_dates: Vec<NaiveDate>,
    pub total_invested: f64,
    pub final_value: f64,
    pub metrics: PerformanceMetrics,
    pub equity_curve: Vec<EquityPoint>,
    pub holdings: Vec<HoldingResult>,
}

/// One holding's output accumulated across segments.
#[derive(Debug, Default)]
struct HoldingTrack {
    equity_curve: Vec<EquityPoint>,
    trades: Vec<TradeRecord>,
    in_market: Vec<bool>,
    round_trips: Vec<RoundTrip>,
    contributed: f64,
}

impl HoldingTrack {
    fn append(&mut self, simulation: Simulation) {
        self.in_market
            .extend(in_market_mask(&simulation.equity_curve, &simulation.trades));
        self.round_trips
            .extend(pair_round_trips(&simulation.trades));
        self.contributed += simulation.total_invested;
        self.equity_curve.extend(simulation.equity_curve);
        self.trades.extend(simulation.trades);
    }

    fn final_value(&self) -> f64 {
        self.equity_curve.last().map_or(0.0, |p| p.value)
    }
}

/// Runs `strategy` on every holding over the dates all holdings share.
///
/// `data` must hold one series per holding, in holding order.
pub fn run_portfolio(
    data: &[SymbolData],
    holdings: &[Holding],
    config: &BacktestConfig,
    strategy: &StrategyParams,
    rebalance: Option<RebalanceSchedule>,
    cancel: &CancelToken,
) -> Result<PortfolioResult, BacktestError> {
    validate_holdings(holdings)?;
    config.validate()?;
    strategy.validate()?;

    if data.len() != holdings.len()
        || data
            .iter()
            .zip(holdings)
            .any(|(d, h)| !d.symbol.eq_ignore_ascii_case(h.symbol.trim()))
    {
        return Err(BacktestError::invalid(
            "price data does not line up with holdings",
        ));
    }

    for series in data {
        if slice_range(&series.prices, config.date_from, config.date_to).is_empty() {
            return Err(BacktestError::DataNotFound {
                symbol: series.symbol.clone(),
                date_from: config.date_from,
                date_to: config.date_to,
            });
        }
    }

    let timeline = build_common_timeline(data, config.date_from, config.date_to);
    if timeline.is_empty() {
        return Err(BacktestError::NoCommonDates {
            symbols: data
                .iter()
                .map(|d| d.symbol.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            date_from: config.date_from,
            date_to: config.date_to,
        });
    }
    let aligned: Vec<SymbolData> = data.iter().map(|d| d.restrict_to(&timeline)).collect();

    let segments = match rebalance {
        Some(schedule) => schedule.segments(&timeline),
        None => vec![(0, timeline.len() - 1)],
    };

    tracing::debug!(
        holdings = holdings.len(),
        days = timeline.len(),
        segments = segments.len(),
        strategy = %strategy.kind(),
        "running portfolio"
    );

    let mut tracks: Vec<HoldingTrack> = holdings.iter().map(|_| HoldingTrack::default()).collect();
    let mut segment_capital = config.initial_capital;

    for (k, &(start, end)) in segments.iter().enumerate() {
        // A single unrebalanced segment keeps the requested range so DCA
        // schedules step from the caller's date_from.
        let (seg_from, seg_to) = if rebalance.is_some() {
            (timeline[start], timeline[end])
        } else {
            (config.date_from, config.date_to)
        };

        let simulations: Vec<Simulation> = aligned
            .par_iter()
            .zip(holdings.par_iter())
            .map(|(series, holding)| {
                let target = segment_capital * holding.weight;
                let (initial_capital, carried) = if strategy.uses_capital() {
                    (target, 0.0)
                } else if k == 0 {
                    (config.initial_capital * holding.weight, 0.0)
                } else {
                    // DCA carries the redistributed value and keeps contributing.
                    (config.initial_capital * holding.weight, target)
                };
                let seg_config = BacktestConfig {
                    date_from: seg_from,
                    date_to: seg_to,
                    initial_capital,
                    price_basis: config.price_basis,
                };
                simulate_segment(series, &seg_config, strategy, carried, cancel)
            })
            .collect::<Result<_, _>>()?;

        for (track, simulation) in tracks.iter_mut().zip(simulations) {
            track.append(simulation);
        }
        segment_capital = tracks.iter().map(HoldingTrack::final_value).sum();

        tracing::debug!(
            from = %seg_from,
            to = %seg_to,
            ending_value = segment_capital,
            "segment complete"
        );
    }

    let equity_curve: Vec<EquityPoint> = timeline
        .iter()
        .enumerate()
        .map(|(i, &date)| EquityPoint {
            date,
            value: tracks.iter().map(|t| t.equity_curve[i].value).sum(),
        })
        .collect();

    let in_market: Vec<bool> = (0..timeline.len())
        .map(|i| tracks.iter().any(|t| t.in_market[i]))
        .collect();

    let holding_results: Vec<HoldingResult> = holdings
        .iter()
        .zip(tracks)
        .map(|(holding, track)| {
            let allocated_capital = config.initial_capital * holding.weight;
            let total_invested = if strategy.uses_capital() {
                allocated_capital
            } else {
                track.contributed
            };
            let metrics =
                PerformanceMetrics::from_curve(&track.equity_curve, total_invested, &track.in_market)
                    .with_round_trips(&track.round_trips);
            HoldingResult {
                symbol: holding.symbol.clone(),
                weight: holding.weight,
                allocated_capital,
                total_invested,
                final_value: track.final_value(),
                metrics,
                equity_curve: track.equity_curve,
                trades: track.trades,
            }
        })
        .collect();

    let total_invested: f64 = holding_results.iter().map(|h| h.total_invested).sum();
    let final_value = equity_curve.last().map_or(0.0, |p| p.value);
    let basis = if strategy.uses_capital() {
        config.initial_capital
    } else {
        total_invested
    };
    let metrics = PerformanceMetrics::from_curve(&equity_curve, basis, &in_market);

    Ok(PortfolioResult {
        strategy: strategy.clone(),
        date_from: timeline[0],
        date_to: timeline[timeline.len() - 1],
        price_basis: config.price_basis,
        initial_capital: config.initial_capital,
        rebalance: rebalance.map(|r| r.interval),
        rebalance_dates: segments.iter().skip(1).map(|&(start, _)| timeline[start]).collect(),
        total_invested,
        final_value,
        metrics,
        equity_curve,
        holdings: holding_results,
    })
}
