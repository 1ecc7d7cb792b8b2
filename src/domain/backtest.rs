//! Strategy execution engine.
//!
//! One strategy over one symbol's in-range prices. The engine is the only
//! producer of trades and equity points; every other component reads its
//! output.

use chrono::NaiveDate;
use serde::Serialize;

use super::account::{Account, EquityPoint};
use super::calendar::{dca_schedule, snap_to_trading_days};
use super::cancel::CancelToken;
use super::error::BacktestError;
use super::execution::{contribute_and_buy, enter_all_in, exit_all, EntryResult};
use super::indicator::{IndicatorSeries, IndicatorType};
use super::indicator_helpers::{compute_indicators, IndicatorMap};
use super::metrics::PerformanceMetrics;
use super::price::{closes, slice_range, PriceBasis, PricePoint};
use super::strategy::{StrategyKind, StrategyParams};
use super::symbol_data::SymbolData;
use super::trade::TradeRecord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestConfig {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub initial_capital: f64,
    pub price_basis: PriceBasis,
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.date_from > self.date_to {
            return Err(BacktestError::invalid(format!(
                "date_from {} is after date_to {}",
                self.date_from, self.date_to
            )));
        }
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(BacktestError::invalid("initial capital must be positive"));
        }
        Ok(())
    }
}

/// Raw engine output for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    pub total_invested: f64,
    pub final_value: f64,
}

/// The in-range slice of one symbol, priced on the configured basis.
#[derive(Debug, Clone)]
pub struct PriceWindow<'a> {
    pub symbol: &'a str,
    pub points: &'a [PricePoint],
    pub dates: Vec<NaiveDate>,
    pub prices: Vec<f64>,
}

impl<'a> PriceWindow<'a> {
    pub fn new(data: &'a SymbolData, config: &BacktestConfig) -> Result<Self, BacktestError> {
        let points = slice_range(&data.prices, config.date_from, config.date_to);
        if points.is_empty() {
            return Err(BacktestError::DataNotFound {
                symbol: data.symbol.clone(),
                date_from: config.date_from,
                date_to: config.date_to,
            });
        }
        Ok(PriceWindow {
            symbol: &data.symbol,
            points,
            dates: points.iter().map(|p| p.date).collect(),
            prices: closes(points, config.price_basis),
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn indicators_for(&self, strategies: &[StrategyParams]) -> IndicatorMap {
        let types: Vec<IndicatorType> = strategies
            .iter()
            .flat_map(|s| s.required_indicators())
            .collect();
        compute_indicators(&self.prices, &types)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Signal {
    Hold,
    Enter,
    Exit,
}

/// Runs `strategy` over `data` restricted to the configured range.
pub fn simulate(
    data: &SymbolData,
    config: &BacktestConfig,
    strategy: &StrategyParams,
    cancel: &CancelToken,
) -> Result<Simulation, BacktestError> {
    config.validate()?;
    strategy.validate()?;

    let window = PriceWindow::new(data, config)?;
    let indicators = window.indicators_for(std::slice::from_ref(strategy));
    simulate_window(&window, &indicators, config, strategy, cancel)
}

/// Runs one rebalance segment. A DCA segment opens by buying `carried`, the
/// value brought over from the previous segment; capital strategies start
/// from `config.initial_capital` and ignore it.
pub fn simulate_segment(
    data: &SymbolData,
    config: &BacktestConfig,
    strategy: &StrategyParams,
    carried: f64,
    cancel: &CancelToken,
) -> Result<Simulation, BacktestError> {
    config.validate()?;
    strategy.validate()?;

    let window = PriceWindow::new(data, config)?;
    let indicators = window.indicators_for(std::slice::from_ref(strategy));
    run_days(&window, &indicators, config, strategy, carried, cancel)
}

/// Runs `strategy` over a prepared window. `indicators` must hold every
/// series `strategy.required_indicators()` names, computed over the window.
pub fn simulate_window(
    window: &PriceWindow<'_>,
    indicators: &IndicatorMap,
    config: &BacktestConfig,
    strategy: &StrategyParams,
    cancel: &CancelToken,
) -> Result<Simulation, BacktestError> {
    config.validate()?;
    strategy.validate()?;
    run_days(window, indicators, config, strategy, 0.0, cancel)
}

fn run_days(
    window: &PriceWindow<'_>,
    indicators: &IndicatorMap,
    config: &BacktestConfig,
    strategy: &StrategyParams,
    carried: f64,
    cancel: &CancelToken,
) -> Result<Simulation, BacktestError> {
    tracing::debug!(
        symbol = window.symbol,
        strategy = %strategy.kind(),
        days = window.len(),
        from = %config.date_from,
        to = %config.date_to,
        "simulating"
    );

    let purchases = match *strategy {
        StrategyParams::Dca { interval, .. } => {
            let schedule = dca_schedule(config.date_from, config.date_to, interval);
            let mut counts = vec![0usize; window.len()];
            for idx in snap_to_trading_days(&schedule, &window.dates) {
                counts[idx] += 1;
            }
            counts
        }
        _ => Vec::new(),
    };

    let starting_cash = if strategy.uses_capital() {
        config.initial_capital
    } else {
        carried.max(0.0)
    };
    let mut account = Account::new(starting_cash);

    for (i, (&date, &price)) in window.dates.iter().zip(&window.prices).enumerate() {
        cancel.check()?;

        if let StrategyParams::Dca { amount, .. } = *strategy {
            if i == 0 && account.cash > 0.0 {
                log_entry(window.symbol, date, enter_all_in(&mut account, date, price));
            }
            for _ in 0..purchases[i] {
                log_entry(
                    window.symbol,
                    date,
                    contribute_and_buy(&mut account, date, price, amount),
                );
            }
        } else {
            match signal_at(strategy, indicators, &window.prices, i, account.is_holding()) {
                Signal::Enter => {
                    log_entry(window.symbol, date, enter_all_in(&mut account, date, price));
                }
                Signal::Exit => {
                    if let Some(exit) = exit_all(&mut account, date, price) {
                        tracing::trace!(
                            symbol = window.symbol,
                            %date,
                            shares = exit.shares,
                            proceeds = exit.proceeds,
                            "exit"
                        );
                    }
                }
                Signal::Hold => {}
            }
        }

        account.record_equity(date, price);
    }

    let total_invested = if strategy.uses_capital() {
        config.initial_capital
    } else {
        account.contributed
    };
    let final_value = account.final_value().unwrap_or(starting_cash);

    tracing::debug!(
        symbol = window.symbol,
        strategy = %strategy.kind(),
        trades = account.trades.len(),
        final_value,
        "simulation complete"
    );

    Ok(Simulation {
        equity_curve: account.equity_curve,
        trades: account.trades,
        total_invested,
        final_value,
    })
}

fn log_entry(symbol: &str, date: NaiveDate, entry: EntryResult) {
    match entry {
        EntryResult::Entered { shares, cost } => {
            tracing::trace!(symbol, %date, shares, cost, "entry");
        }
        EntryResult::NoCash => {
            tracing::debug!(symbol, %date, "entry skipped, no cash");
        }
        EntryResult::InvalidPrice => {
            tracing::warn!(symbol, %date, "entry skipped, price is not positive and finite");
        }
    }
}

/// `a` moved from at-or-above `b` to strictly below it.
fn crossed_below(prev: (f64, f64), cur: (f64, f64)) -> bool {
    prev.0 >= prev.1 && cur.0 < cur.1
}

/// `a` moved from at-or-below `b` to strictly above it.
fn crossed_above(prev: (f64, f64), cur: (f64, f64)) -> bool {
    prev.0 <= prev.1 && cur.0 > cur.1
}

fn simple_pair(series: Option<&IndicatorSeries>, i: usize) -> Option<(f64, f64)> {
    let series = series?;
    Some((series.simple_at(i.checked_sub(1)?)?, series.simple_at(i)?))
}

fn signal_at(
    strategy: &StrategyParams,
    indicators: &IndicatorMap,
    prices: &[f64],
    i: usize,
    holding: bool,
) -> Signal {
    match *strategy {
        StrategyParams::BuyAndHold => {
            if i == 0 {
                Signal::Enter
            } else {
                Signal::Hold
            }
        }
        // Scheduled separately; never signal-driven.
        StrategyParams::Dca { .. } => Signal::Hold,
        StrategyParams::MaCrossover {
            short_window,
            long_window,
        } => {
            let short = simple_pair(indicators.get(&IndicatorType::Sma(short_window)), i);
            let long = simple_pair(indicators.get(&IndicatorType::Sma(long_window)), i);
            let (Some((prev_s, s)), Some((prev_l, l))) = (short, long) else {
                return Signal::Hold;
            };
            if !holding && crossed_above((prev_s, prev_l), (s, l)) {
                Signal::Enter
            } else if holding && crossed_below((prev_s, prev_l), (s, l)) {
                Signal::Exit
            } else {
                Signal::Hold
            }
        }
        StrategyParams::Rsi {
            period,
            oversold,
            overbought,
        } => {
            let Some((prev, cur)) = simple_pair(indicators.get(&IndicatorType::Rsi(period)), i)
            else {
                return Signal::Hold;
            };
            if !holding && crossed_below((prev, oversold), (cur, oversold)) {
                Signal::Enter
            } else if holding && crossed_above((prev, overbought), (cur, overbought)) {
                Signal::Exit
            } else {
                Signal::Hold
            }
        }
        StrategyParams::BollingerBands { window, std_dev } => {
            let Some(bands) = indicators.get(&IndicatorType::bollinger(window, std_dev)) else {
                return Signal::Hold;
            };
            let Some(prev_i) = i.checked_sub(1) else {
                return Signal::Hold;
            };
            let (Some((prev_upper, _, prev_lower)), Some((upper, _, lower))) =
                (bands.bands_at(prev_i), bands.bands_at(i))
            else {
                return Signal::Hold;
            };
            let (prev_close, close) = (prices[prev_i], prices[i]);
            if !holding && crossed_below((prev_close, prev_lower), (close, lower)) {
                Signal::Enter
            } else if holding && crossed_above((prev_close, prev_upper), (close, upper)) {
                Signal::Exit
            } else {
                Signal::Hold
            }
        }
    }
}

/// Engine output plus metrics, as handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub symbol: String,
    #[serde(flatten)]
    pub strategy: StrategyParams,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub price_basis: PriceBasis,
    pub initial_capital: f64,
    pub total_invested: f64,
    pub final_value: f64,
    pub metrics: PerformanceMetrics,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
}

impl BacktestResult {
    pub fn from_simulation(
        symbol: &str,
        config: &BacktestConfig,
        strategy: &StrategyParams,
        simulation: Simulation,
    ) -> Self {
        let metrics = PerformanceMetrics::compute(
            &simulation.equity_curve,
            &simulation.trades,
            simulation.total_invested,
        );
        BacktestResult {
            symbol: symbol.to_string(),
            strategy: strategy.clone(),
            date_from: config.date_from,
            date_to: config.date_to,
            price_basis: config.price_basis,
            initial_capital: config.initial_capital,
            total_invested: simulation.total_invested,
            final_value: simulation.final_value,
            metrics,
            equity_curve: simulation.equity_curve,
            trades: simulation.trades,
        }
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }
}

/// Simulates and scores in one step.
pub fn run_backtest(
    data: &SymbolData,
    config: &BacktestConfig,
    strategy: &StrategyParams,
    cancel: &CancelToken,
) -> Result<BacktestResult, BacktestError> {
    let simulation = simulate(data, config, strategy, cancel)?;
    Ok(BacktestResult::from_simulation(
        &data.symbol,
        config,
        strategy,
        simulation,
    ))
}
