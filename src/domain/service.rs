//! Entry points that fetch prices through a [`DataPort`] and run the
//! engines. Symbols are normalised to upper case here.

use chrono::NaiveDate;
use serde::Serialize;

use crate::ports::data_port::DataPort;

use super::backtest::{self, BacktestConfig, BacktestResult};
use super::calendar::RebalanceInterval;
use super::cancel::CancelToken;
use super::compare::{compare, validate_strategies};
use super::error::BacktestError;
use super::portfolio::{run_portfolio, validate_holdings, Holding, PortfolioResult, RebalanceSchedule};
use super::price::PriceBasis;
use super::strategy::StrategyParams;
use super::symbol_data::SymbolData;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRequest {
    pub symbol: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub initial_capital: f64,
    pub price_basis: PriceBasis,
    pub strategy: StrategyParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareRequest {
    pub symbol: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub initial_capital: f64,
    pub price_basis: PriceBasis,
    pub strategies: Vec<StrategyParams>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioRequest {
    pub holdings: Vec<Holding>,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub initial_capital: f64,
    pub price_basis: PriceBasis,
    pub strategy: StrategyParams,
    pub rebalance: Option<RebalanceInterval>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataRange {
    pub symbol: String,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub point_count: usize,
}

pub fn normalize_symbol(symbol: &str) -> Result<String, BacktestError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(BacktestError::invalid("symbol must not be empty"));
    }
    Ok(symbol)
}

fn load_symbol(
    port: &dyn DataPort,
    symbol: &str,
    config: &BacktestConfig,
) -> Result<SymbolData, BacktestError> {
    let prices = port.fetch_prices(symbol, config.date_from, config.date_to)?;
    if prices.is_empty() {
        return Err(BacktestError::DataNotFound {
            symbol: symbol.to_string(),
            date_from: config.date_from,
            date_to: config.date_to,
        });
    }
    Ok(SymbolData::new(symbol.to_string(), prices))
}

pub fn run_backtest(
    port: &dyn DataPort,
    request: &BacktestRequest,
    cancel: &CancelToken,
) -> Result<BacktestResult, BacktestError> {
    let symbol = normalize_symbol(&request.symbol)?;
    let config = BacktestConfig {
        date_from: request.date_from,
        date_to: request.date_to,
        initial_capital: request.initial_capital,
        price_basis: request.price_basis,
    };
    config.validate()?;
    request.strategy.validate()?;

    tracing::info!(
        symbol = %symbol,
        strategy = %request.strategy.kind(),
        from = %config.date_from,
        to = %config.date_to,
        "running backtest"
    );

    let data = load_symbol(port, &symbol, &config)?;
    backtest::run_backtest(&data, &config, &request.strategy, cancel)
}

pub fn compare_backtests(
    port: &dyn DataPort,
    request: &CompareRequest,
    cancel: &CancelToken,
) -> Result<Vec<BacktestResult>, BacktestError> {
    let symbol = normalize_symbol(&request.symbol)?;
    let config = BacktestConfig {
        date_from: request.date_from,
        date_to: request.date_to,
        initial_capital: request.initial_capital,
        price_basis: request.price_basis,
    };

    tracing::info!(
        symbol = %symbol,
        strategies = request.strategies.len(),
        from = %config.date_from,
        to = %config.date_to,
        "comparing strategies"
    );

    // Parameter errors surface before any data access.
    config.validate()?;
    validate_strategies(&request.strategies)?;

    let data = load_symbol(port, &symbol, &config)?;
    compare(&data, &config, &request.strategies, cancel)
}

pub fn run_portfolio_backtest(
    port: &dyn DataPort,
    request: &PortfolioRequest,
    cancel: &CancelToken,
) -> Result<PortfolioResult, BacktestError> {
    let holdings = request
        .holdings
        .iter()
        .map(|h| Ok(Holding::new(normalize_symbol(&h.symbol)?, h.weight)))
        .collect::<Result<Vec<_>, BacktestError>>()?;
    validate_holdings(&holdings)?;

    let config = BacktestConfig {
        date_from: request.date_from,
        date_to: request.date_to,
        initial_capital: request.initial_capital,
        price_basis: request.price_basis,
    };
    config.validate()?;
    request.strategy.validate()?;

    tracing::info!(
        holdings = %holdings.iter().map(|h| h.symbol.as_str()).collect::<Vec<_>>().join(","),
        strategy = %request.strategy.kind(),
        rebalance = ?request.rebalance,
        "running portfolio backtest"
    );

    let data = holdings
        .iter()
        .map(|h| load_symbol(port, &h.symbol, &config))
        .collect::<Result<Vec<_>, _>>()?;

    run_portfolio(
        &data,
        &holdings,
        &config,
        &request.strategy,
        request.rebalance.map(RebalanceSchedule::new),
        cancel,
    )
}

pub fn data_range(port: &dyn DataPort, symbol: &str) -> Result<Option<DataRange>, BacktestError> {
    let symbol = normalize_symbol(symbol)?;
    Ok(port
        .get_data_range(&symbol)?
        .map(|(first_date, last_date, point_count)| DataRange {
            symbol,
            first_date,
            last_date,
            point_count,
        }))
}
