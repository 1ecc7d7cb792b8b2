//! Side-by-side runs of several strategies on one symbol.

use rayon::prelude::*;

use super::backtest::{simulate_window, BacktestConfig, BacktestResult, PriceWindow};
use super::cancel::CancelToken;
use super::error::BacktestError;
use super::strategy::StrategyParams;
use super::symbol_data::SymbolData;

pub const MIN_STRATEGIES: usize = 2;
pub const MAX_STRATEGIES: usize = 3;

/// Checks the strategy count, then each strategy's parameters.
pub fn validate_strategies(strategies: &[StrategyParams]) -> Result<(), BacktestError> {
    if !(MIN_STRATEGIES..=MAX_STRATEGIES).contains(&strategies.len()) {
        return Err(BacktestError::invalid(format!(
            "compare needs {} to {} strategies, got {}",
            MIN_STRATEGIES,
            MAX_STRATEGIES,
            strategies.len()
        )));
    }
    strategies.iter().try_for_each(StrategyParams::validate)
}

/// Runs each strategy independently over the same window and capital.
///
/// Indicators are computed once for the union of what the strategies need
/// and shared read-only across the parallel runs. Results come back in the
/// order the strategies were given.
pub fn compare(
    data: &SymbolData,
    config: &BacktestConfig,
    strategies: &[StrategyParams],
    cancel: &CancelToken,
) -> Result<Vec<BacktestResult>, BacktestError> {
    validate_strategies(strategies)?;
    config.validate()?;

    let window = PriceWindow::new(data, config)?;
    let indicators = window.indicators_for(strategies);

    tracing::debug!(
        symbol = %data.symbol,
        strategies = strategies.len(),
        indicators = indicators.len(),
        "comparing strategies"
    );

    strategies
        .par_iter()
        .map(|strategy| {
            let simulation = simulate_window(&window, &indicators, config, strategy, cancel)?;
            Ok(BacktestResult::from_simulation(
                &data.symbol,
                config,
                strategy,
                simulation,
            ))
        })
        .collect()
}
