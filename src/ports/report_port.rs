//! Result output port.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use crate::domain::portfolio::PortfolioResult;

pub trait ReportPort {
    fn write_backtest(
        &self,
        result: &BacktestResult,
        output_path: &str,
    ) -> Result<(), BacktestError>;

    fn write_comparison(
        &self,
        results: &[BacktestResult],
        output_path: &str,
    ) -> Result<(), BacktestError>;

    fn write_portfolio(
        &self,
        result: &PortfolioResult,
        output_path: &str,
    ) -> Result<(), BacktestError>;
}
