//! Price data access port.

use crate::domain::error::BacktestError;
use crate::domain::price::PricePoint;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily points for `symbol` with `date_from <= date <= date_to`,
    /// ascending by date. An unknown symbol yields an empty series.
    fn fetch_prices(
        &self,
        symbol: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<PricePoint>, BacktestError>;

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError>;

    /// `(first_date, last_date, point_count)`, or `None` without data.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BacktestError>;
}
