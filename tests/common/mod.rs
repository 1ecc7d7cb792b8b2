#![allow(dead_code)]

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use equitysim::domain::backtest::BacktestConfig;
use equitysim::domain::error::BacktestError;
pub use equitysim::domain::price::{PriceBasis, PricePoint};
use equitysim::domain::symbol_data::SymbolData;
use equitysim::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_prices(mut self, symbol: &str, prices: Vec<PricePoint>) -> Self {
        self.data.insert(symbol.to_string(), prices);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    fn check(&self, symbol: &str) -> Result<(), BacktestError> {
        match self.errors.get(symbol) {
            Some(reason) => Err(BacktestError::DataSource {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(
        &self,
        symbol: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<PricePoint>, BacktestError> {
        self.check(symbol)?;
        Ok(self
            .data
            .get(symbol)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.date >= date_from && p.date <= date_to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BacktestError> {
        self.check(symbol)?;
        match self.data.get(symbol) {
            Some(points) if !points.is_empty() => {
                let min = points.iter().map(|p| p.date).min().unwrap();
                let max = points.iter().map(|p| p.date).max().unwrap();
                Ok(Some((min, max, points.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_point(date: NaiveDate, close: f64) -> PricePoint {
    PricePoint {
        date,
        open: close,
        high: close,
        low: close,
        close,
        adj_close: close,
        volume: 1_000,
    }
}

/// Every weekday from `from` to `to` inclusive.
pub fn weekdays(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = from;
    while day <= to {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(day);
        }
        day += Duration::days(1);
    }
    days
}

/// Consecutive calendar days from `start`, one per close.
pub fn daily_series(start: NaiveDate, closes: &[f64]) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_point(start + Duration::days(i as i64), c))
        .collect()
}

/// One point per weekday, price from `f(index)`.
pub fn weekday_series(from: NaiveDate, to: NaiveDate, f: impl Fn(usize) -> f64) -> Vec<PricePoint> {
    weekdays(from, to)
        .into_iter()
        .enumerate()
        .map(|(i, d)| make_point(d, f(i)))
        .collect()
}

pub fn symbol_data(symbol: &str, prices: Vec<PricePoint>) -> SymbolData {
    SymbolData::new(symbol.to_string(), prices)
}

pub fn sample_config(from: NaiveDate, to: NaiveDate) -> BacktestConfig {
    BacktestConfig {
        date_from: from,
        date_to: to,
        initial_capital: 10_000.0,
        price_basis: PriceBasis::AdjustedClose,
    }
}
