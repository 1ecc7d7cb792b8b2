//! Daily price point representation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: i64,
}

/// Which close field drives valuation and fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceBasis {
    #[default]
    AdjustedClose,
    Close,
}

impl PriceBasis {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "adjusted_close" | "adj_close" | "adjusted" => Some(PriceBasis::AdjustedClose),
            "close" | "raw" => Some(PriceBasis::Close),
            _ => None,
        }
    }
}

impl PricePoint {
    pub fn price(&self, basis: PriceBasis) -> f64 {
        match basis {
            PriceBasis::AdjustedClose => self.adj_close,
            PriceBasis::Close => self.close,
        }
    }
}

/// Points with `date_from <= date <= date_to`, assuming ascending input.
pub fn slice_range(prices: &[PricePoint], date_from: NaiveDate, date_to: NaiveDate) -> &[PricePoint] {
    let start = prices.partition_point(|p| p.date < date_from);
    let end = prices.partition_point(|p| p.date <= date_to);
    if start >= end {
        &prices[0..0]
    } else {
        &prices[start..end]
    }
}

pub fn closes(prices: &[PricePoint], basis: PriceBasis) -> Vec<f64> {
    prices.iter().map(|p| p.price(basis)).collect()
}
