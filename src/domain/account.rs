//! Single-instrument account state and equity tracking.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::trade::TradeRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Cash, shares, and the append-only logs one simulation produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub cash: f64,
    pub shares: f64,
    pub contributed: f64,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Account {
    pub fn new(initial_cash: f64) -> Self {
        Account {
            cash: initial_cash,
            shares: 0.0,
            contributed: 0.0,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn is_holding(&self) -> bool {
        self.shares > 0.0
    }

    pub fn value(&self, price: f64) -> f64 {
        self.cash + self.shares * price
    }

    pub fn record_trade(&mut self, trade: TradeRecord) {
        self.trades.push(trade);
    }

    pub fn record_equity(&mut self, date: NaiveDate, price: f64) {
        let value = self.value(price);
        self.equity_curve.push(EquityPoint { date, value });
    }

    pub fn final_value(&self) -> Option<f64> {
        self.equity_curve.last().map(|p| p.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account() {
        let account = Account::new(10_000.0);
        assert!((account.cash - 10_000.0).abs() < f64::EPSILON);
        assert!(!account.is_holding());
        assert!(account.trades.is_empty());
        assert!(account.equity_curve.is_empty());
        assert_eq!(account.final_value(), None);
    }

    #[test]
    fn value_marks_shares() {
        let mut account = Account::new(1_000.0);
        account.shares = 10.0;
        assert!((account.value(50.0) - 1_500.0).abs() < f64::EPSILON);
        assert!(account.is_holding());
    }

    #[test]
    fn record_equity_appends_marked_value() {
        let mut account = Account::new(0.0);
        account.shares = 2.0;
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        account.record_equity(date, 150.0);
        assert_eq!(
            account.equity_curve,
            vec![EquityPoint { date, value: 300.0 }]
        );
        assert_eq!(account.final_value(), Some(300.0));
    }
}
