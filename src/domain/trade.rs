//! Trade log entries and round-trip pairing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

/// One executed fill. `cash_after + shares_held_after * price` equals
/// `portfolio_value` up to rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub action: TradeAction,
    pub price: f64,
    pub shares: f64,
    pub cash_after: f64,
    pub portfolio_value: f64,
}

/// A BUY matched with the later SELL that closed it.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrip {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: f64,
    pub pnl: f64,
}

impl RoundTrip {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }
}

/// Pairs BUYs with SELLs first-in first-out. A SELL with no open BUY is
/// ignored; BUYs still open at the end are not round trips.
pub fn pair_round_trips(trades: &[TradeRecord]) -> Vec<RoundTrip> {
    let mut open: VecDeque<&TradeRecord> = VecDeque::new();
    let mut trips = Vec::new();

    for trade in trades {
        match trade.action {
            TradeAction::Buy => open.push_back(trade),
            TradeAction::Sell => {
                if let Some(entry) = open.pop_front() {
                    let shares = entry.shares.min(trade.shares);
                    trips.push(RoundTrip {
                        entry_date: entry.date,
                        exit_date: trade.date,
                        entry_price: entry.price,
                        exit_price: trade.price,
                        shares,
                        pnl: (trade.price - entry.price) * shares,
                    });
                }
            }
        }
    }

    trips
}
