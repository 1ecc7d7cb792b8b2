//! Fill simulation.
//!
//! Fills happen at the signal day's price with fractional shares and no
//! commission or slippage. Each fill appends a [`TradeRecord`] to the account.

use chrono::NaiveDate;

use super::account::Account;
use super::trade::{TradeAction, TradeRecord};

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered { shares: f64, cost: f64 },
    NoCash,
    InvalidPrice,
}

/// Deploy all cash into shares.
pub fn enter_all_in(account: &mut Account, date: NaiveDate, price: f64) -> EntryResult {
    if !(price.is_finite() && price > 0.0) {
        return EntryResult::InvalidPrice;
    }
    if account.cash <= 0.0 {
        return EntryResult::NoCash;
    }

    let cost = account.cash;
    let shares = cost / price;
    account.shares += shares;
    account.cash = 0.0;

    let trade = TradeRecord {
        date,
        action: TradeAction::Buy,
        price,
        shares,
        cash_after: account.cash,
        portfolio_value: account.value(price),
    };
    account.record_trade(trade);

    EntryResult::Entered { shares, cost }
}

/// Inject fresh money and buy with all of it immediately.
pub fn contribute_and_buy(
    account: &mut Account,
    date: NaiveDate,
    price: f64,
    amount: f64,
) -> EntryResult {
    if !(price.is_finite() && price > 0.0) {
        return EntryResult::InvalidPrice;
    }
    account.cash += amount;
    account.contributed += amount;
    enter_all_in(account, date, price)
}

/// Result of an exit.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub shares: f64,
    pub proceeds: f64,
}

/// Liquidate every share. Returns `None` when already flat.
pub fn exit_all(account: &mut Account, date: NaiveDate, price: f64) -> Option<ExitResult> {
    if !account.is_holding() || !price.is_finite() {
        return None;
    }

    let shares = account.shares;
    let proceeds = shares * price;
    account.cash += proceeds;
    account.shares = 0.0;

    let trade = TradeRecord {
        date,
        action: TradeAction::Sell,
        price,
        shares,
        cash_after: account.cash,
        portfolio_value: account.value(price),
    };
    account.record_trade(trade);

    Some(ExitResult { shares, proceeds })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn enter_all_in_converts_cash() {
        let mut account = Account::new(10_000.0);
        let result = enter_all_in(&mut account, date(), 100.0);

        assert_eq!(
            result,
            EntryResult::Entered {
                shares: 100.0,
                cost: 10_000.0
            }
        );
        assert_eq!(account.cash, 0.0);
        assert!((account.shares - 100.0).abs() < f64::EPSILON);

        let trade = &account.trades[0];
        assert_eq!(trade.action, TradeAction::Buy);
        assert_eq!(trade.cash_after, 0.0);
        assert!((trade.portfolio_value - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn enter_without_cash() {
        let mut account = Account::new(0.0);
        assert_eq!(enter_all_in(&mut account, date(), 100.0), EntryResult::NoCash);
        assert!(account.trades.is_empty());
    }

    #[test]
    fn enter_rejects_bad_price() {
        let mut account = Account::new(100.0);
        assert_eq!(enter_all_in(&mut account, date(), 0.0), EntryResult::InvalidPrice);
        assert_eq!(
            enter_all_in(&mut account, date(), f64::NAN),
            EntryResult::InvalidPrice
        );
        assert_eq!(account.cash, 100.0);
    }

    #[test]
    fn contribute_accumulates_shares() {
        let mut account = Account::new(0.0);
        contribute_and_buy(&mut account, date(), 50.0, 500.0);
        contribute_and_buy(&mut account, date(), 100.0, 500.0);

        assert!((account.shares - 15.0).abs() < 1e-12);
        assert!((account.contributed - 1_000.0).abs() < f64::EPSILON);
        assert_eq!(account.trades.len(), 2);
        assert!((account.trades[1].shares - 5.0).abs() < 1e-12);
        assert!((account.trades[1].portfolio_value - 1_500.0).abs() < 1e-9);
    }

    #[test]
    fn exit_all_liquidates() {
        let mut account = Account::new(1_000.0);
        enter_all_in(&mut account, date(), 10.0);
        let exit = exit_all(&mut account, date(), 12.0).unwrap();

        assert!((exit.shares - 100.0).abs() < 1e-12);
        assert!((exit.proceeds - 1_200.0).abs() < 1e-9);
        assert!(!account.is_holding());
        assert!((account.cash - 1_200.0).abs() < 1e-9);

        let sell = &account.trades[1];
        assert_eq!(sell.action, TradeAction::Sell);
        assert!((sell.cash_after - sell.portfolio_value).abs() < 1e-9);
    }

    #[test]
    fn exit_when_flat_is_none() {
        let mut account = Account::new(1_000.0);
        assert!(exit_all(&mut account, date(), 12.0).is_none());
    }
}
