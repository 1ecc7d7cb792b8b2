//! Per-symbol price series and the cross-symbol trading-day intersection.

use crate::domain::price::PricePoint;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct SymbolData {
    pub symbol: String,
    pub prices: Vec<PricePoint>,
    pub date_index: HashMap<NaiveDate, usize>,
}

impl SymbolData {
    /// Prices are ordered ascending and deduplicated by date (first wins).
    pub fn new(symbol: String, mut prices: Vec<PricePoint>) -> Self {
        prices.sort_by_key(|p| p.date);
        prices.dedup_by_key(|p| p.date);
        let date_index = prices
            .iter()
            .enumerate()
            .map(|(i, p)| (p.date, i))
            .collect();
        Self {
            symbol,
            prices,
            date_index,
        }
    }

    pub fn get_price(&self, date: NaiveDate) -> Option<&PricePoint> {
        self.date_index.get(&date).map(|&i| &self.prices[i])
    }

    /// A copy holding only the given dates, in the given (ascending) order.
    pub fn restrict_to(&self, dates: &[NaiveDate]) -> SymbolData {
        let prices = dates
            .iter()
            .filter_map(|d| self.get_price(*d).cloned())
            .collect();
        SymbolData::new(self.symbol.clone(), prices)
    }
}

/// Trading days inside `[date_from, date_to]` present in every series.
pub fn build_common_timeline(
    series: &[SymbolData],
    date_from: NaiveDate,
    date_to: NaiveDate,
) -> Vec<NaiveDate> {
    let Some((first, rest)) = series.split_first() else {
        return Vec::new();
    };

    let mut common: BTreeSet<NaiveDate> = first
        .prices
        .iter()
        .map(|p| p.date)
        .filter(|d| *d >= date_from && *d <= date_to)
        .collect();

    for sd in rest {
        common.retain(|d| sd.date_index.contains_key(d));
    }

    common.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_point(date: &str, close: f64) -> PricePoint {
        PricePoint {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            adj_close: close,
            volume: 1000,
        }
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn new_sorts_and_indexes() {
        let sd = SymbolData::new(
            "AAPL".into(),
            vec![
                make_point("2024-01-03", 102.0),
                make_point("2024-01-01", 100.0),
                make_point("2024-01-02", 101.0),
                make_point("2024-01-02", 999.0),
            ],
        );
        assert_eq!(sd.prices.len(), 3);
        assert_eq!(sd.prices.first().unwrap().date, d("2024-01-01"));
        assert_eq!(sd.prices.last().unwrap().date, d("2024-01-03"));
        assert_eq!(sd.get_price(d("2024-01-02")).unwrap().close, 101.0);
        assert!(sd.get_price(d("2024-01-05")).is_none());
    }

    #[test]
    fn common_timeline_is_intersection() {
        let a = SymbolData::new(
            "A".into(),
            vec![
                make_point("2024-01-01", 1.0),
                make_point("2024-01-02", 1.0),
                make_point("2024-01-03", 1.0),
            ],
        );
        let b = SymbolData::new(
            "B".into(),
            vec![make_point("2024-01-02", 1.0), make_point("2024-01-03", 1.0), make_point("2024-01-04", 1.0)],
        );
        let timeline = build_common_timeline(&[a, b], d("2024-01-01"), d("2024-01-31"));
        assert_eq!(timeline, vec![d("2024-01-02"), d("2024-01-03")]);
    }

    #[test]
    fn common_timeline_respects_range() {
        let a = SymbolData::new(
            "A".into(),
            vec![make_point("2024-01-01", 1.0), make_point("2024-01-02", 1.0)],
        );
        let timeline = build_common_timeline(&[a], d("2024-01-02"), d("2024-01-02"));
        assert_eq!(timeline, vec![d("2024-01-02")]);
    }

    #[test]
    fn common_timeline_disjoint_is_empty() {
        let a = SymbolData::new("A".into(), vec![make_point("2024-01-01", 1.0)]);
        let b = SymbolData::new("B".into(), vec![make_point("2024-01-02", 1.0)]);
        assert!(build_common_timeline(&[a, b], d("2024-01-01"), d("2024-12-31")).is_empty());
        assert!(build_common_timeline(&[], d("2024-01-01"), d("2024-12-31")).is_empty());
    }

    #[test]
    fn restrict_to_keeps_listed_dates() {
        let a = SymbolData::new(
            "A".into(),
            vec![
                make_point("2024-01-01", 1.0),
                make_point("2024-01-02", 2.0),
                make_point("2024-01-03", 3.0),
            ],
        );
        let r = a.restrict_to(&[d("2024-01-01"), d("2024-01-03")]);
        assert_eq!(r.prices.len(), 2);
        assert_eq!(r.prices[1].close, 3.0);
        assert_eq!(r.symbol, "A");
    }
}
