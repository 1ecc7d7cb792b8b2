//! Calendar stepping shared by the DCA schedule and rebalance boundaries.
//!
//! Month arithmetic always steps from the origin date, clamping the day of
//! month to the last valid day of the target month. Jan 31 + 1 month is
//! Feb 28/29 and Jan 31 + 2 months is Mar 31; stepping never drifts.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Purchase cadence for dollar-cost averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DcaInterval {
    Weekly,
    Monthly,
    Quarterly,
}

impl DcaInterval {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "weekly" => Some(DcaInterval::Weekly),
            "monthly" => Some(DcaInterval::Monthly),
            "quarterly" => Some(DcaInterval::Quarterly),
            _ => None,
        }
    }

    /// The k-th scheduled date counted from `origin` (k = 0 is the origin).
    pub fn nth_date(&self, origin: NaiveDate, k: u32) -> Option<NaiveDate> {
        match self {
            DcaInterval::Weekly => origin.checked_add_days(Days::new(7 * u64::from(k))),
            DcaInterval::Monthly => add_calendar_months(origin, k),
            DcaInterval::Quarterly => add_calendar_months(origin, k.checked_mul(3)?),
        }
    }
}

/// Cadence for portfolio rebalancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalanceInterval {
    Monthly,
    Quarterly,
}

impl RebalanceInterval {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "monthly" => Some(RebalanceInterval::Monthly),
            "quarterly" => Some(RebalanceInterval::Quarterly),
            _ => None,
        }
    }

    /// Index of the calendar period containing `date`; periods are
    /// consecutive months, or quarters starting Jan/Apr/Jul/Oct.
    pub fn period_of(&self, date: NaiveDate) -> i64 {
        let month_index = i64::from(date.year()) * 12 + i64::from(date.month0());
        match self {
            RebalanceInterval::Monthly => month_index,
            RebalanceInterval::Quarterly => month_index.div_euclid(3),
        }
    }
}

/// `date` moved forward `n` calendar months, day clamped to month end.
pub fn add_calendar_months(date: NaiveDate, n: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(n))
}

/// Scheduled purchase dates from `date_from` through `date_to` inclusive.
pub fn dca_schedule(date_from: NaiveDate, date_to: NaiveDate, interval: DcaInterval) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut k = 0u32;
    while let Some(date) = interval.nth_date(date_from, k) {
        if date > date_to {
            break;
        }
        dates.push(date);
        k += 1;
    }
    dates
}

/// Each scheduled date snapped forward to the first trading day on or after
/// it; dates with no trading day left in `trading_days` are dropped. Returns
/// indices into `trading_days`, one per executed purchase.
pub fn snap_to_trading_days(schedule: &[NaiveDate], trading_days: &[NaiveDate]) -> Vec<usize> {
    schedule
        .iter()
        .filter_map(|date| {
            let idx = trading_days.partition_point(|d| d < date);
            (idx < trading_days.len()).then_some(idx)
        })
        .collect()
}

/// Indices of the first trading day of each new period after the first day.
pub fn rebalance_boundaries(trading_days: &[NaiveDate], interval: RebalanceInterval) -> Vec<usize> {
    trading_days
        .windows(2)
        .enumerate()
        .filter(|(_, w)| interval.period_of(w[1]) != interval.period_of(w[0]))
        .map(|(i, _)| i + 1)
        .collect()
}
