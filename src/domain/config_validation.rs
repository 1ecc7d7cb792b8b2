//! Configuration validation and typed reads.
//!
//! Every field is checked before a run so that a bad file fails with the
//! section and key at fault instead of partway through a simulation.

use crate::domain::calendar::{DcaInterval, RebalanceInterval};
use crate::domain::compare::MAX_STRATEGIES;
use crate::domain::error::BacktestError;
use crate::domain::portfolio::Holding;
use crate::domain::price::PriceBasis;
use crate::domain::strategy::{StrategyKind, StrategyParams};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;

fn missing(section: &str, key: &str) -> BacktestError {
    BacktestError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_value<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: Option<T>,
) -> Result<T, BacktestError> {
    match non_empty(config, section, key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| invalid(section, key, format!("cannot parse '{}'", raw))),
        None => default.ok_or_else(|| missing(section, key)),
    }
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_data_dir(config)?;
    parse_dates(config)?;
    parse_initial_capital(config)?;
    parse_price_basis(config)?;
    Ok(())
}

fn validate_data_dir(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    non_empty(config, "data", "csv_dir")
        .map(|_| ())
        .ok_or_else(|| missing("data", "csv_dir"))
}

pub fn parse_symbol(config: &dyn ConfigPort) -> Result<String, BacktestError> {
    non_empty(config, "backtest", "symbol").ok_or_else(|| missing("backtest", "symbol"))
}

pub fn parse_dates(config: &dyn ConfigPort) -> Result<(NaiveDate, NaiveDate), BacktestError> {
    let date_from = parse_date(config, "date_from")?;
    let date_to = parse_date(config, "date_to")?;

    if date_from > date_to {
        return Err(invalid(
            "backtest",
            "date_from",
            "date_from must not be after date_to",
        ));
    }
    Ok((date_from, date_to))
}

fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<NaiveDate, BacktestError> {
    let raw = non_empty(config, "backtest", field).ok_or_else(|| missing("backtest", field))?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
        invalid(
            "backtest",
            field,
            format!("invalid {} format, expected YYYY-MM-DD", field),
        )
    })
}

pub fn parse_initial_capital(config: &dyn ConfigPort) -> Result<f64, BacktestError> {
    let value: f64 = parse_value(
        config,
        "backtest",
        "initial_capital",
        Some(DEFAULT_INITIAL_CAPITAL),
    )?;
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(value)
}

pub fn parse_price_basis(config: &dyn ConfigPort) -> Result<PriceBasis, BacktestError> {
    match non_empty(config, "backtest", "price_basis") {
        None => Ok(PriceBasis::default()),
        Some(raw) => PriceBasis::parse(&raw).ok_or_else(|| {
            invalid(
                "backtest",
                "price_basis",
                format!("unknown price basis '{}', expected adjusted_close or close", raw),
            )
        }),
    }
}

/// Strategy parameters from `section`, with the usual defaults for
/// indicator periods and thresholds. Parameter constraints are checked too.
pub fn parse_strategy(
    config: &dyn ConfigPort,
    section: &str,
) -> Result<StrategyParams, BacktestError> {
    let raw_type = non_empty(config, section, "type").ok_or_else(|| missing(section, "type"))?;
    let kind = StrategyKind::parse(&raw_type).ok_or_else(|| {
        invalid(
            section,
            "type",
            format!("unknown strategy type '{}'", raw_type),
        )
    })?;

    let params = match kind {
        StrategyKind::BuyAndHold => StrategyParams::BuyAndHold,
        StrategyKind::Dca => {
            let interval = match non_empty(config, section, "interval") {
                None => DcaInterval::Monthly,
                Some(raw) => DcaInterval::parse(&raw).ok_or_else(|| {
                    invalid(
                        section,
                        "interval",
                        format!("unknown interval '{}', expected weekly, monthly or quarterly", raw),
                    )
                })?,
            };
            StrategyParams::Dca {
                interval,
                amount: parse_value(config, section, "amount", None)?,
            }
        }
        StrategyKind::MaCrossover => StrategyParams::MaCrossover {
            short_window: parse_value(config, section, "short_window", Some(50))?,
            long_window: parse_value(config, section, "long_window", Some(200))?,
        },
        StrategyKind::Rsi => StrategyParams::Rsi {
            period: parse_value(config, section, "period", Some(14))?,
            oversold: parse_value(config, section, "oversold", Some(30.0))?,
            overbought: parse_value(config, section, "overbought", Some(70.0))?,
        },
        StrategyKind::BollingerBands => StrategyParams::BollingerBands {
            window: parse_value(config, section, "window", Some(20))?,
            std_dev: parse_value(config, section, "std_dev", Some(2.0))?,
        },
    };

    params.validate()?;
    Ok(params)
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    parse_strategy(config, "strategy").map(|_| ())
}

/// The `[compare.N]` sections present, in order. Numbering stops at the
/// first gap.
pub fn compare_sections(config: &dyn ConfigPort) -> Vec<String> {
    (1..=MAX_STRATEGIES + 1)
        .map(|n| format!("compare.{}", n))
        .take_while(|section| config.has_section(section))
        .collect()
}

pub fn parse_compare_strategies(
    config: &dyn ConfigPort,
) -> Result<Vec<StrategyParams>, BacktestError> {
    let sections = compare_sections(config);
    if sections.is_empty() {
        return Err(missing("compare.1", "type"));
    }
    sections
        .iter()
        .map(|section| parse_strategy(config, section))
        .collect()
}

pub fn validate_compare_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    crate::domain::compare::validate_strategies(&parse_compare_strategies(config)?)
}

/// Parses `AAPL:0.5, MSFT:0.5`.
pub fn parse_holdings(value: &str) -> Result<Vec<Holding>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (symbol, weight) = entry
                .split_once(':')
                .ok_or_else(|| format!("expected SYMBOL:WEIGHT, got '{}'", entry))?;
            let symbol = symbol.trim();
            if symbol.is_empty() {
                return Err(format!("empty symbol in '{}'", entry));
            }
            let weight: f64 = weight
                .trim()
                .parse()
                .map_err(|_| format!("invalid weight in '{}'", entry))?;
            Ok(Holding::new(symbol.to_uppercase(), weight))
        })
        .collect()
}

pub fn parse_portfolio(
    config: &dyn ConfigPort,
) -> Result<(Vec<Holding>, Option<RebalanceInterval>), BacktestError> {
    let raw = non_empty(config, "portfolio", "holdings")
        .ok_or_else(|| missing("portfolio", "holdings"))?;
    let holdings =
        parse_holdings(&raw).map_err(|reason| invalid("portfolio", "holdings", reason))?;
    crate::domain::portfolio::validate_holdings(&holdings)
        .map_err(|e| invalid("portfolio", "holdings", e.to_string()))?;

    if !config.get_bool("portfolio", "rebalance", false) {
        return Ok((holdings, None));
    }

    let interval = match non_empty(config, "portfolio", "rebalance_interval") {
        None => RebalanceInterval::Monthly,
        Some(raw) => RebalanceInterval::parse(&raw).ok_or_else(|| {
            invalid(
                "portfolio",
                "rebalance_interval",
                format!("unknown interval '{}', expected monthly or quarterly", raw),
            )
        })?,
    };
    Ok((holdings, Some(interval)))
}

pub fn validate_portfolio_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    parse_portfolio(config).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorKind;
    use std::collections::HashMap;

    struct TestConfig {
        values: HashMap<(String, String), String>,
    }

    impl TestConfig {
        fn new() -> Self {
            Self {
                values: HashMap::new(),
            }
        }

        fn set(mut self, section: &str, key: &str, value: &str) -> Self {
            self.values
                .insert((section.to_string(), key.to_string()), value.to_string());
            self
        }

        fn valid() -> Self {
            Self::new()
                .set("data", "csv_dir", "/tmp/data")
                .set("backtest", "symbol", "AAPL")
                .set("backtest", "date_from", "2020-01-01")
                .set("backtest", "date_to", "2020-12-31")
                .set("backtest", "initial_capital", "10000")
                .set("strategy", "type", "buy_and_hold")
        }
    }

    impl ConfigPort for TestConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.values
                .get(&(section.to_string(), key.to_string()))
                .cloned()
        }

        fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
            match self.get_string(section, key).as_deref() {
                Some("true") | Some("yes") | Some("1") => true,
                Some("false") | Some("no") | Some("0") => false,
                _ => default,
            }
        }

        fn has_section(&self, section: &str) -> bool {
            self.values.keys().any(|(s, _)| s == section)
        }
    }

    #[test]
    fn valid_config_passes() {
        let config = TestConfig::valid();
        assert!(validate_backtest_config(&config).is_ok());
        assert!(validate_strategy_config(&config).is_ok());
        assert_eq!(parse_symbol(&config).unwrap(), "AAPL");
    }

    #[test]
    fn missing_csv_dir() {
        let mut config = TestConfig::valid();
        config
            .values
            .remove(&("data".to_string(), "csv_dir".to_string()));
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigMissing { ref key, .. } if key == "csv_dir"));
    }

    #[test]
    fn reversed_dates_rejected() {
        let config = TestConfig::valid().set("backtest", "date_from", "2021-01-01");
        let err = validate_backtest_config(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn same_day_range_allowed() {
        let config = TestConfig::valid().set("backtest", "date_to", "2020-01-01");
        assert!(parse_dates(&config).is_ok());
    }

    #[test]
    fn bad_date_format() {
        let config = TestConfig::valid().set("backtest", "date_to", "12/31/2020");
        let err = parse_dates(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { ref key, .. } if key == "date_to"));
    }

    #[test]
    fn capital_defaults_and_must_be_positive() {
        let mut config = TestConfig::valid();
        config
            .values
            .remove(&("backtest".to_string(), "initial_capital".to_string()));
        assert_eq!(parse_initial_capital(&config).unwrap(), DEFAULT_INITIAL_CAPITAL);

        let config = TestConfig::valid().set("backtest", "initial_capital", "-5");
        assert!(parse_initial_capital(&config).is_err());
        let config = TestConfig::valid().set("backtest", "initial_capital", "lots");
        assert!(parse_initial_capital(&config).is_err());
    }

    #[test]
    fn price_basis_parsing() {
        assert_eq!(
            parse_price_basis(&TestConfig::valid()).unwrap(),
            PriceBasis::AdjustedClose
        );
        let config = TestConfig::valid().set("backtest", "price_basis", "close");
        assert_eq!(parse_price_basis(&config).unwrap(), PriceBasis::Close);
        let config = TestConfig::valid().set("backtest", "price_basis", "vwap");
        assert!(parse_price_basis(&config).is_err());
    }

    #[test]
    fn strategy_defaults_applied() {
        let config = TestConfig::valid().set("strategy", "type", "rsi");
        assert_eq!(
            parse_strategy(&config, "strategy").unwrap(),
            StrategyParams::Rsi {
                period: 14,
                oversold: 30.0,
                overbought: 70.0
            }
        );
    }

    #[test]
    fn strategy_constraints_are_parameter_errors() {
        let config = TestConfig::valid()
            .set("strategy", "type", "ma_crossover")
            .set("strategy", "short_window", "200")
            .set("strategy", "long_window", "50");
        let err = parse_strategy(&config, "strategy").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameters);
    }

    #[test]
    fn dca_requires_amount() {
        let config = TestConfig::valid().set("strategy", "type", "dca");
        let err = parse_strategy(&config, "strategy").unwrap_err();
        assert!(matches!(err, BacktestError::ConfigMissing { ref key, .. } if key == "amount"));

        let config = config
            .set("strategy", "amount", "250")
            .set("strategy", "interval", "weekly");
        assert_eq!(
            parse_strategy(&config, "strategy").unwrap(),
            StrategyParams::Dca {
                interval: DcaInterval::Weekly,
                amount: 250.0
            }
        );
    }

    #[test]
    fn unknown_strategy_type() {
        let config = TestConfig::valid().set("strategy", "type", "momentum");
        let err = parse_strategy(&config, "strategy").unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { ref key, .. } if key == "type"));
    }

    #[test]
    fn non_numeric_param_rejected() {
        let config = TestConfig::valid()
            .set("strategy", "type", "bollinger_bands")
            .set("strategy", "window", "twenty");
        let err = parse_strategy(&config, "strategy").unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { ref key, .. } if key == "window"));
    }

    #[test]
    fn compare_sections_in_order() {
        let config = TestConfig::valid()
            .set("compare.1", "type", "buy_and_hold")
            .set("compare.2", "type", "rsi")
            .set("compare.4", "type", "dca");
        assert_eq!(compare_sections(&config), vec!["compare.1", "compare.2"]);
        assert_eq!(parse_compare_strategies(&config).unwrap().len(), 2);
        assert!(validate_compare_config(&config).is_ok());
    }

    #[test]
    fn compare_needs_two_strategies() {
        let config = TestConfig::valid().set("compare.1", "type", "buy_and_hold");
        let err = validate_compare_config(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameters);
    }

    #[test]
    fn compare_rejects_four_strategies() {
        let config = TestConfig::valid()
            .set("compare.1", "type", "buy_and_hold")
            .set("compare.2", "type", "buy_and_hold")
            .set("compare.3", "type", "buy_and_hold")
            .set("compare.4", "type", "buy_and_hold");
        assert!(validate_compare_config(&config).is_err());
    }

    #[test]
    fn holdings_parse() {
        let holdings = parse_holdings("aapl:0.6, MSFT : 0.4").unwrap();
        assert_eq!(
            holdings,
            vec![Holding::new("AAPL", 0.6), Holding::new("MSFT", 0.4)]
        );
        assert!(parse_holdings("AAPL=0.5").is_err());
        assert!(parse_holdings("AAPL:half").is_err());
        assert!(parse_holdings(":0.5").is_err());
    }

    #[test]
    fn portfolio_rebalance_settings() {
        let config = TestConfig::valid().set("portfolio", "holdings", "AAPL:0.5,MSFT:0.5");
        assert_eq!(parse_portfolio(&config).unwrap().1, None);

        let config = config
            .set("portfolio", "rebalance", "true")
            .set("portfolio", "rebalance_interval", "quarterly");
        assert_eq!(
            parse_portfolio(&config).unwrap().1,
            Some(RebalanceInterval::Quarterly)
        );

        let config = config.set("portfolio", "rebalance_interval", "yearly");
        assert!(validate_portfolio_config(&config).is_err());
    }

    #[test]
    fn portfolio_weights_validated() {
        let config = TestConfig::valid().set("portfolio", "holdings", "AAPL:0.5,MSFT:0.47");
        let err = validate_portfolio_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { ref key, .. } if key == "holdings"));
    }
}
