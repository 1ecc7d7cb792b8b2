//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::BacktestResult;
use crate::domain::cancel::CancelToken;
use crate::domain::config_validation::{
    parse_compare_strategies, parse_dates, parse_initial_capital, parse_portfolio,
    parse_price_basis, parse_strategy, parse_symbol, validate_backtest_config,
    validate_compare_config, validate_portfolio_config, validate_strategy_config,
};
use crate::domain::error::BacktestError;
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::portfolio::PortfolioResult;
use crate::domain::service::{
    self, BacktestRequest, CompareRequest, PortfolioRequest,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "equitysim", about = "Equity strategy and portfolio backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one strategy on one symbol
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Run two or three strategies side by side on one symbol
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Run one strategy across a weighted basket of symbols
    Portfolio {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Validate a configuration file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            symbol,
        } => run_backtest(&config, output.as_deref(), symbol.as_deref()),
        Command::Compare {
            config,
            output,
            symbol,
        } => run_compare(&config, output.as_deref(), symbol.as_deref()),
        Command::Portfolio { config, output } => run_portfolio(&config, output.as_deref()),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `level`, which wins
/// over the `warn` default. Later calls are no-ops.
pub fn init_logging(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    let adapter = FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })?;
    init_logging(adapter.get_string("log", "level").as_deref());
    Ok(adapter)
}

/// Data adapter rooted at `[data] csv_dir`.
pub fn build_data_port(config: &dyn ConfigPort) -> Result<CsvAdapter, BacktestError> {
    config
        .get_string("data", "csv_dir")
        .map(|dir| CsvAdapter::new(PathBuf::from(dir.trim())))
        .ok_or_else(|| BacktestError::ConfigMissing {
            section: "data".into(),
            key: "csv_dir".into(),
        })
}

pub fn build_backtest_request(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<BacktestRequest, BacktestError> {
    let (date_from, date_to) = parse_dates(config)?;
    Ok(BacktestRequest {
        symbol: resolve_symbol(config, symbol_override)?,
        date_from,
        date_to,
        initial_capital: parse_initial_capital(config)?,
        price_basis: parse_price_basis(config)?,
        strategy: parse_strategy(config, "strategy")?,
    })
}

pub fn build_compare_request(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<CompareRequest, BacktestError> {
    let (date_from, date_to) = parse_dates(config)?;
    Ok(CompareRequest {
        symbol: resolve_symbol(config, symbol_override)?,
        date_from,
        date_to,
        initial_capital: parse_initial_capital(config)?,
        price_basis: parse_price_basis(config)?,
        strategies: parse_compare_strategies(config)?,
    })
}

pub fn build_portfolio_request(config: &dyn ConfigPort) -> Result<PortfolioRequest, BacktestError> {
    let (date_from, date_to) = parse_dates(config)?;
    let (holdings, rebalance) = parse_portfolio(config)?;
    Ok(PortfolioRequest {
        holdings,
        date_from,
        date_to,
        initial_capital: parse_initial_capital(config)?,
        price_basis: parse_price_basis(config)?,
        strategy: parse_strategy(config, "strategy")?,
        rebalance,
    })
}

fn resolve_symbol(
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<String, BacktestError> {
    match symbol_override {
        Some(symbol) => Ok(symbol.to_string()),
        None => parse_symbol(config),
    }
}

fn run_backtest(config_path: &Path, output: Option<&Path>, symbol: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let result = validate_backtest_config(&adapter)
        .and_then(|_| build_backtest_request(&adapter, symbol))
        .and_then(|request| {
            eprintln!(
                "Running {} on {} from {} to {}...",
                request.strategy.kind(),
                request.symbol.trim().to_uppercase(),
                request.date_from,
                request.date_to
            );
            let port = build_data_port(&adapter)?;
            service::run_backtest(&port, &request, &CancelToken::new())
        });

    let result = match result {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    print_backtest_summary(&result);

    if let Some(path) = output {
        if let Err(e) = write_report(path, |reporter, p| reporter.write_backtest(&result, p)) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("Report written to {}", path.display());
    }

    ExitCode::SUCCESS
}

fn run_compare(config_path: &Path, output: Option<&Path>, symbol: Option<&str>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let results = validate_backtest_config(&adapter)
        .and_then(|_| build_compare_request(&adapter, symbol))
        .and_then(|request| {
            eprintln!(
                "Comparing {} strategies on {}...",
                request.strategies.len(),
                request.symbol.trim().to_uppercase()
            );
            let port = build_data_port(&adapter)?;
            service::compare_backtests(&port, &request, &CancelToken::new())
        });

    let results = match results {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    for result in &results {
        print_backtest_summary(result);
    }

    if let Some(path) = output {
        if let Err(e) = write_report(path, |reporter, p| reporter.write_comparison(&results, p)) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("Report written to {}", path.display());
    }

    ExitCode::SUCCESS
}

fn run_portfolio(config_path: &Path, output: Option<&Path>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let result = validate_backtest_config(&adapter)
        .and_then(|_| build_portfolio_request(&adapter))
        .and_then(|request| {
            eprintln!(
                "Running {} across {} holdings...",
                request.strategy.kind(),
                request.holdings.len()
            );
            let port = build_data_port(&adapter)?;
            service::run_portfolio_backtest(&port, &request, &CancelToken::new())
        });

    let result = match result {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    print_portfolio_summary(&result);

    if let Some(path) = output {
        if let Err(e) = write_report(path, |reporter, p| reporter.write_portfolio(&result, p)) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("Report written to {}", path.display());
    }

    ExitCode::SUCCESS
}

fn run_info(config_path: &Path, symbol: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let port = match build_data_port(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let symbols = match symbol {
        Some(s) => vec![s.to_string()],
        None => match port.list_symbols() {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        },
    };

    if symbols.is_empty() {
        eprintln!("No symbols found");
        return ExitCode::SUCCESS;
    }

    for symbol in &symbols {
        match service::data_range(&port, symbol) {
            Ok(Some(range)) => println!(
                "{}: {} points, {} to {}",
                range.symbol, range.point_count, range.first_date, range.last_date
            ),
            Ok(None) => println!("{}: no data", symbol.trim().to_uppercase()),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    ExitCode::SUCCESS
}

/// Checks every section the file carries. `[backtest]` and `[data]` are
/// always required; `[strategy]`, `[compare.N]` and `[portfolio]` only when
/// present.
fn run_validate(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!("Config OK: {}", config_path.display());
    if let Ok((from, to)) = parse_dates(&adapter) {
        eprintln!("  Range: {} to {}", from, to);
    }
    if let Ok(strategy) = parse_strategy(&adapter, "strategy") {
        eprintln!("  Strategy: {}", strategy.kind());
    }
    if let Ok(strategies) = parse_compare_strategies(&adapter) {
        eprintln!("  Compare: {} strategies", strategies.len());
    }
    if let Ok((holdings, rebalance)) = parse_portfolio(&adapter) {
        eprintln!("  Portfolio: {} holdings", holdings.len());
        if let Some(interval) = rebalance {
            eprintln!("  Rebalance: {:?}", interval);
        }
    }

    ExitCode::SUCCESS
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_backtest_config(config)?;
    if config.has_section("strategy") {
        validate_strategy_config(config)?;
    }
    if config.has_section("compare.1") {
        validate_compare_config(config)?;
    }
    if config.has_section("portfolio") {
        validate_portfolio_config(config)?;
    }
    Ok(())
}

fn write_report<F>(path: &Path, write: F) -> Result<(), BacktestError>
where
    F: FnOnce(&dyn ReportPort, &str) -> Result<(), BacktestError>,
{
    let path_str = path.to_str().ok_or_else(|| BacktestError::ConfigInvalid {
        section: "cli".into(),
        key: "output".into(),
        reason: format!("path is not valid UTF-8: {}", path.display()),
    })?;
    write(&JsonReportAdapter::pretty(), path_str)
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0))
}

fn ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}

fn print_metrics(metrics: &PerformanceMetrics) {
    eprintln!("  Total return:   {}", pct(metrics.total_return));
    eprintln!("  CAGR:           {}", pct(metrics.cagr));
    eprintln!("  Sharpe:         {:.2}", metrics.sharpe_ratio);
    eprintln!("  Max drawdown:   {}", pct(Some(metrics.max_drawdown)));
    eprintln!("  Volatility:     {}", pct(Some(metrics.volatility)));
    eprintln!("  Calmar:         {}", ratio(metrics.calmar_ratio));
    eprintln!("  Win rate:       {}", pct(metrics.win_rate));
    eprintln!("  Profit factor:  {}", ratio(metrics.profit_factor));
    eprintln!("  Time in market: {}", pct(Some(metrics.time_in_market)));
}

fn print_backtest_summary(result: &BacktestResult) {
    eprintln!();
    eprintln!(
        "{} [{}] {} to {}",
        result.symbol,
        result.strategy_kind(),
        result.date_from,
        result.date_to
    );
    eprintln!("  Invested:       {:.2}", result.total_invested);
    eprintln!("  Final value:    {:.2}", result.final_value);
    eprintln!("  Trades:         {}", result.trades.len());
    print_metrics(&result.metrics);
}

fn print_portfolio_summary(result: &PortfolioResult) {
    eprintln!();
    eprintln!(
        "Portfolio [{}] {} to {}",
        result.strategy.kind(),
        result.date_from,
        result.date_to
    );
    eprintln!("  Invested:       {:.2}", result.total_invested);
    eprintln!("  Final value:    {:.2}", result.final_value);
    eprintln!("  Rebalances:     {}", result.rebalance_dates.len());
    print_metrics(&result.metrics);
    for holding in &result.holdings {
        eprintln!(
            "  {:<8} weight {:.2}  final {:.2}  return {}",
            holding.symbol,
            holding.weight,
            holding.final_value,
            pct(holding.metrics.total_return)
        );
    }
}
