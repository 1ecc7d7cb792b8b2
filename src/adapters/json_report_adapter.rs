//! JSON report adapter.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use crate::domain::portfolio::PortfolioResult;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};

#[derive(Debug, Default)]
pub struct JsonReportAdapter {
    pretty: bool,
}

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    fn write_json<T: Serialize + ?Sized>(
        &self,
        value: &T,
        output_path: &str,
    ) -> Result<(), BacktestError> {
        let file = File::create(output_path)?;
        let mut writer = BufWriter::new(file);
        let written = if self.pretty {
            serde_json::to_writer_pretty(&mut writer, value)
        } else {
            serde_json::to_writer(&mut writer, value)
        };
        written.map_err(|e| BacktestError::Io(e.into()))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        tracing::info!(path = output_path, "report written");
        Ok(())
    }
}

impl ReportPort for JsonReportAdapter {
    fn write_backtest(
        &self,
        result: &BacktestResult,
        output_path: &str,
    ) -> Result<(), BacktestError> {
        self.write_json(result, output_path)
    }

    fn write_comparison(
        &self,
        results: &[BacktestResult],
        output_path: &str,
    ) -> Result<(), BacktestError> {
        self.write_json(results, output_path)
    }

    fn write_portfolio(
        &self,
        result: &PortfolioResult,
        output_path: &str,
    ) -> Result<(), BacktestError> {
        self.write_json(result, output_path)
    }
}
