//! CSV file data adapter.
//!
//! One file per symbol, `{base_path}/{SYMBOL}.csv`, with a header row:
//! `date,open,high,low,close,adj_close,volume`. A missing `adj_close`
//! column falls back to `close`. Rows that fail to parse are skipped with a
//! warning.

use crate::domain::error::BacktestError;
use crate::domain::price::PricePoint;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

#[derive(Debug)]
pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(default, alias = "Adj Close", alias = "adjusted_close")]
    adj_close: Option<f64>,
    #[serde(default, alias = "Volume")]
    volume: Option<f64>,
}

impl From<CsvRow> for PricePoint {
    fn from(row: CsvRow) -> Self {
        PricePoint {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            adj_close: row.adj_close.unwrap_or(row.close),
            volume: row.volume.map_or(0, |v| v as i64),
        }
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.csv", symbol.trim().to_uppercase()))
    }

    /// Every parseable row in the symbol's file, ascending and deduplicated
    /// by date. A missing file is an empty series.
    fn load(&self, symbol: &str) -> Result<Vec<PricePoint>, BacktestError> {
        let path = self.csv_path(symbol);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no csv file for symbol");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(BacktestError::DataSource {
                    reason: format!("failed to read {}: {}", path.display(), e),
                });
            }
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut points = Vec::new();

        for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
            match result {
                Ok(row) => points.push(PricePoint::from(row)),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        row = line + 1,
                        error = %e,
                        "skipping unparseable row"
                    );
                }
            }
        }

        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Ok(points)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        symbol: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<PricePoint>, BacktestError> {
        let mut points = self.load(symbol)?;
        points.retain(|p| p.date >= date_from && p.date <= date_to);
        Ok(points)
    }

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| BacktestError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| BacktestError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_uppercase());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BacktestError> {
        let points = self.load(symbol)?;
        Ok(match (points.first(), points.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, points.len())),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,adj_close,volume\n\
            2024-01-15,100.0,110.0,90.0,105.0,104.0,50000\n\
            2024-01-17,110.0,120.0,105.0,115.0,114.0,55000\n\
            2024-01-16,105.0,115.0,100.0,110.0,109.0,60000\n";

        fs::write(path.join("AAPL.csv"), csv_content).unwrap();
        fs::write(
            path.join("MSFT.csv"),
            "Date,Open,High,Low,Close,Volume\n2024-01-15,1,2,0.5,1.5,100\n",
        )
        .unwrap();
        fs::write(path.join("notes.txt"), "ignored").unwrap();

        (dir, path)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn fetch_prices_returns_sorted_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let points = adapter
            .fetch_prices("AAPL", d(2024, 1, 15), d(2024, 1, 17))
            .unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].date, d(2024, 1, 15));
        assert_eq!(points[0].open, 100.0);
        assert_eq!(points[0].close, 105.0);
        assert_eq!(points[0].adj_close, 104.0);
        assert_eq!(points[0].volume, 50000);
        assert_eq!(points[1].date, d(2024, 1, 16));
    }

    #[test]
    fn fetch_prices_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let points = adapter
            .fetch_prices("aapl", d(2024, 1, 16), d(2024, 1, 16))
            .unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].date, d(2024, 1, 16));
    }

    #[test]
    fn missing_adj_close_falls_back_to_close() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let points = adapter
            .fetch_prices("MSFT", d(2024, 1, 1), d(2024, 12, 31))
            .unwrap();
        assert_eq!(points[0].adj_close, 1.5);
    }

    #[test]
    fn missing_file_is_empty_series() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let points = adapter
            .fetch_prices("XYZ", d(2024, 1, 1), d(2024, 1, 31))
            .unwrap();
        assert!(points.is_empty());
        assert_eq!(adapter.get_data_range("XYZ").unwrap(), None);
    }

    #[test]
    fn bad_rows_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("BAD.csv"),
            "date,open,high,low,close,adj_close,volume\n\
             2024-01-15,1,1,1,1,1,1\n\
             not-a-date,1,1,1,1,1,1\n\
             2024-01-16,1,1,1,abc,1,1\n\
             2024-01-17,2,2,2,2,2,2\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let points = adapter
            .fetch_prices("BAD", d(2024, 1, 1), d(2024, 1, 31))
            .unwrap();
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn data_range_reports_bounds_and_count() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert_eq!(
            adapter.get_data_range("AAPL").unwrap(),
            Some((d(2024, 1, 15), d(2024, 1, 17), 3))
        );
    }

    #[test]
    fn list_symbols_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert_eq!(adapter.list_symbols().unwrap(), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn list_symbols_missing_dir_is_error() {
        let adapter = CsvAdapter::new(PathBuf::from("/nonexistent/equitysim/data"));
        let err = adapter.list_symbols().unwrap_err();
        assert!(matches!(err, BacktestError::DataSource { .. }));
    }
}
