//! CSV file data adapter.
//!
//! One file per instrument at `<base>/<CODE>.csv` with the header
//! `date,open,high,low,close,volume` and ISO dates.

use crate::domain::error::StocksageError;
use crate::domain::ohlcv::{InstrumentSeries, PricePoint};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl CsvRow {
    /// The first field that cannot describe a trading session, with the reason.
    fn invalid_field(&self) -> Option<(&'static str, String)> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        if let Some((field, value)) = prices
            .into_iter()
            .find(|(_, v)| !(v.is_finite() && *v > 0.0))
        {
            return Some((field, format!("must be a positive finite price, got {}", value)));
        }
        if !(self.volume.is_finite() && self.volume >= 0.0) {
            return Some((
                "volume",
                format!("must be non-negative and finite, got {}", self.volume),
            ));
        }
        if self.high < self.low {
            return Some(("high", format!("{} is below low {}", self.high, self.low)));
        }
        None
    }
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_series(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<InstrumentSeries, StocksageError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| StocksageError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut points = Vec::new();

        for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = result.map_err(|e| StocksageError::Data {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;
            let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| {
                StocksageError::Data {
                    reason: format!(
                        "{}: invalid date '{}' on row {}: {}",
                        path.display(),
                        row.date,
                        line + 1,
                        e
                    ),
                }
            })?;
            if let Some((field, reason)) = row.invalid_field() {
                return Err(StocksageError::Data {
                    reason: format!("{}: row {}: {} {}", path.display(), line + 1, field, reason),
                });
            }

            if date < start_date || date > end_date {
                continue;
            }

            points.push(PricePoint {
                date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        points.sort_by_key(|p| p.date);
        if let Some(dup) = points.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(StocksageError::Data {
                reason: format!("{}: duplicate session {}", path.display(), dup[0].date),
            });
        }

        debug!(code, rows = points.len(), "loaded price series");
        Ok(InstrumentSeries::new(code, points))
    }

    fn list_codes(&self) -> Result<Vec<String>, StocksageError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| StocksageError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut codes = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StocksageError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            if let Some(code) = name.to_string_lossy().strip_suffix(".csv") {
                codes.push(code.to_string());
            }
        }

        codes.sort();
        Ok(codes)
    }
}
