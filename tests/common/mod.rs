#![allow(dead_code)]

use chrono::NaiveDate;
use stocksage::domain::error::StocksageError;
use stocksage::domain::frame::IndicatorFrame;
pub use stocksage::domain::ohlcv::{InstrumentSeries, PricePoint};
use stocksage::domain::signal::Direction;
use stocksage::domain::strategy::Strategy;
use stocksage::ports::data_port::DataPort;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_points(mut self, code: &str, points: Vec<PricePoint>) -> Self {
        self.data.insert(code.to_string(), points);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<InstrumentSeries, StocksageError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(StocksageError::Data {
                reason: reason.clone(),
            });
        }
        let points = self
            .data
            .get(code)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.date >= start_date && p.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(InstrumentSeries::new(code, points))
    }

    fn list_codes(&self) -> Result<Vec<String>, StocksageError> {
        let mut codes: Vec<String> = self.data.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }
}

/// Buys and sells on fixed dates; holds otherwise.
pub struct DateScript {
    pub buys: Vec<NaiveDate>,
    pub sells: Vec<NaiveDate>,
}

impl Strategy for DateScript {
    fn name(&self) -> &str {
        "date_script"
    }

    fn decide(&self, frame: &IndicatorFrame<'_>, index: usize) -> Result<Direction, StocksageError> {
        let date = frame.date(index).unwrap();
        Ok(if self.buys.contains(&date) {
            Direction::Buy
        } else if self.sells.contains(&date) {
            Direction::Sell
        } else {
            Direction::Hold
        })
    }
}

pub struct NeverBuy;

impl Strategy for NeverBuy {
    fn name(&self) -> &str {
        "never_buy"
    }

    fn decide(&self, _frame: &IndicatorFrame<'_>, _index: usize) -> Result<Direction, StocksageError> {
        Ok(Direction::Hold)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_point(date: &str, open: f64, close: f64) -> PricePoint {
    PricePoint {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open,
        high: open.max(close) + 0.5,
        low: open.min(close) - 0.5,
        close,
        volume: 1000.0,
    }
}

/// One point per calendar day from `start`, with open equal to close.
pub fn points_from_closes(start: NaiveDate, closes: &[f64]) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint {
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        })
        .collect()
}

pub fn series(code: &str, closes: &[f64]) -> InstrumentSeries {
    InstrumentSeries::new(code, points_from_closes(date(2024, 1, 1), closes))
}

pub fn rising_closes(count: usize, start_price: f64, step: f64) -> Vec<f64> {
    (0..count).map(|i| start_price + step * i as f64).collect()
}

/// A slow oscillation around `base`; produces crossovers in every signal.
pub fn wave_closes(count: usize, base: f64, amplitude: f64, period: f64) -> Vec<f64> {
    (0..count)
        .map(|i| base + amplitude * (i as f64 * std::f64::consts::TAU / period).sin())
        .collect()
}

pub fn write_price_csv(dir: &Path, code: &str, points: &[PricePoint]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for p in points {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            p.date, p.open, p.high, p.low, p.close, p.volume
        ));
    }
    fs::write(dir.join(format!("{}.csv", code)), content).unwrap();
}
