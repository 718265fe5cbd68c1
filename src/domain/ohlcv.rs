//! Price points and per-instrument series.

use chrono::NaiveDate;
use std::collections::HashMap;

/// One trading session of one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PricePoint {
    /// Simple return from `prev_close` to this session's close.
    pub fn return_from(&self, prev_close: f64) -> f64 {
        if prev_close == 0.0 {
            0.0
        } else {
            (self.close - prev_close) / prev_close
        }
    }
}

/// An instrument's ascending, deduplicated price series.
#[derive(Debug, Clone)]
pub struct InstrumentSeries {
    pub code: String,
    pub points: Vec<PricePoint>,
    date_index: HashMap<NaiveDate, usize>,
}

impl InstrumentSeries {
    pub fn new(code: impl Into<String>, points: Vec<PricePoint>) -> Self {
        let date_index = points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.date, i))
            .collect();
        Self {
            code: code.into(),
            points,
            date_index,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: u32, close: f64) -> PricePoint {
        PricePoint {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000.0,
        }
    }

    #[test]
    fn return_from_previous_close() {
        let p = point(2, 110.0);
        assert!((p.return_from(100.0) - 0.10).abs() < 1e-12);
    }

    #[test]
    fn return_from_zero_close_is_zero() {
        let p = point(2, 110.0);
        assert_eq!(p.return_from(0.0), 0.0);
    }

    #[test]
    fn series_builds_date_index() {
        let series = InstrumentSeries::new("600000", vec![point(2, 10.0), point(3, 11.0)]);
        assert_eq!(series.len(), 2);
        assert_eq!(
            series.index_of(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()),
            Some(1)
        );
        assert_eq!(
            series.index_of(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap()),
            None
        );
        assert_eq!(
            series.last_date(),
            Some(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap())
        );
    }

    #[test]
    fn empty_series() {
        let series = InstrumentSeries::new("X", vec![]);
        assert!(series.is_empty());
        assert_eq!(series.last_date(), None);
    }
}
