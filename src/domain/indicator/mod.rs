//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorKind`: The closed set of indicator classes, looked up by name
//! - `IndicatorSeries`: A time series of indicator values
//!
//! Every series has exactly one point per input price point. Warm-up points
//! carry `valid == false` and must never be read as values.

pub mod bollinger;
pub mod ema;
pub mod kdj;
pub mod macd;
pub mod rsi;
pub mod sma;

use crate::domain::error::StocksageError;
use crate::domain::ohlcv::PricePoint;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub use ema::ema_seeded;
pub use sma::rolling_mean;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        dif: f64,
        dea: f64,
        histogram: f64,
    },
    Kdj {
        k: f64,
        d: f64,
        j: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ma(usize),
    VolumeMa(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Kdj {
        length: usize,
        signal: usize,
    },
    Bollinger {
        length: usize,
        multiplier_x100: u32,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Build a series from per-index optional values; `None` becomes an
    /// undefined point carrying `placeholder`.
    pub fn from_options(
        indicator_type: IndicatorType,
        points: &[PricePoint],
        values: Vec<Option<IndicatorValue>>,
        placeholder: IndicatorValue,
    ) -> Self {
        let values = points
            .iter()
            .zip(values)
            .map(|(p, v)| IndicatorPoint {
                date: p.date,
                valid: v.is_some(),
                value: v.unwrap_or(placeholder),
            })
            .collect();
        IndicatorSeries {
            indicator_type,
            values,
        }
    }

    /// The value at `index`, or `None` when out of range or still warming up.
    pub fn get(&self, index: usize) -> Option<IndicatorValue> {
        self.values
            .get(index)
            .filter(|p| p.valid)
            .map(|p| p.value)
    }

    pub fn simple(&self, index: usize) -> Option<f64> {
        match self.get(index)? {
            IndicatorValue::Simple(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_all_undefined(&self) -> bool {
        self.values.iter().all(|p| !p.valid)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ma(period) => write!(f, "MA({})", period),
            IndicatorType::VolumeMa(period) => write!(f, "VOL({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Kdj { length, signal } => write!(f, "KDJ({},{})", length, signal),
            IndicatorType::Bollinger {
                length,
                multiplier_x100,
            } => {
                let mult = *multiplier_x100 as f64 / 100.0;
                write!(f, "BOLL({},{})", length, mult)
            }
        }
    }
}

/// Closed registry of indicator classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Ma,
    Macd,
    Rsi,
    Kdj,
    Bollinger,
    VolumeMa,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 6] = [
        IndicatorKind::Ma,
        IndicatorKind::Macd,
        IndicatorKind::Rsi,
        IndicatorKind::Kdj,
        IndicatorKind::Bollinger,
        IndicatorKind::VolumeMa,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IndicatorKind::Ma => "ma",
            IndicatorKind::Macd => "macd",
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::Kdj => "kdj",
            IndicatorKind::Bollinger => "bollinger",
            IndicatorKind::VolumeMa => "volume_ma",
        }
    }

    /// Whether the signal engine derives a directional signal from this class.
    pub fn produces_signal(self) -> bool {
        !matches!(self, IndicatorKind::VolumeMa)
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IndicatorKind {
    type Err = StocksageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ma" | "sma" => Ok(IndicatorKind::Ma),
            "macd" => Ok(IndicatorKind::Macd),
            "rsi" => Ok(IndicatorKind::Rsi),
            "kdj" => Ok(IndicatorKind::Kdj),
            "bollinger" | "boll" => Ok(IndicatorKind::Bollinger),
            "volume_ma" | "vol" => Ok(IndicatorKind::VolumeMa),
            other => Err(StocksageError::invalid_config(
                "indicator",
                format!("unknown indicator name '{}'", other),
            )),
        }
    }
}
