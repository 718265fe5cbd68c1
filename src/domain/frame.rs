//! Per-instrument indicator frame.
//!
//! `compute_frame` runs every enabled indicator over one instrument's series
//! and keeps the results aligned by index with the source price points.

use crate::domain::error::StocksageError;
use crate::domain::indicator::bollinger::{self, calculate_bollinger};
use crate::domain::indicator::kdj::{self, calculate_kdj};
use crate::domain::indicator::macd::{self, calculate_macd};
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::{calculate_ma, calculate_volume_ma};
use crate::domain::indicator::{IndicatorKind, IndicatorSeries};
use crate::domain::ohlcv::{InstrumentSeries, PricePoint};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub const DEFAULT_MA_PERIODS: [usize; 6] = [5, 10, 20, 60, 120, 250];
pub const DEFAULT_RSI_PERIODS: [usize; 3] = [6, 12, 24];
pub const DEFAULT_VOLUME_MA_PERIODS: [usize; 3] = [5, 10, 20];

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub enabled: BTreeSet<IndicatorKind>,
    pub ma_periods: Vec<usize>,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rsi_periods: Vec<usize>,
    pub kdj_length: usize,
    pub kdj_signal: usize,
    pub boll_length: usize,
    pub boll_multiplier: f64,
    pub volume_ma_periods: Vec<usize>,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            enabled: IndicatorKind::ALL.into_iter().collect(),
            ma_periods: DEFAULT_MA_PERIODS.to_vec(),
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            rsi_periods: DEFAULT_RSI_PERIODS.to_vec(),
            kdj_length: kdj::DEFAULT_LENGTH,
            kdj_signal: kdj::DEFAULT_SIGNAL,
            boll_length: bollinger::DEFAULT_LENGTH,
            boll_multiplier: bollinger::DEFAULT_MULTIPLIER_X100 as f64 / 100.0,
            volume_ma_periods: DEFAULT_VOLUME_MA_PERIODS.to_vec(),
        }
    }
}

impl IndicatorConfig {
    pub fn is_enabled(&self, kind: IndicatorKind) -> bool {
        self.enabled.contains(&kind)
    }

    /// Bollinger multiplier in hundredths, as carried by `IndicatorType`.
    pub fn boll_multiplier_x100(&self) -> u32 {
        (self.boll_multiplier * 100.0).round() as u32
    }
}

/// All indicator series of one instrument, index-aligned with its points.
#[derive(Debug, Clone)]
pub struct IndicatorFrame<'a> {
    pub series: &'a InstrumentSeries,
    pub ma: BTreeMap<usize, IndicatorSeries>,
    pub macd: Option<IndicatorSeries>,
    pub rsi: BTreeMap<usize, IndicatorSeries>,
    pub kdj: Option<IndicatorSeries>,
    pub bollinger: Option<IndicatorSeries>,
    pub volume_ma: BTreeMap<usize, IndicatorSeries>,
}

impl<'a> IndicatorFrame<'a> {
    pub fn code(&self) -> &str {
        &self.series.code
    }

    pub fn points(&self) -> &'a [PricePoint] {
        &self.series.points
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.series.index_of(date)
    }

    pub fn date(&self, index: usize) -> Option<NaiveDate> {
        self.series.points.get(index).map(|p| p.date)
    }

    pub fn close(&self, index: usize) -> Option<f64> {
        self.series.points.get(index).map(|p| p.close)
    }

    /// Every computed series, in a stable display order.
    pub fn all_series(&self) -> impl Iterator<Item = &IndicatorSeries> {
        self.ma
            .values()
            .chain(self.macd.iter())
            .chain(self.rsi.values())
            .chain(self.kdj.iter())
            .chain(self.bollinger.iter())
            .chain(self.volume_ma.values())
    }
}

/// Compute every enabled indicator over `series`.
pub fn compute_frame<'a>(
    series: &'a InstrumentSeries,
    config: &IndicatorConfig,
) -> Result<IndicatorFrame<'a>, StocksageError> {
    if series.is_empty() {
        return Err(StocksageError::EmptySeries {
            code: series.code.clone(),
        });
    }
    let points = series.points.as_slice();

    let periodic = |kind: IndicatorKind,
                    periods: &[usize],
                    calc: fn(&[PricePoint], usize) -> IndicatorSeries|
     -> BTreeMap<usize, IndicatorSeries> {
        if !config.is_enabled(kind) {
            return BTreeMap::new();
        }
        periods
            .iter()
            .map(|&period| (period, calc(points, period)))
            .collect()
    };

    let frame = IndicatorFrame {
        series,
        ma: periodic(IndicatorKind::Ma, &config.ma_periods, calculate_ma),
        macd: config.is_enabled(IndicatorKind::Macd).then(|| {
            calculate_macd(points, config.macd_fast, config.macd_slow, config.macd_signal)
        }),
        rsi: periodic(IndicatorKind::Rsi, &config.rsi_periods, calculate_rsi),
        kdj: config
            .is_enabled(IndicatorKind::Kdj)
            .then(|| calculate_kdj(points, config.kdj_length, config.kdj_signal)),
        bollinger: config.is_enabled(IndicatorKind::Bollinger).then(|| {
            calculate_bollinger(points, config.boll_length, config.boll_multiplier_x100())
        }),
        volume_ma: periodic(
            IndicatorKind::VolumeMa,
            &config.volume_ma_periods,
            calculate_volume_ma,
        ),
    };

    debug!(
        code = %series.code,
        points = points.len(),
        indicators = frame.all_series().count(),
        "computed indicator frame"
    );
    Ok(frame)
}
