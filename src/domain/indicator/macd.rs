//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! DIF = EMA(fast) - EMA(slow)
//! DEA = EMA(signal) of DIF
//! Histogram = 2 * (DIF - DEA)
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: slow - 1 + signal - 1 bars.

use crate::domain::indicator::ema::{ema_of_defined, ema_seeded};
use crate::domain::indicator::{IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PricePoint;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    points: &[PricePoint],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();

    let ema_fast = ema_seeded(&closes, fast);
    let ema_slow = ema_seeded(&closes, slow);

    let dif: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let dea = ema_of_defined(&dif, signal_period);

    let values = dif
        .iter()
        .zip(&dea)
        .map(|(dif, dea)| {
            let (dif, dea) = ((*dif)?, (*dea)?);
            Some(IndicatorValue::Macd {
                dif,
                dea,
                histogram: 2.0 * (dif - dea),
            })
        })
        .collect();

    IndicatorSeries::from_options(
        indicator_type,
        points,
        values,
        IndicatorValue::Macd {
            dif: 0.0,
            dea: 0.0,
            histogram: 0.0,
        },
    )
}
