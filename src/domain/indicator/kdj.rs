//! KDJ stochastic oscillator.
//!
//! RSV = (close - lowest low) / (highest high - lowest low) * 100 over `length`.
//! %K = SMA(RSV, signal), %D = SMA(%K, signal), %J = 3 * %D - 2 * %K.
//! A flat window (zero range) yields RSV = 50.
//!
//! Warmup: RSV from index length-1, %K from length+signal-2,
//! %D (and the point) from length+2*signal-3.

use crate::domain::indicator::sma::rolling_mean;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PricePoint;

pub const DEFAULT_LENGTH: usize = 9;
pub const DEFAULT_SIGNAL: usize = 3;

const NEUTRAL_RSV: f64 = 50.0;

fn raw_stochastic(points: &[PricePoint], length: usize) -> Vec<Option<f64>> {
    (0..points.len())
        .map(|i| {
            if length == 0 || i + 1 < length {
                return None;
            }
            let window = &points[i + 1 - length..=i];
            let highest = window.iter().map(|p| p.high).fold(f64::MIN, f64::max);
            let lowest = window.iter().map(|p| p.low).fold(f64::MAX, f64::min);
            let range = highest - lowest;
            if range == 0.0 {
                Some(NEUTRAL_RSV)
            } else {
                Some((points[i].close - lowest) / range * 100.0)
            }
        })
        .collect()
}

/// Rolling mean over a series whose leading run is undefined.
fn smooth(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let Some(start) = values.iter().position(Option::is_some) else {
        return vec![None; values.len()];
    };
    let tail: Vec<f64> = values[start..].iter().map(|v| v.unwrap_or(0.0)).collect();
    let mut out = vec![None; start];
    out.extend(rolling_mean(&tail, period));
    out
}

pub fn calculate_kdj(points: &[PricePoint], length: usize, signal: usize) -> IndicatorSeries {
    let rsv = raw_stochastic(points, length);
    let k_line = smooth(&rsv, signal);
    let d_line = smooth(&k_line, signal);

    let values = k_line
        .iter()
        .zip(&d_line)
        .map(|(k, d)| {
            let (k, d) = ((*k)?, (*d)?);
            Some(IndicatorValue::Kdj {
                k,
                d,
                j: 3.0 * d - 2.0 * k,
            })
        })
        .collect();

    IndicatorSeries::from_options(
        IndicatorType::Kdj { length, signal },
        points,
        values,
        IndicatorValue::Kdj {
            k: 0.0,
            d: 0.0,
            j: 0.0,
        },
    )
}
