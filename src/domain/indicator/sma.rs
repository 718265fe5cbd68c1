//! Simple moving averages of close and volume.
//!
//! MA(n)[i] = mean(C[i-n+1..=i]); VOL(n)[i] = mean(V[i-n+1..=i]).
//! Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PricePoint;

/// Rolling mean over `period` values, `None` until `period` values are available.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                None
            } else {
                let window = &values[i + 1 - period..=i];
                Some(window.iter().sum::<f64>() / period as f64)
            }
        })
        .collect()
}

pub fn calculate_ma(points: &[PricePoint], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
    simple_series(IndicatorType::Ma(period), points, rolling_mean(&closes, period))
}

pub fn calculate_volume_ma(points: &[PricePoint], period: usize) -> IndicatorSeries {
    let volumes: Vec<f64> = points.iter().map(|p| p.volume).collect();
    simple_series(
        IndicatorType::VolumeMa(period),
        points,
        rolling_mean(&volumes, period),
    )
}

fn simple_series(
    indicator_type: IndicatorType,
    points: &[PricePoint],
    values: Vec<Option<f64>>,
) -> IndicatorSeries {
    IndicatorSeries::from_options(
        indicator_type,
        points,
        values.into_iter().map(|v| v.map(IndicatorValue::Simple)).collect(),
        IndicatorValue::Simple(0.0),
    )
}
