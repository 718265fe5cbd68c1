//! RSI (Relative Strength Index) indicator.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are invalid (need n price changes to compute initial average).

use crate::domain::indicator::{IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PricePoint;

pub fn calculate_rsi(points: &[PricePoint], period: usize) -> IndicatorSeries {
    let mut values: Vec<Option<IndicatorValue>> = vec![None; points.len()];

    if period > 0 && points.len() > period {
        let (gains, losses): (Vec<f64>, Vec<f64>) = points
            .windows(2)
            .map(|w| {
                let change = w[1].close - w[0].close;
                (change.max(0.0), (-change).max(0.0))
            })
            .unzip();

        let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
        let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
        values[period] = Some(IndicatorValue::Simple(rsi_value(avg_gain, avg_loss)));

        for change_idx in period..gains.len() {
            avg_gain = (avg_gain * (period - 1) as f64 + gains[change_idx]) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + losses[change_idx]) / period as f64;
            values[change_idx + 1] = Some(IndicatorValue::Simple(rsi_value(avg_gain, avg_loss)));
        }
    }

    IndicatorSeries::from_options(
        IndicatorType::Rsi(period),
        points,
        values,
        IndicatorValue::Simple(0.0),
    )
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_points;
    use proptest::prelude::*;

    #[test]
    fn rsi_empty_points() {
        let series = calculate_rsi(&[], 14);
        assert!(series.values.is_empty());
    }

    #[test]
    fn rsi_single_point() {
        let series = calculate_rsi(&make_points(&[100.0]), 14);
        assert_eq!(series.values.len(), 1);
        assert!(!series.values[0].valid);
    }

    #[test]
    fn rsi_warmup_period() {
        let prices: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let series = calculate_rsi(&make_points(&prices), 14);

        assert_eq!(series.values.len(), 15);
        for i in 0..14 {
            assert!(!series.values[i].valid, "Bar {} should be invalid", i);
        }
        assert!(series.values[14].valid, "Bar 14 should be valid");
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&make_points(&prices), 14);
        assert_eq!(series.simple(14), Some(100.0));
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&make_points(&prices), 14);
        assert_eq!(series.simple(14), Some(0.0));
    }

    #[test]
    fn rsi_flat_series_is_100() {
        let series = calculate_rsi(&make_points(&[100.0; 30]), 6);
        for i in 6..30 {
            assert_eq!(series.simple(i), Some(100.0));
        }
    }

    #[test]
    fn rsi_wilder_smoothing_step() {
        // changes: +2, -1, +3 ; period 2
        let series = calculate_rsi(&make_points(&[10.0, 12.0, 11.0, 14.0]), 2);
        // seed: gain 1.0, loss 0.5 -> RS 2
        let seed = series.simple(2).unwrap();
        assert!((seed - (100.0 - 100.0 / 3.0)).abs() < 1e-9);
        // next: gain (1*1+3)/2=2, loss (0.5*1+0)/2=0.25 -> RS 8
        let next = series.simple(3).unwrap();
        assert!((next - (100.0 - 100.0 / 9.0)).abs() < 1e-9);
    }

    #[test]
    fn rsi_zero_period() {
        let series = calculate_rsi(&make_points(&[100.0, 101.0]), 0);
        assert_eq!(series.values.len(), 2);
        assert!(series.is_all_undefined());
    }

    #[test]
    fn rsi_indicator_type() {
        let series = calculate_rsi(&make_points(&[100.0]), 6);
        assert_eq!(series.indicator_type, IndicatorType::Rsi(6));
    }

    proptest! {
        #[test]
        fn rsi_always_within_bounds(
            prices in prop::collection::vec(1.0f64..1_000.0, 2..120),
            period in 1usize..30,
        ) {
            let series = calculate_rsi(&make_points(&prices), period);
            for i in 0..prices.len() {
                if let Some(rsi) = series.simple(i) {
                    prop_assert!((0.0..=100.0).contains(&rsi), "RSI {} out of range", rsi);
                }
            }
        }
    }
}
