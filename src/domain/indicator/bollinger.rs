//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: length=20, multiplier=2.0
//! Warmup: first (length-1) bars are invalid.

use crate::domain::indicator::{IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PricePoint;

pub const DEFAULT_LENGTH: usize = 20;
pub const DEFAULT_MULTIPLIER_X100: u32 = 200;

pub fn calculate_bollinger(
    points: &[PricePoint],
    length: usize,
    multiplier_x100: u32,
) -> IndicatorSeries {
    let mult = multiplier_x100 as f64 / 100.0;

    let values = (0..points.len())
        .map(|i| {
            if length == 0 || i + 1 < length {
                return None;
            }
            let window = &points[i + 1 - length..=i];
            let middle = window.iter().map(|p| p.close).sum::<f64>() / length as f64;
            let variance = window
                .iter()
                .map(|p| {
                    let diff = p.close - middle;
                    diff * diff
                })
                .sum::<f64>()
                / length as f64;
            let band = mult * variance.sqrt();

            Some(IndicatorValue::Bollinger {
                upper: middle + band,
                middle,
                lower: middle - band,
            })
        })
        .collect();

    IndicatorSeries::from_options(
        IndicatorType::Bollinger {
            length,
            multiplier_x100,
        },
        points,
        values,
        IndicatorValue::Bollinger {
            upper: 0.0,
            middle: 0.0,
            lower: 0.0,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_points;
    use approx::assert_relative_eq;

    fn bands(series: &IndicatorSeries, i: usize) -> (f64, f64, f64) {
        match series.get(i) {
            Some(IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            }) => (upper, middle, lower),
            other => panic!("Expected Bollinger value at {}, got {:?}", i, other),
        }
    }

    #[test]
    fn bollinger_warmup() {
        let series = calculate_bollinger(&make_points(&[10.0, 20.0, 30.0, 40.0, 50.0]), 3, 200);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn bollinger_constant_values_collapse_to_price() {
        let series = calculate_bollinger(&make_points(&[100.0; 30]), DEFAULT_LENGTH, 200);
        for i in (DEFAULT_LENGTH - 1)..30 {
            let (upper, middle, lower) = bands(&series, i);
            assert_relative_eq!(upper, 100.0);
            assert_relative_eq!(middle, 100.0);
            assert_relative_eq!(lower, 100.0);
        }
    }

    #[test]
    fn bollinger_basic_calculation() {
        let series = calculate_bollinger(&make_points(&[10.0, 20.0, 30.0]), 3, 200);
        let (upper, middle, lower) = bands(&series, 2);

        let stddev = (200.0_f64 / 3.0).sqrt();
        assert_relative_eq!(middle, 20.0, epsilon = 1e-10);
        assert_relative_eq!(upper, 20.0 + 2.0 * stddev, epsilon = 1e-10);
        assert_relative_eq!(lower, 20.0 - 2.0 * stddev, epsilon = 1e-10);
    }

    #[test]
    fn bollinger_fractional_multiplier() {
        let series = calculate_bollinger(&make_points(&[10.0, 20.0, 30.0]), 3, 150);
        let (upper, middle, _) = bands(&series, 2);
        let stddev = (200.0_f64 / 3.0).sqrt();
        assert_relative_eq!(upper - middle, 1.5 * stddev, epsilon = 1e-10);
    }

    #[test]
    fn bollinger_symmetry() {
        let series = calculate_bollinger(&make_points(&[10.0, 13.0, 9.0, 30.0]), 3, 200);
        for i in 2..4 {
            let (upper, middle, lower) = bands(&series, i);
            assert_relative_eq!(upper - middle, middle - lower, epsilon = 1e-10);
        }
    }

    #[test]
    fn bollinger_short_series_is_all_undefined() {
        let series = calculate_bollinger(&make_points(&[1.0, 2.0]), 20, 200);
        assert!(series.is_all_undefined());
    }

    #[test]
    fn bollinger_indicator_type() {
        let series = calculate_bollinger(&make_points(&[10.0]), 20, 200);
        assert_eq!(
            series.indicator_type,
            IndicatorType::Bollinger {
                length: 20,
                multiplier_x100: 200
            }
        );
    }
}
