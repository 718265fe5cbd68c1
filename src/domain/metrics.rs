//! Performance metrics and statistics.
//!
//! Every ratio is `Option<f64>`: a metric that cannot be computed is `None`,
//! never a zero or NaN stand-in.

use super::equity::EquityPoint;
use super::position::Trade;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub total_return: Option<f64>,
    pub annualized_return: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub win_rate: Option<f64>,
    pub profit_loss_ratio: Option<f64>,
    pub trade_count: usize,
}

impl PerformanceReport {
    /// A report with no trades: every metric undefined.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[Trade],
        initial_capital: f64,
        risk_free_rate: f64,
        periods_per_year: f64,
    ) -> Self {
        if trades.is_empty() {
            return Self::empty();
        }

        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);
        let total_return = (initial_capital > 0.0).then(|| final_equity / initial_capital - 1.0);

        let annualized_return = total_return.and_then(|r| annualize(r, equity_curve));
        let max_drawdown = (!equity_curve.is_empty()).then(|| compute_drawdown(equity_curve));
        let sharpe_ratio = compute_sharpe(equity_curve, risk_free_rate, periods_per_year);

        let wins: Vec<f64> = trades
            .iter()
            .filter(|t| t.is_win())
            .map(|t| t.return_pct)
            .collect();
        let losses: Vec<f64> = trades
            .iter()
            .filter(|t| t.is_loss())
            .map(|t| t.return_pct.abs())
            .collect();

        let win_rate = Some(wins.len() as f64 / trades.len() as f64);
        let profit_loss_ratio = mean(&losses)
            .filter(|avg_loss| *avg_loss > 0.0)
            .map(|avg_loss| mean(&wins).unwrap_or(0.0) / avg_loss);

        PerformanceReport {
            total_return,
            annualized_return,
            max_drawdown,
            sharpe_ratio,
            win_rate,
            profit_loss_ratio,
            trade_count: trades.len(),
        }
    }
}

/// Compound `total_return` to a yearly rate over the calendar span of the curve.
fn annualize(total_return: f64, equity_curve: &[EquityPoint]) -> Option<f64> {
    let (first, last) = (equity_curve.first()?, equity_curve.last()?);
    let holding_days = (last.date - first.date).num_days();
    if holding_days <= 0 {
        return None;
    }
    let annualized = (1.0 + total_return).powf(365.0 / holding_days as f64) - 1.0;
    annualized.is_finite().then_some(annualized)
}

/// Largest peak-to-trough decline as a fraction of the peak.
pub fn compute_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = match equity_curve.first() {
        Some(p) => p.equity,
        None => return 0.0,
    };
    let mut max_dd = 0.0_f64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
    }
    max_dd
}

pub fn period_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect()
}

pub fn compute_sharpe(
    equity_curve: &[EquityPoint],
    risk_free_rate: f64,
    periods_per_year: f64,
) -> Option<f64> {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return None;
    }
    let mean = mean(&returns)?;
    let stddev = population_std_dev(&returns)?;
    if stddev == 0.0 {
        return None;
    }
    let excess = mean - risk_free_rate / periods_per_year;
    Some(excess / stddev * periods_per_year.sqrt())
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Standard deviation dividing by N.
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::ExitReason;
    use crate::domain::signal::Direction;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    fn make_equity_curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                date: day(i as i64),
                equity: v,
            })
            .collect()
    }

    fn make_trade(entry_price: f64, exit_price: f64) -> Trade {
        Trade {
            entry_date: day(0),
            entry_price,
            exit_date: day(5),
            exit_price,
            direction: Direction::Buy,
            exit_reason: ExitReason::Signal,
            return_pct: exit_price / entry_price - 1.0,
            pnl: exit_price - entry_price,
        }
    }

    #[test]
    fn no_trades_means_every_metric_is_null() {
        let curve = make_equity_curve(&[100.0, 110.0, 90.0]);
        let report = PerformanceReport::compute(&curve, &[], 100.0, 0.0, 252.0);
        assert_eq!(report, PerformanceReport::empty());
        assert_eq!(report.trade_count, 0);
        assert!(report.total_return.is_none());
        assert!(report.sharpe_ratio.is_none());
    }

    #[test]
    fn single_round_trip_buy_10_sell_12() {
        let curve = make_equity_curve(&[1000.0, 1100.0, 1200.0]);
        let trades = vec![make_trade(10.0, 12.0)];
        let report = PerformanceReport::compute(&curve, &trades, 1000.0, 0.0, 252.0);

        assert_relative_eq!(report.total_return.unwrap(), 0.20, epsilon = 1e-12);
        assert_eq!(report.win_rate, Some(1.0));
        assert_eq!(report.profit_loss_ratio, None);
        assert_eq!(report.trade_count, 1);
    }

    #[test]
    fn annualized_return_uses_calendar_days() {
        let curve = vec![
            EquityPoint {
                date: day(0),
                equity: 100.0,
            },
            EquityPoint {
                date: day(365),
                equity: 121.0,
            },
        ];
        let report = PerformanceReport::compute(&curve, &[make_trade(1.0, 1.21)], 100.0, 0.0, 252.0);
        assert_relative_eq!(report.annualized_return.unwrap(), 0.21, epsilon = 1e-12);

        let two_years = vec![
            EquityPoint {
                date: day(0),
                equity: 100.0,
            },
            EquityPoint {
                date: day(730),
                equity: 121.0,
            },
        ];
        let report =
            PerformanceReport::compute(&two_years, &[make_trade(1.0, 1.21)], 100.0, 0.0, 252.0);
        assert_relative_eq!(report.annualized_return.unwrap(), 0.10, epsilon = 1e-12);
    }

    #[test]
    fn annualized_return_null_for_single_day() {
        let curve = make_equity_curve(&[100.0]);
        let report = PerformanceReport::compute(&curve, &[make_trade(1.0, 1.0)], 100.0, 0.0, 252.0);
        assert_eq!(report.annualized_return, None);
    }

    #[test]
    fn win_rate_and_profit_loss_ratio() {
        let trades = vec![
            make_trade(100.0, 110.0),
            make_trade(100.0, 95.0),
            make_trade(100.0, 130.0),
            make_trade(100.0, 85.0),
        ];
        let curve = make_equity_curve(&[100.0, 101.0]);
        let report = PerformanceReport::compute(&curve, &trades, 100.0, 0.0, 252.0);

        assert_relative_eq!(report.win_rate.unwrap(), 0.5);
        // avg win 0.20, avg loss 0.10
        assert_relative_eq!(report.profit_loss_ratio.unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn breakeven_trade_is_neither_win_nor_loss() {
        let trades = vec![make_trade(100.0, 100.0), make_trade(100.0, 110.0)];
        let curve = make_equity_curve(&[100.0, 110.0]);
        let report = PerformanceReport::compute(&curve, &trades, 100.0, 0.0, 252.0);
        assert_relative_eq!(report.win_rate.unwrap(), 0.5);
        assert_eq!(report.profit_loss_ratio, None);
    }

    #[test]
    fn max_drawdown_peak_to_trough() {
        let curve = make_equity_curve(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]);
        assert_relative_eq!(compute_drawdown(&curve), (110.0 - 80.0) / 110.0, epsilon = 1e-12);
    }

    #[test]
    fn max_drawdown_monotonic_rise_is_zero() {
        let curve = make_equity_curve(&[100.0, 101.0, 102.0]);
        assert_eq!(compute_drawdown(&curve), 0.0);
        assert_eq!(compute_drawdown(&[]), 0.0);
    }

    #[test]
    fn sharpe_null_for_flat_or_short_curves() {
        assert_eq!(compute_sharpe(&make_equity_curve(&[100.0, 100.0, 100.0]), 0.0, 252.0), None);
        assert_eq!(compute_sharpe(&make_equity_curve(&[100.0, 101.0]), 0.0, 252.0), None);
    }

    #[test]
    fn sharpe_matches_hand_calculation() {
        let curve = make_equity_curve(&[100.0, 110.0, 99.0]);
        // returns 0.10, -0.10: mean 0, sd 0.10
        let sharpe = compute_sharpe(&curve, 0.0, 252.0).unwrap();
        assert_relative_eq!(sharpe, 0.0, epsilon = 1e-12);

        let rising = make_equity_curve(&[100.0, 101.0, 103.02]);
        // returns 0.01, 0.02: mean 0.015, sd 0.005
        let sharpe = compute_sharpe(&rising, 0.0, 252.0).unwrap();
        assert_relative_eq!(sharpe, 3.0 * 252.0_f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn stats_helpers() {
        assert_eq!(mean(&[]), None);
        assert_eq!(population_std_dev(&[]), None);
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0]).unwrap(), 2.0);
        assert_relative_eq!(population_std_dev(&[2.0, 4.0]).unwrap(), 1.0);
    }
}
