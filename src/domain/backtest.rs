//! Backtest engine.
//!
//! Indicators are computed over the whole supplied series so that history
//! before `start_date` satisfies warm-up; only sessions inside
//! `[start_date, end_date]` trade. The account is flat or fully long.

use crate::domain::equity::{Account, EquityPoint};
use crate::domain::error::StocksageError;
use crate::domain::frame::{compute_frame, IndicatorConfig, IndicatorFrame};
use crate::domain::metrics::PerformanceReport;
use crate::domain::ohlcv::InstrumentSeries;
use crate::domain::position::{ExitReason, Trade};
use crate::domain::signal::Direction;
use crate::domain::strategy::Strategy;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// When a decision is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionTiming {
    /// At the close of the session that produced the decision.
    #[default]
    SameClose,
    /// At the open of the following session.
    NextOpen,
}

impl fmt::Display for ExecutionTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionTiming::SameClose => f.write_str("close"),
            ExecutionTiming::NextOpen => f.write_str("next_open"),
        }
    }
}

impl FromStr for ExecutionTiming {
    type Err = StocksageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "close" | "same_close" => Ok(ExecutionTiming::SameClose),
            "next_open" | "open" => Ok(ExecutionTiming::NextOpen),
            other => Err(StocksageError::invalid_config(
                "execution",
                format!("unknown execution timing '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub execution: ExecutionTiming,
    pub initial_capital: f64,
    pub slippage_pct: f64,
    pub commission_pct: f64,
    pub risk_free_rate: f64,
    pub periods_per_year: f64,
}

impl BacktestConfig {
    pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;
    pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

    /// A cost-free, same-close configuration over `[start_date, end_date]`.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        BacktestConfig {
            start_date,
            end_date,
            execution: ExecutionTiming::SameClose,
            initial_capital: Self::DEFAULT_INITIAL_CAPITAL,
            slippage_pct: 0.0,
            commission_pct: 0.0,
            risk_free_rate: 0.0,
            periods_per_year: Self::DEFAULT_PERIODS_PER_YEAR,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub code: String,
    pub strategy: String,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub report: PerformanceReport,
}

/// Replay `strategy` over `series` inside the configured window.
pub fn run(
    series: &InstrumentSeries,
    strategy: &dyn Strategy,
    indicators: &IndicatorConfig,
    config: &BacktestConfig,
) -> Result<BacktestResult, StocksageError> {
    let frame = compute_frame(series, indicators)?;
    run_on_frame(&frame, strategy, config)
}

/// Replay `strategy` over an already computed frame.
pub fn run_on_frame(
    frame: &IndicatorFrame<'_>,
    strategy: &dyn Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, StocksageError> {
    let points = frame.points();
    let window: Vec<usize> = (0..points.len())
        .filter(|&i| config.contains(points[i].date))
        .collect();
    let Some(&last) = window.last() else {
        return Err(StocksageError::EmptySeries {
            code: frame.code().to_string(),
        });
    };

    let mut account = Account::new(config.initial_capital, config.commission_pct);
    let mut pending: Option<Direction> = None;
    let mut scored_sessions = 0usize;
    let mut first_gap: Option<StocksageError> = None;

    for &i in &window {
        let point = &points[i];

        if let Some(direction) = pending.take() {
            apply(&mut account, direction, point.date, point.open, config);
        }

        let decision = match strategy.decide(frame, i) {
            Ok(direction) => {
                scored_sessions += 1;
                direction
            }
            Err(gap @ StocksageError::InsufficientData { .. }) => {
                first_gap.get_or_insert(gap);
                Direction::Hold
            }
            Err(e) => return Err(e),
        };

        match config.execution {
            ExecutionTiming::SameClose => {
                apply(&mut account, decision, point.date, point.close, config)
            }
            ExecutionTiming::NextOpen if i != last => pending = Some(decision),
            ExecutionTiming::NextOpen => {}
        }

        if i == last && account.is_long() {
            let price = point.close * (1.0 - config.slippage_pct);
            account.close(point.date, price, ExitReason::EndOfWindow);
        }
        account.mark(point.date, point.close);
    }

    if scored_sessions == 0 {
        return Err(first_gap.unwrap_or_else(|| StocksageError::InsufficientData {
            code: frame.code().to_string(),
            date: config.start_date,
            indicator: strategy.name().to_string(),
        }));
    }

    let report = PerformanceReport::compute(
        &account.equity_curve,
        &account.trades,
        config.initial_capital,
        config.risk_free_rate,
        config.periods_per_year,
    );

    info!(
        code = frame.code(),
        strategy = strategy.name(),
        sessions = window.len(),
        scored = scored_sessions,
        trades = report.trade_count,
        total_return = ?report.total_return,
        "backtest complete"
    );

    Ok(BacktestResult {
        code: frame.code().to_string(),
        strategy: strategy.name().to_string(),
        trades: account.trades,
        equity_curve: account.equity_curve,
        report,
    })
}

/// Flat + buy opens, long + sell closes; everything else is ignored.
fn apply(
    account: &mut Account,
    direction: Direction,
    date: NaiveDate,
    price: f64,
    config: &BacktestConfig,
) {
    match (direction, account.is_long()) {
        (Direction::Buy, false) => account.open(date, price * (1.0 + config.slippage_pct)),
        (Direction::Sell, true) => {
            account.close(date, price * (1.0 - config.slippage_pct), ExitReason::Signal);
        }
        _ => debug!(%date, %direction, "no fill"),
    }
}
