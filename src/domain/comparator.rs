//! Multi-strategy comparison.
//!
//! Each strategy is backtested over every instrument of a universe; the
//! per-instrument reports are folded into one portfolio-level report and
//! the strategies are ranked on a chosen metric.

use crate::domain::backtest::{run_on_frame, BacktestConfig};
use crate::domain::error::StocksageError;
use crate::domain::frame::{compute_frame, IndicatorConfig};
use crate::domain::metrics::PerformanceReport;
use crate::domain::ohlcv::InstrumentSeries;
use crate::domain::strategy::Strategy;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    TotalReturn,
    AnnualizedReturn,
    MaxDrawdown,
    SharpeRatio,
    WinRate,
    ProfitLossRatio,
    TradeCount,
}

impl RankingMetric {
    pub const ALL: [RankingMetric; 7] = [
        RankingMetric::TotalReturn,
        RankingMetric::AnnualizedReturn,
        RankingMetric::MaxDrawdown,
        RankingMetric::SharpeRatio,
        RankingMetric::WinRate,
        RankingMetric::ProfitLossRatio,
        RankingMetric::TradeCount,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RankingMetric::TotalReturn => "total_return",
            RankingMetric::AnnualizedReturn => "annualized_return",
            RankingMetric::MaxDrawdown => "max_drawdown",
            RankingMetric::SharpeRatio => "sharpe_ratio",
            RankingMetric::WinRate => "win_rate",
            RankingMetric::ProfitLossRatio => "profit_loss_ratio",
            RankingMetric::TradeCount => "trade_count",
        }
    }

    pub fn value(self, report: &PerformanceReport) -> Option<f64> {
        match self {
            RankingMetric::TotalReturn => report.total_return,
            RankingMetric::AnnualizedReturn => report.annualized_return,
            RankingMetric::MaxDrawdown => report.max_drawdown,
            RankingMetric::SharpeRatio => report.sharpe_ratio,
            RankingMetric::WinRate => report.win_rate,
            RankingMetric::ProfitLossRatio => report.profit_loss_ratio,
            RankingMetric::TradeCount => Some(report.trade_count as f64),
        }
    }

    /// Drawdown is a loss measure: smaller is better.
    pub fn higher_is_better(self) -> bool {
        !matches!(self, RankingMetric::MaxDrawdown)
    }
}

impl fmt::Display for RankingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RankingMetric {
    type Err = StocksageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        RankingMetric::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| {
                StocksageError::invalid_config(
                    "ranking_metric",
                    format!("unknown ranking metric '{}'", s.trim()),
                )
            })
    }
}

/// How per-instrument reports are weighted in the aggregate.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Weighting {
    #[default]
    Equal,
    /// Per-code weights; codes without an entry get weight zero.
    Custom(HashMap<String, f64>),
}

impl Weighting {
    fn weight_of(&self, code: &str) -> f64 {
        match self {
            Weighting::Equal => 1.0,
            Weighting::Custom(weights) => weights.get(code).copied().unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyRanking {
    pub strategy_name: String,
    pub report: PerformanceReport,
    pub per_instrument: BTreeMap<String, PerformanceReport>,
}

/// Fold per-instrument reports into one. Each metric is the weighted mean of
/// the instruments where it is defined; trade counts are summed.
pub fn aggregate_reports(
    reports: &BTreeMap<String, PerformanceReport>,
    weighting: &Weighting,
) -> PerformanceReport {
    let weighted_mean = |metric: RankingMetric| -> Option<f64> {
        let (sum, weight) = reports
            .iter()
            .filter_map(|(code, report)| {
                let w = weighting.weight_of(code);
                metric.value(report).filter(|_| w > 0.0).map(|v| (v * w, w))
            })
            .fold((0.0, 0.0), |(s, tw), (v, w)| (s + v, tw + w));
        (weight > 0.0).then(|| sum / weight)
    };

    PerformanceReport {
        total_return: weighted_mean(RankingMetric::TotalReturn),
        annualized_return: weighted_mean(RankingMetric::AnnualizedReturn),
        max_drawdown: weighted_mean(RankingMetric::MaxDrawdown),
        sharpe_ratio: weighted_mean(RankingMetric::SharpeRatio),
        win_rate: weighted_mean(RankingMetric::WinRate),
        profit_loss_ratio: weighted_mean(RankingMetric::ProfitLossRatio),
        trade_count: reports.values().map(|r| r.trade_count).sum(),
    }
}

/// Order best first on `metric`; undefined values last, ties by name.
pub fn rank(rankings: &mut [StrategyRanking], metric: RankingMetric) {
    rankings.sort_by(|a, b| {
        let by_metric = match (metric.value(&a.report), metric.value(&b.report)) {
            (Some(x), Some(y)) => {
                let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
                if metric.higher_is_better() {
                    ord.reverse()
                } else {
                    ord
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_metric.then_with(|| a.strategy_name.cmp(&b.strategy_name))
    });
}

/// Backtest every strategy on every instrument and rank the aggregates.
pub fn compare(
    strategies: &[Box<dyn Strategy>],
    universe: &[InstrumentSeries],
    indicators: &IndicatorConfig,
    config: &BacktestConfig,
    metric: RankingMetric,
    weighting: &Weighting,
) -> Result<Vec<StrategyRanking>, StocksageError> {
    if strategies.is_empty() {
        return Err(StocksageError::invalid_config(
            "strategies",
            "at least one strategy is required",
        ));
    }
    if universe.is_empty() {
        return Err(StocksageError::invalid_config(
            "codes",
            "at least one instrument is required",
        ));
    }

    // Frames do not depend on the strategy, so compute each once.
    let frames: Vec<_> = universe
        .iter()
        .filter_map(|series| match compute_frame(series, indicators) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(code = %series.code, error = %e, "skipping instrument");
                None
            }
        })
        .collect();

    let mut rankings: Vec<StrategyRanking> = strategies
        .iter()
        .map(|strategy| {
            let per_instrument: BTreeMap<String, PerformanceReport> = frames
                .iter()
                .filter_map(|frame| match run_on_frame(frame, strategy.as_ref(), config) {
                    Ok(result) => Some((result.code, result.report)),
                    Err(e) => {
                        warn!(
                            code = frame.code(),
                            strategy = strategy.name(),
                            error = %e,
                            "skipping instrument for strategy"
                        );
                        None
                    }
                })
                .collect();

            StrategyRanking {
                strategy_name: strategy.name().to_string(),
                report: aggregate_reports(&per_instrument, weighting),
                per_instrument,
            }
        })
        .collect();

    rank(&mut rankings, metric);
    info!(
        strategies = rankings.len(),
        instruments = frames.len(),
        %metric,
        best = rankings.first().map(|r| r.strategy_name.as_str()),
        "comparison complete"
    );
    Ok(rankings)
}
