//! Composite recommendation scoring.
//!
//! Every defined per-indicator vote contributes `+w` (buy), `0` (hold) or
//! `-w` (sell). The net contribution is normalised by the weight of the
//! voting indicators and mapped onto a 0..=100 score centred on 50:
//!
//! score = 50 + 50 * (sum of contributions / sum of voting weights)
//!
//! Weights, thresholds, the risk bands and the expected-return estimate are
//! heuristics. They rank and describe signals; they do not forecast prices.

use crate::domain::error::StocksageError;
use crate::domain::frame::{compute_frame, IndicatorConfig, IndicatorFrame};
use crate::domain::indicator::IndicatorKind;
use crate::domain::metrics::{mean, population_std_dev};
use crate::domain::ohlcv::{InstrumentSeries, PricePoint};
use crate::domain::signal::{collect_votes, Direction, Signal, SignalConfig, Vote};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

const NEUTRAL_SCORE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub code: String,
    pub date: NaiveDate,
    pub rating: Direction,
    pub score: f64,
    pub risk_level: RiskLevel,
    pub expected_return_pct: f64,
    pub contributing_signals: Vec<Signal>,
}

/// Weighted tally of the defined votes at one index.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeScore {
    pub score: f64,
    pub net_contribution: f64,
    pub total_weight: f64,
    pub has_buy: bool,
    pub has_sell: bool,
}

impl CompositeScore {
    /// |net| / total weight: 1.0 when every voter agrees, 0.0 when they cancel.
    pub fn agreement(&self) -> f64 {
        if self.total_weight > 0.0 {
            (self.net_contribution.abs() / self.total_weight).max(0.0)
        } else {
            0.0
        }
    }
}

/// Score the votes. A class weight is split evenly across the class's
/// configured votes (one per RSI period); abstaining votes add no weight.
pub fn composite_score(votes: &[Vote], config: &SignalConfig) -> CompositeScore {
    let mut per_kind: BTreeMap<IndicatorKind, usize> = BTreeMap::new();
    for vote in votes {
        *per_kind.entry(vote.kind).or_default() += 1;
    }

    let mut net_contribution = 0.0;
    let mut total_weight = 0.0;
    let mut has_buy = false;
    let mut has_sell = false;

    for vote in votes {
        let Some(direction) = vote.direction else {
            continue;
        };
        let weight = config.weight(vote.kind) / per_kind[&vote.kind] as f64;
        net_contribution += weight * direction.polarity();
        total_weight += weight;
        has_buy |= direction == Direction::Buy;
        has_sell |= direction == Direction::Sell;
    }

    let score = if total_weight > 0.0 {
        (NEUTRAL_SCORE + NEUTRAL_SCORE * net_contribution / total_weight).clamp(0.0, 100.0)
    } else {
        NEUTRAL_SCORE
    };

    CompositeScore {
        score,
        net_contribution,
        total_weight,
        has_buy,
        has_sell,
    }
}

/// Map a score to a rating. Conflicting votes stay on hold unless the score
/// is more than `confidence_margin` away from neutral.
pub fn rate(composite: &CompositeScore, config: &SignalConfig) -> Direction {
    let conflicted = composite.has_buy && composite.has_sell;
    if conflicted && (composite.score - NEUTRAL_SCORE).abs() <= config.confidence_margin {
        return Direction::Hold;
    }
    if composite.score >= config.buy_threshold {
        Direction::Buy
    } else if composite.score <= config.sell_threshold {
        Direction::Sell
    } else {
        Direction::Hold
    }
}

/// Close-to-close returns of up to `lookback` sessions ending at `index`.
pub fn trailing_returns(points: &[PricePoint], index: usize, lookback: usize) -> Vec<f64> {
    if index >= points.len() {
        return Vec::new();
    }
    let start = index.saturating_sub(lookback);
    points[start..=index]
        .windows(2)
        .map(|w| w[1].return_from(w[0].close))
        .collect()
}

pub fn risk_level(returns: &[f64], config: &SignalConfig) -> RiskLevel {
    if returns.len() < 2 {
        return RiskLevel::Medium;
    }
    let volatility =
        population_std_dev(returns).unwrap_or(0.0) * config.periods_per_year.sqrt();
    if volatility < config.risk_low {
        RiskLevel::Low
    } else if volatility < config.risk_high {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Annualised trailing drift in percent, scaled by vote agreement.
pub fn expected_return_pct(returns: &[f64], agreement: f64, config: &SignalConfig) -> f64 {
    mean(returns).map_or(0.0, |m| m * config.periods_per_year * 100.0 * agreement)
}

/// Recommendation for the session at `date`.
pub fn evaluate(
    frame: &IndicatorFrame<'_>,
    date: NaiveDate,
    config: &SignalConfig,
) -> Result<Recommendation, StocksageError> {
    let index = frame
        .index_of(date)
        .ok_or_else(|| StocksageError::InsufficientData {
            code: frame.code().to_string(),
            date,
            indicator: "price".to_string(),
        })?;
    evaluate_at(frame, index, config)
}

/// Recommendation for the session at `index` of the frame.
pub fn evaluate_at(
    frame: &IndicatorFrame<'_>,
    index: usize,
    config: &SignalConfig,
) -> Result<Recommendation, StocksageError> {
    let date = frame.date(index).ok_or_else(|| StocksageError::Data {
        reason: format!("index {} outside series of {}", index, frame.code()),
    })?;

    let votes = collect_votes(frame, index, config);
    let contributing_signals: Vec<Signal> = votes
        .iter()
        .filter_map(|v| {
            v.direction.map(|direction| Signal {
                indicator_name: v.name.clone(),
                direction,
                date,
            })
        })
        .collect();

    if contributing_signals.is_empty() {
        let indicator = votes
            .iter()
            .find(|v| v.direction.is_none())
            .map_or_else(|| "signal indicators".to_string(), |v| v.name.clone());
        return Err(StocksageError::InsufficientData {
            code: frame.code().to_string(),
            date,
            indicator,
        });
    }

    let composite = composite_score(&votes, config);
    let rating = rate(&composite, config);
    let returns = trailing_returns(frame.points(), index, config.risk_lookback);

    debug!(
        code = frame.code(),
        %date,
        score = composite.score,
        %rating,
        signals = contributing_signals.len(),
        "evaluated signals"
    );

    Ok(Recommendation {
        code: frame.code().to_string(),
        date,
        rating,
        score: composite.score,
        risk_level: risk_level(&returns, config),
        expected_return_pct: expected_return_pct(&returns, composite.agreement(), config),
        contributing_signals,
    })
}

/// Recommendation for the most recent session of `series`.
pub fn analyze_latest(
    series: &InstrumentSeries,
    indicators: &IndicatorConfig,
    signals: &SignalConfig,
) -> Result<Recommendation, StocksageError> {
    let frame = compute_frame(series, indicators)?;
    evaluate_at(&frame, frame.len() - 1, signals)
}

/// Latest recommendation for each instrument; failures are logged and skipped.
pub fn batch_analyze(
    universe: &[InstrumentSeries],
    indicators: &IndicatorConfig,
    signals: &SignalConfig,
) -> Vec<Recommendation> {
    universe
        .iter()
        .filter_map(|series| match analyze_latest(series, indicators, signals) {
            Ok(rec) => Some(rec),
            Err(e) => {
                warn!(code = %series.code, error = %e, "skipping instrument");
                None
            }
        })
        .collect()
}
