//! Per-indicator signal rules.
//!
//! Each rule reads one indicator family at index `i` (and `i - 1` for
//! crossover rules) and returns a [`Direction`], or `None` when any value it
//! needs is still in warm-up. Undefined values never vote.

use crate::domain::frame::IndicatorFrame;
use crate::domain::indicator::{IndicatorKind, IndicatorSeries, IndicatorValue};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Hold,
    Sell,
}

impl Direction {
    /// Signed unit contribution to the composite score.
    pub fn polarity(self) -> f64 {
        match self {
            Direction::Buy => 1.0,
            Direction::Hold => 0.0,
            Direction::Sell => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Buy => "buy",
            Direction::Hold => "hold",
            Direction::Sell => "sell",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub indicator_name: String,
    pub direction: Direction,
    pub date: NaiveDate,
}

/// Thresholds and weights for the signal engine. Weights and thresholds are
/// heuristics, not calibrated values.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub ma_short: usize,
    pub ma_long: usize,
    pub weights: BTreeMap<IndicatorKind, f64>,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    pub confidence_margin: f64,
    pub risk_lookback: usize,
    pub risk_low: f64,
    pub risk_high: f64,
    pub periods_per_year: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            ma_short: 5,
            ma_long: 20,
            weights: default_weights(),
            buy_threshold: 70.0,
            sell_threshold: 30.0,
            confidence_margin: 25.0,
            risk_lookback: 30,
            risk_low: 0.20,
            risk_high: 0.40,
            periods_per_year: 252.0,
        }
    }
}

pub fn default_weights() -> BTreeMap<IndicatorKind, f64> {
    BTreeMap::from([
        (IndicatorKind::Macd, 25.0),
        (IndicatorKind::Rsi, 20.0),
        (IndicatorKind::Kdj, 20.0),
        (IndicatorKind::Bollinger, 15.0),
        (IndicatorKind::Ma, 20.0),
    ])
}

impl SignalConfig {
    pub fn weight(&self, kind: IndicatorKind) -> f64 {
        self.weights.get(&kind).copied().unwrap_or(0.0)
    }
}

/// One indicator's vote at an index; `direction` is `None` during warm-up.
#[derive(Debug, Clone, PartialEq)]
pub struct Vote {
    pub kind: IndicatorKind,
    pub name: String,
    pub direction: Option<Direction>,
}

/// Votes of every signal-producing indicator present in the frame, in a
/// fixed order: MACD, RSI (one per period), KDJ, Bollinger, MA.
pub fn collect_votes(frame: &IndicatorFrame<'_>, index: usize, config: &SignalConfig) -> Vec<Vote> {
    [
        IndicatorKind::Macd,
        IndicatorKind::Rsi,
        IndicatorKind::Kdj,
        IndicatorKind::Bollinger,
        IndicatorKind::Ma,
    ]
    .into_iter()
    .flat_map(|kind| votes_for(frame, kind, index, config))
    .collect()
}

/// Votes of a single indicator class. Empty when the class was not computed.
pub fn votes_for(
    frame: &IndicatorFrame<'_>,
    kind: IndicatorKind,
    index: usize,
    config: &SignalConfig,
) -> Vec<Vote> {
    let vote = |name: String, direction: Option<Direction>| Vote {
        kind,
        name,
        direction,
    };

    match kind {
        IndicatorKind::Macd => frame
            .macd
            .iter()
            .map(|s| vote("macd".into(), macd_rule(s, index)))
            .collect(),
        IndicatorKind::Rsi => frame
            .rsi
            .iter()
            .map(|(period, s)| {
                vote(
                    format!("rsi{}", period),
                    rsi_rule(s, index, config.rsi_overbought, config.rsi_oversold),
                )
            })
            .collect(),
        IndicatorKind::Kdj => frame
            .kdj
            .iter()
            .map(|s| vote("kdj".into(), kdj_rule(s, index)))
            .collect(),
        IndicatorKind::Bollinger => frame
            .bollinger
            .iter()
            .map(|s| vote("bollinger".into(), bollinger_rule(frame, s, index)))
            .collect(),
        IndicatorKind::Ma => {
            if frame.ma.is_empty() {
                return Vec::new();
            }
            let direction = match (
                frame.ma.get(&config.ma_short),
                frame.ma.get(&config.ma_long),
            ) {
                (Some(short), Some(long)) => ma_cross_rule(short, long, index),
                _ => None,
            };
            vec![vote(
                format!("ma{}_{}", config.ma_short, config.ma_long),
                direction,
            )]
        }
        IndicatorKind::VolumeMa => Vec::new(),
    }
}

/// Classify a crossing of `a` against `b` between two consecutive indices.
fn crossover(prev_a: f64, prev_b: f64, a: f64, b: f64) -> Direction {
    if prev_a <= prev_b && a > b {
        Direction::Buy
    } else if prev_a >= prev_b && a < b {
        Direction::Sell
    } else {
        Direction::Hold
    }
}

fn previous(index: usize) -> Option<usize> {
    index.checked_sub(1)
}

pub fn macd_rule(series: &IndicatorSeries, index: usize) -> Option<Direction> {
    let hist = |i| match series.get(i)? {
        IndicatorValue::Macd { histogram, .. } => Some(histogram),
        _ => None,
    };
    let prev = hist(previous(index)?)?;
    let cur = hist(index)?;
    Some(crossover(prev, 0.0, cur, 0.0))
}

pub fn rsi_rule(
    series: &IndicatorSeries,
    index: usize,
    overbought: f64,
    oversold: f64,
) -> Option<Direction> {
    let rsi = series.simple(index)?;
    Some(if rsi > overbought {
        Direction::Sell
    } else if rsi < oversold {
        Direction::Buy
    } else {
        Direction::Hold
    })
}

pub fn kdj_rule(series: &IndicatorSeries, index: usize) -> Option<Direction> {
    let kd = |i| match series.get(i)? {
        IndicatorValue::Kdj { k, d, .. } => Some((k, d)),
        _ => None,
    };
    let (prev_k, prev_d) = kd(previous(index)?)?;
    let (k, d) = kd(index)?;
    Some(crossover(prev_k, prev_d, k, d))
}

/// Close breaking out above the upper band sells; breaking below the lower
/// band buys.
pub fn bollinger_rule(
    frame: &IndicatorFrame<'_>,
    series: &IndicatorSeries,
    index: usize,
) -> Option<Direction> {
    let bands = |i| match series.get(i)? {
        IndicatorValue::Bollinger { upper, lower, .. } => Some((upper, lower)),
        _ => None,
    };
    let prev_index = previous(index)?;
    let (prev_upper, prev_lower) = bands(prev_index)?;
    let (upper, lower) = bands(index)?;
    let prev_close = frame.close(prev_index)?;
    let close = frame.close(index)?;

    Some(if prev_close <= prev_upper && close > upper {
        Direction::Sell
    } else if prev_close >= prev_lower && close < lower {
        Direction::Buy
    } else {
        Direction::Hold
    })
}

/// Golden cross of the short MA over the long MA buys, death cross sells.
pub fn ma_cross_rule(
    short: &IndicatorSeries,
    long: &IndicatorSeries,
    index: usize,
) -> Option<Direction> {
    let prev_index = previous(index)?;
    Some(crossover(
        short.simple(prev_index)?,
        long.simple(prev_index)?,
        short.simple(index)?,
        long.simple(index)?,
    ))
}
