//! Decision functions replayed by the backtest engine.
//!
//! A strategy maps one index of an indicator frame to a [`Direction`]. It
//! returns `InsufficientData` when the indicators it reads are still warming
//! up; the engine treats that session as a hold.

use crate::domain::error::StocksageError;
use crate::domain::frame::IndicatorFrame;
use crate::domain::indicator::IndicatorKind;
use crate::domain::recommendation::evaluate_at;
use crate::domain::signal::{votes_for, Direction, SignalConfig};

pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn decide(&self, frame: &IndicatorFrame<'_>, index: usize) -> Result<Direction, StocksageError>;
}

pub const COMPOSITE: &str = "composite";
pub const BUY_AND_HOLD: &str = "buy_and_hold";

/// Trades the composite rating of the signal engine.
#[derive(Debug, Clone)]
pub struct CompositeStrategy {
    config: SignalConfig,
}

impl CompositeStrategy {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }
}

impl Strategy for CompositeStrategy {
    fn name(&self) -> &str {
        COMPOSITE
    }

    fn decide(&self, frame: &IndicatorFrame<'_>, index: usize) -> Result<Direction, StocksageError> {
        evaluate_at(frame, index, &self.config).map(|rec| rec.rating)
    }
}

/// Trades one indicator class's signal. Classes with several votes (RSI)
/// follow the sign of their summed votes.
#[derive(Debug, Clone)]
pub struct SingleIndicatorStrategy {
    kind: IndicatorKind,
    config: SignalConfig,
}

impl SingleIndicatorStrategy {
    pub fn new(kind: IndicatorKind, config: SignalConfig) -> Result<Self, StocksageError> {
        if !kind.produces_signal() {
            return Err(StocksageError::invalid_config(
                "strategy",
                format!("indicator '{}' does not produce trading signals", kind),
            ));
        }
        Ok(Self { kind, config })
    }

    pub fn kind(&self) -> IndicatorKind {
        self.kind
    }
}

impl Strategy for SingleIndicatorStrategy {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn decide(&self, frame: &IndicatorFrame<'_>, index: usize) -> Result<Direction, StocksageError> {
        let date = frame.date(index).ok_or_else(|| StocksageError::Data {
            reason: format!("index {} outside series of {}", index, frame.code()),
        })?;
        let votes = votes_for(frame, self.kind, index, &self.config);
        let defined: Vec<Direction> = votes.iter().filter_map(|v| v.direction).collect();

        if defined.is_empty() {
            let indicator = votes
                .first()
                .map_or_else(|| self.kind.name().to_string(), |v| v.name.clone());
            return Err(StocksageError::InsufficientData {
                code: frame.code().to_string(),
                date,
                indicator,
            });
        }

        let net: f64 = defined.iter().map(|d| d.polarity()).sum();
        Ok(if net > 0.0 {
            Direction::Buy
        } else if net < 0.0 {
            Direction::Sell
        } else {
            Direction::Hold
        })
    }
}

/// Buys on the first session it is asked about and never sells.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuyAndHold;

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        BUY_AND_HOLD
    }

    fn decide(&self, _frame: &IndicatorFrame<'_>, _index: usize) -> Result<Direction, StocksageError> {
        Ok(Direction::Buy)
    }
}

/// Look up a built-in strategy by name: `composite`, `buy_and_hold`, or a
/// signal-producing indicator name (`macd`, `rsi`, `kdj`, `bollinger`, `ma`).
pub fn build_strategy(
    name: &str,
    config: &SignalConfig,
) -> Result<Box<dyn Strategy>, StocksageError> {
    match name.trim().to_lowercase().as_str() {
        COMPOSITE => Ok(Box::new(CompositeStrategy::new(config.clone()))),
        BUY_AND_HOLD | "buyandhold" => Ok(Box::new(BuyAndHold)),
        other => {
            let kind = other.parse::<IndicatorKind>().map_err(|_| {
                StocksageError::invalid_config("strategy", format!("unknown strategy '{}'", name))
            })?;
            Ok(Box::new(SingleIndicatorStrategy::new(kind, config.clone())?))
        }
    }
}
