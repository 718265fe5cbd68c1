//! Open positions and closed trades.

use crate::domain::signal::Direction;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Closed by a sell decision.
    Signal,
    /// Marked to market at the last session of the backtest window.
    EndOfWindow,
}

/// A fully invested long holding.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub units: f64,
    /// Cash spent on entry, commission included.
    pub cost_basis: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.units * price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub direction: Direction,
    pub exit_reason: ExitReason,
    /// Net return on the cash committed to the trade.
    pub return_pct: f64,
    pub pnl: f64,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }
}
