//! Single-instrument account state and equity tracking.
//!
//! The account is either flat (all cash) or long one position bought with
//! all available cash. Fill prices arrive already adjusted for slippage;
//! commission is charged here as a fraction of traded notional.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::position::{ExitReason, Position, Trade};
use super::signal::Direction;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub cash: f64,
    pub initial_capital: f64,
    pub commission_pct: f64,
    pub position: Option<Position>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Account {
    pub fn new(initial_capital: f64, commission_pct: f64) -> Self {
        Account {
            cash: initial_capital,
            initial_capital,
            commission_pct,
            position: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn is_long(&self) -> bool {
        self.position.is_some()
    }

    /// Invest all cash at `price`. Ignored when already long.
    pub fn open(&mut self, date: NaiveDate, price: f64) {
        if self.is_long() || price <= 0.0 {
            return;
        }
        let units = self.cash / (price * (1.0 + self.commission_pct));
        debug!(%date, price, units, "open long");
        self.position = Some(Position {
            entry_date: date,
            entry_price: price,
            units,
            cost_basis: self.cash,
        });
        self.cash = 0.0;
    }

    /// Sell the whole position at `price`. Returns the closed trade, or
    /// `None` when flat.
    pub fn close(&mut self, date: NaiveDate, price: f64, reason: ExitReason) -> Option<&Trade> {
        let position = self.position.take()?;
        let proceeds = position.market_value(price) * (1.0 - self.commission_pct);
        let pnl = proceeds - position.cost_basis;
        let return_pct = if position.cost_basis > 0.0 {
            pnl / position.cost_basis
        } else {
            0.0
        };
        self.cash += proceeds;
        debug!(%date, price, pnl, ?reason, "close long");

        self.trades.push(Trade {
            entry_date: position.entry_date,
            entry_price: position.entry_price,
            exit_date: date,
            exit_price: price,
            direction: Direction::Buy,
            exit_reason: reason,
            return_pct,
            pnl,
        });
        self.trades.last()
    }

    pub fn total_equity(&self, price: f64) -> f64 {
        self.cash + self.position.as_ref().map_or(0.0, |p| p.market_value(price))
    }

    /// Append a mark-to-market point at `close`.
    pub fn mark(&mut self, date: NaiveDate, close: f64) {
        let equity = self.total_equity(close);
        self.equity_curve.push(EquityPoint { date, equity });
    }
}
