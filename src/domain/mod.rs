//! Core domain types and logic.

pub mod error;
pub mod ohlcv;
pub mod indicator;
pub mod frame;
pub mod signal;
pub mod recommendation;
pub mod position;
pub mod equity;
pub mod metrics;
pub mod strategy;
pub mod backtest;
pub mod comparator;
pub mod config_validation;
