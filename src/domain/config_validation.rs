//! Configuration loading and validation.
//!
//! Each `load_*` function reads one INI section through [`ConfigPort`],
//! falls back to the documented default for absent keys, rejects values
//! that do not parse, and then validates the typed result.

use crate::domain::backtest::{BacktestConfig, ExecutionTiming};
use crate::domain::comparator::{RankingMetric, Weighting};
use crate::domain::error::StocksageError;
use crate::domain::frame::IndicatorConfig;
use crate::domain::indicator::IndicatorKind;
use crate::domain::signal::SignalConfig;
use crate::domain::strategy::COMPOSITE;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::str::FromStr;

const INDICATORS: &str = "indicators";
const SIGNALS: &str = "signals";
const BACKTEST: &str = "backtest";
const COMPARE: &str = "compare";
const DATA: &str = "data";

#[derive(Debug, Clone, PartialEq)]
pub struct CompareConfig {
    pub strategies: Vec<String>,
    pub ranking_metric: RankingMetric,
    pub weighting: Weighting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub dir: PathBuf,
    /// Empty means every instrument the data source lists.
    pub codes: Vec<String>,
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StocksageError {
    StocksageError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn parse_value<T: FromStr>(section: &str, key: &str, raw: &str) -> Result<T, StocksageError> {
    raw.trim()
        .parse()
        .map_err(|_| invalid(section, key, format!("cannot parse '{}'", raw.trim())))
}

fn read<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, StocksageError> {
    match config.get_string(section, key) {
        Some(raw) if !raw.trim().is_empty() => parse_value(section, key, &raw),
        _ => Ok(default),
    }
}

fn read_list<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: Vec<T>,
) -> Result<Vec<T>, StocksageError> {
    match config.get_list(section, key) {
        Some(items) => items
            .iter()
            .map(|item| parse_value(section, key, item))
            .collect(),
        None => Ok(default),
    }
}

fn read_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, StocksageError> {
    match config.get_string(BACKTEST, key) {
        None => Err(StocksageError::ConfigMissing {
            section: BACKTEST.to_string(),
            key: key.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                BACKTEST,
                key,
                format!("invalid {} format, expected YYYY-MM-DD", key),
            )
        }),
    }
}

pub fn load_indicator_config(config: &dyn ConfigPort) -> Result<IndicatorConfig, StocksageError> {
    let defaults = IndicatorConfig::default();
    let enabled: BTreeSet<IndicatorKind> = match config.get_list(INDICATORS, "enabled") {
        Some(names) => names
            .iter()
            .map(|n| n.parse::<IndicatorKind>())
            .collect::<Result<_, _>>()?,
        None => defaults.enabled.clone(),
    };

    let indicators = IndicatorConfig {
        enabled,
        ma_periods: read_list(config, INDICATORS, "ma_periods", defaults.ma_periods)?,
        macd_fast: read(config, INDICATORS, "macd_fast", defaults.macd_fast)?,
        macd_slow: read(config, INDICATORS, "macd_slow", defaults.macd_slow)?,
        macd_signal: read(config, INDICATORS, "macd_signal", defaults.macd_signal)?,
        rsi_periods: read_list(config, INDICATORS, "rsi_periods", defaults.rsi_periods)?,
        kdj_length: read(config, INDICATORS, "kdj_length", defaults.kdj_length)?,
        kdj_signal: read(config, INDICATORS, "kdj_signal", defaults.kdj_signal)?,
        boll_length: read(config, INDICATORS, "boll_length", defaults.boll_length)?,
        boll_multiplier: read(config, INDICATORS, "boll_multiplier", defaults.boll_multiplier)?,
        volume_ma_periods: read_list(
            config,
            INDICATORS,
            "volume_ma_periods",
            defaults.volume_ma_periods,
        )?,
    };
    validate_indicator_config(&indicators)?;
    Ok(indicators)
}

pub fn load_signal_config(
    config: &dyn ConfigPort,
    indicators: &IndicatorConfig,
) -> Result<SignalConfig, StocksageError> {
    let defaults = SignalConfig::default();
    let mut weights = defaults.weights.clone();
    for key in config.keys(SIGNALS) {
        let Some(name) = key.strip_prefix("weight.") else {
            continue;
        };
        let kind: IndicatorKind = name
            .parse()
            .map_err(|_| invalid(SIGNALS, &key, format!("unknown indicator '{}'", name)))?;
        if !kind.produces_signal() {
            return Err(invalid(SIGNALS, &key, format!("{} does not vote", kind)));
        }
        let weight = read(config, SIGNALS, &key, defaults.weight(kind))?;
        weights.insert(kind, weight);
    }

    let signals = SignalConfig {
        rsi_overbought: read(config, SIGNALS, "rsi_overbought", defaults.rsi_overbought)?,
        rsi_oversold: read(config, SIGNALS, "rsi_oversold", defaults.rsi_oversold)?,
        ma_short: read(config, SIGNALS, "ma_short", defaults.ma_short)?,
        ma_long: read(config, SIGNALS, "ma_long", defaults.ma_long)?,
        weights,
        buy_threshold: read(config, SIGNALS, "buy_threshold", defaults.buy_threshold)?,
        sell_threshold: read(config, SIGNALS, "sell_threshold", defaults.sell_threshold)?,
        confidence_margin: read(config, SIGNALS, "confidence_margin", defaults.confidence_margin)?,
        risk_lookback: read(config, SIGNALS, "risk_lookback", defaults.risk_lookback)?,
        risk_low: read(config, SIGNALS, "risk_low", defaults.risk_low)?,
        risk_high: read(config, SIGNALS, "risk_high", defaults.risk_high)?,
        periods_per_year: read(config, BACKTEST, "periods_per_year", defaults.periods_per_year)?,
    };
    validate_signal_config(&signals, indicators)?;
    Ok(signals)
}

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, StocksageError> {
    let start_date = read_date(config, "start_date")?;
    let end_date = read_date(config, "end_date")?;
    let defaults = BacktestConfig::new(start_date, end_date);

    let execution = match config.get_string(BACKTEST, "execution") {
        Some(raw) => raw.parse::<ExecutionTiming>()?,
        None => defaults.execution,
    };

    let backtest = BacktestConfig {
        execution,
        initial_capital: read(config, BACKTEST, "initial_capital", defaults.initial_capital)?,
        slippage_pct: read(config, BACKTEST, "slippage_pct", defaults.slippage_pct)?,
        commission_pct: read(config, BACKTEST, "commission_pct", defaults.commission_pct)?,
        risk_free_rate: read(config, BACKTEST, "risk_free_rate", defaults.risk_free_rate)?,
        periods_per_year: read(config, BACKTEST, "periods_per_year", defaults.periods_per_year)?,
        ..defaults
    };
    validate_backtest_config(&backtest)?;
    Ok(backtest)
}

/// `[compare]`: `strategies` (default `composite`), `ranking_metric`
/// (default `total_return`) and optional `weights = CODE:w, CODE:w`.
pub fn load_compare_config(config: &dyn ConfigPort) -> Result<CompareConfig, StocksageError> {
    let strategies = config
        .get_list(COMPARE, "strategies")
        .unwrap_or_else(|| vec![COMPOSITE.to_string()]);
    if strategies.is_empty() {
        return Err(StocksageError::invalid_config(
            "strategies",
            "at least one strategy is required",
        ));
    }

    let ranking_metric = match config.get_string(COMPARE, "ranking_metric") {
        Some(raw) => raw.parse::<RankingMetric>()?,
        None => RankingMetric::TotalReturn,
    };

    let weighting = match config.get_list(COMPARE, "weights") {
        None => Weighting::Equal,
        Some(pairs) => {
            let mut weights = HashMap::new();
            for pair in pairs {
                let (code, weight) = pair
                    .split_once(':')
                    .ok_or_else(|| invalid(COMPARE, "weights", format!("expected CODE:weight, got '{}'", pair)))?;
                let weight: f64 = parse_value(COMPARE, "weights", weight)?;
                if weight < 0.0 {
                    return Err(invalid(COMPARE, "weights", "weights must be non-negative"));
                }
                weights.insert(code.trim().to_string(), weight);
            }
            Weighting::Custom(weights)
        }
    };

    Ok(CompareConfig {
        strategies,
        ranking_metric,
        weighting,
    })
}

pub fn load_data_config(config: &dyn ConfigPort) -> Result<DataConfig, StocksageError> {
    let dir = config
        .get_string(DATA, "dir")
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| StocksageError::ConfigMissing {
            section: DATA.to_string(),
            key: "dir".to_string(),
        })?;
    Ok(DataConfig {
        dir: PathBuf::from(dir.trim()),
        codes: config.get_list(DATA, "codes").unwrap_or_default(),
    })
}

fn require(condition: bool, field: &str, reason: &str) -> Result<(), StocksageError> {
    if condition {
        Ok(())
    } else {
        Err(StocksageError::invalid_config(field, reason))
    }
}

fn require_periods(
    indicators: &IndicatorConfig,
    kind: IndicatorKind,
    field: &str,
    periods: &[usize],
) -> Result<(), StocksageError> {
    if !indicators.is_enabled(kind) {
        return Ok(());
    }
    require(!periods.is_empty(), field, "at least one period is required")?;
    require(periods.iter().all(|&p| p > 0), field, "periods must be positive")
}

pub fn validate_indicator_config(indicators: &IndicatorConfig) -> Result<(), StocksageError> {
    require(
        !indicators.enabled.is_empty(),
        "enabled",
        "at least one indicator must be enabled",
    )?;
    require_periods(indicators, IndicatorKind::Ma, "ma_periods", &indicators.ma_periods)?;
    require_periods(indicators, IndicatorKind::Rsi, "rsi_periods", &indicators.rsi_periods)?;
    require_periods(
        indicators,
        IndicatorKind::VolumeMa,
        "volume_ma_periods",
        &indicators.volume_ma_periods,
    )?;

    if indicators.is_enabled(IndicatorKind::Macd) {
        require(indicators.macd_fast > 0, "macd_fast", "must be positive")?;
        require(indicators.macd_signal > 0, "macd_signal", "must be positive")?;
        require(
            indicators.macd_fast < indicators.macd_slow,
            "macd_fast",
            "must be less than macd_slow",
        )?;
    }
    if indicators.is_enabled(IndicatorKind::Kdj) {
        require(indicators.kdj_length > 0, "kdj_length", "must be positive")?;
        require(indicators.kdj_signal > 0, "kdj_signal", "must be positive")?;
    }
    if indicators.is_enabled(IndicatorKind::Bollinger) {
        require(indicators.boll_length > 0, "boll_length", "must be positive")?;
        require(
            indicators.boll_multiplier > 0.0 && indicators.boll_multiplier.is_finite(),
            "boll_multiplier",
            "must be positive",
        )?;
    }
    Ok(())
}

pub fn validate_signal_config(
    signals: &SignalConfig,
    indicators: &IndicatorConfig,
) -> Result<(), StocksageError> {
    let in_unit_range = |v: f64| (0.0..=100.0).contains(&v);

    require(
        in_unit_range(signals.rsi_overbought) && in_unit_range(signals.rsi_oversold),
        "rsi_overbought",
        "RSI thresholds must lie within 0..=100",
    )?;
    require(
        signals.rsi_oversold < signals.rsi_overbought,
        "rsi_oversold",
        "must be less than rsi_overbought",
    )?;

    require(signals.ma_short > 0, "ma_short", "must be positive")?;
    require(
        signals.ma_short < signals.ma_long,
        "ma_short",
        "must be less than ma_long",
    )?;
    if indicators.is_enabled(IndicatorKind::Ma) {
        require(
            indicators.ma_periods.contains(&signals.ma_short)
                && indicators.ma_periods.contains(&signals.ma_long),
            "ma_periods",
            "must include ma_short and ma_long",
        )?;
    }

    require(
        signals.weights.values().all(|&w| w >= 0.0 && w.is_finite()),
        "weight",
        "weights must be non-negative",
    )?;

    require(
        in_unit_range(signals.buy_threshold) && in_unit_range(signals.sell_threshold),
        "buy_threshold",
        "score thresholds must lie within 0..=100",
    )?;
    require(
        signals.sell_threshold < signals.buy_threshold,
        "buy_threshold",
        "must be greater than sell_threshold",
    )?;
    require(
        signals.confidence_margin >= 0.0,
        "confidence_margin",
        "must be non-negative",
    )?;

    require(signals.risk_lookback > 0, "risk_lookback", "must be positive")?;
    require(signals.risk_low > 0.0, "risk_low", "must be positive")?;
    require(
        signals.risk_low < signals.risk_high,
        "risk_low",
        "must be less than risk_high",
    )?;
    require(
        signals.periods_per_year > 0.0,
        "periods_per_year",
        "must be positive",
    )
}

pub fn validate_backtest_config(backtest: &BacktestConfig) -> Result<(), StocksageError> {
    let fraction = |v: f64| (0.0..1.0).contains(&v);

    require(
        backtest.start_date <= backtest.end_date,
        "start_date",
        "must not be after end_date",
    )?;
    require(
        backtest.initial_capital > 0.0,
        "initial_capital",
        "must be positive",
    )?;
    require(
        fraction(backtest.slippage_pct),
        "slippage_pct",
        "must be within [0, 1)",
    )?;
    require(
        fraction(backtest.commission_pct),
        "commission_pct",
        "must be within [0, 1)",
    )?;
    require(
        fraction(backtest.risk_free_rate),
        "risk_free_rate",
        "must be within [0, 1)",
    )?;
    require(
        backtest.periods_per_year > 0.0,
        "periods_per_year",
        "must be positive",
    )
}
