//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig};
use crate::domain::comparator::{self, RankingMetric, StrategyRanking};
use crate::domain::config_validation::{
    load_backtest_config, load_compare_config, load_data_config, load_indicator_config,
    load_signal_config,
};
use crate::domain::error::StocksageError;
use crate::domain::frame::IndicatorConfig;
use crate::domain::metrics::PerformanceReport;
use crate::domain::ohlcv::InstrumentSeries;
use crate::domain::position::ExitReason;
use crate::domain::recommendation::{batch_analyze, Recommendation};
use crate::domain::strategy::{build_strategy, COMPOSITE};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(
    name = "stocksage",
    about = "Technical-indicator signals and strategy backtesting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score the latest session of each instrument
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated codes; overrides [data] codes
        #[arg(long)]
        code: Option<String>,
        /// Analyze as of this date (YYYY-MM-DD) instead of the latest session
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Write recommendations to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Backtest one strategy per instrument
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        /// composite, buy_and_hold or an indicator name
        #[arg(short, long, default_value = COMPOSITE)]
        strategy: String,
        /// Write closed trades to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Backtest several strategies over a universe and rank them
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
        /// Overrides [compare] ranking_metric
        #[arg(short, long)]
        metric: Option<String>,
        /// Write rankings to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Analyze {
            config,
            code,
            date,
            output,
        } => run_analyze(&config, code.as_deref(), date, output.as_deref()),
        Command::Backtest {
            config,
            code,
            strategy,
            output,
        } => run_backtest(&config, code.as_deref(), &strategy, output.as_deref()),
        Command::Compare {
            config,
            code,
            metric,
            output,
        } => run_compare(&config, code.as_deref(), metric.as_deref(), output.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, StocksageError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

/// Codes from `--code` when given, then `[data] codes`, then every file the
/// data source lists.
pub fn resolve_codes(
    code_override: Option<&str>,
    configured: &[String],
    data_port: &dyn DataPort,
) -> Result<Vec<String>, StocksageError> {
    let codes: Vec<String> = match code_override {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect(),
        None if !configured.is_empty() => configured.to_vec(),
        None => data_port.list_codes()?,
    };
    if codes.is_empty() {
        return Err(StocksageError::invalid_config(
            "codes",
            "no instrument codes configured",
        ));
    }
    Ok(codes)
}

/// Fetch full history up to `end_date` so indicators are warm at the start
/// of any later window. Codes that fail to load are skipped.
pub fn load_universe(
    data_port: &dyn DataPort,
    codes: &[String],
    end_date: NaiveDate,
) -> Vec<InstrumentSeries> {
    codes
        .iter()
        .filter_map(|code| match data_port.fetch_series(code, NaiveDate::MIN, end_date) {
            Ok(series) if series.is_empty() => {
                warn!(%code, "no sessions on or before {}", end_date);
                None
            }
            Ok(series) => Some(series),
            Err(e) => {
                warn!(%code, error = %e, "skipping instrument");
                None
            }
        })
        .collect()
}

struct Workspace {
    config: FileConfigAdapter,
    data: CsvAdapter,
    codes: Vec<String>,
    indicators: IndicatorConfig,
}

fn open_workspace(config_path: &Path, code_override: Option<&str>) -> Result<Workspace, StocksageError> {
    let config = load_config(config_path)?;
    let data_config = load_data_config(&config)?;
    let indicators = load_indicator_config(&config)?;
    let data = CsvAdapter::new(data_config.dir);
    let codes = resolve_codes(code_override, &data_config.codes, &data)?;
    Ok(Workspace {
        config,
        data,
        codes,
        indicators,
    })
}

fn require_universe(universe: &[InstrumentSeries]) -> Result<(), StocksageError> {
    if universe.is_empty() {
        return Err(StocksageError::Data {
            reason: "no instrument data could be loaded".to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct RecommendationRow<'a> {
    code: &'a str,
    date: NaiveDate,
    rating: String,
    score: f64,
    risk_level: String,
    expected_return_pct: f64,
    signals: String,
}

impl<'a> From<&'a Recommendation> for RecommendationRow<'a> {
    fn from(rec: &'a Recommendation) -> Self {
        let signals = rec
            .contributing_signals
            .iter()
            .map(|s| format!("{}:{}", s.indicator_name, s.direction))
            .collect::<Vec<_>>()
            .join(";");
        RecommendationRow {
            code: &rec.code,
            date: rec.date,
            rating: rec.rating.to_string(),
            score: rec.score,
            risk_level: rec.risk_level.to_string(),
            expected_return_pct: rec.expected_return_pct,
            signals,
        }
    }
}

fn run_analyze(
    config_path: &Path,
    code_override: Option<&str>,
    date: Option<NaiveDate>,
    output_path: Option<&Path>,
) -> Result<(), StocksageError> {
    let ws = open_workspace(config_path, code_override)?;
    let signals = load_signal_config(&ws.config, &ws.indicators)?;

    let universe = load_universe(&ws.data, &ws.codes, date.unwrap_or(NaiveDate::MAX));
    require_universe(&universe)?;
    eprintln!("Analyzing {} instruments", universe.len());

    let recommendations = batch_analyze(&universe, &ws.indicators, &signals);
    if recommendations.is_empty() {
        return Err(StocksageError::Data {
            reason: "no instrument produced a recommendation".to_string(),
        });
    }

    eprintln!("\n=== Recommendations ===");
    for rec in &recommendations {
        eprintln!(
            "  {}  {}  {:<4}  score {:>5.1}  risk {:<6}  expected {:+.1}%",
            rec.code,
            rec.date,
            rec.rating.to_string(),
            rec.score,
            rec.risk_level.to_string(),
            rec.expected_return_pct,
        );
        let detail: Vec<String> = rec
            .contributing_signals
            .iter()
            .map(|s| format!("{}={}", s.indicator_name, s.direction))
            .collect();
        eprintln!("      {}", detail.join(" "));
    }

    if let Some(path) = output_path {
        write_csv(path, recommendations.iter().map(RecommendationRow::from))?;
        eprintln!("\nRecommendations written to: {}", path.display());
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct TradeRow<'a> {
    code: &'a str,
    entry_date: NaiveDate,
    entry_price: f64,
    exit_date: NaiveDate,
    exit_price: f64,
    exit_reason: ExitReason,
    return_pct: f64,
    pnl: f64,
}

fn run_backtest(
    config_path: &Path,
    code_override: Option<&str>,
    strategy_name: &str,
    output_path: Option<&Path>,
) -> Result<(), StocksageError> {
    let ws = open_workspace(config_path, code_override)?;
    let signals = load_signal_config(&ws.config, &ws.indicators)?;
    let bt_config = load_backtest_config(&ws.config)?;
    let strategy = build_strategy(strategy_name, &signals)?;

    let universe = load_universe(&ws.data, &ws.codes, bt_config.end_date);
    require_universe(&universe)?;

    eprintln!(
        "Running backtest: strategy {}, {} instruments, {} to {} ({} execution)",
        strategy.name(),
        universe.len(),
        bt_config.start_date,
        bt_config.end_date,
        bt_config.execution,
    );

    let mut results = Vec::with_capacity(universe.len());
    for series in &universe {
        match backtest_engine::run(series, strategy.as_ref(), &ws.indicators, &bt_config) {
            Ok(result) => results.push(result),
            Err(e) => warn!(code = %series.code, error = %e, "skipping instrument"),
        }
    }
    if results.is_empty() {
        return Err(StocksageError::Data {
            reason: "no instrument could be backtested".to_string(),
        });
    }

    for result in &results {
        eprintln!("\n=== {} ===", result.code);
        print_report(&result.report, &bt_config);
    }

    if let Some(path) = output_path {
        let rows = results.iter().flat_map(|result| {
            result.trades.iter().map(move |t| TradeRow {
                code: &result.code,
                entry_date: t.entry_date,
                entry_price: t.entry_price,
                exit_date: t.exit_date,
                exit_price: t.exit_price,
                exit_reason: t.exit_reason,
                return_pct: t.return_pct,
                pnl: t.pnl,
            })
        });
        write_csv(path, rows)?;
        eprintln!("\nTrades written to: {}", path.display());
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct RankingRow<'a> {
    rank: usize,
    strategy: &'a str,
    total_return: Option<f64>,
    annualized_return: Option<f64>,
    max_drawdown: Option<f64>,
    sharpe_ratio: Option<f64>,
    win_rate: Option<f64>,
    profit_loss_ratio: Option<f64>,
    trade_count: usize,
    instruments: usize,
}

impl<'a> RankingRow<'a> {
    fn new(rank: usize, ranking: &'a StrategyRanking) -> Self {
        let r = &ranking.report;
        RankingRow {
            rank,
            strategy: &ranking.strategy_name,
            total_return: r.total_return,
            annualized_return: r.annualized_return,
            max_drawdown: r.max_drawdown,
            sharpe_ratio: r.sharpe_ratio,
            win_rate: r.win_rate,
            profit_loss_ratio: r.profit_loss_ratio,
            trade_count: r.trade_count,
            instruments: ranking.per_instrument.len(),
        }
    }
}

fn run_compare(
    config_path: &Path,
    code_override: Option<&str>,
    metric_override: Option<&str>,
    output_path: Option<&Path>,
) -> Result<(), StocksageError> {
    let ws = open_workspace(config_path, code_override)?;
    let signals = load_signal_config(&ws.config, &ws.indicators)?;
    let bt_config = load_backtest_config(&ws.config)?;
    let mut compare_config = load_compare_config(&ws.config)?;
    if let Some(raw) = metric_override {
        compare_config.ranking_metric = raw.parse::<RankingMetric>()?;
    }

    let strategies = compare_config
        .strategies
        .iter()
        .map(|name| build_strategy(name, &signals))
        .collect::<Result<Vec<_>, _>>()?;

    let universe = load_universe(&ws.data, &ws.codes, bt_config.end_date);
    require_universe(&universe)?;

    eprintln!(
        "Comparing {} strategies over {} instruments, ranked by {}",
        strategies.len(),
        universe.len(),
        compare_config.ranking_metric,
    );

    let rankings = comparator::compare(
        &strategies,
        &universe,
        &ws.indicators,
        &bt_config,
        compare_config.ranking_metric,
        &compare_config.weighting,
    )?;

    eprintln!("\n=== Rankings ({}) ===", compare_config.ranking_metric);
    for (i, ranking) in rankings.iter().enumerate() {
        eprintln!(
            "  {}. {:<14} {:>10}  ({} trades, {} instruments)",
            i + 1,
            ranking.strategy_name,
            format_metric(compare_config.ranking_metric, &ranking.report),
            ranking.report.trade_count,
            ranking.per_instrument.len(),
        );
    }

    if let Some(path) = output_path {
        write_csv(
            path,
            rankings
                .iter()
                .enumerate()
                .map(|(i, ranking)| RankingRow::new(i + 1, ranking)),
        )?;
        eprintln!("\nRankings written to: {}", path.display());
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), StocksageError> {
    let config = load_config(config_path)?;

    let indicators = load_indicator_config(&config)?;
    let enabled: Vec<&str> = indicators.enabled.iter().map(|k| k.name()).collect();
    eprintln!("  indicators: {}", enabled.join(", "));

    let signals = load_signal_config(&config, &indicators)?;
    eprintln!(
        "  signals:    buy >= {}, sell <= {}, MA cross {}/{}",
        signals.buy_threshold, signals.sell_threshold, signals.ma_short, signals.ma_long
    );

    let compare = load_compare_config(&config)?;
    for name in &compare.strategies {
        build_strategy(name, &signals)?;
    }
    eprintln!(
        "  compare:    {} ranked by {}",
        compare.strategies.join(", "),
        compare.ranking_metric
    );

    let has_window = config.get_string("backtest", "start_date").is_some()
        || config.get_string("backtest", "end_date").is_some();
    if has_window {
        let bt_config = load_backtest_config(&config)?;
        eprintln!(
            "  backtest:   {} to {}, capital {:.2}, {} execution",
            bt_config.start_date,
            bt_config.end_date,
            bt_config.initial_capital,
            bt_config.execution
        );
    }

    if config.get_string("data", "dir").is_some() {
        let data = load_data_config(&config)?;
        eprintln!("  data:       {}", data.dir.display());
    }

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn format_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0))
}

fn format_ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}

fn format_metric(metric: RankingMetric, report: &PerformanceReport) -> String {
    match metric {
        RankingMetric::SharpeRatio | RankingMetric::ProfitLossRatio => {
            format_ratio(metric.value(report))
        }
        RankingMetric::TradeCount => report.trade_count.to_string(),
        _ => format_pct(metric.value(report)),
    }
}

fn print_report(report: &PerformanceReport, config: &BacktestConfig) {
    eprintln!("Total Return:     {}", format_pct(report.total_return));
    eprintln!("Annualized:       {}", format_pct(report.annualized_return));
    eprintln!("Max Drawdown:     {}", format_pct(report.max_drawdown));
    eprintln!(
        "Sharpe Ratio:     {} (rf {:.2}%)",
        format_ratio(report.sharpe_ratio),
        config.risk_free_rate * 100.0
    );
    eprintln!("Win Rate:         {}", format_pct(report.win_rate));
    eprintln!("Profit/Loss:      {}", format_ratio(report.profit_loss_ratio));
    eprintln!("Total Trades:     {}", report.trade_count);
}

fn write_csv<T, I>(path: &Path, rows: I) -> Result<(), StocksageError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let to_err = |e: csv::Error| StocksageError::Data {
        reason: format!("failed to write {}: {}", path.display(), e),
    };
    let mut writer = csv::Writer::from_path(path).map_err(to_err)?;
    for row in rows {
        writer.serialize(row).map_err(to_err)?;
    }
    writer.flush()?;
    Ok(())
}
