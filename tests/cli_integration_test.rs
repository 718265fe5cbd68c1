//! CLI integration tests: INI files and CSV price data on disk, commands
//! dispatched through `cli::run`.

mod common;

use common::*;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use stocksage::adapters::file_config_adapter::FileConfigAdapter;
use stocksage::cli::{self, Cli};
use stocksage::domain::backtest::ExecutionTiming;
use stocksage::domain::comparator::RankingMetric;
use stocksage::domain::config_validation::{
    load_backtest_config, load_compare_config, load_data_config, load_indicator_config,
    load_signal_config,
};
use stocksage::domain::error::StocksageError;
use stocksage::domain::indicator::IndicatorKind;

use clap::Parser;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn same_code(actual: ExitCode, expected: ExitCode) {
    assert_eq!(format!("{:?}", actual), format!("{:?}", expected));
}

fn run_args(args: &[&str]) -> ExitCode {
    let mut argv = vec!["stocksage"];
    argv.extend_from_slice(args);
    cli::run(Cli::try_parse_from(argv).unwrap())
}

/// Two rising instruments as CSV files plus a config pointing at them.
fn workspace(dir: &Path, extra: &str) -> tempfile::NamedTempFile {
    let data_dir = dir.join("prices");
    fs::create_dir(&data_dir).unwrap();
    write_price_csv(
        &data_dir,
        "AAA",
        &points_from_closes(date(2024, 1, 1), &rising_closes(120, 10.0, 0.25)),
    );
    write_price_csv(
        &data_dir,
        "BBB",
        &points_from_closes(date(2024, 1, 1), &wave_closes(120, 40.0, 4.0, 25.0)),
    );

    write_temp_ini(&format!(
        "[data]\ndir = {}\ncodes = AAA, BBB\n\n\
         [backtest]\nstart_date = 2024-01-01\nend_date = 2024-12-31\ninitial_capital = 10000\n\n\
         {}",
        data_dir.display(),
        extra
    ))
}

const FULL_INI: &str = r#"
[indicators]
enabled = ma, macd, rsi, kdj, boll
ma_periods = 5, 10, 20
rsi_periods = 6, 14
boll_multiplier = 2.5

[signals]
rsi_overbought = 80
rsi_oversold = 20
weight.macd = 30
buy_threshold = 65
sell_threshold = 35

[backtest]
start_date = 2023-01-01
end_date = 2023-12-31
execution = next_open
initial_capital = 50000
slippage_pct = 0.001
commission_pct = 0.0005
risk_free_rate = 0.02

[compare]
strategies = composite, macd, buy_and_hold
ranking_metric = max_drawdown

[data]
dir = /var/lib/prices
codes = 600000, 000001
"#;

mod config_loading {
    use super::*;

    #[test]
    fn full_config_round_trips_into_typed_settings() {
        let config = FileConfigAdapter::from_string(FULL_INI).unwrap();

        let indicators = load_indicator_config(&config).unwrap();
        assert!(!indicators.is_enabled(IndicatorKind::VolumeMa));
        assert_eq!(indicators.ma_periods, vec![5, 10, 20]);
        assert_eq!(indicators.rsi_periods, vec![6, 14]);
        assert_eq!(indicators.boll_multiplier_x100(), 250);

        let signals = load_signal_config(&config, &indicators).unwrap();
        assert_eq!(signals.rsi_overbought, 80.0);
        assert_eq!(signals.weight(IndicatorKind::Macd), 30.0);
        assert_eq!(signals.buy_threshold, 65.0);

        let backtest = load_backtest_config(&config).unwrap();
        assert_eq!(backtest.start_date, date(2023, 1, 1));
        assert_eq!(backtest.execution, ExecutionTiming::NextOpen);
        assert_eq!(backtest.initial_capital, 50_000.0);
        assert_eq!(backtest.risk_free_rate, 0.02);

        let compare = load_compare_config(&config).unwrap();
        assert_eq!(compare.strategies, vec!["composite", "macd", "buy_and_hold"]);
        assert_eq!(compare.ranking_metric, RankingMetric::MaxDrawdown);

        let data = load_data_config(&config).unwrap();
        assert_eq!(data.codes, vec!["600000", "000001"]);
    }

    #[test]
    fn ma_cross_periods_must_be_computed() {
        let config = FileConfigAdapter::from_string(
            "[indicators]\nma_periods = 10, 30\n\n[signals]\nma_short = 5\nma_long = 20\n",
        )
        .unwrap();
        let indicators = load_indicator_config(&config).unwrap();
        assert!(matches!(
            load_signal_config(&config, &indicators),
            Err(StocksageError::InvalidConfiguration { ref field, .. }) if field == "ma_periods"
        ));
    }

    #[test]
    fn missing_config_file_is_a_parse_error() {
        let Err(err) = cli::load_config(Path::new("/nonexistent/stocksage.ini")) else {
            panic!("a missing config file must not load");
        };
        assert!(matches!(err, StocksageError::ConfigParse { .. }));
        same_code((&err).into(), ExitCode::from(2));
    }
}

mod commands {
    use super::*;

    #[test]
    fn validate_accepts_a_complete_config() {
        let ini = write_temp_ini(FULL_INI);
        same_code(
            run_args(&["validate", "-c", ini.path().to_str().unwrap()]),
            ExitCode::SUCCESS,
        );
    }

    #[test]
    fn validate_rejects_inverted_macd() {
        let ini = write_temp_ini("[indicators]\nmacd_fast = 30\nmacd_slow = 12\n");
        same_code(
            run_args(&["validate", "-c", ini.path().to_str().unwrap()]),
            ExitCode::from(2),
        );
    }

    #[test]
    fn validate_rejects_unknown_strategy() {
        let ini = write_temp_ini("[compare]\nstrategies = composite, momentum\n");
        same_code(
            run_args(&["validate", "-c", ini.path().to_str().unwrap()]),
            ExitCode::from(2),
        );
    }

    #[test]
    fn analyze_writes_recommendations() {
        let dir = tempfile::tempdir().unwrap();
        let ini = workspace(dir.path(), "");
        let output = dir.path().join("recs.csv");

        same_code(
            run_args(&[
                "analyze",
                "-c",
                ini.path().to_str().unwrap(),
                "-o",
                output.to_str().unwrap(),
            ]),
            ExitCode::SUCCESS,
        );

        let content = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "code,date,rating,score,risk_level,expected_return_pct,signals"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("AAA,2024-04-29,"));
    }

    #[test]
    fn backtest_writes_trades() {
        let dir = tempfile::tempdir().unwrap();
        let ini = workspace(dir.path(), "");
        let output = dir.path().join("trades.csv");

        same_code(
            run_args(&[
                "backtest",
                "-c",
                ini.path().to_str().unwrap(),
                "--strategy",
                "buy_and_hold",
                "-o",
                output.to_str().unwrap(),
            ]),
            ExitCode::SUCCESS,
        );

        let content = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "code,entry_date,entry_price,exit_date,exit_price,exit_reason,return_pct,pnl"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("AAA,2024-01-01,10.0,2024-04-29,"));
        assert!(lines.iter().skip(1).all(|l| l.contains(",end_of_window,")));
    }

    #[test]
    fn compare_writes_rankings() {
        let dir = tempfile::tempdir().unwrap();
        let ini = workspace(
            dir.path(),
            "[compare]\nstrategies = composite, buy_and_hold, kdj\nranking_metric = total_return\n",
        );
        let output = dir.path().join("rankings.csv");

        same_code(
            run_args(&[
                "compare",
                "-c",
                ini.path().to_str().unwrap(),
                "-o",
                output.to_str().unwrap(),
            ]),
            ExitCode::SUCCESS,
        );

        let content = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].starts_with("rank,strategy,total_return,"));
        assert_eq!(lines.len(), 4);
        for (i, line) in lines.iter().skip(1).enumerate() {
            assert!(line.starts_with(&format!("{},", i + 1)));
        }
    }

    #[test]
    fn compare_without_output_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let ini = workspace(dir.path(), "[compare]\nstrategies = composite, buy_and_hold\n");
        let before: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();

        same_code(
            run_args(&["compare", "-c", ini.path().to_str().unwrap()]),
            ExitCode::SUCCESS,
        );

        assert!(!Path::new("rankings.csv").exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), before.len());
    }

    #[test]
    fn compare_rejects_unknown_metric_override() {
        let dir = tempfile::tempdir().unwrap();
        let ini = workspace(dir.path(), "");
        same_code(
            run_args(&[
                "compare",
                "-c",
                ini.path().to_str().unwrap(),
                "--metric",
                "alpha",
                "-o",
                dir.path().join("r.csv").to_str().unwrap(),
            ]),
            ExitCode::from(2),
        );
    }

    #[test]
    fn unknown_codes_are_a_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let ini = workspace(dir.path(), "");
        same_code(
            run_args(&[
                "backtest",
                "-c",
                ini.path().to_str().unwrap(),
                "--code",
                "ZZZ",
            ]),
            ExitCode::from(3),
        );
    }
}
