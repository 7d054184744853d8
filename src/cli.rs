//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::tracing_metrics::TracingMetricsSink;
use crate::domain::backtest::{run_batch, BacktestJob};
use crate::domain::candle::format_millis;
use crate::domain::condition::ConditionGroup;
use crate::domain::config_validation::{
    build_risk_config, build_run_settings, build_strategy, validate_config, RunSettings,
    DEFAULT_INTERVAL,
};
use crate::domain::error::StratsimError;
use crate::domain::risk::RiskConfig;
use crate::domain::strategy::{SignalMode, Strategy};
use crate::ports::data_port::DataPort;
use crate::ports::metrics_port::MetricsSink;
use crate::ports::report_port::ReportPort;

const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "stratsim", about = "Backtest engine for retail trading strategies")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding <SYMBOL>_<interval>.csv files
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        /// Directory for trade, equity and summary CSV files
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a strategy configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        interval: Option<String>,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// List symbols with data for an interval
    ListSymbols {
        #[arg(short, long)]
        data_dir: PathBuf,
        #[arg(long, default_value = DEFAULT_INTERVAL)]
        interval: String,
    },
}

/// Install the global subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);
    match cli.command {
        Command::Backtest {
            config,
            data_dir,
            output,
            symbol,
            dry_run,
        } => run_backtest(
            &config,
            data_dir.as_deref(),
            output.as_deref(),
            symbol.as_deref(),
            dry_run,
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Info {
            config,
            data_dir,
            interval,
            symbol,
        } => run_info(
            config.as_deref(),
            data_dir.as_deref(),
            interval.as_deref(),
            symbol.as_deref(),
        ),
        Command::ListSymbols { data_dir, interval } => run_list_symbols(&data_dir, &interval),
    }
}

fn fail(err: &StratsimError) -> ExitCode {
    eprintln!("error: {}", err.display_with_context());
    ExitCode::from(err)
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

fn resolve_data_dir(flag: Option<&Path>, settings_dir: Option<&str>) -> PathBuf {
    match (flag, settings_dir) {
        (Some(dir), _) => dir.to_path_buf(),
        (None, Some(dir)) => PathBuf::from(dir),
        (None, None) => PathBuf::from(DEFAULT_DATA_DIR),
    }
}

fn print_group(name: &str, group: &ConditionGroup) {
    if group.is_empty() {
        return;
    }
    let joiner = if group.is_disjunction() { "any of" } else { "all of" };
    eprintln!("  {} ({} {}):", name, joiner, group.len());
    for condition in &group.conditions {
        eprintln!("    {}", condition);
    }
}

fn print_strategy(strategy: &Strategy) {
    eprintln!("\nStrategy: {}", strategy.name);
    if !strategy.description.is_empty() {
        eprintln!("  {}", strategy.description);
    }
    match &strategy.mode {
        SignalMode::Conditions(rules) => {
            print_group("entry_long", &rules.entry_long);
            print_group("exit_long", &rules.exit_long);
            print_group("entry_short", &rules.entry_short);
            print_group("exit_short", &rules.exit_short);

            let mut indicators: Vec<String> = [
                &rules.entry_long,
                &rules.exit_long,
                &rules.entry_short,
                &rules.exit_short,
            ]
            .iter()
            .flat_map(|g| g.indicators())
            .map(|k| k.to_string())
            .collect();
            indicators.sort();
            indicators.dedup();
            eprintln!("\nIndicators to compute:");
            for ind in &indicators {
                eprintln!("  {}", ind);
            }
        }
        SignalMode::Composite(c) => {
            eprintln!(
                "  composite: weights momentum={} trend={} volatility={} relative_strength={}",
                c.weights.momentum,
                c.weights.trend,
                c.weights.volatility,
                c.weights.relative_strength
            );
            eprintln!(
                "  thresholds: long > {}, short < {}, exit {}",
                c.long_threshold, c.short_threshold, c.exit_threshold
            );
        }
    }
    eprintln!("Warmup: {} candles", strategy.warmup());
}

fn print_risk(risk: &RiskConfig) {
    eprintln!("\nRisk:");
    eprintln!("  initial balance: {:.2}", risk.initial_balance);
    eprintln!(
        "  product: {}, leverage {}x, position size {}%",
        risk.product_type, risk.leverage, risk.position_size_percent
    );
    eprintln!(
        "  fees: maker {}%, taker {}% ({}), slippage {}%",
        risk.maker_fee_percent, risk.taker_fee_percent, risk.execution_timing, risk.slippage_percent
    );
    if risk.stop_loss_enabled() {
        eprintln!("  stop loss: {}%", risk.stop_loss_percent);
    }
    if risk.take_profit_enabled() {
        eprintln!("  take profit: {}%", risk.take_profit_percent);
    }
}

fn run_backtest(
    config_path: &Path,
    data_dir: Option<&Path>,
    output: Option<&Path>,
    symbol_override: Option<&str>,
    dry_run: bool,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let (mut settings, risk, strategy) = match validate_config(&adapter) {
        Ok(v) => v,
        Err(e) => return fail(&e),
    };
    if let Some(symbol) = symbol_override {
        settings.symbols = vec![symbol.trim().to_uppercase()];
    }

    if dry_run {
        print_strategy(&strategy);
        print_risk(&risk);
        eprintln!(
            "\nSymbols: {} ({})",
            settings.symbols.join(", "),
            settings.interval
        );
        eprintln!("\nDry run complete: configuration is valid");
        return ExitCode::SUCCESS;
    }

    let data_port = CsvAdapter::new(resolve_data_dir(data_dir, settings.data_dir.as_deref()));
    let report = output.map(|dir| CsvReportAdapter::new(dir.to_path_buf()));
    let sink = TracingMetricsSink::new();

    let code = run_backtest_pipeline(
        &data_port,
        &strategy,
        &risk,
        &settings,
        report.as_ref().map(|r| r as &dyn ReportPort),
        &sink,
    );
    sink.log_summary();
    code
}

/// Fetch, simulate and report every configured symbol.
///
/// Symbols without usable data are skipped with a warning; the run fails
/// only when no symbol produced a result.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    strategy: &Strategy,
    risk: &RiskConfig,
    settings: &RunSettings,
    report: Option<&dyn ReportPort>,
    sink: &dyn MetricsSink,
) -> ExitCode {
    let mut jobs = Vec::with_capacity(settings.symbols.len());
    let mut first_error: Option<StratsimError> = None;

    for symbol in &settings.symbols {
        match data_port.fetch_candles(symbol, &settings.interval, settings.start_ms, settings.end_ms)
        {
            Ok(candles) => jobs.push(BacktestJob {
                label: symbol.clone(),
                candles,
                strategy: strategy.clone(),
                risk: risk.clone(),
            }),
            Err(e) => {
                eprintln!("warning: skipping {} ({})", symbol, e);
                first_error.get_or_insert(e);
            }
        }
    }

    if jobs.is_empty() {
        let err = first_error.unwrap_or(StratsimError::NoData {
            symbol: settings.symbols.join(","),
        });
        return fail(&err);
    }

    eprintln!(
        "Running backtest: {} on {} symbol(s), interval {}",
        strategy.name,
        jobs.len(),
        settings.interval
    );

    let results = run_batch(&jobs, sink);
    let mut succeeded = 0usize;

    for (job, result) in jobs.iter().zip(results) {
        let result = match result {
            Ok(r) => r,
            Err(e) => {
                let verdict = if e.is_input_error() { "rejected" } else { "failed" };
                eprintln!("warning: {} {} ({})", job.label, verdict, e);
                first_error.get_or_insert(e);
                continue;
            }
        };
        succeeded += 1;

        let m = &result.metrics;
        let (first, last) = match (job.candles.first(), job.candles.last()) {
            (Some(f), Some(l)) => (format_millis(f.open_time), format_millis(l.open_time)),
            _ => (String::new(), String::new()),
        };
        eprintln!("\n=== {} ({} to {}) ===", job.label, first, last);
        eprintln!("Final Balance:    {:.2}", m.final_balance);
        eprintln!("Total Return:     {:.2}%", m.total_return);
        eprintln!("Max Drawdown:     -{:.2}%", m.max_drawdown);
        eprintln!("Total Trades:     {}", m.total_trades);
        eprintln!("Win Rate:         {:.1}%", m.win_rate);
        eprintln!("Profit Factor:    {:.2}", m.profit_factor);
        eprintln!("Total Fees:       {:.4}", m.total_fees);

        if let Some(report) = report {
            if let Err(e) = report.write(&result, strategy, &job.label) {
                return fail(&e);
            }
        }
    }

    if succeeded == 0 {
        if let Some(e) = first_error {
            return fail(&e);
        }
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating strategy: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let strategy = match build_strategy(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    print_strategy(&strategy);

    match build_risk_config(&adapter) {
        Ok(risk) => print_risk(&risk),
        Err(e) => return fail(&e),
    }

    eprintln!("\nStrategy is valid");
    ExitCode::SUCCESS
}

fn run_info(
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
    interval: Option<&str>,
    symbol: Option<&str>,
) -> ExitCode {
    let settings = match config_path {
        Some(path) => {
            let config = match load_config(path) {
                Ok(c) => c,
                Err(code) => return code,
            };
            match build_run_settings(&config) {
                Ok(s) => Some(s),
                Err(e) => return fail(&e),
            }
        }
        None => None,
    };

    let interval = interval
        .map(str::to_string)
        .or_else(|| settings.as_ref().map(|s| s.interval.clone()))
        .unwrap_or_else(|| DEFAULT_INTERVAL.to_string());
    let dir = resolve_data_dir(
        data_dir,
        settings.as_ref().and_then(|s| s.data_dir.as_deref()),
    );
    let symbols: Vec<String> = match (symbol, &settings) {
        (Some(s), _) => vec![s.trim().to_uppercase()],
        (None, Some(s)) => s.symbols.clone(),
        (None, None) => {
            eprintln!("error: --symbol or --config is required for info");
            return ExitCode::from(2);
        }
    };

    let adapter = CsvAdapter::new(dir);
    for s in &symbols {
        match adapter.data_range(s, &interval) {
            Ok(Some((first, last, count))) => {
                println!(
                    "{} {}: {} candles, {} to {}",
                    s,
                    interval,
                    count,
                    format_millis(first),
                    format_millis(last)
                );
            }
            Ok(None) => eprintln!("{} {}: no data found", s, interval),
            Err(e) => eprintln!("error querying {} {}: {}", s, interval, e),
        }
    }
    ExitCode::SUCCESS
}

fn run_list_symbols(data_dir: &Path, interval: &str) -> ExitCode {
    let adapter = CsvAdapter::new(data_dir.to_path_buf());
    let symbols = match adapter.list_symbols(interval) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found for interval {}", interval);
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}
