//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_data_adapter::{CsvDataAdapter, CsvHoldingsAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestResult};
use crate::domain::config_validation::{
    load_backtest_settings, load_strategy_config, parse_symbols,
};
use crate::domain::error::EngineError;
use crate::domain::risk::{compute_risk_analytics, AssetHistory};
use crate::domain::scan::{scan_universe, ScanCandidate};
use crate::domain::stats;
use crate::domain::strategy::StrategyConfig;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{HoldingsPort, PriceDataPort};
use crate::ports::event_port::{EventSink, ScanEvent};

#[derive(Parser, Debug)]
#[command(name = "quantfolio", about = "Strategy backtesting and portfolio risk analytics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run per-symbol backtests
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Override the configured symbol list
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Write the trade ledger as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Scan a universe for current signals
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data_dir: PathBuf,
        /// Comma-separated symbol list; defaults to every CSV in the data dir
        #[arg(long)]
        symbols: Option<String>,
    },
    /// Portfolio risk analytics over current holdings
    Risk {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long)]
        holdings: PathBuf,
        /// Benchmark symbol for beta/alpha/correlation
        #[arg(long)]
        benchmark: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in a data directory
    ListSymbols {
        #[arg(long)]
        data_dir: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbol,
            data_dir,
            output,
        } => run_backtest_command(&config, symbol.as_deref(), data_dir, output.as_ref()),
        Command::Scan {
            config,
            data_dir,
            symbols,
        } => run_scan_command(&config, &data_dir, symbols.as_deref()),
        Command::Risk {
            config,
            data_dir,
            holdings,
            benchmark,
        } => run_risk_command(&config, &data_dir, &holdings, benchmark.as_deref()),
        Command::Validate { config } => run_validate_command(&config),
        Command::ListSymbols { data_dir } => run_list_symbols(&data_dir),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn resolve_data_dir(override_dir: Option<PathBuf>, config: &dyn ConfigPort) -> PathBuf {
    override_dir
        .or_else(|| config.get_string("data", "dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn run_backtest_command(
    config_path: &PathBuf,
    symbol_override: Option<&str>,
    data_dir: Option<PathBuf>,
    output_path: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let strategy = match load_strategy_config(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let settings = match load_backtest_settings(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let symbols = match symbol_override {
        Some(list) => parse_symbols(list),
        None => settings.symbols.clone(),
    };
    if symbols.is_empty() {
        eprintln!("error: no symbols configured");
        return ExitCode::from(2);
    }

    let data_port = CsvDataAdapter::new(resolve_data_dir(data_dir, &adapter));

    eprintln!(
        "Running {} backtest(s), {} to {}",
        symbols.len(),
        settings.start_date,
        settings.end_date,
    );

    let mut results: Vec<BacktestResult> = Vec::new();
    for symbol in &symbols {
        let bars = match data_port.fetch_bars(symbol, settings.start_date, settings.end_date) {
            Ok(bars) => bars,
            Err(e) => {
                eprintln!("warning: skipping {} ({})", symbol, e);
                continue;
            }
        };
        match run_backtest(symbol, &bars, &strategy, settings.initial_capital) {
            Ok(result) => {
                print_backtest_summary(&result);
                results.push(result);
            }
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    if results.is_empty() {
        eprintln!("error: no symbols with data to backtest");
        return ExitCode::from(5);
    }

    if let Some(output) = output_path {
        if let Err(e) = write_trade_ledger(output, &results) {
            eprintln!("error: failed to write ledger: {e}");
            return ExitCode::from(1);
        }
        eprintln!("\nTrade ledger written to: {}", output.display());
    }

    ExitCode::SUCCESS
}

fn print_backtest_summary(result: &BacktestResult) {
    let m = &result.summary;
    eprintln!("\n=== {} ===", result.symbol);
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", m.annualized_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", m.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", m.total_trades);
    eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", m.profit_factor);
    eprintln!("Final Capital:    {:.2}", result.final_capital);
}

fn write_trade_ledger(path: &PathBuf, results: &[BacktestResult]) -> Result<(), EngineError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| EngineError::Upstream {
        reason: format!("CSV write error: {}", e),
    })?;
    writer
        .write_record([
            "symbol",
            "entry_date",
            "entry_price",
            "exit_date",
            "exit_price",
            "quantity",
            "pnl",
            "pnl_pct",
            "exit_reason",
        ])
        .map_err(|e| EngineError::Upstream {
            reason: format!("CSV write error: {}", e),
        })?;

    for result in results {
        for trade in &result.trades {
            writer
                .write_record([
                    trade.symbol.clone(),
                    trade.entry_date.to_string(),
                    format!("{:.4}", trade.entry_price),
                    trade.exit_date.to_string(),
                    format!("{:.4}", trade.exit_price),
                    trade.quantity.to_string(),
                    format!("{:.2}", trade.pnl),
                    format!("{:.2}", trade.pnl_pct),
                    format!("{:?}", trade.exit_reason),
                ])
                .map_err(|e| EngineError::Upstream {
                    reason: format!("CSV write error: {}", e),
                })?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Scan progress on stderr.
struct StderrSink;

impl EventSink for StderrSink {
    fn emit(&self, event: ScanEvent) {
        match event {
            ScanEvent::Started { total } => eprintln!("Scanning {} symbols...", total),
            ScanEvent::Scored { .. } => {}
            ScanEvent::Failed { symbol, reason } => {
                eprintln!("warning: skipping {} ({})", symbol, reason)
            }
            ScanEvent::Finished { scored, failed } => {
                eprintln!("Scan complete: {} scored, {} failed", scored, failed)
            }
        }
    }
}

fn run_scan_command(
    config_path: &PathBuf,
    data_dir: &PathBuf,
    symbols_override: Option<&str>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let strategy = match load_strategy_config(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let data_port = CsvDataAdapter::new(data_dir.clone());
    let symbols = match symbols_override {
        Some(list) => parse_symbols(list),
        None => match data_port.list_symbols() {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        },
    };
    if symbols.is_empty() {
        eprintln!("error: no symbols to scan");
        return ExitCode::from(5);
    }

    let candidates = match build_candidates(&data_port, &adapter, &symbols) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let report = scan_universe(&candidates, &strategy, &StderrSink);

    eprintln!("\n=== Signals ===");
    for result in &report.results {
        let rsi = result
            .signal
            .rsi
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "-".to_string());
        eprintln!(
            "  {:<8} {:<10} {:?}  score {:.1}  rsi {}",
            result.symbol, result.sector, result.signal.direction, result.signal.score, rsi,
        );
    }

    if !report.sectors.is_empty() {
        eprintln!("\n=== Sectors ===");
        for sector in &report.sectors {
            eprintln!(
                "  {:<12} {} symbols, {} buys, {} sells, avg score {:.1}",
                sector.sector, sector.symbols, sector.buys, sector.sells, sector.avg_score,
            );
        }
    }

    ExitCode::SUCCESS
}

fn build_candidates(
    data_port: &dyn PriceDataPort,
    config: &dyn ConfigPort,
    symbols: &[String],
) -> Result<Vec<ScanCandidate>, EngineError> {
    let mut candidates = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let bars = data_port.fetch_bars(symbol, chrono::NaiveDate::MIN, chrono::NaiveDate::MAX)?;
        let sector = config
            .get_string("sectors", &symbol.to_lowercase())
            .unwrap_or_else(|| "Unknown".to_string());
        candidates.push(ScanCandidate {
            symbol: symbol.clone(),
            sector,
            bars,
        });
    }
    Ok(candidates)
}

fn run_risk_command(
    config_path: &PathBuf,
    data_dir: &PathBuf,
    holdings_path: &PathBuf,
    benchmark: Option<&str>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    if let Err(code) = load_config(config_path) {
        return code;
    }

    let holdings_port = CsvHoldingsAdapter::new(holdings_path.clone());
    let holdings = match holdings_port.fetch_holdings() {
        Ok(h) => h,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Loaded {} holdings", holdings.len());

    let data_port = CsvDataAdapter::new(data_dir.clone());
    let mut history = std::collections::HashMap::new();
    for holding in &holdings {
        match fetch_history(&data_port, &holding.symbol) {
            Ok(h) => {
                history.insert(holding.symbol.clone(), h);
            }
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    let benchmark_history = match benchmark {
        Some(symbol) => match fetch_history(&data_port, symbol) {
            Ok(h) => Some(h),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        },
        None => None,
    };

    let analytics = match compute_risk_analytics(
        &holdings,
        &history,
        benchmark_history.as_ref().map(|h| h.returns.as_slice()),
    ) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let p = &analytics.portfolio;
    eprintln!("\n=== Portfolio Risk ===");
    eprintln!("Total Value:      {:.2}", p.total_value);
    eprintln!("Annualized Ret:   {:.2}%", p.annualized_return * 100.0);
    eprintln!("Annualized Vol:   {:.2}%", p.annualized_volatility * 100.0);
    eprintln!("VaR 95 / 99:      {:.2} / {:.2}", p.var_95, p.var_99);
    eprintln!("CVaR 95 / 99:     {:.2} / {:.2}", p.cvar_95, p.cvar_99);
    eprintln!("Sharpe:           {:.2}", p.sharpe_ratio);
    eprintln!("Sortino:          {:.2}", p.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", p.max_drawdown * 100.0);
    if benchmark.is_some() {
        eprintln!("Beta:             {:.2}", p.beta);
        eprintln!("Alpha:            {:.2}%", p.alpha * 100.0);
        eprintln!("Correlation:      {:.2}", p.benchmark_correlation);
    }
    eprintln!("Concentration:    {:.3}", p.concentration);
    eprintln!("Diversification:  {:.2}", p.diversification_ratio);

    eprintln!("\n=== Assets ===");
    for asset in &analytics.assets {
        let pnl_sign = if asset.unrealized_pnl >= 0.0 { "+" } else { "" };
        eprintln!(
            "  {:<8} weight {:.1}%, vol {:.1}%, cVaR {:.2}, {}{:.0} unrealized",
            asset.symbol,
            asset.weight * 100.0,
            asset.annualized_volatility * 100.0,
            asset.component_var,
            pnl_sign,
            asset.unrealized_pnl,
        );
    }

    ExitCode::SUCCESS
}

fn fetch_history(
    data_port: &dyn PriceDataPort,
    symbol: &str,
) -> Result<AssetHistory, EngineError> {
    let bars = data_port.fetch_bars(symbol, chrono::NaiveDate::MIN, chrono::NaiveDate::MAX)?;
    if bars.is_empty() {
        return Err(EngineError::NoData {
            symbol: symbol.to_string(),
        });
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    Ok(AssetHistory {
        returns: stats::simple_returns(&closes),
        latest_price: closes[closes.len() - 1],
    })
}

fn run_validate_command(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let strategy: StrategyConfig = match load_strategy_config(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Err(e) = load_backtest_settings(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!("Config validated successfully");
    eprintln!("\nStrategy:");
    eprintln!("  ema:        {} / {}", strategy.ema_fast, strategy.ema_slow);
    eprintln!(
        "  rsi:        {} in [{}, {}]",
        strategy.rsi_period, strategy.rsi_lower, strategy.rsi_upper
    );
    eprintln!("  threshold:  {}", strategy.score_threshold);
    eprintln!(
        "  atr:        {} (stop {}x, target {}x)",
        strategy.atr_period, strategy.atr_multiplier, strategy.tp_multiplier
    );
    eprintln!("  warmup:     {} bars", strategy.min_bars());

    ExitCode::SUCCESS
}

fn run_list_symbols(data_dir: &PathBuf) -> ExitCode {
    let data_port = CsvDataAdapter::new(data_dir.clone());
    match data_port.list_symbols() {
        Ok(symbols) if symbols.is_empty() => {
            eprintln!("No symbols found in {}", data_dir.display());
            ExitCode::SUCCESS
        }
        Ok(symbols) => {
            for symbol in symbols {
                println!("{}", symbol);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
