//! Backtest simulator.
//!
//! A per-symbol state machine over {FLAT, LONG}, starting and ending FLAT.
//! Execution policy, applied to every trade in a run:
//!
//! - Entries fill at the **same bar's close** (no look-ahead to the next
//!   bar's open).
//! - Exits are never evaluated on the bar a position was opened, so every
//!   trade's exit date is strictly after its entry date.
//! - Same-bar exit priority: stop-loss, then take-profit, then sell signal.
//!   Protective exits beat discretionary ones when a single bar spans both.
//! - Sizing is all-in whole shares: quantity = floor(cash / entry price),
//!   constant policy across the run.
//! - No entries on the final bar; an open position is force-closed at the
//!   last bar's close for accounting.
//!
//! A series shorter than the longest indicator lookback yields a zero-trade
//! result, not an error.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::error::EngineError;
use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::divergence::{rsi_divergence, volume_divergence, Divergence};
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::ohlcv::{is_ordered, Bar};
use crate::domain::performance::PerformanceSummary;
use crate::domain::signal::{score_signal, Direction, IndicatorSnapshot, Signal};
use crate::domain::strategy::StrategyConfig;

/// Simulator-internal open position. Exactly one may exist per run.
#[derive(Debug, Clone)]
pub struct Position {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub quantity: i64,
    pub stop_price: f64,
    pub take_profit_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    StoppedOut,
    TargetHit,
    SignalExit,
    EndOfData,
}

/// Immutable ledger entry, appended when a position closes.
#[derive(Debug, Clone, Serialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub quantity: i64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub risk_reward: f64,
    pub exit_reason: ExitReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Per-bar annotation (close + indicators + signal) for charting.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedBar {
    pub date: NaiveDate,
    pub close: f64,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub rsi: Option<f64>,
    pub direction: Direction,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub trades: Vec<TradeRecord>,
    pub summary: PerformanceSummary,
    pub equity_curve: Vec<EquityPoint>,
    pub series: Vec<AnnotatedBar>,
}

/// Exit check for one bar, in documented priority order.
pub fn check_exit(position: &Position, bar: &Bar, direction: Direction) -> Option<(f64, ExitReason)> {
    if bar.low <= position.stop_price {
        return Some((position.stop_price, ExitReason::StoppedOut));
    }
    if bar.high >= position.take_profit_price {
        return Some((position.take_profit_price, ExitReason::TargetHit));
    }
    if direction == Direction::Sell {
        return Some((bar.close, ExitReason::SignalExit));
    }
    None
}

/// Run one backtest. `InvalidConfig` and unordered input are fatal; a short
/// series degrades to a zero-trade result.
pub fn run_backtest(
    symbol: &str,
    bars: &[Bar],
    config: &StrategyConfig,
    initial_capital: f64,
) -> Result<BacktestResult, EngineError> {
    config.validate()?;
    if initial_capital <= 0.0 {
        return Err(EngineError::invalid_config(
            "initial_capital",
            "must be positive",
        ));
    }
    if !is_ordered(bars) {
        return Err(EngineError::Upstream {
            reason: format!("price series for {} is not ordered by date", symbol),
        });
    }

    if bars.len() < config.min_bars() {
        return Ok(empty_result(symbol, bars, initial_capital));
    }

    let ema_fast = calculate_ema(bars, config.ema_fast)?;
    let ema_slow = calculate_ema(bars, config.ema_slow)?;
    let rsi = calculate_rsi(bars, config.rsi_period)?;
    let atr = calculate_atr(bars, config.atr_period)?;

    let mut cash = initial_capital;
    let mut open_position: Option<Position> = None;
    let mut trades: Vec<TradeRecord> = Vec::new();
    let mut equity_curve: Vec<EquityPoint> = Vec::with_capacity(bars.len());
    let mut series: Vec<AnnotatedBar> = Vec::with_capacity(bars.len());

    let last_index = bars.len() - 1;

    for (i, bar) in bars.iter().enumerate() {
        let snapshot = match (ema_fast.value_at(i), ema_slow.value_at(i)) {
            (Some(fast), Some(slow)) => Some(IndicatorSnapshot {
                close: bar.close,
                ema_fast: fast,
                ema_slow: slow,
                prev_ema_fast: if i > 0 { ema_fast.value_at(i - 1) } else { None },
                prev_ema_slow: if i > 0 { ema_slow.value_at(i - 1) } else { None },
                rsi: rsi.value_at(i),
                atr: atr.value_at(i),
                rsi_divergence: rsi_divergence(bars, &rsi, i),
                volume_divergence: volume_divergence(bars, i),
            }),
            _ => None,
        };

        let signal = snapshot
            .as_ref()
            .map(|s| score_signal(s, config))
            .unwrap_or_else(warmup_signal);

        // Exit first, and never on the entry bar.
        let started_flat = open_position.is_none();
        let exit = open_position.as_ref().and_then(|p| {
            if p.entry_date < bar.date {
                check_exit(p, bar, signal.direction)
            } else {
                None
            }
        });
        if let Some((exit_price, exit_reason)) = exit {
            if let Some(position) = open_position.take() {
                cash += position.quantity as f64 * exit_price;
                trades.push(close_trade(symbol, &position, bar.date, exit_price, exit_reason));
            }
        }

        // Entry only if the bar began flat; never on the final bar.
        if started_flat && i < last_index && signal.direction == Direction::Buy {
            if let Some(atr_value) = snapshot.as_ref().and_then(|s| s.atr) {
                let entry_price = bar.close;
                let quantity = (cash / entry_price).floor() as i64;
                if quantity > 0 && atr_value > 0.0 {
                    cash -= quantity as f64 * entry_price;
                    open_position = Some(Position {
                        entry_date: bar.date,
                        entry_price,
                        quantity,
                        stop_price: entry_price - config.atr_multiplier * atr_value,
                        take_profit_price: entry_price + config.tp_multiplier * atr_value,
                    });
                }
            }
        }

        let mark_to_market = open_position
            .as_ref()
            .map(|p| p.quantity as f64 * bar.close)
            .unwrap_or(0.0);
        equity_curve.push(EquityPoint {
            date: bar.date,
            equity: cash + mark_to_market,
        });

        series.push(AnnotatedBar {
            date: bar.date,
            close: bar.close,
            ema_fast: ema_fast.value_at(i),
            ema_slow: ema_slow.value_at(i),
            rsi: rsi.value_at(i),
            direction: signal.direction,
            score: signal.score,
        });
    }

    // Terminal state is FLAT: force-close at the last bar's close.
    if let Some(position) = open_position.take() {
        let last_bar = &bars[last_index];
        cash += position.quantity as f64 * last_bar.close;
        trades.push(close_trade(
            symbol,
            &position,
            last_bar.date,
            last_bar.close,
            ExitReason::EndOfData,
        ));
        if let Some(point) = equity_curve.last_mut() {
            point.equity = cash;
        }
    }

    let summary = PerformanceSummary::compute(initial_capital, &trades, &equity_curve);
    let final_capital = equity_curve
        .last()
        .map(|p| p.equity)
        .unwrap_or(initial_capital);

    Ok(BacktestResult {
        symbol: symbol.to_string(),
        initial_capital,
        final_capital,
        trades,
        summary,
        equity_curve,
        series,
    })
}

fn warmup_signal() -> Signal {
    Signal {
        direction: Direction::Hold,
        score: 0.0,
        ema_fast: 0.0,
        ema_slow: 0.0,
        rsi: None,
        rsi_divergence: Divergence::None,
        volume_divergence: Divergence::None,
    }
}

fn close_trade(
    symbol: &str,
    position: &Position,
    exit_date: NaiveDate,
    exit_price: f64,
    exit_reason: ExitReason,
) -> TradeRecord {
    let pnl = (exit_price - position.entry_price) * position.quantity as f64;
    let pnl_pct = (exit_price - position.entry_price) / position.entry_price * 100.0;
    let risk = position.entry_price - position.stop_price;
    let risk_reward = if risk > 0.0 {
        (position.take_profit_price - position.entry_price) / risk
    } else {
        0.0
    };

    TradeRecord {
        symbol: symbol.to_string(),
        entry_date: position.entry_date,
        entry_price: position.entry_price,
        exit_date,
        exit_price,
        quantity: position.quantity,
        pnl,
        pnl_pct,
        risk_reward,
        exit_reason,
    }
}

fn empty_result(symbol: &str, bars: &[Bar], initial_capital: f64) -> BacktestResult {
    let equity_curve: Vec<EquityPoint> = bars
        .iter()
        .map(|b| EquityPoint {
            date: b.date,
            equity: initial_capital,
        })
        .collect();
    let series: Vec<AnnotatedBar> = bars
        .iter()
        .map(|b| AnnotatedBar {
            date: b.date,
            close: b.close,
            ema_fast: None,
            ema_slow: None,
            rsi: None,
            direction: Direction::Hold,
            score: 0.0,
        })
        .collect();
    let summary = PerformanceSummary::compute(initial_capital, &[], &equity_curve);

    BacktestResult {
        symbol: symbol.to_string(),
        initial_capital,
        final_capital: initial_capital,
        trades: Vec::new(),
        summary,
        equity_curve,
        series,
    }
}
