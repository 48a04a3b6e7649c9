//! Batch universe scanner.
//!
//! Scores many symbols against one strategy configuration, in parallel, and
//! aggregates the results by sector. Scanning never simulates: each symbol
//! gets the indicator pipeline plus one scorer pass on its final bar.
//!
//! One bad symbol never aborts the batch. Failures are collected alongside
//! the successes and excluded from every aggregate.

use rayon::prelude::*;
use serde::Serialize;

use crate::domain::error::EngineError;
use crate::domain::indicator::atr::calculate_atr;
use crate::domain::indicator::divergence::{rsi_divergence, volume_divergence};
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::ohlcv::{is_ordered, Bar};
use crate::domain::signal::{score_signal, Direction, IndicatorSnapshot, Signal};
use crate::domain::strategy::StrategyConfig;
use crate::ports::event_port::{EventSink, ScanEvent};

/// One symbol queued for scanning.
#[derive(Debug, Clone)]
pub struct ScanCandidate {
    pub symbol: String,
    pub sector: String,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub symbol: String,
    pub sector: String,
    pub signal: Signal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectorSummary {
    pub sector: String,
    pub symbols: usize,
    pub buys: usize,
    pub sells: usize,
    pub avg_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub results: Vec<ScanResult>,
    pub failures: Vec<ScanFailure>,
    pub sectors: Vec<SectorSummary>,
}

/// Score a single symbol's final bar. No simulation, no position state.
pub fn score_symbol(bars: &[Bar], config: &StrategyConfig) -> Result<Signal, EngineError> {
    config.validate()?;
    if !is_ordered(bars) {
        return Err(EngineError::Upstream {
            reason: "price series is not ordered by date".to_string(),
        });
    }
    let need = config.min_bars();
    if bars.len() < need {
        return Err(EngineError::InsufficientData {
            have: bars.len(),
            need,
        });
    }

    let ema_fast = calculate_ema(bars, config.ema_fast)?;
    let ema_slow = calculate_ema(bars, config.ema_slow)?;
    let rsi = calculate_rsi(bars, config.rsi_period)?;
    let atr = calculate_atr(bars, config.atr_period)?;

    let last = bars.len() - 1;
    let (Some(fast), Some(slow)) = (ema_fast.value_at(last), ema_slow.value_at(last)) else {
        return Err(EngineError::InsufficientData {
            have: bars.len(),
            need,
        });
    };

    let snapshot = IndicatorSnapshot {
        close: bars[last].close,
        ema_fast: fast,
        ema_slow: slow,
        prev_ema_fast: if last > 0 { ema_fast.value_at(last - 1) } else { None },
        prev_ema_slow: if last > 0 { ema_slow.value_at(last - 1) } else { None },
        rsi: rsi.value_at(last),
        atr: atr.value_at(last),
        rsi_divergence: rsi_divergence(bars, &rsi, last),
        volume_divergence: volume_divergence(bars, last),
    };

    Ok(score_signal(&snapshot, config))
}

/// Scan a universe in parallel and aggregate per sector.
///
/// Results and failures come back sorted by symbol, sector summaries by
/// sector name, so output is deterministic regardless of scheduling.
pub fn scan_universe(
    candidates: &[ScanCandidate],
    config: &StrategyConfig,
    sink: &dyn EventSink,
) -> ScanReport {
    sink.emit(ScanEvent::Started {
        total: candidates.len(),
    });

    let outcomes: Vec<Result<ScanResult, ScanFailure>> = candidates
        .par_iter()
        .map(|candidate| match score_symbol(&candidate.bars, config) {
            Ok(signal) => {
                sink.emit(ScanEvent::Scored {
                    symbol: candidate.symbol.clone(),
                    signal: signal.clone(),
                });
                Ok(ScanResult {
                    symbol: candidate.symbol.clone(),
                    sector: candidate.sector.clone(),
                    signal,
                })
            }
            Err(err) => {
                let reason = err.to_string();
                sink.emit(ScanEvent::Failed {
                    symbol: candidate.symbol.clone(),
                    reason: reason.clone(),
                });
                Err(ScanFailure {
                    symbol: candidate.symbol.clone(),
                    reason,
                })
            }
        })
        .collect();

    let mut results = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(failure) => failures.push(failure),
        }
    }
    results.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    failures.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let sectors = aggregate_sectors(&results);

    sink.emit(ScanEvent::Finished {
        scored: results.len(),
        failed: failures.len(),
    });

    ScanReport {
        results,
        failures,
        sectors,
    }
}

fn aggregate_sectors(results: &[ScanResult]) -> Vec<SectorSummary> {
    use std::collections::BTreeMap;

    // BTreeMap keeps sectors sorted by name.
    let mut by_sector: BTreeMap<&str, (usize, usize, usize, f64)> = BTreeMap::new();
    for result in results {
        let entry = by_sector
            .entry(result.sector.as_str())
            .or_insert((0, 0, 0, 0.0));
        entry.0 += 1;
        match result.signal.direction {
            Direction::Buy => entry.1 += 1,
            Direction::Sell => entry.2 += 1,
            Direction::Hold => {}
        }
        entry.3 += result.signal.score;
    }

    by_sector
        .into_iter()
        .map(|(sector, (symbols, buys, sells, score_sum))| SectorSummary {
            sector: sector.to_string(),
            symbols,
            buys,
            sells,
            avg_score: score_sum / symbols as f64,
        })
        .collect()
}
