//! Price/indicator divergence detection.
//!
//! Compares the current bar against the local price extremum of a trailing
//! window. A bullish RSI divergence is a significant lower low in price while
//! RSI holds a higher low; bearish is the mirror image. Volume divergence
//! flags below-average volume behind a fresh extremum: a new low on fading
//! volume reads bullish (sellers exhausting), a new high on fading volume
//! reads bearish (buyers exhausting).
//!
//! Window length and the "significant extremum" tolerance are module
//! constants, not per-call parameters, so scoring stays tunable in one place.

use serde::Serialize;

use crate::domain::indicator::IndicatorSeries;
use crate::domain::ohlcv::Bar;

/// Trailing bars inspected for the local extremum.
pub const DIVERGENCE_WINDOW: usize = 14;

/// Relative margin a new extremum must clear to count as significant.
pub const EXTREMUM_TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Divergence {
    Bullish,
    Bearish,
    None,
}

/// Classify RSI divergence at bar `index`.
///
/// Returns `Divergence::None` when the window has not filled yet or RSI is
/// still warming up at either comparison point.
pub fn rsi_divergence(bars: &[Bar], rsi: &IndicatorSeries, index: usize) -> Divergence {
    if index < DIVERGENCE_WINDOW || index >= bars.len() {
        return Divergence::None;
    }
    let Some(current_rsi) = rsi.value_at(index) else {
        return Divergence::None;
    };

    let window = &bars[index - DIVERGENCE_WINDOW..index];
    let current_close = bars[index].close;

    let (low_offset, window_low) = extremum_by(window, |a, b| a < b);
    let (high_offset, window_high) = extremum_by(window, |a, b| a > b);

    if current_close < window_low * (1.0 - EXTREMUM_TOLERANCE) {
        let low_index = index - DIVERGENCE_WINDOW + low_offset;
        if let Some(rsi_at_low) = rsi.value_at(low_index) {
            if current_rsi > rsi_at_low {
                return Divergence::Bullish;
            }
        }
    }

    if current_close > window_high * (1.0 + EXTREMUM_TOLERANCE) {
        let high_index = index - DIVERGENCE_WINDOW + high_offset;
        if let Some(rsi_at_high) = rsi.value_at(high_index) {
            if current_rsi < rsi_at_high {
                return Divergence::Bearish;
            }
        }
    }

    Divergence::None
}

/// Classify volume divergence at bar `index`.
pub fn volume_divergence(bars: &[Bar], index: usize) -> Divergence {
    if index < DIVERGENCE_WINDOW || index >= bars.len() {
        return Divergence::None;
    }

    let window = &bars[index - DIVERGENCE_WINDOW..index];
    let current = &bars[index];

    let avg_volume = window.iter().map(|b| b.volume as f64).sum::<f64>() / window.len() as f64;
    if avg_volume <= 0.0 || current.volume as f64 >= avg_volume {
        return Divergence::None;
    }

    let (_, window_low) = extremum_by(window, |a, b| a < b);
    let (_, window_high) = extremum_by(window, |a, b| a > b);

    if current.close < window_low * (1.0 - EXTREMUM_TOLERANCE) {
        return Divergence::Bullish;
    }
    if current.close > window_high * (1.0 + EXTREMUM_TOLERANCE) {
        return Divergence::Bearish;
    }

    Divergence::None
}

fn extremum_by(window: &[Bar], better: impl Fn(f64, f64) -> bool) -> (usize, f64) {
    let mut best_offset = 0;
    let mut best = window[0].close;
    for (offset, bar) in window.iter().enumerate().skip(1) {
        if better(bar.close, best) {
            best = bar.close;
            best_offset = offset;
        }
    }
    (best_offset, best)
}
