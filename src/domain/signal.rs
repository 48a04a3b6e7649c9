//! Signal scoring.
//!
//! Converts one bar's indicator snapshot into a weighted buy/sell/hold
//! decision with a numeric score in [0, 10]. The scorer is stateless per
//! bar: everything it needs is in the snapshot, so re-scoring any bar in
//! isolation is deterministic and idempotent. Stop/target exits are the
//! simulator's job, never the scorer's.

use serde::Serialize;

use crate::domain::indicator::divergence::Divergence;
use crate::domain::strategy::StrategyConfig;

/// Score weight for fast EMA above slow EMA.
pub const TREND_ALIGNMENT_POINTS: f64 = 3.0;
/// Score weight for RSI inside the configured momentum zone.
pub const MOMENTUM_ZONE_POINTS: f64 = 3.0;
/// Score weight for RSI divergence (added when bullish, deducted when bearish).
pub const RSI_DIVERGENCE_POINTS: f64 = 2.0;
/// Score weight for volume divergence (added when bullish, deducted when bearish).
pub const VOLUME_DIVERGENCE_POINTS: f64 = 2.0;
/// Volatility filter cap: ATR as a fraction of close.
pub const MAX_ATR_FRACTION: f64 = 0.05;

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

/// One bar's worth of indicator state, as consumed by the scorer.
///
/// `prev_ema_*` carry the prior bar's EMA values so the bearish-crossover
/// exit condition stays a pure function of the snapshot.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub prev_ema_fast: Option<f64>,
    pub prev_ema_slow: Option<f64>,
    pub rsi: Option<f64>,
    pub atr: Option<f64>,
    pub rsi_divergence: Divergence,
    pub volume_divergence: Divergence,
}

#[derive(Debug, Clone, Serialize)]
pub struct Signal {
    pub direction: Direction,
    pub score: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub rsi: Option<f64>,
    pub rsi_divergence: Divergence,
    pub volume_divergence: Divergence,
}

/// Additive score, clamped to [0, 10]. Bars with undefined RSI earn no
/// momentum or divergence points.
pub fn compute_score(snapshot: &IndicatorSnapshot, config: &StrategyConfig) -> f64 {
    let mut score = 0.0;

    if snapshot.ema_fast > snapshot.ema_slow {
        score += TREND_ALIGNMENT_POINTS;
    }

    if let Some(rsi) = snapshot.rsi {
        if rsi >= config.rsi_lower && rsi <= config.rsi_upper {
            score += MOMENTUM_ZONE_POINTS;
        }
    }

    score += match snapshot.rsi_divergence {
        Divergence::Bullish => RSI_DIVERGENCE_POINTS,
        Divergence::Bearish => -RSI_DIVERGENCE_POINTS,
        Divergence::None => 0.0,
    };

    score += match snapshot.volume_divergence {
        Divergence::Bullish => VOLUME_DIVERGENCE_POINTS,
        Divergence::Bearish => -VOLUME_DIVERGENCE_POINTS,
        Divergence::None => 0.0,
    };

    score.clamp(SCORE_MIN, SCORE_MAX)
}

/// True when the fast EMA crossed below the slow EMA on this bar.
pub fn is_bearish_crossover(snapshot: &IndicatorSnapshot) -> bool {
    match (snapshot.prev_ema_fast, snapshot.prev_ema_slow) {
        (Some(prev_fast), Some(prev_slow)) => {
            prev_fast >= prev_slow && snapshot.ema_fast < snapshot.ema_slow
        }
        _ => false,
    }
}

fn passes_trend_filter(snapshot: &IndicatorSnapshot, config: &StrategyConfig) -> bool {
    !config.trend_filter || snapshot.close > snapshot.ema_slow
}

fn passes_volatility_filter(snapshot: &IndicatorSnapshot, config: &StrategyConfig) -> bool {
    if !config.volatility_filter {
        return true;
    }
    match snapshot.atr {
        Some(atr) if snapshot.close > 0.0 => atr / snapshot.close <= MAX_ATR_FRACTION,
        _ => false,
    }
}

/// Score one bar.
pub fn score_signal(snapshot: &IndicatorSnapshot, config: &StrategyConfig) -> Signal {
    let score = compute_score(snapshot, config);

    let direction = if is_bearish_crossover(snapshot) {
        Direction::Sell
    } else if score >= config.score_threshold
        && passes_trend_filter(snapshot, config)
        && passes_volatility_filter(snapshot, config)
    {
        Direction::Buy
    } else {
        Direction::Hold
    };

    Signal {
        direction,
        score,
        ema_fast: snapshot.ema_fast,
        ema_slow: snapshot.ema_slow,
        rsi: snapshot.rsi,
        rsi_divergence: snapshot.rsi_divergence,
        volume_divergence: snapshot.volume_divergence,
    }
}
