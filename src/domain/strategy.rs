//! Validated strategy configuration.
//!
//! A `StrategyConfig` is constructed once per backtest or scan request and
//! never mutated after simulation starts. All field constraints are enforced
//! by [`StrategyConfig::validate`], so a config held by the simulator is
//! known-good.

use serde::Serialize;

use crate::domain::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyConfig {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub rsi_lower: f64,
    pub rsi_upper: f64,
    pub score_threshold: f64,
    pub atr_period: usize,
    pub atr_multiplier: f64,
    pub tp_multiplier: f64,
    pub trend_filter: bool,
    pub volatility_filter: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            ema_fast: 12,
            ema_slow: 26,
            rsi_period: 14,
            rsi_lower: 30.0,
            rsi_upper: 70.0,
            score_threshold: 6.0,
            atr_period: 14,
            atr_multiplier: 2.0,
            tp_multiplier: 3.0,
            trend_filter: true,
            volatility_filter: true,
        }
    }
}

impl StrategyConfig {
    /// Reject any configuration the simulator cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.ema_fast == 0 {
            return Err(EngineError::invalid_config("ema_fast", "must be positive"));
        }
        if self.ema_fast >= self.ema_slow {
            return Err(EngineError::invalid_config(
                "ema_fast",
                format!("must be less than ema_slow ({})", self.ema_slow),
            ));
        }
        if self.rsi_period == 0 {
            return Err(EngineError::invalid_config("rsi_period", "must be positive"));
        }
        if self.rsi_lower >= self.rsi_upper {
            return Err(EngineError::invalid_config(
                "rsi_lower",
                format!("must be less than rsi_upper ({})", self.rsi_upper),
            ));
        }
        if !(0.0..=100.0).contains(&self.rsi_lower) || !(0.0..=100.0).contains(&self.rsi_upper) {
            return Err(EngineError::invalid_config(
                "rsi_lower",
                "rsi bounds must lie within [0, 100]",
            ));
        }
        if !(0.0..=10.0).contains(&self.score_threshold) {
            return Err(EngineError::invalid_config(
                "score_threshold",
                "must lie within [0, 10]",
            ));
        }
        if self.atr_period == 0 {
            return Err(EngineError::invalid_config("atr_period", "must be positive"));
        }
        if self.atr_multiplier <= 0.0 {
            return Err(EngineError::invalid_config(
                "atr_multiplier",
                "must be positive",
            ));
        }
        if self.tp_multiplier <= 0.0 {
            return Err(EngineError::invalid_config(
                "tp_multiplier",
                "must be positive",
            ));
        }
        Ok(())
    }

    /// Number of leading bars consumed before every indicator is live.
    ///
    /// RSI needs `period + 1` bars (one extra close for the first change).
    pub fn min_bars(&self) -> usize {
        self.ema_slow.max(self.rsi_period + 1).max(self.atr_period)
    }
}
