//! Config loading and validation.
//!
//! Builds validated domain structs from any [`ConfigPort`] before a run
//! starts. Missing keys with sensible defaults fall back silently; keys that
//! are present but out of range fail fast with `ConfigInvalid`.

use chrono::NaiveDate;

use crate::domain::error::EngineError;
use crate::domain::strategy::StrategyConfig;
use crate::ports::config_port::ConfigPort;

/// Run-level settings from the `[backtest]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSettings {
    pub initial_capital: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub symbols: Vec<String>,
}

/// Build a [`StrategyConfig`] from the `[strategy]` section. Absent keys
/// take the default profile's values.
pub fn load_strategy_config(config: &dyn ConfigPort) -> Result<StrategyConfig, EngineError> {
    let defaults = StrategyConfig::default();

    let strategy = StrategyConfig {
        ema_fast: read_period(config, "ema_fast", defaults.ema_fast)?,
        ema_slow: read_period(config, "ema_slow", defaults.ema_slow)?,
        rsi_period: read_period(config, "rsi_period", defaults.rsi_period)?,
        rsi_lower: config.get_double("strategy", "rsi_lower", defaults.rsi_lower),
        rsi_upper: config.get_double("strategy", "rsi_upper", defaults.rsi_upper),
        score_threshold: config.get_double("strategy", "score_threshold", defaults.score_threshold),
        atr_period: read_period(config, "atr_period", defaults.atr_period)?,
        atr_multiplier: config.get_double("strategy", "atr_multiplier", defaults.atr_multiplier),
        tp_multiplier: config.get_double("strategy", "tp_multiplier", defaults.tp_multiplier),
        trend_filter: config.get_bool("strategy", "trend_filter", defaults.trend_filter),
        volatility_filter: config.get_bool(
            "strategy",
            "volatility_filter",
            defaults.volatility_filter,
        ),
    };

    // Re-key validation failures to the config section they came from.
    strategy.validate().map_err(|err| match err {
        EngineError::InvalidConfig { field, reason } => EngineError::ConfigInvalid {
            section: "strategy".to_string(),
            key: field,
            reason,
        },
        other => other,
    })?;

    Ok(strategy)
}

/// Build [`BacktestSettings`] from the `[backtest]` section.
pub fn load_backtest_settings(config: &dyn ConfigPort) -> Result<BacktestSettings, EngineError> {
    let initial_capital = config.get_double("backtest", "initial_capital", 0.0);
    if initial_capital <= 0.0 {
        return Err(EngineError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_capital".to_string(),
            reason: "initial_capital must be positive".to_string(),
        });
    }

    let start_date = parse_date(config.get_string("backtest", "start_date"), "start_date")?;
    let end_date = parse_date(config.get_string("backtest", "end_date"), "end_date")?;
    if start_date >= end_date {
        return Err(EngineError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must be before end_date".to_string(),
        });
    }

    let symbols = match (
        config.get_string("backtest", "symbols"),
        config.get_string("backtest", "symbol"),
    ) {
        (Some(list), _) if !list.trim().is_empty() => parse_symbols(&list),
        (None, Some(one)) if !one.trim().is_empty() => parse_symbols(&one),
        _ => {
            return Err(EngineError::ConfigMissing {
                section: "backtest".to_string(),
                key: "symbols".to_string(),
            });
        }
    };

    Ok(BacktestSettings {
        initial_capital,
        start_date,
        end_date,
        symbols,
    })
}

/// Split a comma-separated symbol list: trimmed, uppercased, de-duplicated,
/// original order preserved.
pub fn parse_symbols(list: &str) -> Vec<String> {
    let mut symbols = Vec::new();
    for raw in list.split(',') {
        let symbol = raw.trim().to_uppercase();
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

fn read_period(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, EngineError> {
    let value = config.get_int("strategy", key, default as i64);
    if value < 1 {
        return Err(EngineError::ConfigInvalid {
            section: "strategy".to_string(),
            key: key.to_string(),
            reason: "must be a positive integer".to_string(),
        });
    }
    Ok(value as usize)
}

fn parse_date(value: Option<String>, key: &str) -> Result<NaiveDate, EngineError> {
    match value {
        None => Err(EngineError::ConfigMissing {
            section: "backtest".to_string(),
            key: key.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| {
            EngineError::ConfigInvalid {
                section: "backtest".to_string(),
                key: key.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", key),
            }
        }),
    }
}
