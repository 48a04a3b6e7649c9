#![allow(dead_code)]

use chrono::NaiveDate;
use quantfolio::domain::error::EngineError;
pub use quantfolio::domain::ohlcv::Bar;
use quantfolio::domain::strategy::StrategyConfig;
use quantfolio::ports::data_port::PriceDataPort;
use std::collections::HashMap;

pub struct MockPriceData {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockPriceData {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl PriceDataPort for MockPriceData {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, EngineError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(EngineError::Upstream {
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) => Ok(bars
                .iter()
                .filter(|b| b.date >= start_date && b.date <= end_date)
                .cloned()
                .collect()),
            None => Err(EngineError::NoData {
                symbol: symbol.to_string(),
            }),
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn make_bar(symbol: &str, date: &str, close: f64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 10_000,
    }
}

/// Daily bars from a close series, starting 2024-01-01, range ±1 around each
/// close, constant volume.
pub fn make_bars(symbol: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            symbol: symbol.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10_000,
        })
        .collect()
}

/// Short-lookback config so tests need few bars.
pub fn fast_config() -> StrategyConfig {
    StrategyConfig {
        ema_fast: 2,
        ema_slow: 4,
        rsi_period: 3,
        rsi_lower: 5.0,
        rsi_upper: 100.0,
        score_threshold: 6.0,
        atr_period: 3,
        atr_multiplier: 2.0,
        tp_multiplier: 3.0,
        trend_filter: true,
        volatility_filter: true,
    }
}

/// Flat floor then a steady one-point-per-bar climb.
pub fn rising_closes(n: usize) -> Vec<f64> {
    let mut closes = vec![100.0; 6];
    for i in 1..=n {
        closes.push(100.0 + i as f64);
    }
    closes
}
