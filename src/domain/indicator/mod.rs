//! Technical indicator library.
//!
//! Pure functions over an ordered [`Bar`](crate::domain::ohlcv::Bar) slice.
//! Each indicator returns an [`IndicatorSeries`] aligned 1:1 with the input
//! bars; warmup points are marked `valid: false` and must never be scored or
//! plotted as real values. A series shorter than the requested period is an
//! `InsufficientData` error, which callers treat as "no signal yet" for the
//! affected bars rather than as fatal.

pub mod atr;
pub mod divergence;
pub mod ema;
pub mod rsi;

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ema(usize),
    Rsi(usize),
    Atr(usize),
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Value at bar index `i`, or `None` during warmup / out of range.
    pub fn value_at(&self, i: usize) -> Option<f64> {
        self.values
            .get(i)
            .filter(|p| p.valid)
            .map(|p| p.value)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
        }
    }
}
