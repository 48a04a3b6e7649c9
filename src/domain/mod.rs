//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod ohlcv;
pub mod performance;
pub mod risk;
pub mod scan;
pub mod signal;
pub mod stats;
pub mod strategy;
