//! Data access port traits.
//!
//! Providers surface failures as errors (`NoData`, `Upstream`); they never
//! substitute stale or partial data silently.

use chrono::NaiveDate;

use crate::domain::error::EngineError;
use crate::domain::ohlcv::Bar;
use crate::domain::risk::Holding;

pub trait PriceDataPort {
    /// Daily bars for `symbol` within `[start_date, end_date]`, ordered
    /// ascending by date.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, EngineError>;

    fn list_symbols(&self) -> Result<Vec<String>, EngineError>;
}

pub trait HoldingsPort {
    fn fetch_holdings(&self) -> Result<Vec<Holding>, EngineError>;
}
