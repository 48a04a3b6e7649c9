//! CSV file data adapter.
//!
//! Price history lives as one `SYMBOL.csv` per symbol under a base
//! directory, columns `date,open,high,low,close,volume` with ISO dates.
//! Holdings are a single CSV with columns `symbol,quantity,avg_price,type`.

use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

use crate::domain::error::EngineError;
use crate::domain::ohlcv::Bar;
use crate::domain::risk::Holding;
use crate::ports::data_port::{HoldingsPort, PriceDataPort};

pub struct CsvDataAdapter {
    base_path: PathBuf,
}

impl CsvDataAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn field<'a>(
    record: &'a csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<&'a str, EngineError> {
    record.get(index).ok_or_else(|| EngineError::Upstream {
        reason: format!("missing {} column", name),
    })
}

fn parse_field<T: std::str::FromStr>(value: &str, name: &str) -> Result<T, EngineError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| EngineError::Upstream {
        reason: format!("invalid {} value: {}", name, e),
    })
}

impl PriceDataPort for CsvDataAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, EngineError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Err(EngineError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let content = fs::read_to_string(&path)?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| EngineError::Upstream {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date_str = field(&record, 0, "date")?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                EngineError::Upstream {
                    reason: format!("invalid date format: {}", e),
                }
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            bars.push(Bar {
                symbol: symbol.to_string(),
                date,
                open: parse_field(field(&record, 1, "open")?, "open")?,
                high: parse_field(field(&record, 2, "high")?, "high")?,
                low: parse_field(field(&record, 3, "low")?, "low")?,
                close: parse_field(field(&record, 4, "close")?, "close")?,
                volume: parse_field(field(&record, 5, "volume")?, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        let entries = fs::read_dir(&self.base_path)?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

/// Holdings reader over one CSV file.
pub struct CsvHoldingsAdapter {
    path: PathBuf,
}

impl CsvHoldingsAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl HoldingsPort for CsvHoldingsAdapter {
    fn fetch_holdings(&self) -> Result<Vec<Holding>, EngineError> {
        let content = fs::read_to_string(&self.path)?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut holdings = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| EngineError::Upstream {
                reason: format!("CSV parse error in {}: {}", self.path.display(), e),
            })?;

            holdings.push(Holding {
                symbol: field(&record, 0, "symbol")?.trim().to_uppercase(),
                quantity: parse_field(field(&record, 1, "quantity")?, "quantity")?,
                avg_price: parse_field(field(&record, 2, "avg_price")?, "avg_price")?,
                asset_type: record.get(3).unwrap_or("stock").trim().to_string(),
            });
        }

        Ok(holdings)
    }
}
