//! Relative Strength Index with Wilder's smoothing.
//!
//! - First average gain/loss: simple mean over the first n price changes.
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//! - RSI = 100 - (100 / (1 + avg_gain / avg_loss)); avg_loss == 0 → RSI = 100.
//!
//! The first n points are warmup: RSI is undefined there, represented as
//! `valid: false`, never as a real RSI of zero.

use crate::domain::error::EngineError;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

pub fn calculate_rsi(bars: &[Bar], period: usize) -> Result<IndicatorSeries, EngineError> {
    if period == 0 {
        return Err(EngineError::invalid_config("rsi period", "must be positive"));
    }
    // One extra bar for the first close-to-close change.
    if bars.len() < period + 1 {
        return Err(EngineError::InsufficientData {
            have: bars.len(),
            need: period + 1,
        });
    }

    let mut values = Vec::with_capacity(bars.len());
    values.push(IndicatorPoint {
        date: bars[0].date,
        valid: false,
        value: 0.0,
    });

    let changes: Vec<f64> = bars.windows(2).map(|w| w[1].close - w[0].close).collect();

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, bar) in bars.iter().enumerate().skip(1) {
        let change_idx = i - 1;
        let gain = changes[change_idx].max(0.0);
        let loss = (-changes[change_idx]).max(0.0);

        if change_idx < period - 1 {
            values.push(IndicatorPoint {
                date: bar.date,
                valid: false,
                value: 0.0,
            });
        } else if change_idx == period - 1 {
            avg_gain = changes[..period].iter().map(|c| c.max(0.0)).sum::<f64>() / period as f64;
            avg_loss = changes[..period].iter().map(|c| (-c).max(0.0)).sum::<f64>() / period as f64;
            values.push(IndicatorPoint {
                date: bar.date,
                valid: true,
                value: rsi_from_averages(avg_gain, avg_loss),
            });
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
            values.push(IndicatorPoint {
                date: bar.date,
                valid: true,
                value: rsi_from_averages(avg_gain, avg_loss),
            });
        }
    }

    Ok(IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    })
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
