//! Average True Range with Wilder's smoothing.
//!
//! TR = max(high-low, |high-prev_close|, |low-prev_close|); the first bar's
//! TR is high-low. Seed = mean of the first n TRs, then
//! ATR[i] = (ATR[i-1]*(n-1) + TR[i]) / n. First (n-1) points are warmup.

use crate::domain::error::EngineError;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

pub fn calculate_atr(bars: &[Bar], period: usize) -> Result<IndicatorSeries, EngineError> {
    if period == 0 {
        return Err(EngineError::invalid_config("atr period", "must be positive"));
    }
    if bars.len() < period {
        return Err(EngineError::InsufficientData {
            have: bars.len(),
            need: period,
        });
    }

    let mut tr_values = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let tr = if i == 0 {
            bar.high - bar.low
        } else {
            bar.true_range(bars[i - 1].close)
        };
        tr_values.push(tr);
    }

    let mut values: Vec<IndicatorPoint> = Vec::with_capacity(bars.len());
    let mut atr = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i < period - 1 {
            values.push(IndicatorPoint {
                date: bar.date,
                valid: false,
                value: 0.0,
            });
        } else if i == period - 1 {
            atr = tr_values[..period].iter().sum::<f64>() / period as f64;
            values.push(IndicatorPoint {
                date: bar.date,
                valid: true,
                value: atr,
            });
        } else {
            atr = (atr * (period - 1) as f64 + tr_values[i]) / period as f64;
            values.push(IndicatorPoint {
                date: bar.date,
                valid: true,
                value: atr,
            });
        }
    }

    Ok(IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(day: u32, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            symbol: "TEST".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn atr_constant_range() {
        // Every bar has range 2.0 and closes mid-range → TR = 2.0 throughout.
        let bars: Vec<Bar> = (1..=10)
            .map(|d| make_bar(d, 101.0, 99.0, 100.0))
            .collect();
        let series = calculate_atr(&bars, 3).unwrap();

        for point in series.values.iter().filter(|p| p.valid) {
            assert!((point.value - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn atr_warmup() {
        let bars: Vec<Bar> = (1..=5).map(|d| make_bar(d, 101.0, 99.0, 100.0)).collect();
        let series = calculate_atr(&bars, 3).unwrap();

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
    }

    #[test]
    fn atr_seed_is_mean_of_true_ranges() {
        let bars = vec![
            make_bar(1, 102.0, 98.0, 100.0),  // TR = 4
            make_bar(2, 103.0, 99.0, 101.0),  // TR = max(4, 3, 1) = 4
            make_bar(3, 105.0, 100.0, 104.0), // TR = max(5, 4, 1) = 5
        ];
        let series = calculate_atr(&bars, 3).unwrap();
        let expected = (4.0 + 4.0 + 5.0) / 3.0;
        assert!((series.values[2].value - expected).abs() < 1e-9);
    }

    #[test]
    fn atr_gap_increases_true_range() {
        let bars = vec![
            make_bar(1, 101.0, 99.0, 100.0),
            make_bar(2, 111.0, 109.0, 110.0), // gap up: TR = |111-100| = 11
        ];
        let series = calculate_atr(&bars, 2).unwrap();
        let expected = (2.0 + 11.0) / 2.0;
        assert!((series.values[1].value - expected).abs() < 1e-9);
    }

    #[test]
    fn atr_too_few_bars_is_insufficient_data() {
        let bars = vec![make_bar(1, 101.0, 99.0, 100.0)];
        assert!(matches!(
            calculate_atr(&bars, 3).unwrap_err(),
            EngineError::InsufficientData { have: 1, need: 3 }
        ));
    }
}
