//! Performance statistics over one backtest run.
//!
//! Pure reduction of a trade ledger and the equity curve produced by the
//! same run. Statistics that could divide by zero resolve to documented
//! sentinels: `win_rate = 0` with no trades, `profit_factor = RATIO_CAP`
//! with wins but no losses, `sharpe_ratio = 0` with zero return variance.

use serde::Serialize;

use crate::domain::backtest::{EquityPoint, TradeRecord};
use crate::domain::stats::{self, TRADING_DAYS_PER_YEAR};

/// Sentinel for ratios whose denominator is legitimately zero (no losing
/// trades, no downside bars). A finite cap keeps serialized results
/// comparable, unlike +inf.
pub const RATIO_CAP: f64 = 9999.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub expectancy: f64,
}

impl PerformanceSummary {
    pub fn compute(
        initial_capital: f64,
        trades: &[TradeRecord],
        equity_curve: &[EquityPoint],
    ) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital
        } else {
            0.0
        };

        let bars = equity_curve.len() as f64;
        let years = bars / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let equity_values: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let returns = stats::simple_returns(&equity_values);
        let sharpe_ratio = sharpe(&returns);
        let max_drawdown = stats::max_drawdown(&equity_values);

        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;

        for trade in trades {
            if trade.pnl > 0.0 {
                winning_trades += 1;
                total_wins += trade.pnl;
            } else if trade.pnl < 0.0 {
                losing_trades += 1;
                total_losses += trade.pnl.abs();
            }
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            RATIO_CAP
        } else {
            0.0
        };

        let avg_win = if winning_trades > 0 {
            total_wins / winning_trades as f64
        } else {
            0.0
        };
        let avg_loss = if losing_trades > 0 {
            total_losses / losing_trades as f64
        } else {
            0.0
        };

        let expectancy = if total_trades > 0 {
            win_rate * avg_win - (1.0 - win_rate) * avg_loss
        } else {
            0.0
        };

        PerformanceSummary {
            total_return,
            annualized_return,
            sharpe_ratio,
            max_drawdown,
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            expectancy,
        }
    }
}

/// Annualized Sharpe ratio of a per-bar return series. 0.0 when the series
/// is too short or has zero variance.
pub fn sharpe(returns: &[f64]) -> f64 {
    let sd = stats::std_dev(returns);
    if sd == 0.0 {
        return 0.0;
    }
    stats::mean(returns) / sd * TRADING_DAYS_PER_YEAR.sqrt()
}
