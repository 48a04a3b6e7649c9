//! Portfolio risk engine.
//!
//! Computes portfolio-level and per-asset risk analytics from current
//! holdings plus aligned daily return histories. VaR and CVaR are
//! parametric-normal, fitted to the observed mean and standard deviation of
//! the portfolio return series; this is not a historical simulation.
//!
//! Degenerate inputs (fewer than two aligned observations, zero variance)
//! resolve to zeros and documented sentinels, never NaN and never a panic.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::domain::error::EngineError;
use crate::domain::performance::RATIO_CAP;
use crate::domain::stats::{self, TRADING_DAYS_PER_YEAR};

/// One-sided normal quantile at 95% confidence.
pub const Z_95: f64 = 1.6449;
/// One-sided normal quantile at 99% confidence.
pub const Z_99: f64 = 2.3263;

/// A position as reported by the holdings source.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub symbol: String,
    pub quantity: f64,
    pub avg_price: f64,
    pub asset_type: String,
}

/// Aligned daily simple-return history plus the latest known price for one
/// asset. Series are truncated to the shortest common length before any
/// cross-asset statistic is computed.
#[derive(Debug, Clone)]
pub struct AssetHistory {
    pub returns: Vec<f64>,
    pub latest_price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioRiskMetrics {
    pub total_value: f64,
    pub daily_return: f64,
    pub annualized_return: f64,
    pub daily_volatility: f64,
    pub annualized_volatility: f64,
    pub var_95: f64,
    pub var_99: f64,
    pub cvar_95: f64,
    pub cvar_99: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub max_drawdown: f64,
    pub beta: f64,
    pub alpha: f64,
    pub benchmark_correlation: f64,
    pub concentration: f64,
    pub diversification_ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetRiskMetrics {
    pub symbol: String,
    pub weight: f64,
    pub component_var: f64,
    pub annualized_volatility: f64,
    pub beta: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub unrealized_pnl: f64,
}

/// Pairwise Pearson correlations over the aligned return series. Symmetric
/// with a unit diagonal; a single holding yields `[[1.0]]`.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub symbols: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskAnalytics {
    pub portfolio: PortfolioRiskMetrics,
    pub assets: Vec<AssetRiskMetrics>,
    pub correlations: CorrelationMatrix,
}

/// Normal density at `z`.
fn phi(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Parametric VaR at confidence `z`, as a non-negative currency amount.
fn parametric_var(mean: f64, sd: f64, z: f64, value: f64) -> f64 {
    (-(mean - z * sd) * value).max(0.0)
}

/// Parametric CVaR (expected shortfall beyond the cutoff), non-negative.
fn parametric_cvar(mean: f64, sd: f64, z: f64, confidence: f64, value: f64) -> f64 {
    let tail_mean = mean - sd * phi(z) / (1.0 - confidence);
    (-tail_mean * value).max(0.0)
}

/// Compute the full analytics bundle for a set of holdings.
///
/// `history` must contain an entry for every holding symbol; a missing entry
/// is a `NoData` error. Holdings must be unique by symbol. `benchmark_returns`, when present, drives beta,
/// alpha and benchmark correlation; without it those three are 0.0.
pub fn compute_risk_analytics(
    holdings: &[Holding],
    history: &HashMap<String, AssetHistory>,
    benchmark_returns: Option<&[f64]>,
) -> Result<RiskAnalytics, EngineError> {
    if holdings.is_empty() {
        return Err(EngineError::invalid_config(
            "holdings",
            "at least one holding is required",
        ));
    }

    let mut seen = HashSet::new();
    for holding in holdings {
        if !history.contains_key(&holding.symbol) {
            return Err(EngineError::NoData {
                symbol: holding.symbol.clone(),
            });
        }
        if holding.quantity <= 0.0 {
            return Err(EngineError::invalid_config(
                "quantity",
                "holding quantities must be positive",
            ));
        }
        // A repeated symbol would double-weight the position and duplicate
        // correlation-matrix rows.
        if !seen.insert(holding.symbol.as_str()) {
            return Err(EngineError::invalid_config(
                "holdings",
                format!("duplicate holding symbol {}", holding.symbol),
            ));
        }
    }

    // Align every series (including the benchmark) to the shortest length,
    // keeping the most recent observations.
    let mut common_len = holdings
        .iter()
        .filter_map(|h| history.get(&h.symbol))
        .map(|h| h.returns.len())
        .min()
        .unwrap_or(0);
    if let Some(bench) = benchmark_returns {
        common_len = common_len.min(bench.len());
    }

    let aligned: Vec<&[f64]> = holdings
        .iter()
        .filter_map(|h| history.get(&h.symbol))
        .map(|h| &h.returns[h.returns.len() - common_len..])
        .collect();
    let bench: Option<&[f64]> =
        benchmark_returns.map(|b| &b[b.len() - common_len..]);

    // Weights from current market value.
    let values: Vec<f64> = holdings
        .iter()
        .map(|h| {
            let price = history
                .get(&h.symbol)
                .map(|a| a.latest_price)
                .unwrap_or(h.avg_price);
            h.quantity * price
        })
        .collect();
    let total_value: f64 = values.iter().sum();
    let weights: Vec<f64> = if total_value > 0.0 {
        values.iter().map(|v| v / total_value).collect()
    } else {
        vec![0.0; values.len()]
    };

    // Portfolio return per bar is the weighted sum of asset returns.
    let portfolio_returns: Vec<f64> = (0..common_len)
        .map(|t| {
            aligned
                .iter()
                .zip(&weights)
                .map(|(series, w)| w * series[t])
                .sum()
        })
        .collect();

    let mean = stats::mean(&portfolio_returns);
    let sd = stats::std_dev(&portfolio_returns);

    let annualized_return = mean * TRADING_DAYS_PER_YEAR;
    let annualized_volatility = sd * TRADING_DAYS_PER_YEAR.sqrt();

    let var_95 = parametric_var(mean, sd, Z_95, total_value);
    let var_99 = parametric_var(mean, sd, Z_99, total_value);
    let cvar_95 = parametric_cvar(mean, sd, Z_95, 0.95, total_value);
    let cvar_99 = parametric_cvar(mean, sd, Z_99, 0.99, total_value);

    let sharpe_ratio = if sd > 0.0 {
        mean / sd * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside = stats::downside_deviation(&portfolio_returns);
    let sortino_ratio = if downside > 0.0 {
        mean / downside * TRADING_DAYS_PER_YEAR.sqrt()
    } else if annualized_return > 0.0 {
        RATIO_CAP
    } else {
        0.0
    };

    let max_drawdown = stats::max_drawdown_from_returns(&portfolio_returns);
    let calmar_ratio = if max_drawdown > 0.0 {
        annualized_return / max_drawdown
    } else if annualized_return > 0.0 {
        RATIO_CAP
    } else {
        0.0
    };

    let (beta, alpha, benchmark_correlation) = match bench {
        Some(bench) if common_len >= 2 => {
            let bench_var = stats::std_dev(bench).powi(2);
            let beta = if bench_var > 0.0 {
                stats::covariance(&portfolio_returns, bench) / bench_var
            } else {
                0.0
            };
            let alpha =
                annualized_return - beta * stats::mean(bench) * TRADING_DAYS_PER_YEAR;
            let correlation = stats::correlation(&portfolio_returns, bench);
            (beta, alpha, correlation)
        }
        _ => (0.0, 0.0, 0.0),
    };

    let concentration: f64 = weights.iter().map(|w| w * w).sum();

    let asset_sds: Vec<f64> = aligned.iter().map(|s| stats::std_dev(s)).collect();
    let weighted_sd: f64 = weights.iter().zip(&asset_sds).map(|(w, s)| w * s).sum();
    let diversification_ratio = if sd > 0.0 && holdings.len() > 1 {
        weighted_sd / sd
    } else {
        1.0
    };

    let assets = holdings
        .iter()
        .enumerate()
        .map(|(i, holding)| {
            let series = aligned[i];
            let asset_sd = asset_sds[i];
            let asset_mean = stats::mean(series);

            let correlation_to_portfolio = stats::correlation(series, &portfolio_returns);
            let component_var = if sd > 0.0 {
                var_95 * weights[i] * correlation_to_portfolio * asset_sd / sd
            } else {
                0.0
            };

            let asset_beta = match bench {
                Some(bench) => {
                    let bench_var = stats::std_dev(bench).powi(2);
                    if bench_var > 0.0 {
                        stats::covariance(series, bench) / bench_var
                    } else {
                        0.0
                    }
                }
                None => 0.0,
            };

            let asset_sharpe = if asset_sd > 0.0 {
                asset_mean / asset_sd * TRADING_DAYS_PER_YEAR.sqrt()
            } else {
                0.0
            };

            let latest_price = history
                .get(&holding.symbol)
                .map(|a| a.latest_price)
                .unwrap_or(holding.avg_price);

            AssetRiskMetrics {
                symbol: holding.symbol.clone(),
                weight: weights[i],
                component_var,
                annualized_volatility: asset_sd * TRADING_DAYS_PER_YEAR.sqrt(),
                beta: asset_beta,
                sharpe_ratio: asset_sharpe,
                max_drawdown: stats::max_drawdown_from_returns(series),
                unrealized_pnl: (latest_price - holding.avg_price) * holding.quantity,
            }
        })
        .collect();

    let correlations = correlation_matrix(holdings, &aligned);

    let portfolio = PortfolioRiskMetrics {
        total_value,
        daily_return: mean,
        annualized_return,
        daily_volatility: sd,
        annualized_volatility,
        var_95,
        var_99,
        cvar_95,
        cvar_99,
        sharpe_ratio,
        sortino_ratio,
        calmar_ratio,
        max_drawdown,
        beta,
        alpha,
        benchmark_correlation,
        concentration,
        diversification_ratio,
    };

    Ok(RiskAnalytics {
        portfolio,
        assets,
        correlations,
    })
}

fn correlation_matrix(holdings: &[Holding], aligned: &[&[f64]]) -> CorrelationMatrix {
    let n = holdings.len();
    let mut values = vec![vec![0.0; n]; n];
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let c = stats::correlation(aligned[i], aligned[j]);
            values[i][j] = c;
            values[j][i] = c;
        }
    }
    CorrelationMatrix {
        symbols: holdings.iter().map(|h| h.symbol.clone()).collect(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn holding(symbol: &str, quantity: f64, avg_price: f64) -> Holding {
        Holding {
            symbol: symbol.to_string(),
            quantity,
            avg_price,
            asset_type: "stock".to_string(),
        }
    }

    fn history(returns: Vec<f64>, latest_price: f64) -> AssetHistory {
        AssetHistory {
            returns,
            latest_price,
        }
    }

    fn two_asset_fixture() -> (Vec<Holding>, HashMap<String, AssetHistory>) {
        let holdings = vec![holding("AAA", 10.0, 100.0), holding("BBB", 5.0, 200.0)];
        let mut map = HashMap::new();
        map.insert(
            "AAA".to_string(),
            history(vec![0.01, -0.02, 0.015, 0.005, -0.01, 0.02], 110.0),
        );
        map.insert(
            "BBB".to_string(),
            history(vec![-0.005, 0.01, -0.01, 0.02, 0.005, -0.015], 190.0),
        );
        (holdings, map)
    }

    #[test]
    fn missing_history_is_no_data() {
        let holdings = vec![holding("GONE", 1.0, 50.0)];
        let map = HashMap::new();
        assert!(matches!(
            compute_risk_analytics(&holdings, &map, None).unwrap_err(),
            EngineError::NoData { .. }
        ));
    }

    #[test]
    fn empty_holdings_rejected() {
        let map = HashMap::new();
        assert!(compute_risk_analytics(&[], &map, None).is_err());
    }

    #[test]
    fn duplicate_holding_symbols_rejected() {
        let (mut holdings, map) = two_asset_fixture();
        holdings.push(holding("AAA", 3.0, 105.0));
        assert!(matches!(
            compute_risk_analytics(&holdings, &map, None).unwrap_err(),
            EngineError::InvalidConfig { ref field, .. } if field == "holdings"
        ));
    }

    #[test]
    fn weights_sum_to_one() {
        let (holdings, map) = two_asset_fixture();
        let analytics = compute_risk_analytics(&holdings, &map, None).unwrap();
        let weight_sum: f64 = analytics.assets.iter().map(|a| a.weight).sum();
        assert_relative_eq!(weight_sum, 1.0, epsilon = 1e-12);

        // 10 × 110 = 1100, 5 × 190 = 950
        assert_relative_eq!(analytics.portfolio.total_value, 2050.0);
        assert_relative_eq!(analytics.assets[0].weight, 1100.0 / 2050.0, epsilon = 1e-12);
    }

    #[test]
    fn var_99_dominates_var_95() {
        let (holdings, map) = two_asset_fixture();
        let analytics = compute_risk_analytics(&holdings, &map, None).unwrap();
        assert!(analytics.portfolio.var_99 >= analytics.portfolio.var_95);
        assert!(analytics.portfolio.var_95 >= 0.0);
    }

    #[test]
    fn cvar_dominates_var_at_same_confidence() {
        let (holdings, map) = two_asset_fixture();
        let analytics = compute_risk_analytics(&holdings, &map, None).unwrap();
        // Expected shortfall beyond the cutoff is at least the cutoff loss.
        assert!(analytics.portfolio.cvar_95 >= analytics.portfolio.var_95);
        assert!(analytics.portfolio.cvar_99 >= analytics.portfolio.var_99);
    }

    #[test]
    fn correlation_matrix_symmetric_unit_diagonal() {
        let (holdings, map) = two_asset_fixture();
        let analytics = compute_risk_analytics(&holdings, &map, None).unwrap();
        let m = &analytics.correlations;

        assert_eq!(m.symbols.len(), 2);
        for i in 0..2 {
            assert_relative_eq!(m.values[i][i], 1.0);
            for j in 0..2 {
                assert_relative_eq!(m.values[i][j], m.values[j][i]);
                assert!(m.values[i][j] >= -1.0 && m.values[i][j] <= 1.0);
            }
        }
    }

    #[test]
    fn single_holding_matrix_is_unit() {
        let holdings = vec![holding("AAA", 10.0, 100.0)];
        let mut map = HashMap::new();
        map.insert(
            "AAA".to_string(),
            history(vec![0.01, -0.01, 0.02, 0.0], 105.0),
        );
        let analytics = compute_risk_analytics(&holdings, &map, None).unwrap();

        assert_eq!(analytics.correlations.values, vec![vec![1.0]]);
        assert_relative_eq!(analytics.portfolio.concentration, 1.0);
        assert_relative_eq!(analytics.portfolio.diversification_ratio, 1.0);
    }

    #[test]
    fn zero_variance_single_holding_degrades_to_sentinels() {
        let holdings = vec![holding("FLAT", 10.0, 100.0)];
        let mut map = HashMap::new();
        map.insert("FLAT".to_string(), history(vec![0.0; 10], 100.0));
        let analytics = compute_risk_analytics(&holdings, &map, None).unwrap();

        let p = &analytics.portfolio;
        assert_eq!(p.daily_volatility, 0.0);
        assert_eq!(p.annualized_volatility, 0.0);
        assert_eq!(p.sharpe_ratio, 0.0);
        assert_eq!(p.sortino_ratio, 0.0);
        assert_eq!(p.var_95, 0.0);
        assert_relative_eq!(p.concentration, 1.0);
    }

    #[test]
    fn short_history_yields_zeroed_metrics_not_panic() {
        let holdings = vec![holding("AAA", 10.0, 100.0)];
        let mut map = HashMap::new();
        map.insert("AAA".to_string(), history(vec![0.01], 101.0));
        let analytics = compute_risk_analytics(&holdings, &map, None).unwrap();

        assert_eq!(analytics.portfolio.daily_volatility, 0.0);
        assert_eq!(analytics.portfolio.sharpe_ratio, 0.0);
    }

    #[test]
    fn beta_against_identical_benchmark_is_one() {
        let returns = vec![0.01, -0.02, 0.015, 0.005, -0.01, 0.02];
        let holdings = vec![holding("AAA", 10.0, 100.0)];
        let mut map = HashMap::new();
        map.insert("AAA".to_string(), history(returns.clone(), 110.0));

        let analytics = compute_risk_analytics(&holdings, &map, Some(&returns)).unwrap();
        assert_relative_eq!(analytics.portfolio.beta, 1.0, epsilon = 1e-9);
        assert_relative_eq!(
            analytics.portfolio.benchmark_correlation,
            1.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(analytics.portfolio.alpha, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_variance_benchmark_gives_zero_beta() {
        let (holdings, map) = two_asset_fixture();
        let bench = vec![0.0; 6];
        let analytics = compute_risk_analytics(&holdings, &map, Some(&bench)).unwrap();
        assert_eq!(analytics.portfolio.beta, 0.0);
        assert_eq!(analytics.portfolio.benchmark_correlation, 0.0);
    }

    #[test]
    fn series_aligned_to_shortest() {
        let holdings = vec![holding("AAA", 10.0, 100.0), holding("BBB", 5.0, 200.0)];
        let mut map = HashMap::new();
        map.insert(
            "AAA".to_string(),
            history(vec![0.5, 0.5, 0.01, -0.02, 0.015], 110.0),
        );
        map.insert("BBB".to_string(), history(vec![0.01, -0.01, 0.02], 190.0));
        // Only the trailing 3 observations of AAA participate; the 0.5
        // outliers at the head must be dropped by alignment.
        let analytics = compute_risk_analytics(&holdings, &map, None).unwrap();
        assert!(analytics.portfolio.daily_return.abs() < 0.1);
    }

    #[test]
    fn unrealized_pnl_from_latest_price() {
        let (holdings, map) = two_asset_fixture();
        let analytics = compute_risk_analytics(&holdings, &map, None).unwrap();
        // AAA: (110 - 100) × 10 = 100; BBB: (190 - 200) × 5 = -50
        assert_relative_eq!(analytics.assets[0].unrealized_pnl, 100.0);
        assert_relative_eq!(analytics.assets[1].unrealized_pnl, -50.0);
    }

    #[test]
    fn component_var_sums_to_portfolio_var() {
        let (holdings, map) = two_asset_fixture();
        let analytics = compute_risk_analytics(&holdings, &map, None).unwrap();
        let component_sum: f64 = analytics.assets.iter().map(|a| a.component_var).sum();
        // Σ wᵢρᵢσᵢ = σ_p, so the Euler components reconstruct VaR95.
        assert_relative_eq!(component_sum, analytics.portfolio.var_95, epsilon = 1e-9);
    }

    #[test]
    fn negative_quantity_rejected() {
        let holdings = vec![holding("AAA", -5.0, 100.0)];
        let mut map = HashMap::new();
        map.insert("AAA".to_string(), history(vec![0.01, 0.02], 110.0));
        assert!(compute_risk_analytics(&holdings, &map, None).is_err());
    }
}
