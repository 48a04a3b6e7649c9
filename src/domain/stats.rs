//! Shared statistics helpers for the performance analyzer and risk engine.
//!
//! Every function tolerates short or degenerate inputs by returning 0.0
//! instead of NaN, matching the engine-wide sentinel policy.

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub fn covariance(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let mx = mean(&xs[..n]);
    let my = mean(&ys[..n]);
    xs[..n]
        .iter()
        .zip(&ys[..n])
        .map(|(x, y)| (x - mx) * (y - my))
        .sum::<f64>()
        / n as f64
}

/// Pearson correlation coefficient, clamped to [-1, 1] to absorb
/// floating-point drift. Zero-variance inputs yield 0.0.
pub fn correlation(xs: &[f64], ys: &[f64]) -> f64 {
    let sx = std_dev(xs);
    let sy = std_dev(ys);
    if sx == 0.0 || sy == 0.0 {
        return 0.0;
    }
    (covariance(xs, ys) / (sx * sy)).clamp(-1.0, 1.0)
}

/// Standard deviation of the negative observations only. 0.0 when there
/// are none.
pub fn downside_deviation(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let squared_downside: f64 = returns
        .iter()
        .filter(|&&r| r < 0.0)
        .map(|r| r.powi(2))
        .sum();
    if squared_downside == 0.0 {
        return 0.0;
    }
    (squared_downside / returns.len() as f64).sqrt()
}

/// Largest peak-to-trough decline of an equity/value series, as a fraction
/// of the peak.
pub fn max_drawdown(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut peak = values[0];
    let mut max_dd = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        } else if peak > 0.0 {
            let dd = (peak - v) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Max drawdown over a simple-return series, via the implied cumulative
/// value curve starting at 1.0.
pub fn max_drawdown_from_returns(returns: &[f64]) -> f64 {
    let mut curve = Vec::with_capacity(returns.len() + 1);
    let mut value = 1.0;
    curve.push(value);
    for r in returns {
        value *= 1.0 + r;
        curve.push(value);
    }
    max_drawdown(&curve)
}

/// Per-bar simple returns of a value series.
pub fn simple_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_basic() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn std_dev_basic() {
        // Population stddev of [2, 4, 4, 4, 5, 5, 7, 9] is 2.
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(std_dev(&values), 2.0);
    }

    #[test]
    fn std_dev_degenerate() {
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[5.0]), 0.0);
        assert_eq!(std_dev(&[5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn correlation_perfect() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        assert_relative_eq!(correlation(&xs, &ys), 1.0, epsilon = 1e-12);

        let inverse = [8.0, 6.0, 4.0, 2.0];
        assert_relative_eq!(correlation(&xs, &inverse), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn correlation_zero_variance_is_zero() {
        let flat = [1.0, 1.0, 1.0];
        let xs = [1.0, 2.0, 3.0];
        assert_eq!(correlation(&flat, &xs), 0.0);
    }

    #[test]
    fn correlation_is_clamped() {
        let xs = [1.0, 2.0, 3.0];
        let c = correlation(&xs, &xs);
        assert!(c <= 1.0);
        assert_relative_eq!(c, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn downside_deviation_ignores_gains() {
        let returns = [0.05, -0.02, 0.03, -0.04];
        let expected = ((0.02_f64.powi(2) + 0.04_f64.powi(2)) / 4.0).sqrt();
        assert_relative_eq!(downside_deviation(&returns), expected);
    }

    #[test]
    fn downside_deviation_all_gains_is_zero() {
        assert_eq!(downside_deviation(&[0.01, 0.02, 0.03]), 0.0);
    }

    #[test]
    fn max_drawdown_basic() {
        let values = [100.0, 110.0, 90.0, 95.0, 80.0, 100.0];
        assert_relative_eq!(max_drawdown(&values), (110.0 - 80.0) / 110.0);
    }

    #[test]
    fn max_drawdown_monotone_rise_is_zero() {
        let values = [100.0, 105.0, 110.0];
        assert_eq!(max_drawdown(&values), 0.0);
    }

    #[test]
    fn max_drawdown_from_returns_matches_curve() {
        let returns = [0.10, -0.20, 0.05];
        // Curve: 1.0, 1.1, 0.88, 0.924 → drawdown (1.1-0.88)/1.1 = 0.2
        assert_relative_eq!(max_drawdown_from_returns(&returns), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn simple_returns_basic() {
        let values = [100.0, 110.0, 99.0];
        let returns = simple_returns(&values);
        assert_relative_eq!(returns[0], 0.10);
        assert_relative_eq!(returns[1], -0.10);
    }
}
