//! Streaming rolling statistics.
//!
//! Regressions over trailing windows are solved from prefix sums of the
//! moment matrices `X'X` and `X'y`: the moments of the window ending at step
//! `i` are `cum(i) - cum(i - window)`, so each step costs `O(k²)` for the
//! accumulation plus one `k x k` solve, independent of the window length.
//!
//! A window whose moment matrix is singular (a constant regressor, e.g. a
//! suspended stock) produces the missing sentinel for that step only.

use crate::{FactorError, Result};
use ndarray::{Array1, Array2, s};

/// Relative pivot size under which a moment matrix is treated as singular.
const SINGULAR_TOLERANCE: f64 = 1e-10;

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` when `a` is singular or not square.
pub fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if a.ncols() != n || b.len() != n {
        return None;
    }
    let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if !scale.is_finite() || scale == 0.0 {
        return None;
    }

    let mut m = a.clone();
    let mut rhs = b.clone();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| m[[i, col]].abs().total_cmp(&m[[j, col]].abs()))?;
        if m[[pivot, col]].abs() <= SINGULAR_TOLERANCE * scale {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                m.swap([pivot, k], [col, k]);
            }
            rhs.swap(pivot, col);
        }
        for row in col + 1..n {
            let factor = m[[row, col]] / m[[col, col]];
            for k in col..n {
                m[[row, k]] -= factor * m[[col, k]];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail = m.slice(s![row, row + 1..]).dot(&x.slice(s![row + 1..]));
        x[row] = (rhs[row] - tail) / m[[row, row]];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Prefix sums of regression moments for an intercept plus `k - 1` regressors.
///
/// Step `i` holds the sums over observations `0..i`; an observation with any
/// missing field contributes nothing and is not counted as complete. The
/// `X'X` sums live in one contiguous buffer of `k * k` blocks and the `X'y`
/// sums in one of `k` blocks.
#[derive(Debug, Clone)]
pub struct MomentAccumulator {
    k: usize,
    xx: Vec<f64>,
    xy: Vec<f64>,
    complete: Vec<usize>,
}

impl MomentAccumulator {
    /// Accumulator for `regressors` explanatory columns plus an intercept.
    pub fn new(regressors: usize) -> Self {
        Self::with_capacity(regressors, 0)
    }

    /// Accumulator with room for `steps` observations.
    pub fn with_capacity(regressors: usize, steps: usize) -> Self {
        let k = regressors + 1;
        let mut xx = Vec::with_capacity((steps + 1) * k * k);
        xx.resize(k * k, 0.0);
        let mut xy = Vec::with_capacity((steps + 1) * k);
        xy.resize(k, 0.0);
        let mut complete = Vec::with_capacity(steps + 1);
        complete.push(0);
        Self { k, xx, xy, complete }
    }

    /// Number of observations pushed so far.
    pub fn len(&self) -> usize {
        self.complete.len() - 1
    }

    /// Whether nothing has been pushed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one observation; `x` excludes the intercept.
    pub fn push(&mut self, x: &[f64], y: f64) {
        let k = self.k;
        let xx_from = self.xx.len() - k * k;
        let xy_from = self.xy.len() - k;
        self.xx.extend_from_within(xx_from..);
        self.xy.extend_from_within(xy_from..);
        let mut complete = self.complete[self.complete.len() - 1];

        if x.len() + 1 == k && !y.is_nan() && x.iter().all(|v| !v.is_nan()) {
            let xx = &mut self.xx[xx_from + k * k..];
            let xy = &mut self.xy[xy_from + k..];
            let field = |i: usize| if i == 0 { 1.0 } else { x[i - 1] };
            for i in 0..k {
                xy[i] += field(i) * y;
                for j in 0..k {
                    xx[i * k + j] += field(i) * field(j);
                }
            }
            complete += 1;
        }
        self.complete.push(complete);
    }

    /// Moments of the `window` observations ending at step `end` (inclusive).
    ///
    /// Returns the windowed `X'X`, `X'y` and the count of complete
    /// observations, or `None` while fewer than `window` steps exist.
    pub fn window(&self, end: usize, window: usize) -> Option<(Array2<f64>, Array1<f64>, usize)> {
        if window == 0 || end >= self.len() || end + 1 < window {
            return None;
        }
        let k = self.k;
        let hi = end + 1;
        let lo = hi - window;
        let xx = Array2::from_shape_fn((k, k), |(i, j)| {
            self.xx[hi * k * k + i * k + j] - self.xx[lo * k * k + i * k + j]
        });
        let xy = Array1::from_shape_fn(k, |i| self.xy[hi * k + i] - self.xy[lo * k + i]);
        Some((xx, xy, self.complete[hi] - self.complete[lo]))
    }

    /// Coefficients (intercept first) of the fully observed window ending at `end`.
    pub fn solve_window(&self, end: usize, window: usize) -> Option<Array1<f64>> {
        let (xx, xy, complete) = self.window(end, window)?;
        if complete < window {
            return None;
        }
        solve(&xx, &xy)
    }
}

/// One step of a rolling single-regressor regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OlsStep {
    /// Intercept
    pub intercept: f64,
    /// Coefficient on the regressor
    pub slope: f64,
    /// Population standard deviation of in-window residuals
    pub residual_std: f64,
}

impl OlsStep {
    /// Step with every statistic missing.
    pub const MISSING: Self = Self {
        intercept: f64::NAN,
        slope: f64::NAN,
        residual_std: f64::NAN,
    };
}

fn accumulate(y: &[f64], x: &[f64]) -> Result<MomentAccumulator> {
    if y.len() != x.len() {
        return Err(FactorError::ShapeMismatch(format!(
            "regression of {} observations on {} regressor values",
            y.len(),
            x.len()
        )));
    }
    let mut acc = MomentAccumulator::with_capacity(1, y.len());
    for (yi, xi) in y.iter().zip(x) {
        acc.push(&[*xi], *yi);
    }
    Ok(acc)
}

/// Rolling slope of `y` on `x` with an intercept, aligned to `y`.
///
/// A step is missing when its window is not fully observed or the moment
/// matrix is singular.
pub fn rolling_slope(y: &[f64], x: &[f64], window: usize) -> Result<Vec<f64>> {
    let acc = accumulate(y, x)?;
    Ok((0..y.len())
        .map(|i| acc.solve_window(i, window).map_or(f64::NAN, |beta| beta[1]))
        .collect())
}

/// Rolling regression of `y` on `x` with an intercept, aligned to `y`.
///
/// Besides the coefficients, each step reports the standard deviation of the
/// residuals over the live window. Degenerate steps are [`OlsStep::MISSING`].
pub fn rolling_ols(y: &[f64], x: &[f64], window: usize) -> Result<Vec<OlsStep>> {
    let acc = accumulate(y, x)?;
    Ok((0..y.len())
        .map(|i| {
            let Some(beta) = acc.solve_window(i, window) else {
                return OlsStep::MISSING;
            };
            let lo = i + 1 - window;
            let residuals: Vec<f64> = (lo..=i).map(|t| y[t] - beta[0] - beta[1] * x[t]).collect();
            OlsStep {
                intercept: beta[0],
                slope: beta[1],
                residual_std: population_std(&residuals),
            }
        })
        .collect())
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Windowed mean, deviation and higher moments from prefix power sums.
#[derive(Debug, Clone)]
pub struct RollingMoments {
    window: usize,
    min_periods: usize,
    // cumulative [count, Σx, Σx², Σx³, Σx⁴], with a leading zero row
    sums: Vec<[f64; 5]>,
}

impl RollingMoments {
    /// Accumulate `series`; a step needs `min_periods` observed values in its window.
    pub fn new(series: &[f64], window: usize, min_periods: usize) -> Self {
        let mut sums = Vec::with_capacity(series.len() + 1);
        let mut acc = [0.0; 5];
        sums.push(acc);
        for &v in series {
            if !v.is_nan() {
                acc[0] += 1.0;
                acc[1] += v;
                acc[2] += v * v;
                acc[3] += v * v * v;
                acc[4] += v * v * v * v;
            }
            sums.push(acc);
        }
        Self {
            window,
            min_periods: min_periods.max(1),
            sums,
        }
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.sums.len() - 1
    }

    /// Whether the series was empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // count plus central sums M2, M3, M4 and the mean of the window ending at `end`
    fn central(&self, end: usize) -> Option<(f64, f64, f64, f64, f64)> {
        if self.window == 0 || end >= self.len() || end + 1 < self.window {
            return None;
        }
        let hi = self.sums[end + 1];
        let lo = self.sums[end + 1 - self.window];
        let [n, s1, s2, s3, s4]: [f64; 5] = std::array::from_fn(|k| hi[k] - lo[k]);
        if n < self.min_periods as f64 {
            return None;
        }
        let m = s1 / n;
        let mut m2 = s2 - n * m * m;
        if m2 <= SINGULAR_TOLERANCE * s2.abs() {
            m2 = 0.0;
        }
        let m3 = s3 - 3.0 * m * s2 + 2.0 * n * m.powi(3);
        let m4 = s4 - 4.0 * m * s3 + 6.0 * m * m * s2 - 3.0 * n * m.powi(4);
        Some((n, m, m2, m3, m4))
    }

    /// Windowed mean.
    pub fn mean(&self, end: usize) -> f64 {
        self.central(end).map_or(f64::NAN, |(_, m, ..)| m)
    }

    /// Windowed sample standard deviation.
    pub fn std(&self, end: usize) -> f64 {
        match self.central(end) {
            Some((n, _, m2, ..)) if n > 1.0 => (m2 / (n - 1.0)).sqrt(),
            _ => f64::NAN,
        }
    }

    /// Windowed bias-corrected skewness; missing for a constant window.
    pub fn skew(&self, end: usize) -> f64 {
        match self.central(end) {
            Some((n, _, m2, m3, _)) if n > 2.0 && m2 > 0.0 => {
                let (b, c) = (m2 / n, m3 / n);
                (n * (n - 1.0)).sqrt() / (n - 2.0) * c / b.powf(1.5)
            }
            _ => f64::NAN,
        }
    }

    /// Windowed bias-corrected excess kurtosis; missing for a constant window.
    pub fn kurt(&self, end: usize) -> f64 {
        match self.central(end) {
            Some((n, _, m2, _, m4)) if n > 3.0 && m2 > 0.0 => {
                let d = (n - 2.0) * (n - 3.0);
                (n - 1.0) / d * ((n + 1.0) * n * m4 / (m2 * m2) - 3.0 * (n - 1.0))
            }
            _ => f64::NAN,
        }
    }

    /// Apply one windowed statistic at every step.
    pub fn collect(&self, stat: impl Fn(&Self, usize) -> f64) -> Vec<f64> {
        (0..self.len()).map(|i| stat(self, i)).collect()
    }
}

/// Relative change over `periods` steps: `x[t] / x[t - periods] - 1`.
pub fn pct_change(series: &[f64], periods: usize) -> Vec<f64> {
    (0..series.len())
        .map(|t| {
            if periods == 0 || t < periods {
                f64::NAN
            } else {
                series[t] / series[t - periods] - 1.0
            }
        })
        .collect()
}
