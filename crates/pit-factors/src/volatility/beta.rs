//! Market beta and specific volatility.
//!
//! Each stock's daily returns are regressed on the benchmark's over a
//! trailing window of sessions:
//!
//! `R_i = α + β R_m + ε`
//!
//! Beta is the slope; specific volatility is the population standard
//! deviation of the in-window residuals. A window with a missing return, or
//! with a constant regressor, yields a missing value.

use crate::{
    Result,
    catalog::query_with_lookback,
    engine::QueryEngine,
    panel::Panel,
    rolling::{OlsStep, pct_change, rolling_ols},
    traits::{Compute, ConfigurableFactor},
    universe::Universe,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Configuration shared by the market regression factors.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MarketRegressionConfig {
    /// Stock price factor
    pub price: String,
    /// Benchmark price factor; its first column is the market series
    pub benchmark: String,
    /// Regression window in sessions (default: 252)
    pub window: usize,
}

impl Default for MarketRegressionConfig {
    fn default() -> Self {
        Self {
            price: "ADJ_CLOSE".to_string(),
            benchmark: "BENCHMARK_CLOSE".to_string(),
            window: 252,
        }
    }
}

/// Rolling regression of every stock on the benchmark, reduced by `pick`.
fn market_regression(
    config: &MarketRegressionConfig,
    engine: &mut QueryEngine,
    start: NaiveDate,
    end: NaiveDate,
    pick: fn(&OlsStep) -> f64,
) -> Result<Panel> {
    let window = config.window;
    let prices = query_with_lookback(engine, &config.price, start, end, window)?;
    let benchmark = query_with_lookback(engine, &config.benchmark, start, end, window)?;

    let market = benchmark
        .columns()
        .first()
        .and_then(|code| benchmark.column(code))
        .unwrap_or_else(|| vec![f64::NAN; benchmark.nrows()]);
    let market = pct_change(&market, 1);

    let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for code in prices.columns() {
        let Some(series) = prices.column(code) else {
            continue;
        };
        let steps = rolling_ols(&pct_change(&series, 1), &market, window)?;
        columns.insert(code.clone(), steps.iter().map(pick).collect());
    }
    Ok(Panel::from_column_map(prices.index().to_vec(), columns)?.slice(start, end))
}

/// Slope of the rolling benchmark regression.
#[derive(Debug, Clone, Default)]
pub struct MarketBeta {
    config: MarketRegressionConfig,
}

impl ConfigurableFactor for MarketBeta {
    type Config = MarketRegressionConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Compute for MarketBeta {
    fn compute(
        &self,
        engine: &mut QueryEngine,
        _universe: &Universe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Panel> {
        market_regression(&self.config, engine, start, end, |step| step.slope)
    }
}

/// Residual volatility of the rolling benchmark regression.
#[derive(Debug, Clone, Default)]
pub struct SpecificVolatility {
    config: MarketRegressionConfig,
}

impl ConfigurableFactor for SpecificVolatility {
    type Config = MarketRegressionConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Compute for SpecificVolatility {
    fn compute(
        &self,
        engine: &mut QueryEngine,
        _universe: &Universe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Panel> {
        market_regression(&self.config, engine, start, end, |step| step.residual_std)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{daily_frame, date, engine, sessions};
    use crate::registry::FactorDescriptor;
    use crate::source::InMemorySource;
    use approx::assert_abs_diff_eq;

    const WINDOW: usize = 10;

    // benchmark return alternates around a drift so the regressor varies
    fn market_return(t: usize) -> f64 {
        0.001 + if t % 3 == 0 { 0.02 } else { -0.01 }
    }

    fn cumulative(returns: impl Fn(usize) -> f64, t: usize) -> f64 {
        (1..=t).fold(100.0, |p, s| p * (1.0 + returns(s)))
    }

    fn source() -> InMemorySource {
        let days = sessions(date(2010, 1, 1), date(2010, 3, 31));
        let quotes = daily_frame(
            &days,
            &["A", "B"],
            &[(
                "adj_close",
                // A has beta 1.5; B adds a noise term
                &|t, c| {
                    cumulative(
                        |s| {
                            let noise = if c == 1 && s % 2 == 0 { 0.005 } else { 0.0 };
                            0.0005 + 1.5 * market_return(s) + noise
                        },
                        t,
                    )
                },
            )],
        );
        let index = daily_frame(&days, &["000001"], &[("close", &|t, _| cumulative(market_return, t))]);
        InMemorySource::new()
            .with("QUOTE", quotes)
            .with("INDEX_QUOTE", index)
    }

    fn descriptors() -> Vec<FactorDescriptor> {
        let config = MarketRegressionConfig {
            window: WINDOW,
            ..MarketRegressionConfig::default()
        };
        vec![
            FactorDescriptor::new("BETA_SHORT", MarketBeta::with_config(config.clone()))
                .depends_on(["ADJ_CLOSE", "BENCHMARK_CLOSE"]),
            FactorDescriptor::new("SPECIAL_VOL_SHORT", SpecificVolatility::with_config(config))
                .depends_on(["ADJ_CLOSE", "BENCHMARK_CLOSE"]),
        ]
    }

    #[test]
    fn test_beta_recovers_exposure() {
        let mut engine = engine(source(), &["A", "B"], descriptors());
        let beta = engine
            .query("BETA_SHORT", date(2010, 2, 1), date(2010, 2, 26), None)
            .unwrap();
        for value in beta.column("A").unwrap() {
            assert_abs_diff_eq!(value, 1.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_specific_volatility() {
        let mut engine = engine(source(), &["A", "B"], descriptors());
        let vol = engine
            .query("SPECIAL_VOL_SHORT", date(2010, 2, 1), date(2010, 2, 5), None)
            .unwrap();
        // an exact linear relation leaves no residual
        for value in vol.column("A").unwrap() {
            assert_abs_diff_eq!(value, 0.0, epsilon = 1e-9);
        }
        assert!(vol.column("B").unwrap().iter().all(|v| *v > 0.0));

        // both regression factors share the cached inputs
        engine.query("BETA_SHORT", date(2010, 2, 1), date(2010, 2, 5), None).unwrap();
        assert_eq!(engine.compute_count("ADJ_CLOSE"), 1);
        assert_eq!(engine.compute_count("BENCHMARK_CLOSE"), 1);
    }
}
