//! Trailing price momentum.
//!
//! `P[t - skip] / P[t - skip - window] - 1`, counted in trading sessions.
//! Skipping the most recent sessions sidesteps short-term reversal.

use crate::{
    Result,
    catalog::query_with_lookback,
    engine::QueryEngine,
    panel::Panel,
    rolling::pct_change,
    traits::{Compute, ConfigurableFactor},
    universe::Universe,
};
use chrono::NaiveDate;

/// Configuration for the PriceMomentum factor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PriceMomentumConfig {
    /// Price factor
    pub price: String,
    /// Sessions between the two prices (default: 20)
    pub window: usize,
    /// Most recent sessions to skip (default: 0)
    pub skip: usize,
}

impl Default for PriceMomentumConfig {
    fn default() -> Self {
        Self {
            price: "ADJ_CLOSE".to_string(),
            window: 20,
            skip: 0,
        }
    }
}

/// Price change over a trailing window of sessions.
#[derive(Debug, Clone, Default)]
pub struct PriceMomentum {
    config: PriceMomentumConfig,
}

impl ConfigurableFactor for PriceMomentum {
    type Config = PriceMomentumConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Compute for PriceMomentum {
    fn compute(
        &self,
        engine: &mut QueryEngine,
        _universe: &Universe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Panel> {
        let PriceMomentumConfig { price, window, skip } = &self.config;
        let prices = query_with_lookback(engine, price, start, end, window + skip)?;
        let momentum = prices.map_columns(|series| {
            let change = pct_change(series, *window);
            (0..change.len())
                .map(|t| t.checked_sub(*skip).map_or(f64::NAN, |s| change[s]))
                .collect()
        })?;
        Ok(momentum.slice(start, end))
    }
}
