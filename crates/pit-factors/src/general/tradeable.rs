//! Trading state factor.
//!
//! A session counts as tradeable when the stock changed hands and its price
//! moved within the day; zero volume (a full-day suspension) or a locked
//! price (high equal to low) count as not tradeable. Intraday halts shorter
//! than a session are ignored.

use crate::{
    Result,
    align::pivot_frame,
    engine::QueryEngine,
    panel::Panel,
    source::{CODE_COLUMN, FetchParams, TIME_COLUMN},
    traits::{Compute, ConfigurableFactor},
    universe::Universe,
};
use chrono::NaiveDate;

/// Configuration for the Tradeable factor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TradeableConfig {
    /// Raw daily quote query id
    pub query_id: String,
}

impl Default for TradeableConfig {
    fn default() -> Self {
        Self {
            query_id: "QUOTE".to_string(),
        }
    }
}

/// 1 tradeable, 0 suspended or locked, missing without a quote.
#[derive(Debug, Clone, Default)]
pub struct Tradeable {
    config: TradeableConfig,
}

impl ConfigurableFactor for Tradeable {
    type Config = TradeableConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

fn tradeable_flag(volume: f64, range: f64) -> f64 {
    if volume.is_nan() {
        f64::NAN
    } else if volume > 0.0 && range != 0.0 {
        1.0
    } else {
        0.0
    }
}

impl Compute for Tradeable {
    fn compute(
        &self,
        engine: &mut QueryEngine,
        universe: &Universe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Panel> {
        let raw = engine.fetch(
            &self.config.query_id,
            &FetchParams::between(start, end),
            &[CODE_COLUMN, TIME_COLUMN, "volume", "high", "low"],
        )?;
        let dates = engine.trading_dates(start, end);
        let volume = pivot_frame(&raw, "volume", &dates)?.select(universe);
        let high = pivot_frame(&raw, "high", &dates)?.select(universe);
        let low = pivot_frame(&raw, "low", &dates)?.select(universe);

        let range = high.zip_with(&low, |h, l| h - l)?;
        volume.zip_with(&range, tradeable_flag)
    }
}
