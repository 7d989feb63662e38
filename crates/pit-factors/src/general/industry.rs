//! Industry classification.
//!
//! Classification changes are published as `(code, time, industry)` rows.
//! The panel is categorical: cells are codes into the label dictionary of
//! every industry seen in the extract, and a code without a classification
//! yet is missing.

use crate::{
    Result,
    align::align_labels,
    engine::QueryEngine,
    panel::Panel,
    source::{CODE_COLUMN, FetchParams, TIME_COLUMN},
    traits::{Compute, ConfigurableFactor},
    universe::Universe,
};
use chrono::NaiveDate;

/// Configuration for the Industry factor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IndustryConfig {
    /// Raw query id
    pub query_id: String,
    /// Column holding the industry name
    pub column: String,
    /// Whether a reclassification counts on the day it is published
    pub effective_immediately: bool,
}

impl Default for IndustryConfig {
    fn default() -> Self {
        Self {
            query_id: "INDUSTRY".to_string(),
            column: "industry".to_string(),
            effective_immediately: false,
        }
    }
}

/// Latest industry of each code, forward-filled over sessions.
#[derive(Debug, Clone, Default)]
pub struct Industry {
    config: IndustryConfig,
}

impl ConfigurableFactor for Industry {
    type Config = IndustryConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Compute for Industry {
    fn compute(
        &self,
        engine: &mut QueryEngine,
        universe: &Universe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Panel> {
        let raw = engine.fetch(
            &self.config.query_id,
            &FetchParams::until(end),
            &[CODE_COLUMN, TIME_COLUMN, self.config.column.as_str()],
        )?;
        let dates = engine.trading_dates(start, end);
        let aligned = align_labels(&raw, &self.config.column, &dates, self.config.effective_immediately)?;
        Ok(aligned.select(universe))
    }
}
