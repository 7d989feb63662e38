//! One field of the statement extract, as known on each session.

use crate::{
    Result,
    align::{TieBreak, align_frame},
    engine::QueryEngine,
    panel::Panel,
    source::{CODE_COLUMN, FetchParams, TIME_COLUMN},
    traits::{Compute, ConfigurableFactor},
    universe::Universe,
};
use chrono::NaiveDate;

/// Configuration for the StatementField factor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StatementFieldConfig {
    /// Raw query id
    pub query_id: String,
    /// Value column
    pub column: String,
}

impl Default for StatementFieldConfig {
    fn default() -> Self {
        Self {
            query_id: "FUNDAMENTALS".to_string(),
            column: "ni_ttm".to_string(),
        }
    }
}

/// Latest announced value, visible from the session after announcement.
///
/// Restatements published on the same day as the original resolve to the
/// row supplied last.
#[derive(Debug, Clone, Default)]
pub struct StatementField {
    config: StatementFieldConfig,
}

impl ConfigurableFactor for StatementField {
    type Config = StatementFieldConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Compute for StatementField {
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
        let aligned = align_frame(&raw, &self.config.column, &dates, false, TieBreak::LastArrival)?;
        Ok(aligned.select(universe))
    }
}
