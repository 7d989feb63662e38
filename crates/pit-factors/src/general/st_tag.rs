//! Special treatment tag.
//!
//! Tags are coded so that a larger number means a higher risk:
//! 0 normal, 1 ST, 2 *ST, 3 delisting arrangement, 4 risk warning, 5 PT.
//! Several announcements on one day resolve to the riskiest tag, and codes
//! that never received a tag are reported as normal.

use crate::{
    Result,
    align::{TieBreak, align_frame},
    engine::QueryEngine,
    panel::{FillNa, Panel},
    source::{CODE_COLUMN, FetchParams, TIME_COLUMN},
    traits::{Compute, ConfigurableFactor},
    universe::Universe,
};
use chrono::NaiveDate;

/// Configuration for the SpecialTreatment factor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SpecialTreatmentConfig {
    /// Raw query id
    pub query_id: String,
    /// Column holding the numeric tag
    pub column: String,
}

impl Default for SpecialTreatmentConfig {
    fn default() -> Self {
        Self {
            query_id: "ST_TAG".to_string(),
            column: "tag".to_string(),
        }
    }
}

/// Special treatment tag aligned with immediate effect.
#[derive(Debug, Clone, Default)]
pub struct SpecialTreatment {
    config: SpecialTreatmentConfig,
}

impl ConfigurableFactor for SpecialTreatment {
    type Config = SpecialTreatmentConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Compute for SpecialTreatment {
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
        let aligned = align_frame(&raw, &self.config.column, &dates, true, TieBreak::Max)?;
        Ok(aligned.select(universe).fill_missing(&FillNa::Value(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{date, engine};
    use crate::source::InMemorySource;
    use polars::df;

    #[test]
    fn test_same_day_tags_keep_the_riskiest() {
        let raw = df! {
            "code" => ["A", "A", "A"],
            "time" => ["2010-01-05", "2010-01-05", "2010-01-07"],
            "tag" => [2, 1, 0],
        }
        .unwrap();
        let mut engine = engine(InMemorySource::new().with("ST_TAG", raw), &["A", "B"], vec![]);
        let panel = engine.query("ST_TAG", date(2010, 1, 4), date(2010, 1, 8), None).unwrap();

        assert_eq!(panel.column("A").unwrap(), vec![0.0, 2.0, 2.0, 0.0, 0.0]);
        // never tagged
        assert_eq!(panel.column("B").unwrap(), vec![0.0; 5]);
    }
}
