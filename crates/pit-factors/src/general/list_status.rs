//! Listing status factor.
//!
//! Exchange listing events are stored with the raw codes
//! 1 listed, 2 listing suspended, 3 listing resumed, 4 delisted and
//! 6 delisting arrangement. The factor folds them into
//! 1 listed, 2 suspended, 3 delisting arrangement and 4 delisted.

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

/// Configuration for the ListStatus factor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ListStatusConfig {
    /// Raw query id
    pub query_id: String,
    /// Column holding the raw status code
    pub column: String,
}

impl Default for ListStatusConfig {
    fn default() -> Self {
        Self {
            query_id: "LIST_STATUS".to_string(),
            column: "list_status".to_string(),
        }
    }
}

/// Listing status aligned onto trading sessions with immediate effect.
#[derive(Debug, Clone, Default)]
pub struct ListStatus {
    config: ListStatusConfig,
}

/// Fold a raw listing event code into the factor's coding.
fn fold_status(raw: f64) -> f64 {
    match raw as i64 {
        1 | 3 => 1.0,
        2 => 2.0,
        4 => 4.0,
        6 => 3.0,
        _ => f64::NAN,
    }
}

impl ConfigurableFactor for ListStatus {
    type Config = ListStatusConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Compute for ListStatus {
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
        let aligned = align_frame(&raw, &self.config.column, &dates, true, TieBreak::LastArrival)?;
        Ok(aligned.map(fold_status).select(universe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{date, engine};
    use crate::source::InMemorySource;
    use polars::df;

    #[test]
    fn test_fold_status() {
        assert_eq!(fold_status(1.0), 1.0);
        assert_eq!(fold_status(3.0), 1.0);
        assert_eq!(fold_status(6.0), 3.0);
        assert!(fold_status(5.0).is_nan());
        assert!(fold_status(f64::NAN).is_nan());
    }

    #[test]
    fn test_list_status_takes_effect_on_event_day() {
        let raw = df! {
            "code" => ["A", "B", "A", "A"],
            "time" => ["2005-03-01", "2005-03-01", "2010-01-06", "2010-01-08"],
            "list_status" => [1, 1, 2, 3],
        }
        .unwrap();
        let mut engine = engine(InMemorySource::new().with("LIST_STATUS", raw), &["A", "B"], vec![]);
        let panel = engine
            .query("LIST_STATUS", date(2010, 1, 4), date(2010, 1, 8), None)
            .unwrap();

        assert_eq!(panel.column("A").unwrap(), vec![1.0, 1.0, 2.0, 2.0, 1.0]);
        assert_eq!(panel.column("B").unwrap(), vec![1.0; 5]);
    }
}
