//! Index membership and constituent weights.
//!
//! Index providers publish full constituent lists (and weights) at each
//! rebalance, roughly monthly. Every publication replaces the previous one,
//! so a code that drops out becomes missing from that date on. Both factors
//! read history from before the requested start so the latest publication
//! preceding it is found.

use crate::{
    Result,
    align::align_snapshots,
    engine::QueryEngine,
    panel::Panel,
    source::{CODE_COLUMN, FetchParams, TIME_COLUMN},
    traits::{Compute, ConfigurableFactor},
    universe::Universe,
};
use chrono::{Days, NaiveDate};
use polars::prelude::*;

/// Configuration for the IndexConstituents factor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IndexConstituentsConfig {
    /// Index code, e.g. `000300`
    pub index_code: String,
    /// Raw query id
    pub query_id: String,
    /// Calendar days of history read before the requested start
    pub lookback_days: u64,
}

impl Default for IndexConstituentsConfig {
    fn default() -> Self {
        Self {
            index_code: "000300".to_string(),
            query_id: "INDEX_CONSTITUENTS".to_string(),
            lookback_days: 60,
        }
    }
}

/// 1 for codes in the latest published constituent list, missing otherwise.
#[derive(Debug, Clone, Default)]
pub struct IndexConstituents {
    config: IndexConstituentsConfig,
}

impl ConfigurableFactor for IndexConstituents {
    type Config = IndexConstituentsConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

const MEMBER_COLUMN: &str = "member";

impl Compute for IndexConstituents {
    fn compute(
        &self,
        engine: &mut QueryEngine,
        universe: &Universe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Panel> {
        let from = start
            .checked_sub_days(Days::new(self.config.lookback_days))
            .unwrap_or(start);
        let raw = engine.fetch(
            &self.config.query_id,
            &FetchParams::between(from, end).with_index(self.config.index_code.as_str()),
            &[CODE_COLUMN, TIME_COLUMN],
        )?;
        let raw = raw
            .lazy()
            .with_column(lit(1.0).alias(MEMBER_COLUMN))
            .collect()?;

        let dates = engine.trading_dates(from, end);
        let aligned = align_snapshots(&raw, MEMBER_COLUMN, &dates, true)?;
        Ok(aligned.slice(start, end).select(universe))
    }
}

/// Configuration for the IndexWeights factor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IndexWeightsConfig {
    /// Index code, e.g. `000300`
    pub index_code: String,
    /// Raw query id
    pub query_id: String,
    /// Column holding the weight in percent
    pub column: String,
    /// Trading sessions of history read before the requested start
    pub lookback_sessions: usize,
}

impl Default for IndexWeightsConfig {
    fn default() -> Self {
        Self {
            index_code: "000300".to_string(),
            query_id: "INDEX_WEIGHTS".to_string(),
            column: "weight".to_string(),
            lookback_sessions: 130,
        }
    }
}

/// Latest published constituent weight, as a fraction of the index.
#[derive(Debug, Clone, Default)]
pub struct IndexWeights {
    config: IndexWeightsConfig,
}

impl ConfigurableFactor for IndexWeights {
    type Config = IndexWeightsConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Compute for IndexWeights {
    fn compute(
        &self,
        engine: &mut QueryEngine,
        universe: &Universe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Panel> {
        let from = engine
            .calendar()
            .shift_back(start, self.config.lookback_sessions)
            .min(start);
        let raw = engine.fetch(
            &self.config.query_id,
            &FetchParams::between(from, end).with_index(self.config.index_code.as_str()),
            &[CODE_COLUMN, TIME_COLUMN, self.config.column.as_str()],
        )?;

        let dates = engine.trading_dates(from, end);
        let aligned = align_snapshots(&raw, &self.config.column, &dates, true)?;
        Ok(aligned.map(|w| w / 100.0).slice(start, end).select(universe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FactorError;
    use crate::catalog::testing::{date, engine};
    use crate::source::InMemorySource;
    use approx::assert_relative_eq;
    use polars::df;

    fn members() -> DataFrame {
        df! {
            "index_code" => ["000300", "000300", "000300", "000300", "000905"],
            "code" => ["A", "B", "A", "C", "B"],
            "time" => ["2009-12-31", "2009-12-31", "2010-01-06", "2010-01-06", "2010-01-04"],
        }
        .unwrap()
    }

    #[test]
    fn test_constituents_follow_publications() {
        let mut engine = engine(
            InMemorySource::new().with("INDEX_CONSTITUENTS", members()),
            &["A", "B", "C"],
            vec![],
        );
        let panel = engine.query("IF_CONS", date(2010, 1, 4), date(2010, 1, 8), None).unwrap();

        assert_eq!(panel.column("A").unwrap(), vec![1.0; 5]);
        let b = panel.column("B").unwrap();
        assert_eq!(&b[..2], &[1.0, 1.0]);
        assert!(b[2..].iter().all(|v| v.is_nan()));
        let c = panel.column("C").unwrap();
        assert!(c[..2].iter().all(|v| v.is_nan()));
        assert_eq!(&c[2..], &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_no_publication_in_lookback_is_incomplete() {
        let mut engine = engine(
            InMemorySource::new().with("INDEX_CONSTITUENTS", members()),
            &["A", "B", "C"],
            vec![],
        );
        assert!(matches!(
            engine.query("IF_CONS", date(2010, 6, 1), date(2010, 6, 4), None),
            Err(FactorError::Incomplete { .. })
        ));
    }

    #[test]
    fn test_weights_are_fractions() {
        let weights = df! {
            "index_code" => ["000300", "000300", "000300"],
            "code" => ["A", "B", "A"],
            "time" => ["2009-12-31", "2009-12-31", "2010-01-07"],
            "weight" => [0.6, 0.4, 1.0],
        }
        .unwrap();
        let mut engine = engine(
            InMemorySource::new().with("INDEX_WEIGHTS", weights),
            &["A", "B"],
            vec![],
        );
        let panel = engine
            .query("IF_WEIGHTS", date(2010, 1, 4), date(2010, 1, 8), None)
            .unwrap();

        assert_relative_eq!(panel.get(date(2010, 1, 4), "A").unwrap(), 0.006);
        assert_relative_eq!(panel.get(date(2010, 1, 6), "B").unwrap(), 0.004);
        assert_relative_eq!(panel.get(date(2010, 1, 7), "A").unwrap(), 0.01);
        assert!(panel.get(date(2010, 1, 7), "B").unwrap().is_nan());
    }
}
