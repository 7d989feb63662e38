//! Benchmark index close.
//!
//! Repeated across every code of the universe so it lines up cell for cell
//! with stock-level panels.

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
use std::collections::BTreeMap;

/// Configuration for the BenchmarkClose factor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BenchmarkCloseConfig {
    /// Benchmark index code
    pub index_code: String,
    /// Raw index quote query id
    pub query_id: String,
    /// Value column
    pub column: String,
}

impl Default for BenchmarkCloseConfig {
    fn default() -> Self {
        Self {
            index_code: "000001".to_string(),
            query_id: "INDEX_QUOTE".to_string(),
            column: "close".to_string(),
        }
    }
}

/// Benchmark close broadcast to the universe.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkClose {
    config: BenchmarkCloseConfig,
}

impl ConfigurableFactor for BenchmarkClose {
    type Config = BenchmarkCloseConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Compute for BenchmarkClose {
    fn compute(
        &self,
        engine: &mut QueryEngine,
        universe: &Universe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Panel> {
        let raw = engine.fetch(
            &self.config.query_id,
            &FetchParams::between(start, end).with_code(self.config.index_code.as_str()),
            &[CODE_COLUMN, TIME_COLUMN, self.config.column.as_str()],
        )?;
        let dates = engine.trading_dates(start, end);
        let index = pivot_frame(&raw, &self.config.column, &dates)?;
        let series = index
            .column(&self.config.index_code)
            .unwrap_or_else(|| vec![f64::NAN; dates.len()]);

        let columns: BTreeMap<String, Vec<f64>> = universe
            .codes()
            .iter()
            .map(|code| (code.clone(), series.clone()))
            .collect();
        Panel::from_column_map(dates, columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{daily_frame, date, engine, sessions};
    use crate::source::InMemorySource;

    #[test]
    fn test_benchmark_is_broadcast() {
        let days = sessions(date(2010, 1, 4), date(2010, 1, 6));
        let index_quotes = daily_frame(
            &days,
            &["000001", "000300"],
            &[("close", &|t, c| 3000.0 + t as f64 + 1000.0 * c as f64)],
        );
        let mut engine = engine(
            InMemorySource::new().with("INDEX_QUOTE", index_quotes),
            &["A", "B"],
            vec![],
        );
        let panel = engine
            .query("BENCHMARK_CLOSE", date(2010, 1, 4), date(2010, 1, 6), None)
            .unwrap();

        assert_eq!(panel.columns(), &["A".to_string(), "B".to_string()]);
        assert_eq!(panel.column("A").unwrap(), vec![3000.0, 3001.0, 3002.0]);
        assert_eq!(panel.column("A"), panel.column("B"));
    }
}
