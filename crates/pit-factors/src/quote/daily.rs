//! One column of the daily quote extract.

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

/// Configuration for the DailyField factor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DailyFieldConfig {
    /// Raw query id
    pub query_id: String,
    /// Value column
    pub column: String,
}

impl Default for DailyFieldConfig {
    fn default() -> Self {
        Self {
            query_id: "QUOTE".to_string(),
            column: "close".to_string(),
        }
    }
}

/// Daily quote column, missing on sessions without a row.
#[derive(Debug, Clone, Default)]
pub struct DailyField {
    config: DailyFieldConfig,
}

impl ConfigurableFactor for DailyField {
    type Config = DailyFieldConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Compute for DailyField {
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
            &[CODE_COLUMN, TIME_COLUMN, self.config.column.as_str()],
        )?;
        let dates = engine.trading_dates(start, end);
        Ok(pivot_frame(&raw, &self.config.column, &dates)?.select(universe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FactorError;
    use crate::catalog::testing::{daily_frame, date, engine, sessions};
    use crate::source::InMemorySource;

    #[test]
    fn test_daily_field_reads_the_configured_column() {
        let days = sessions(date(2010, 1, 4), date(2010, 1, 8));
        let quotes = daily_frame(
            &days,
            &["A", "B"],
            &[
                ("close", &|t, c| 10.0 + t as f64 + c as f64),
                ("adj_close", &|t, _| 100.0 + t as f64),
            ],
        );
        let mut engine = engine(InMemorySource::new().with("QUOTE", quotes), &["A", "B"], vec![]);

        let close = engine.query("CLOSE", date(2010, 1, 4), date(2010, 1, 8), None).unwrap();
        assert_eq!(close.column("B").unwrap(), vec![11.0, 12.0, 13.0, 14.0, 15.0]);
        let adj = engine.query("ADJ_CLOSE", date(2010, 1, 6), date(2010, 1, 6), None).unwrap();
        assert_eq!(adj.get(date(2010, 1, 6), "A"), Some(102.0));
    }

    #[test]
    fn test_quotes_are_not_filled_across_sessions() {
        let days = sessions(date(2010, 1, 4), date(2010, 1, 8));
        // A trades every session, B only on the first two
        let mut quotes = daily_frame(&days, &["A"], &[("close", &|t, _| t as f64)]);
        quotes
            .vstack_mut(&daily_frame(&days[..2], &["B"], &[("close", &|_, _| 5.0)]))
            .unwrap();
        let mut engine = engine(InMemorySource::new().with("QUOTE", quotes), &["A", "B"], vec![]);

        let close = engine.query("CLOSE", date(2010, 1, 4), date(2010, 1, 8), None).unwrap();
        let b = close.column("B").unwrap();
        assert_eq!(&b[..2], &[5.0, 5.0]);
        assert!(b[2..].iter().all(|v| v.is_nan()));

        // every row still has a value, so the panel was accepted and cached
        assert_eq!(engine.compute_count("CLOSE"), 1);
        assert!(matches!(
            engine.query("CLOSE", date(2010, 1, 11), date(2010, 1, 12), None),
            Err(FactorError::Incomplete { .. })
        ));
    }
}
