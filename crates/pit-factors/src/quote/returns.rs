//! Daily return of a price factor.

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

/// Configuration for the DailyReturn factor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DailyReturnConfig {
    /// Price factor the return is taken on
    pub price: String,
}

impl Default for DailyReturnConfig {
    fn default() -> Self {
        Self {
            price: "ADJ_CLOSE".to_string(),
        }
    }
}

/// `price[t] / price[t - 1] - 1` over consecutive sessions.
///
/// A missing price on either session makes the return missing.
#[derive(Debug, Clone, Default)]
pub struct DailyReturn {
    config: DailyReturnConfig,
}

impl ConfigurableFactor for DailyReturn {
    type Config = DailyReturnConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Compute for DailyReturn {
    fn compute(
        &self,
        engine: &mut QueryEngine,
        _universe: &Universe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Panel> {
        let prices = query_with_lookback(engine, &self.config.price, start, end, 1)?;
        let returns = prices.map_columns(|series| pct_change(series, 1))?;
        Ok(returns.slice(start, end))
    }
}

#[cfg(test)]
mod tests {
    use crate::FactorError;
    use crate::catalog::data_start;
    use crate::catalog::testing::{daily_frame, date, engine, sessions};
    use crate::source::InMemorySource;
    use approx::assert_relative_eq;

    #[test]
    fn test_daily_return_reaches_back_one_session() {
        let days = sessions(date(2010, 1, 1), date(2010, 1, 8));
        let quotes = daily_frame(&days, &["A"], &[("adj_close", &|t, _| 2f64.powi(t as i32))]);
        let mut engine = engine(InMemorySource::new().with("QUOTE", quotes), &["A"], vec![]);

        // 2010-01-04 is a Monday, its previous session is Friday 2010-01-01
        let ret = engine.query("DAILY_RET", date(2010, 1, 4), date(2010, 1, 8), None).unwrap();
        assert_eq!(ret.nrows(), 5);
        for value in ret.column("A").unwrap() {
            assert_relative_eq!(value, 1.0);
        }
        assert_eq!(engine.compute_count("ADJ_CLOSE"), 1);
        assert_eq!(
            engine.store().covered("ADJ_CLOSE").map(|r| r.start),
            Some(date(2010, 1, 1))
        );
    }

    #[test]
    fn test_lookback_stops_at_price_validity() {
        let days = sessions(data_start(), date(2005, 1, 10));
        let quotes = daily_frame(&days, &["A"], &[("adj_close", &|t, _| 1.0 + t as f64)]);
        let mut engine = engine(InMemorySource::new().with("QUOTE", quotes), &["A"], vec![]);

        // the first session has no prior price, so the panel is incomplete
        // rather than reaching before the price history
        assert!(matches!(
            engine.query("DAILY_RET", data_start(), date(2005, 1, 10), None),
            Err(FactorError::Incomplete { .. })
        ));
        let ret = engine.query("DAILY_RET", date(2005, 1, 5), date(2005, 1, 10), None).unwrap();
        assert_relative_eq!(ret.get(date(2005, 1, 5), "A").unwrap(), 1.0);
    }
}
