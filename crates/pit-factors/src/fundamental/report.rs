//! Value of one report period, counted back from the latest period filed.

use crate::{
    Result,
    align::{ReportLag, align_reports},
    engine::QueryEngine,
    panel::Panel,
    source::{CODE_COLUMN, FetchParams, TIME_COLUMN},
    traits::{Compute, ConfigurableFactor},
    universe::Universe,
};
use chrono::NaiveDate;

/// Configuration for the PeriodReport factor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PeriodReportConfig {
    /// Raw query id
    pub query_id: String,
    /// Column holding the report period end date
    pub period_column: String,
    /// Value column
    pub column: String,
    /// Months between report periods
    pub period_months: u32,
    /// Periods back from the latest one filed
    pub lag: u32,
}

impl Default for PeriodReportConfig {
    fn default() -> Self {
        Self {
            query_id: "QUARTERLY_REPORTS".to_string(),
            period_column: "period".to_string(),
            column: "ni_q".to_string(),
            period_months: 3,
            lag: 0,
        }
    }
}

/// Report value of the period `lag` periods before the latest one filed,
/// as known on each session.
///
/// With quarterly periods, lag 0 is the latest quarter and lag 4 the same
/// quarter a year earlier.
#[derive(Debug, Clone, Default)]
pub struct PeriodReport {
    config: PeriodReportConfig,
}

impl ConfigurableFactor for PeriodReport {
    type Config = PeriodReportConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Compute for PeriodReport {
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
            &[
                CODE_COLUMN,
                TIME_COLUMN,
                self.config.period_column.as_str(),
                self.config.column.as_str(),
            ],
        )?;
        let dates = engine.trading_dates(start, end);
        let lag = ReportLag {
            period_months: self.config.period_months,
            lag: self.config.lag,
        };
        let aligned = align_reports(
            &raw,
            &self.config.period_column,
            &self.config.column,
            &dates,
            lag,
            false,
        )?;
        Ok(aligned.select(universe))
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::testing::{date, engine};
    use crate::source::InMemorySource;
    use polars::df;

    #[test]
    fn test_annual_lags() {
        let annual = df! {
            "code" => ["A", "A", "A"],
            "time" => ["2008-04-20", "2009-04-20", "2010-01-05"],
            "period" => ["2007-12-31", "2008-12-31", "2009-12-31"],
            "ni" => [80.0, 90.0, 100.0],
            "oprev" => [800.0, 900.0, 1000.0],
        }
        .unwrap();
        let mut engine = engine(InMemorySource::new().with("ANNUAL_REPORTS", annual), &["A"], vec![]);

        let latest = engine.query("NI_1Y", date(2010, 1, 5), date(2010, 1, 6), None).unwrap();
        assert_eq!(latest.column("A").unwrap(), vec![90.0, 100.0]);
        let two_back = engine.query("OPREV_3Y", date(2010, 1, 6), date(2010, 1, 6), None).unwrap();
        assert_eq!(two_back.get(date(2010, 1, 6), "A"), Some(800.0));
    }
}
