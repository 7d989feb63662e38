//! Year over year growth of a single-quarter item.

use crate::{
    Result,
    catalog::safe_div,
    engine::QueryEngine,
    panel::Panel,
    registry::FactorDescriptor,
    traits::{Compute, ConfigurableFactor},
    universe::Universe,
};
use chrono::NaiveDate;

/// Configuration for the YearOverYear factor.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct YearOverYearConfig {
    /// Factor holding the latest quarter
    pub current: String,
    /// Factor holding the same quarter one year earlier
    pub year_ago: String,
}

/// `(current - year_ago) / |year_ago|`.
///
/// Dividing by the magnitude keeps the sign meaningful when the base is a
/// loss. Missing where either side is missing or the base is zero.
#[derive(Debug, Clone, Default)]
pub struct YearOverYear {
    config: YearOverYearConfig,
}

impl YearOverYear {
    /// Descriptor declaring both inputs as dependencies.
    pub fn descriptor(name: &str, current: &str, year_ago: &str) -> FactorDescriptor {
        let factor = Self::with_config(YearOverYearConfig {
            current: current.to_string(),
            year_ago: year_ago.to_string(),
        });
        FactorDescriptor::new(name, factor).depends_on([current, year_ago])
    }
}

impl ConfigurableFactor for YearOverYear {
    type Config = YearOverYearConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Compute for YearOverYear {
    fn compute(
        &self,
        engine: &mut QueryEngine,
        _universe: &Universe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Panel> {
        let current = engine.query(&self.config.current, start, end, None)?;
        let year_ago = engine.query(&self.config.year_ago, start, end, None)?;
        current.zip_with(&year_ago, |now, before| safe_div(now - before, before.abs()))
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::testing::{date, engine};
    use crate::source::InMemorySource;
    use approx::assert_relative_eq;
    use polars::df;

    #[test]
    fn test_growth_against_same_quarter() {
        let quarterly = df! {
            "code" => ["A", "A", "B", "B", "C", "C"],
            "time" => ["2009-01-20", "2010-01-20", "2009-01-20", "2010-01-20", "2009-01-20", "2010-01-20"],
            "period" => ["2008-12-31", "2009-12-31", "2008-12-31", "2009-12-31", "2008-12-31", "2009-12-31"],
            "ni_q" => [100.0, 120.0, -50.0, -25.0, 0.0, 10.0],
            "oprev_q" => [1000.0, 900.0, 500.0, 600.0, 100.0, 110.0],
        }
        .unwrap();
        let mut engine = engine(
            InMemorySource::new().with("QUARTERLY_REPORTS", quarterly),
            &["A", "B", "C"],
            vec![],
        );

        let ni = engine.query("NI_YOY", date(2010, 2, 1), date(2010, 2, 5), None).unwrap();
        assert_relative_eq!(ni.get(date(2010, 2, 1), "A").unwrap(), 0.2);
        // a shrinking loss is positive growth
        assert_relative_eq!(ni.get(date(2010, 2, 1), "B").unwrap(), 0.5);
        // zero base
        assert!(ni.get(date(2010, 2, 1), "C").unwrap().is_nan());

        let rev = engine.query("OPREV_YOY", date(2010, 2, 1), date(2010, 2, 1), None).unwrap();
        assert_relative_eq!(rev.get(date(2010, 2, 1), "A").unwrap(), -0.1);
        assert_eq!(engine.compute_count("NI_1S"), 1);
    }
}
