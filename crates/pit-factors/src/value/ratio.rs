//! Cell-wise ratio of two factors.

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

/// Configuration for the Ratio factor.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct RatioConfig {
    /// Numerator factor
    pub numerator: String,
    /// Denominator factor
    pub denominator: String,
}

/// `numerator / denominator`, missing where either side is missing or the
/// denominator is zero.
#[derive(Debug, Clone, Default)]
pub struct Ratio {
    config: RatioConfig,
}

impl Ratio {
    /// Descriptor of a ratio factor declaring both operands as dependencies.
    pub fn descriptor(name: &str, numerator: &str, denominator: &str) -> FactorDescriptor {
        let ratio = Self::with_config(RatioConfig {
            numerator: numerator.to_string(),
            denominator: denominator.to_string(),
        });
        FactorDescriptor::new(name, ratio).depends_on([numerator, denominator])
    }
}

impl ConfigurableFactor for Ratio {
    type Config = RatioConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Compute for Ratio {
    fn compute(
        &self,
        engine: &mut QueryEngine,
        _universe: &Universe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Panel> {
        let numerator = engine.query(&self.config.numerator, start, end, None)?;
        let denominator = engine.query(&self.config.denominator, start, end, None)?;
        numerator.zip_with(&denominator, safe_div)
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::testing::{daily_frame, date, engine, sessions};
    use crate::source::InMemorySource;
    use approx::assert_relative_eq;
    use polars::df;

    fn source() -> InMemorySource {
        let days = sessions(date(2010, 1, 4), date(2010, 1, 8));
        let quotes = daily_frame(
            &days,
            &["A", "B"],
            &[("total_mktvalue", &|t, c| if c == 1 && t == 2 { 0.0 } else { 1000.0 * (c + 1) as f64 })],
        );
        let statements = df! {
            "code" => ["A", "B"],
            "time" => ["2009-10-30", "2009-10-30"],
            "ni_ttm" => [100.0, 50.0],
            "oprev_ttm" => [400.0, 300.0],
            "equity" => [500.0, 250.0],
            "total_assets" => [2000.0, 1000.0],
        }
        .unwrap();
        InMemorySource::new()
            .with("QUOTE", quotes)
            .with("FUNDAMENTALS", statements)
    }

    #[test]
    fn test_earnings_to_price() {
        let mut engine = engine(source(), &["A", "B"], vec![]);
        let ep = engine.query("EP_TTM", date(2010, 1, 4), date(2010, 1, 8), None).unwrap();

        for value in ep.column("A").unwrap() {
            assert_relative_eq!(value, 0.1);
        }
        let b = ep.column("B").unwrap();
        assert_relative_eq!(b[0], 0.025);
        // zero market value
        assert!(b[2].is_nan());

        assert_eq!(engine.compute_count("NI_TTM"), 1);
        assert_eq!(engine.compute_count("TOTAL_MKTVALUE"), 1);
    }

    #[test]
    fn test_shared_operand_is_computed_once() {
        let mut engine = engine(source(), &["A", "B"], vec![]);
        engine.query("BP", date(2010, 1, 4), date(2010, 1, 8), None).unwrap();
        engine.query("SP_TTM", date(2010, 1, 4), date(2010, 1, 8), None).unwrap();
        let roe = engine.query("ROE", date(2010, 1, 5), date(2010, 1, 6), None).unwrap();

        assert_relative_eq!(roe.get(date(2010, 1, 5), "A").unwrap(), 0.2);
        assert_eq!(engine.compute_count("TOTAL_MKTVALUE"), 1);
        assert_eq!(engine.compute_count("EQUITY"), 1);
    }
}
