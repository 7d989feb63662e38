//! Higher moments of daily returns.

use crate::{
    Result,
    catalog::query_with_lookback,
    engine::QueryEngine,
    panel::Panel,
    rolling::RollingMoments,
    traits::{Compute, ConfigurableFactor},
    universe::Universe,
};
use chrono::NaiveDate;
use derive_more::Display;

/// Which windowed moment to report.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MomentStat {
    /// Bias-corrected skewness
    #[default]
    Skew,
    /// Bias-corrected excess kurtosis
    Kurtosis,
}

/// Configuration for the ReturnMoment factor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ReturnMomentConfig {
    /// Daily return factor
    pub returns: String,
    /// Window in sessions; every return in it must be observed (default: 20)
    pub window: usize,
    /// Reported statistic
    pub stat: MomentStat,
}

impl Default for ReturnMomentConfig {
    fn default() -> Self {
        Self {
            returns: "DAILY_RET".to_string(),
            window: 20,
            stat: MomentStat::Skew,
        }
    }
}

/// Windowed skewness or kurtosis of daily returns.
#[derive(Debug, Clone, Default)]
pub struct ReturnMoment {
    config: ReturnMomentConfig,
}

impl ConfigurableFactor for ReturnMoment {
    type Config = ReturnMomentConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

impl Compute for ReturnMoment {
    fn compute(
        &self,
        engine: &mut QueryEngine,
        _universe: &Universe,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Panel> {
        let window = self.config.window;
        let returns = query_with_lookback(engine, &self.config.returns, start, end, window.saturating_sub(1))?;
        let stat = match self.config.stat {
            MomentStat::Skew => RollingMoments::skew,
            MomentStat::Kurtosis => RollingMoments::kurt,
        };
        let moments = returns.map_columns(|series| RollingMoments::new(series, window, window).collect(stat))?;
        Ok(moments.slice(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{daily_frame, date, engine, sessions};
    use crate::registry::FactorDescriptor;
    use crate::source::InMemorySource;
    use approx::assert_relative_eq;
    use rstest::rstest;

    // returns cycle through +1%, +1%, -2%, so every 3-session window has the
    // same sample
    fn source() -> InMemorySource {
        let days = sessions(date(2010, 1, 1), date(2010, 2, 26));
        let quotes = daily_frame(
            &days,
            &["A"],
            &[(
                "adj_close",
                &|t, _| {
                    (1..=t).fold(10.0, |p, s| p * if s % 3 == 0 { 0.98 } else { 1.01 })
                },
            )],
        );
        InMemorySource::new().with("QUOTE", quotes)
    }

    fn sample_skew(sample: &[f64]) -> f64 {
        let n = sample.len() as f64;
        let mean = sample.iter().sum::<f64>() / n;
        let m2 = sample.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let m3 = sample.iter().map(|x| (x - mean).powi(3)).sum::<f64>() / n;
        (n * (n - 1.0)).sqrt() / (n - 2.0) * m3 / m2.powf(1.5)
    }

    #[rstest]
    #[case(MomentStat::Skew)]
    #[case(MomentStat::Kurtosis)]
    fn test_return_moments(#[case] stat: MomentStat) {
        let factor = ReturnMoment::with_config(ReturnMomentConfig {
            window: 6,
            stat,
            ..ReturnMomentConfig::default()
        });
        let mut engine = engine(
            source(),
            &["A"],
            vec![FactorDescriptor::new("MOMENT", factor).depends_on(["DAILY_RET"])],
        );
        let panel = engine.query("MOMENT", date(2010, 2, 1), date(2010, 2, 12), None).unwrap();
        let values = panel.column("A").unwrap();
        assert_eq!(values.len(), 10);

        let sample = [0.01, 0.01, -0.02, 0.01, 0.01, -0.02];
        let expected = match stat {
            MomentStat::Skew => sample_skew(&sample),
            // two outliers against four equal values
            MomentStat::Kurtosis => RollingMoments::new(&sample, 6, 6).kurt(5),
        };
        for value in values {
            assert_relative_eq!(value, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_default_windows_are_registered() {
        let mut engine = engine(source(), &["A"], vec![]);
        let skew = engine.query("SKEW_1M", date(2010, 2, 1), date(2010, 2, 5), None).unwrap();
        assert!(skew.column("A").unwrap().iter().all(|v| v.is_finite()));
        assert_eq!(engine.compute_count("DAILY_RET"), 1);
    }
}
