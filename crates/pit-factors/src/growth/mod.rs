//! Growth factors - statement growth rates.
//!
//! Growth is measured on report periods rather than sessions: the year over
//! year rates compare the latest quarter with the same quarter a year
//! earlier, and the trend rates fit a line through several fiscal years.
//! Their inputs reach back years before the requested start through the
//! report history known on each session.

pub mod trend;
pub mod yoy;

pub use trend::{TrendGrowth, TrendGrowthConfig};
pub use yoy::{YearOverYear, YearOverYearConfig};

use crate::{
    catalog::derived_start,
    fundamental::ANNUAL_DEPTH,
    registry::{FactorCategory, FactorDescriptor},
};

/// Descriptors of the growth factors.
pub fn descriptors() -> Vec<FactorDescriptor> {
    [
        YearOverYear::descriptor("OPREV_YOY", "OPREV_1S", "OPREV_5S")
            .describe("Single-quarter operating revenue growth over the same quarter a year earlier"),
        YearOverYear::descriptor("NI_YOY", "NI_1S", "NI_5S")
            .describe("Single-quarter net income growth over the same quarter a year earlier"),
        TrendGrowth::descriptor("NI_5YG", "NI", ANNUAL_DEPTH)
            .describe("Slope of net income over the last five fiscal years, relative to their mean"),
        TrendGrowth::descriptor("OPREV_5YG", "OPREV", ANNUAL_DEPTH)
            .describe("Slope of operating revenue over the last five fiscal years, relative to their mean"),
    ]
    .into_iter()
    .map(|d| d.valid_from(derived_start()).in_category(FactorCategory::Growth))
    .collect()
}
