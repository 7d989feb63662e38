//! Value factors - fundamentals relative to market value.

pub mod ratio;

pub use ratio::{Ratio, RatioConfig};

use crate::{
    catalog::derived_start,
    registry::{FactorCategory, FactorDescriptor},
};

const RATIOS: [(&str, &str, &str, &str); 3] = [
    ("EP_TTM", "NI_TTM", "TOTAL_MKTVALUE", "Earnings to price, trailing twelve months"),
    ("BP", "EQUITY", "TOTAL_MKTVALUE", "Book to price"),
    ("SP_TTM", "OPREV_TTM", "TOTAL_MKTVALUE", "Sales to price, trailing twelve months"),
];

/// Descriptors of the value factors.
pub fn descriptors() -> Vec<FactorDescriptor> {
    RATIOS
        .into_iter()
        .map(|(name, numerator, denominator, description)| {
            Ratio::descriptor(name, numerator, denominator)
                .describe(description)
                .valid_from(derived_start())
                .in_category(FactorCategory::Value)
        })
        .collect()
}
