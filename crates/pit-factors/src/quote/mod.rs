//! Quote factors - daily prices, market value and returns.
//!
//! Quote rows exist only for sessions a stock traded, so these factors are
//! placed on the session grid without any forward filling.

pub mod benchmark;
pub mod daily;
pub mod returns;

pub use benchmark::{BenchmarkClose, BenchmarkCloseConfig};
pub use daily::{DailyField, DailyFieldConfig};
pub use returns::{DailyReturn, DailyReturnConfig};

use crate::{
    catalog::data_start,
    registry::{FactorCategory, FactorDescriptor},
    traits::ConfigurableFactor,
};

fn daily(column: &str) -> DailyField {
    DailyField::with_config(DailyFieldConfig {
        column: column.to_string(),
        ..DailyFieldConfig::default()
    })
}

/// Descriptors of the quote factors.
pub fn descriptors() -> Vec<FactorDescriptor> {
    let raw = [
        FactorDescriptor::new("CLOSE", daily("close")).describe("Unadjusted close"),
        FactorDescriptor::new("ADJ_CLOSE", daily("adj_close")).describe("Split and dividend adjusted close"),
        FactorDescriptor::new("TOTAL_MKTVALUE", daily("total_mktvalue"))
            .describe("Total market value"),
        FactorDescriptor::new("BENCHMARK_CLOSE", BenchmarkClose::default())
            .describe("Benchmark index close, repeated for every code"),
    ];

    let returns = FactorDescriptor::new("DAILY_RET", DailyReturn::default())
        .describe("Close-to-close return of the adjusted price")
        .depends_on(["ADJ_CLOSE"]);

    raw.into_iter()
        .chain([returns])
        .map(|d| d.valid_from(data_start()).in_category(FactorCategory::Quote))
        .collect()
}
