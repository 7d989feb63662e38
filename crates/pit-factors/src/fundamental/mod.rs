//! Fundamental factors - financial statement fields.
//!
//! Statement rows are keyed by announcement date. An announcement may land
//! after the close, so a value only becomes visible on the session after the
//! one it was announced on.

pub mod report;
pub mod statement;

pub use report::{PeriodReport, PeriodReportConfig};
pub use statement::{StatementField, StatementFieldConfig};

use crate::{
    catalog::data_start,
    registry::{FactorCategory, FactorDescriptor},
    traits::ConfigurableFactor,
};

const FIELDS: [(&str, &str, &str); 4] = [
    ("NI_TTM", "ni_ttm", "Net income attributable to the parent, trailing twelve months"),
    ("OPREV_TTM", "oprev_ttm", "Operating revenue, trailing twelve months"),
    ("EQUITY", "equity", "Shareholders' equity attributable to the parent"),
    ("TA", "total_assets", "Total assets"),
];

/// Report items with per-period factors: name prefix, quarterly column,
/// annual column.
const REPORT_ITEMS: [(&str, &str, &str); 2] = [
    ("NI", "ni_q", "ni"),
    ("OPREV", "oprev_q", "oprev"),
];

/// Years of annual reports exposed as `<item>_<n>Y`.
pub const ANNUAL_DEPTH: u32 = 5;

fn period_report(name: String, query_id: &str, column: &str, period_months: u32, lag: u32) -> FactorDescriptor {
    let factor = PeriodReport::with_config(PeriodReportConfig {
        query_id: query_id.to_string(),
        column: column.to_string(),
        period_months,
        lag,
        ..PeriodReportConfig::default()
    });
    FactorDescriptor::new(name, factor)
}

/// Descriptors of the fundamental factors.
pub fn descriptors() -> Vec<FactorDescriptor> {
    let mut out: Vec<FactorDescriptor> = FIELDS
        .into_iter()
        .map(|(name, column, description)| {
            let factor = StatementField::with_config(StatementFieldConfig {
                column: column.to_string(),
                ..StatementFieldConfig::default()
            });
            FactorDescriptor::new(name, factor).describe(description)
        })
        .collect();
    for (item, quarterly, annual) in REPORT_ITEMS {
        out.push(
            period_report(format!("{item}_1S"), "QUARTERLY_REPORTS", quarterly, 3, 0)
                .describe(format!("{item}, latest single quarter")),
        );
        out.push(
            period_report(format!("{item}_5S"), "QUARTERLY_REPORTS", quarterly, 3, 4)
                .describe(format!("{item}, same quarter one year before the latest")),
        );
        for n in 1..=ANNUAL_DEPTH {
            out.push(
                period_report(format!("{item}_{n}Y"), "ANNUAL_REPORTS", annual, 12, n - 1)
                    .describe(format!("{item}, fiscal year {n} back counting the latest as 1")),
            );
        }
    }
    out.into_iter()
        .map(|d| d.valid_from(data_start()).in_category(FactorCategory::Fundamental))
        .collect()
}
