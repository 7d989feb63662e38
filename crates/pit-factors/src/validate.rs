//! Panel invariants checked before anything is cached or returned.

use crate::{FactorError, Result, calendar::TradingCalendar, panel::Panel};
use chrono::NaiveDate;
use std::collections::HashMap;

/// First trading date in `[start, end]` without a row holding a non-missing value.
fn first_gap(
    panel: &Panel,
    start: NaiveDate,
    end: NaiveDate,
    calendar: &dyn TradingCalendar,
) -> Option<NaiveDate> {
    let rows: HashMap<NaiveDate, usize> = panel
        .index()
        .iter()
        .enumerate()
        .map(|(i, d)| (*d, i))
        .collect();
    calendar
        .trading_dates(start, end)
        .into_iter()
        .find(|date| rows.get(date).is_none_or(|&i| !panel.row_has_value(i)))
}

/// Whether every session in `[start, end]` appears with at least one value.
///
/// A fully missing row signals an upstream data gap.
pub fn check_completeness(
    panel: &Panel,
    start: NaiveDate,
    end: NaiveDate,
    calendar: &dyn TradingCalendar,
) -> bool {
    first_gap(panel, start, end, calendar).is_none()
}

/// Position of the first row whose date does not exceed its predecessor.
fn first_inversion(panel: &Panel) -> Option<usize> {
    panel
        .index()
        .windows(2)
        .position(|pair| pair[0] >= pair[1])
        .map(|i| i + 1)
}

/// Whether row dates are strictly increasing.
pub fn check_index_order(panel: &Panel) -> bool {
    first_inversion(panel).is_none()
}

/// [`check_completeness`] as an error naming the first missing session.
pub fn ensure_complete(
    factor: &str,
    panel: &Panel,
    start: NaiveDate,
    end: NaiveDate,
    calendar: &dyn TradingCalendar,
) -> Result<()> {
    match first_gap(panel, start, end, calendar) {
        Some(date) => Err(FactorError::Incomplete {
            factor: factor.to_string(),
            date,
        }),
        None => Ok(()),
    }
}

/// [`check_index_order`] as an error naming the inversion.
pub fn ensure_index_order(factor: &str, panel: &Panel) -> Result<()> {
    match first_inversion(panel) {
        Some(i) => Err(FactorError::IndexOrder {
            factor: factor.to_string(),
            previous: panel.index()[i - 1],
            next: panel.index()[i],
        }),
        None => Ok(()),
    }
}
