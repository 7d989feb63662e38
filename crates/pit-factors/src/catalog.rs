//! Shared pieces of the built-in factor catalog.
//!
//! Raw factors read query ids from the [`DataSource`](crate::DataSource):
//!
//! | query id             | columns                                      |
//! |----------------------|----------------------------------------------|
//! | `LIST_STATUS`        | `code`, `time`, `list_status`                |
//! | `ST_TAG`             | `code`, `time`, `tag`                        |
//! | `INDEX_CONSTITUENTS` | `index_code`, `code`, `time`                 |
//! | `INDEX_WEIGHTS`      | `index_code`, `code`, `time`, `weight`       |
//! | `QUOTE`              | `code`, `time`, `close`, `adj_close`, `total_mktvalue`, `volume`, `high`, `low` |
//! | `INDEX_QUOTE`        | `code`, `time`, `close`                      |
//! | `FUNDAMENTALS`       | `code`, `time`, `ni_ttm`, `oprev_ttm`, `equity`, `total_assets` |
//! | `QUARTERLY_REPORTS`  | `code`, `time`, `period`, `ni_q`, `oprev_q`  |
//! | `ANNUAL_REPORTS`     | `code`, `time`, `period`, `ni`, `oprev`      |
//! | `INDUSTRY`           | `code`, `time`, `industry`                   |
//!
//! Fundamental and report rows are keyed by announcement date; `period` is
//! the end date of the reported period.

use crate::{Result, engine::QueryEngine, panel::Panel};
use chrono::NaiveDate;

/// First session raw extracts are expected to cover.
pub fn data_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2005, 1, 4).unwrap_or(NaiveDate::MIN)
}

/// First date derived factors are served from, leaving them a year of history.
pub fn derived_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2007, 1, 4).unwrap_or(NaiveDate::MIN)
}

/// Query `name` from `lookback` sessions before `start` through `end`.
///
/// The lookback stops at the validity start of `name`.
pub(crate) fn query_with_lookback(
    engine: &mut QueryEngine,
    name: &str,
    start: NaiveDate,
    end: NaiveDate,
    lookback: usize,
) -> Result<Panel> {
    let floor = engine
        .registry()
        .get(name)
        .map_or(NaiveDate::MIN, |d| d.validity_start());
    let from = engine.calendar().shift_back(start, lookback).max(floor);
    engine.query(name, from.min(start), end, None)
}

/// `numerator / denominator`, missing where the denominator is zero.
pub(crate) fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        f64::NAN
    } else {
        numerator / denominator
    }
}
