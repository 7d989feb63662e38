//! Point-in-time alignment of irregular events onto trading dates.
//!
//! Raw events (statement announcements, index rebalances, status changes)
//! arrive on arbitrary timestamps. [`map_events`] forward-fills them onto a
//! target date grid and, unless the event is effective immediately, delays
//! visibility by one position so no value is seen on the date it was produced.

use crate::{
    Result,
    panel::Panel,
    source::{events_by_code, label_events_by_code, report_events_by_code},
};
use chrono::{Datelike, NaiveDate};
use derive_more::Display;
use polars::prelude::DataFrame;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// How to resolve several events of one entity sharing a timestamp.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// The event supplied last wins
    #[default]
    LastArrival,
    /// The largest value wins
    Max,
}

/// Collapse same-timestamp events according to `tie_break`.
///
/// The output is sorted by timestamp with one event per timestamp.
pub fn resolve_ties(events: &[(NaiveDate, f64)], tie_break: TieBreak) -> Vec<(NaiveDate, f64)> {
    let mut sorted = events.to_vec();
    sorted.sort_by_key(|(t, _)| *t);

    let mut out: Vec<(NaiveDate, f64)> = Vec::with_capacity(sorted.len());
    for (t, v) in sorted {
        match out.last_mut() {
            Some((last_t, last_v)) if *last_t == t => {
                *last_v = match tie_break {
                    TieBreak::LastArrival => v,
                    TieBreak::Max => last_v.max(v),
                };
            }
            _ => out.push((t, v)),
        }
    }
    out
}

/// Map raw `(timestamp, value)` events onto `target_dates`.
///
/// `target_dates` must be ascending. Each target date takes the value of the
/// most recent event at or before it. When `effective_immediately` is false
/// every value is shifted one position later along the combined index of
/// pre-window event timestamps and target dates, so a value only becomes
/// visible strictly after the date it is attached to. Dates before the first
/// event are missing; an empty event list yields an all-missing result.
///
/// Events sharing a timestamp resolve to the one supplied last.
pub fn map_events(
    events: &[(NaiveDate, f64)],
    target_dates: &[NaiveDate],
    effective_immediately: bool,
) -> Vec<f64> {
    let Some(&first) = target_dates.first() else {
        return Vec::new();
    };

    let mut sorted = events.to_vec();
    // stable, so the last supplied of equal timestamps is applied last
    sorted.sort_by_key(|(t, _)| *t);

    let combined: Vec<NaiveDate> = sorted
        .iter()
        .map(|(t, _)| *t)
        .filter(|t| *t < first)
        .chain(target_dates.iter().copied())
        .collect();

    let mut filled = Vec::with_capacity(combined.len());
    let mut cursor = 0;
    let mut current = f64::NAN;
    for t in &combined {
        while cursor < sorted.len() && sorted[cursor].0 <= *t {
            current = sorted[cursor].1;
            cursor += 1;
        }
        filled.push(current);
    }

    let offset = combined.len() - target_dates.len();
    (offset..combined.len())
        .map(|p| match (effective_immediately, p) {
            (true, _) => filled[p],
            (false, 0) => f64::NAN,
            (false, _) => filled[p - 1],
        })
        .collect()
}

/// Align one value column of a raw frame, entity by entity.
///
/// The result has one column per code present in `raw`, in sorted order;
/// callers restrict it to their universe.
pub fn align_frame(
    raw: &DataFrame,
    value_column: &str,
    target_dates: &[NaiveDate],
    effective_immediately: bool,
    tie_break: TieBreak,
) -> Result<Panel> {
    let grouped = events_by_code(raw, value_column)?;
    let columns: BTreeMap<String, Vec<f64>> = grouped
        .into_iter()
        .map(|(code, events)| {
            let events = match tie_break {
                TieBreak::LastArrival => events,
                TieBreak::Max => resolve_ties(&events, TieBreak::Max),
            };
            let aligned = map_events(&events, target_dates, effective_immediately);
            (code, aligned)
        })
        .collect();
    Panel::from_column_map(target_dates.to_vec(), columns)
}

/// Align one string column of a raw frame as a categorical panel.
///
/// Same-timestamp events resolve to the one supplied last, and a null or
/// empty label reads as missing from its timestamp on.
pub fn align_labels(
    raw: &DataFrame,
    label_column: &str,
    target_dates: &[NaiveDate],
    effective_immediately: bool,
) -> Result<Panel> {
    let (categories, grouped) = label_events_by_code(raw, label_column)?;
    let columns: BTreeMap<String, Vec<f64>> = grouped
        .into_iter()
        .map(|(code, events)| (code, map_events(&events, target_dates, effective_immediately)))
        .collect();
    Ok(Panel::from_column_map(target_dates.to_vec(), columns)?.with_categories(categories))
}

/// Report spacing and offset for [`align_reports`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportLag {
    /// Months between consecutive report periods (3 quarterly, 12 annual)
    pub period_months: u32,
    /// Periods back from the latest period reported so far
    pub lag: u32,
}

fn month_key(period: NaiveDate) -> i64 {
    i64::from(period.year()) * 12 + i64::from(period.month0())
}

/// Align periodic reports so each date sees the value of the period
/// `lag` periods before the latest period reported so far.
///
/// Periods match by year and month. A later announcement for a period
/// replaces the value known for it. Visibility of announcements follows
/// [`map_events`]; a date whose target period was never reported is missing.
pub fn align_reports(
    raw: &DataFrame,
    period_column: &str,
    value_column: &str,
    target_dates: &[NaiveDate],
    report_lag: ReportLag,
    effective_immediately: bool,
) -> Result<Panel> {
    let offset = i64::from(report_lag.lag) * i64::from(report_lag.period_months);
    let columns: BTreeMap<String, Vec<f64>> = report_events_by_code(raw, period_column, value_column)?
        .into_iter()
        .map(|(code, mut reports)| {
            reports.sort_by_key(|(announced, _, _)| *announced);
            let markers: Vec<(NaiveDate, f64)> = reports
                .iter()
                .enumerate()
                .map(|(i, (announced, _, _))| (*announced, i as f64))
                .collect();
            let mut known: BTreeMap<i64, f64> = BTreeMap::new();
            let mut applied = 0;
            let values = map_events(&markers, target_dates, effective_immediately)
                .into_iter()
                .map(|last| {
                    if !last.is_nan() {
                        while applied <= last as usize {
                            let (_, period, value) = reports[applied];
                            known.insert(month_key(period), value);
                            applied += 1;
                        }
                    }
                    known
                        .last_key_value()
                        .and_then(|(latest, _)| known.get(&(latest - offset)))
                        .copied()
                        .unwrap_or(f64::NAN)
                })
                .collect();
            (code, values)
        })
        .collect();
    Panel::from_column_map(target_dates.to_vec(), columns)
}

/// Align a frame of full cross-sectional snapshots (index membership, weights).
///
/// Each distinct timestamp is one snapshot replacing the previous one as a
/// whole, so a code absent from the latest snapshot is missing even if an
/// older snapshot listed it.
pub fn align_snapshots(
    raw: &DataFrame,
    value_column: &str,
    target_dates: &[NaiveDate],
    effective_immediately: bool,
) -> Result<Panel> {
    let grouped = events_by_code(raw, value_column)?;
    let snapshots: Vec<NaiveDate> = grouped
        .values()
        .flatten()
        .map(|(t, _)| *t)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let markers: Vec<(NaiveDate, f64)> = snapshots
        .iter()
        .enumerate()
        .map(|(i, t)| (*t, i as f64))
        .collect();
    let active: Vec<Option<NaiveDate>> = map_events(&markers, target_dates, effective_immediately)
        .into_iter()
        .map(|pos| (!pos.is_nan()).then(|| snapshots[pos as usize]))
        .collect();

    let columns: BTreeMap<String, Vec<f64>> = grouped
        .into_iter()
        .map(|(code, events)| {
            let by_time: HashMap<NaiveDate, f64> = events.into_iter().collect();
            let values = active
                .iter()
                .map(|snapshot| {
                    snapshot
                        .and_then(|t| by_time.get(&t).copied())
                        .unwrap_or(f64::NAN)
                })
                .collect();
            (code, values)
        })
        .collect();
    Panel::from_column_map(target_dates.to_vec(), columns)
}

/// Place daily rows on `target_dates` without any filling.
///
/// Dates without a row for a code stay missing; rows off the grid are dropped.
pub fn pivot_frame(raw: &DataFrame, value_column: &str, target_dates: &[NaiveDate]) -> Result<Panel> {
    let columns: BTreeMap<String, Vec<f64>> = events_by_code(raw, value_column)?
        .into_iter()
        .map(|(code, events)| {
            let by_time: HashMap<NaiveDate, f64> = events.into_iter().collect();
            let values = target_dates
                .iter()
                .map(|d| by_time.get(d).copied().unwrap_or(f64::NAN))
                .collect();
            (code, values)
        })
        .collect();
    Panel::from_column_map(target_dates.to_vec(), columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{TradingCalendar, WeekdayCalendar};
    use polars::df;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn jan_feb_2010() -> Vec<NaiveDate> {
        WeekdayCalendar::new().trading_dates(date(2010, 1, 1), date(2010, 2, 28))
    }

    fn two_events() -> Vec<(NaiveDate, f64)> {
        vec![(date(2010, 1, 1), 1.0), (date(2010, 2, 1), 2.0)]
    }

    #[test]
    fn test_no_lookahead_when_not_immediate() {
        let days = jan_feb_2010();
        let aligned = map_events(&two_events(), &days, false);

        for (day, value) in days.iter().zip(&aligned) {
            if *day == date(2010, 1, 1) {
                assert!(value.is_nan(), "event day itself must not see the value");
            } else if *day <= date(2010, 2, 1) {
                assert_eq!(*value, 1.0, "on {day}");
            } else {
                assert_eq!(*value, 2.0, "on {day}");
            }
        }
    }

    #[test]
    fn test_immediate_effectiveness() {
        let days = jan_feb_2010();
        let aligned = map_events(&two_events(), &days, true);

        for (day, value) in days.iter().zip(&aligned) {
            let expected = if *day < date(2010, 2, 1) { 1.0 } else { 2.0 };
            assert_eq!(*value, expected, "on {day}");
        }
    }

    #[test]
    fn test_prior_history_carries_into_window() {
        let events = vec![(date(2009, 6, 30), 5.0), (date(2009, 12, 31), 7.0)];
        let days = vec![date(2010, 1, 4), date(2010, 1, 5)];
        assert_eq!(map_events(&events, &days, false), vec![7.0, 7.0]);
        assert_eq!(map_events(&events, &days, true), vec![7.0, 7.0]);
    }

    #[test]
    fn test_unsorted_input_and_dates_before_first_event() {
        let events = vec![(date(2010, 1, 6), 3.0), (date(2010, 1, 4), 1.0)];
        let days = vec![date(2010, 1, 1), date(2010, 1, 4), date(2010, 1, 5), date(2010, 1, 6), date(2010, 1, 7)];
        let aligned = map_events(&events, &days, true);
        assert!(aligned[0].is_nan());
        assert_eq!(&aligned[1..], &[1.0, 1.0, 3.0, 3.0]);
    }

    #[test]
    fn test_empty_events_are_all_missing() {
        let days = jan_feb_2010();
        let aligned = map_events(&[], &days, false);
        assert_eq!(aligned.len(), days.len());
        assert!(aligned.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_same_timestamp_last_arrival_wins() {
        let events = vec![(date(2010, 1, 4), 9.0), (date(2010, 1, 4), 2.0)];
        let days = vec![date(2010, 1, 4)];
        assert_eq!(map_events(&events, &days, true), vec![2.0]);
    }

    #[test]
    fn test_resolve_ties_max() {
        let events = vec![(date(2010, 1, 4), 9.0), (date(2010, 1, 1), 1.0), (date(2010, 1, 4), 2.0)];
        assert_eq!(
            resolve_ties(&events, TieBreak::Max),
            vec![(date(2010, 1, 1), 1.0), (date(2010, 1, 4), 9.0)]
        );
        assert_eq!(
            resolve_ties(&events, TieBreak::LastArrival),
            vec![(date(2010, 1, 1), 1.0), (date(2010, 1, 4), 2.0)]
        );
    }

    #[test]
    fn test_align_frame_per_code() {
        let raw = df! {
            "code" => ["B", "A", "A"],
            "time" => ["2010-01-05", "2010-01-01", "2010-01-05"],
            "status" => [4, 1, 2],
        }
        .unwrap();
        let days = vec![date(2010, 1, 4), date(2010, 1, 5), date(2010, 1, 6)];
        let panel = align_frame(&raw, "status", &days, true, TieBreak::LastArrival).unwrap();

        assert_eq!(panel.columns(), &["A".to_string(), "B".to_string()]);
        assert_eq!(panel.column("A").unwrap(), vec![1.0, 2.0, 2.0]);
        let b = panel.column("B").unwrap();
        assert!(b[0].is_nan());
        assert_eq!(&b[1..], &[4.0, 4.0]);
    }

    #[test]
    fn test_align_labels_delays_reclassification() {
        let raw = df! {
            "code" => ["A", "A", "B"],
            "time" => ["2009-12-31", "2010-01-05", "2009-12-31"],
            "industry" => ["Steel", "Banks", "Media"],
        }
        .unwrap();
        let days = vec![date(2010, 1, 4), date(2010, 1, 5), date(2010, 1, 6)];
        let panel = align_labels(&raw, "industry", &days, false).unwrap();

        assert_eq!(panel.categories().unwrap().labels(), &["Banks", "Media", "Steel"]);
        assert_eq!(panel.label(date(2010, 1, 5), "A"), Some("Steel"));
        assert_eq!(panel.label(date(2010, 1, 6), "A"), Some("Banks"));
        assert_eq!(panel.label(date(2010, 1, 4), "B"), Some("Media"));

        let immediate = align_labels(&raw, "industry", &days, true).unwrap();
        assert_eq!(immediate.label(date(2010, 1, 5), "A"), Some("Banks"));
    }

    fn quarterly_reports() -> DataFrame {
        df! {
            "code" => ["A", "A", "A", "A", "A", "A"],
            "time" => ["2009-04-20", "2009-08-20", "2009-10-20", "2010-01-04", "2010-01-06", "2010-01-06"],
            "period" => ["2009-03-31", "2009-06-30", "2009-09-30", "2008-12-31", "2009-12-31", "2008-12-31"],
            "ni_q" => [10.0, 11.0, 12.0, 8.0, 13.0, 9.0],
        }
        .unwrap()
    }

    #[test]
    fn test_align_reports_tracks_latest_period() {
        let days = vec![date(2010, 1, 4), date(2010, 1, 5), date(2010, 1, 6), date(2010, 1, 7)];
        let latest = ReportLag { period_months: 3, lag: 0 };
        let panel = align_reports(&quarterly_reports(), "period", "ni_q", &days, latest, false).unwrap();
        // the late 2008 filing does not move the latest period back
        assert_eq!(panel.column("A").unwrap(), vec![12.0, 12.0, 12.0, 13.0]);
    }

    #[test]
    fn test_align_reports_year_ago_quarter() {
        let days = vec![date(2010, 1, 4), date(2010, 1, 5), date(2010, 1, 6), date(2010, 1, 7)];
        let year_ago = ReportLag { period_months: 3, lag: 4 };
        let panel = align_reports(&quarterly_reports(), "period", "ni_q", &days, year_ago, false).unwrap();
        let a = panel.column("A").unwrap();
        // 2008-09-30 was never reported
        assert!(a[..3].iter().all(|v| v.is_nan()));
        // restated 2008-12-31 value, announced with the 2009 annual report
        assert_eq!(a[3], 9.0);
    }

    #[test]
    fn test_snapshots_replace_membership() {
        let raw = df! {
            "code" => ["A", "B", "A", "C"],
            "time" => ["2010-01-04", "2010-01-04", "2010-01-06", "2010-01-06"],
            "member" => [1.0, 1.0, 1.0, 1.0],
        }
        .unwrap();
        let days = vec![date(2010, 1, 1), date(2010, 1, 4), date(2010, 1, 5), date(2010, 1, 6)];
        let panel = align_snapshots(&raw, "member", &days, true).unwrap();

        assert!(panel.get(date(2010, 1, 1), "A").unwrap().is_nan());
        assert_eq!(panel.get(date(2010, 1, 5), "B"), Some(1.0));
        assert!(panel.get(date(2010, 1, 6), "B").unwrap().is_nan());
        assert_eq!(panel.get(date(2010, 1, 6), "C"), Some(1.0));
        assert_eq!(panel.get(date(2010, 1, 6), "A"), Some(1.0));
    }

    #[test]
    fn test_pivot_frame_does_not_fill() {
        let raw = df! {
            "code" => ["A", "A"],
            "time" => ["2010-01-04", "2010-01-06"],
            "close" => [10.0, 11.0],
        }
        .unwrap();
        let days = vec![date(2010, 1, 4), date(2010, 1, 5), date(2010, 1, 6)];
        let panel = pivot_frame(&raw, "close", &days).unwrap();
        let a = panel.column("A").unwrap();
        assert_eq!(a[0], 10.0);
        assert!(a[1].is_nan());
        assert_eq!(a[2], 11.0);
    }
}
