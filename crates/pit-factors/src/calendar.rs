//! Trading calendar providers.
//!
//! Every panel is indexed by the sessions a [`TradingCalendar`] reports. The
//! engine never invents dates on its own: completeness checks, lookback
//! widening and range extension all go through this trait.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::BTreeSet;

/// Upper bound on how far back a session search will look (about forty years).
const MAX_SEARCH_DAYS: u64 = 40 * 366;

/// Source of valid trading sessions.
pub trait TradingCalendar: Send + Sync + std::fmt::Debug {
    /// Ordered, deduplicated sessions in `[start, end]` (inclusive).
    ///
    /// Returns an empty vector when `start > end`.
    fn trading_dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate>;

    /// Whether `date` is a trading session.
    fn is_trading_day(&self, date: NaiveDate) -> bool {
        self.trading_dates(date, date).first() == Some(&date)
    }

    /// The session `sessions` steps before the last session on or before `date`.
    ///
    /// `shift_back(d, 0)` is the last session on or before `d`. When the
    /// calendar runs out of history the earliest known session is returned,
    /// or `date` itself if there is none.
    fn shift_back(&self, date: NaiveDate, sessions: usize) -> NaiveDate {
        let mut span = sessions as u64 * 2 + 10;
        loop {
            let lo = date - Days::new(span);
            let dates = self.trading_dates(lo, date);
            if dates.len() > sessions {
                return dates[dates.len() - 1 - sessions];
            }
            if span >= MAX_SEARCH_DAYS {
                return dates.first().copied().unwrap_or(date);
            }
            span = (span * 2).min(MAX_SEARCH_DAYS);
        }
    }

    /// Latest session strictly before `date`.
    fn previous(&self, date: NaiveDate) -> Option<NaiveDate> {
        let mut span = 16;
        let end = date.pred_opt()?;
        loop {
            let dates = self.trading_dates(end - Days::new(span), end);
            if let Some(last) = dates.last() {
                return Some(*last);
            }
            if span >= MAX_SEARCH_DAYS {
                return None;
            }
            span = (span * 4).min(MAX_SEARCH_DAYS);
        }
    }

    /// Earliest session strictly after `date`.
    fn next(&self, date: NaiveDate) -> Option<NaiveDate> {
        let mut span = 16;
        let start = date.succ_opt()?;
        loop {
            let dates = self.trading_dates(start, start + Days::new(span));
            if let Some(first) = dates.first() {
                return Some(*first);
            }
            if span >= MAX_SEARCH_DAYS {
                return None;
            }
            span = (span * 4).min(MAX_SEARCH_DAYS);
        }
    }
}

/// Monday to Friday sessions minus an explicit holiday list.
#[derive(Debug, Clone, Default)]
pub struct WeekdayCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl WeekdayCalendar {
    /// Create a calendar with no holidays.
    pub const fn new() -> Self {
        Self {
            holidays: BTreeSet::new(),
        }
    }

    /// Create a calendar that skips the given holidays.
    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }
}

impl TradingCalendar for WeekdayCalendar {
    fn trading_dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        if start > end {
            return Vec::new();
        }
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .filter(|d| !self.holidays.contains(d))
            .collect()
    }
}

/// Calendar backed by an explicit list of sessions.
#[derive(Debug, Clone, Default)]
pub struct FixedCalendar {
    sessions: Vec<NaiveDate>,
}

impl FixedCalendar {
    /// Build from any collection of dates; input order and duplicates do not matter.
    pub fn new(sessions: impl IntoIterator<Item = NaiveDate>) -> Self {
        let mut sessions: Vec<NaiveDate> = sessions.into_iter().collect();
        sessions.sort_unstable();
        sessions.dedup();
        Self { sessions }
    }
}

impl TradingCalendar for FixedCalendar {
    fn trading_dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        if start > end {
            return Vec::new();
        }
        let lo = self.sessions.partition_point(|d| *d < start);
        let hi = self.sessions.partition_point(|d| *d <= end);
        self.sessions[lo..hi].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    // 2010-01-01 is a Friday
    #[case(date(2010, 1, 1), date(2010, 1, 1), 1)]
    #[case(date(2010, 1, 2), date(2010, 1, 3), 0)]
    #[case(date(2010, 1, 1), date(2010, 1, 31), 21)]
    #[case(date(2010, 1, 5), date(2010, 1, 4), 0)]
    fn test_weekday_calendar_counts(
        #[case] start: NaiveDate,
        #[case] end: NaiveDate,
        #[case] expected: usize,
    ) {
        let cal = WeekdayCalendar::new();
        assert_eq!(cal.trading_dates(start, end).len(), expected);
    }

    #[test]
    fn test_weekday_calendar_holidays() {
        let cal = WeekdayCalendar::with_holidays([date(2010, 1, 1)]);
        let dates = cal.trading_dates(date(2010, 1, 1), date(2010, 1, 5));
        assert_eq!(dates, vec![date(2010, 1, 4), date(2010, 1, 5)]);
        assert!(!cal.is_trading_day(date(2010, 1, 1)));
    }

    #[test]
    fn test_shift_back() {
        let cal = WeekdayCalendar::new();
        // Monday 2010-01-11 minus 5 sessions is Monday 2010-01-04
        assert_eq!(cal.shift_back(date(2010, 1, 11), 5), date(2010, 1, 4));
        // a weekend date rolls back to Friday first
        assert_eq!(cal.shift_back(date(2010, 1, 10), 0), date(2010, 1, 8));
        assert_eq!(cal.shift_back(date(2010, 12, 31), 252), date(2010, 1, 13));
    }

    #[test]
    fn test_previous_and_next() {
        let cal = WeekdayCalendar::new();
        assert_eq!(cal.previous(date(2010, 1, 4)), Some(date(2010, 1, 1)));
        assert_eq!(cal.next(date(2010, 1, 1)), Some(date(2010, 1, 4)));
    }

    #[test]
    fn test_fixed_calendar() {
        let cal = FixedCalendar::new([date(2010, 1, 5), date(2010, 1, 1), date(2010, 1, 5)]);
        assert_eq!(
            cal.trading_dates(date(2009, 1, 1), date(2011, 1, 1)),
            vec![date(2010, 1, 1), date(2010, 1, 5)]
        );
        assert_eq!(cal.previous(date(2010, 1, 1)), None);
        assert_eq!(cal.shift_back(date(2010, 1, 5), 3), date(2010, 1, 1));
    }
}
