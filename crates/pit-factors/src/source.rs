//! Raw-data adapters.
//!
//! A [`DataSource`] answers a query id with a frame of raw rows. Every frame
//! follows one convention: a `code` column with the entity code, a `time`
//! column holding `YYYY-MM-DD` strings, and any number of value columns.
//! Index-level extracts (constituents, weights) add an `index_code` column.
//! Timestamps are neither required to be trading dates nor sorted.

use crate::{FactorError, Result, categorical::Categories};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Entity code column of a raw frame.
pub const CODE_COLUMN: &str = "code";
/// Event timestamp column of a raw frame.
pub const TIME_COLUMN: &str = "time";
/// Owning index column of index-level frames.
pub const INDEX_COLUMN: &str = "index_code";

/// Row filters passed to a [`DataSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchParams {
    /// Keep rows with `time >= start`
    pub start: Option<NaiveDate>,
    /// Keep rows with `time <= end`
    pub end: Option<NaiveDate>,
    /// Keep rows with this `code`
    pub code: Option<String>,
    /// Keep rows with this `index_code`
    pub index: Option<String>,
}

impl FetchParams {
    /// Filter on `[start, end]`.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    /// Every row up to and including `end`.
    pub fn until(end: NaiveDate) -> Self {
        Self {
            end: Some(end),
            ..Self::default()
        }
    }

    /// Additionally filter on one code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Additionally filter on one owning index.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }
}

/// Raw-data adapter consumed by factor compute routines.
pub trait DataSource: Send + Sync + std::fmt::Debug {
    /// Fetch rows of `query_id` matching `params`, projected to `columns`.
    ///
    /// An empty `columns` slice keeps every column.
    fn fetch(&self, query_id: &str, params: &FetchParams, columns: &[&str]) -> Result<DataFrame>;
}

/// Filter and project a raw frame according to `params`.
fn apply_params(frame: &DataFrame, params: &FetchParams, columns: &[&str]) -> Result<DataFrame> {
    for name in columns {
        if frame.get_column_index(name).is_none() {
            return Err(FactorError::MissingColumn((*name).to_string()));
        }
    }

    let mut predicate: Option<Expr> = None;
    let mut push = |expr: Expr| {
        predicate = Some(match predicate.take() {
            Some(p) => p.and(expr),
            None => expr,
        });
    };
    if let Some(start) = params.start {
        push(col(TIME_COLUMN).gt_eq(lit(start.format("%Y-%m-%d").to_string())));
    }
    if let Some(end) = params.end {
        // timestamps may carry a time-of-day suffix, so compare against the next day
        let bound = end.succ_opt().unwrap_or(end);
        push(col(TIME_COLUMN).lt(lit(bound.format("%Y-%m-%d").to_string())));
    }
    if let Some(code) = &params.code {
        push(col(CODE_COLUMN).eq(lit(code.clone())));
    }
    if let Some(index) = &params.index {
        push(col(INDEX_COLUMN).eq(lit(index.clone())));
    }

    let mut lazy = frame.clone().lazy();
    if let Some(predicate) = predicate {
        lazy = lazy.filter(predicate);
    }
    if !columns.is_empty() {
        lazy = lazy.select(columns.iter().map(|c| col(*c)).collect::<Vec<_>>());
    }
    Ok(lazy.collect()?)
}

/// Frames held in memory, keyed by query id.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    frames: HashMap<String, DataFrame>,
}

impl InMemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the rows answered for `query_id`.
    pub fn insert(&mut self, query_id: impl Into<String>, frame: DataFrame) {
        self.frames.insert(query_id.into(), frame);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, query_id: impl Into<String>, frame: DataFrame) -> Self {
        self.insert(query_id, frame);
        self
    }
}

impl DataSource for InMemorySource {
    fn fetch(&self, query_id: &str, params: &FetchParams, columns: &[&str]) -> Result<DataFrame> {
        let frame = self
            .frames
            .get(query_id)
            .ok_or_else(|| FactorError::UnknownQuery(query_id.to_string()))?;
        apply_params(frame, params, columns)
    }
}

/// Raw extracts stored as `<dir>/<query_id>.csv`.
#[derive(Debug, Clone)]
pub struct CsvSource {
    dir: PathBuf,
}

impl CsvSource {
    /// Read extracts from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DataSource for CsvSource {
    fn fetch(&self, query_id: &str, params: &FetchParams, columns: &[&str]) -> Result<DataFrame> {
        let path = self.dir.join(format!("{query_id}.csv"));
        if !path.exists() {
            return Err(FactorError::UnknownQuery(query_id.to_string()));
        }
        // every column is read as text so codes such as 000001 keep their zeros;
        // value columns are cast when they are consumed
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path))?
            .finish()?;
        tracing::debug!(query_id, rows = frame.height(), "read raw extract");
        apply_params(&frame, params, columns)
    }
}

/// Look up a column, reporting absence as [`FactorError::MissingColumn`].
pub fn required_column<'a>(frame: &'a DataFrame, name: &str) -> Result<&'a Column> {
    frame
        .column(name)
        .map_err(|_| FactorError::MissingColumn(name.to_string()))
}

/// Parse a `YYYY-MM-DD` timestamp, ignoring any time-of-day suffix.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| FactorError::InvalidData(format!("bad timestamp {raw:?}: {e}")))
}

/// Raw `(timestamp, value)` events of one column, grouped by entity code.
///
/// Rows keep their supplied order within each code. Rows without a code or a
/// timestamp are skipped; a null value becomes the missing sentinel.
pub fn events_by_code(
    frame: &DataFrame,
    value_column: &str,
) -> Result<BTreeMap<String, Vec<(NaiveDate, f64)>>> {
    let codes = required_column(frame, CODE_COLUMN)?.cast(&DataType::String)?;
    let times = required_column(frame, TIME_COLUMN)?.cast(&DataType::String)?;
    let values = required_column(frame, value_column)?.cast(&DataType::Float64)?;

    let mut grouped: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for ((code, time), value) in codes
        .str()?
        .into_iter()
        .zip(times.str()?.into_iter())
        .zip(values.f64()?.into_iter())
    {
        let (Some(code), Some(time)) = (code, time) else {
            continue;
        };
        grouped
            .entry(code.to_string())
            .or_default()
            .push((parse_date(time)?, value.unwrap_or(f64::NAN)));
    }
    Ok(grouped)
}

/// Periodic report rows as `(announced, period, value)`, grouped by code.
///
/// Rows without a code, an announcement date or a period are skipped; a
/// null value becomes the missing sentinel.
pub fn report_events_by_code(
    frame: &DataFrame,
    period_column: &str,
    value_column: &str,
) -> Result<BTreeMap<String, Vec<(NaiveDate, NaiveDate, f64)>>> {
    let codes = required_column(frame, CODE_COLUMN)?.cast(&DataType::String)?;
    let times = required_column(frame, TIME_COLUMN)?.cast(&DataType::String)?;
    let periods = required_column(frame, period_column)?.cast(&DataType::String)?;
    let values = required_column(frame, value_column)?.cast(&DataType::Float64)?;

    let mut grouped: BTreeMap<String, Vec<(NaiveDate, NaiveDate, f64)>> = BTreeMap::new();
    for (((code, time), period), value) in codes
        .str()?
        .into_iter()
        .zip(times.str()?.into_iter())
        .zip(periods.str()?.into_iter())
        .zip(values.f64()?.into_iter())
    {
        let (Some(code), Some(time), Some(period)) = (code, time, period) else {
            continue;
        };
        grouped.entry(code.to_string()).or_default().push((
            parse_date(time)?,
            parse_date(period)?,
            value.unwrap_or(f64::NAN),
        ));
    }
    Ok(grouped)
}

/// Raw label events of one string column, coded against a dictionary of
/// every distinct label in sorted order.
///
/// A null or empty label becomes the missing sentinel.
pub fn label_events_by_code(
    frame: &DataFrame,
    label_column: &str,
) -> Result<(Categories, BTreeMap<String, Vec<(NaiveDate, f64)>>)> {
    let codes = required_column(frame, CODE_COLUMN)?.cast(&DataType::String)?;
    let times = required_column(frame, TIME_COLUMN)?.cast(&DataType::String)?;
    let labels = required_column(frame, label_column)?.cast(&DataType::String)?;
    let labels = labels.str()?;

    let mut distinct: Vec<&str> = labels.into_iter().flatten().filter(|l| !l.is_empty()).collect();
    distinct.sort_unstable();
    distinct.dedup();
    let categories = Categories::from_labels(distinct);

    let mut grouped: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for ((code, time), label) in codes
        .str()?
        .into_iter()
        .zip(times.str()?.into_iter())
        .zip(labels.into_iter())
    {
        let (Some(code), Some(time)) = (code, time) else {
            continue;
        };
        let value = label
            .and_then(|l| categories.code(l))
            .unwrap_or(f64::NAN);
        grouped
            .entry(code.to_string())
            .or_default()
            .push((parse_date(time)?, value));
    }
    Ok((categories, grouped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw() -> DataFrame {
        df! {
            "code" => ["B", "A", "A", "B"],
            "time" => ["2010-01-05", "2010-01-01", "2010-02-01 00:00:00", "2009-12-31"],
            "value" => [Some(10.0), Some(1.0), Some(2.0), None],
        }
        .unwrap()
    }

    #[test]
    fn test_in_memory_filters_by_range_and_code() {
        let source = InMemorySource::new().with("Q", raw());
        let all = source.fetch("Q", &FetchParams::default(), &[]).unwrap();
        assert_eq!(all.height(), 4);

        let ranged = source
            .fetch("Q", &FetchParams::between(date(2010, 1, 1), date(2010, 2, 1)), &["code", "value"])
            .unwrap();
        assert_eq!(ranged.height(), 3);
        assert_eq!(ranged.width(), 2);

        let only_b = source
            .fetch("Q", &FetchParams::default().with_code("B"), &[])
            .unwrap();
        assert_eq!(only_b.height(), 2);

        let until = source.fetch("Q", &FetchParams::until(date(2010, 1, 4)), &[]).unwrap();
        assert_eq!(until.height(), 2);
    }

    #[test]
    fn test_index_filter() {
        let members = df! {
            "index_code" => ["000300", "000300", "000905"],
            "code" => ["A", "B", "C"],
            "time" => ["2010-01-04", "2010-01-04", "2010-01-04"],
        }
        .unwrap();
        let source = InMemorySource::new().with("INDEX_CONSTITUENTS", members);
        let frame = source
            .fetch("INDEX_CONSTITUENTS", &FetchParams::default().with_index("000300"), &[])
            .unwrap();
        assert_eq!(frame.height(), 2);
    }

    #[test]
    fn test_unknown_query_and_missing_column() {
        let source = InMemorySource::new().with("Q", raw());
        assert!(matches!(
            source.fetch("NOPE", &FetchParams::default(), &[]),
            Err(FactorError::UnknownQuery(_))
        ));
        assert!(matches!(
            source.fetch("Q", &FetchParams::default(), &["close"]),
            Err(FactorError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_events_by_code_groups_in_supplied_order() {
        let grouped = events_by_code(&raw(), "value").unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["A"], vec![(date(2010, 1, 1), 1.0), (date(2010, 2, 1), 2.0)]);
        let b = &grouped["B"];
        assert_eq!(b[0], (date(2010, 1, 5), 10.0));
        assert!(b[1].1.is_nan());
    }

    #[test]
    fn test_label_events_share_one_sorted_dictionary() {
        let raw = df! {
            "code" => ["A", "B", "A", "B"],
            "time" => ["2010-01-04", "2010-01-04", "2010-02-01", "2010-02-01"],
            "industry" => [Some("Steel"), Some("Banks"), Some(""), None],
        }
        .unwrap();
        let (categories, grouped) = label_events_by_code(&raw, "industry").unwrap();

        assert_eq!(categories.labels(), &["Banks", "Steel"]);
        assert_eq!(grouped["A"][0], (date(2010, 1, 4), 1.0));
        assert!(grouped["A"][1].1.is_nan());
        assert_eq!(grouped["B"][0], (date(2010, 1, 4), 0.0));
        assert!(grouped["B"][1].1.is_nan());
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("2010/01/01").is_err());
        assert_eq!(parse_date("2010-01-01T09:30").unwrap(), date(2010, 1, 1));
    }

    #[test]
    fn test_csv_source_keeps_codes_as_strings() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("QUOTE.csv")).unwrap();
        writeln!(file, "code,time,close").unwrap();
        writeln!(file, "000001,2010-01-04,10.5").unwrap();
        writeln!(file, "600000,2010-01-05,8.0").unwrap();
        drop(file);

        let source = CsvSource::new(dir.path());
        let frame = source
            .fetch("QUOTE", &FetchParams::default().with_code("000001"), &[])
            .unwrap();
        assert_eq!(frame.height(), 1);
        let grouped = events_by_code(&frame, "close").unwrap();
        assert_eq!(grouped["000001"], vec![(date(2010, 1, 4), 10.5)]);
    }
}
