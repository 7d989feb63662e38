//! Persisted factor cache.
//!
//! Each factor owns one panel plus the contiguous date range it covers. The
//! panel's columns are the codes computed over that whole range. Coverage
//! only grows: an extension merges newly computed rows or codes without
//! touching cells already stored. A directory-backed store keeps one JSON
//! document per factor; missing cells are written as `null` so they
//! survive a round-trip, and categorical factors keep their label list.

use crate::{Result, categorical::Categories, panel::Panel};
use chrono::NaiveDate;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First covered date
    pub start: NaiveDate,
    /// Last covered date
    pub end: NaiveDate,
}

impl DateRange {
    /// Range `[start, end]`.
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whether `other` lies entirely inside this range.
    pub fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Smallest range covering both.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug)]
struct Entry {
    panel: Panel,
    covered: DateRange,
    dirty: bool,
}

/// On-disk form of one factor.
#[derive(Debug, Serialize, Deserialize)]
struct StoredFactor {
    factor: String,
    covered: DateRange,
    index: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    labels: Option<Categories>,
}

impl StoredFactor {
    fn from_entry(factor: &str, entry: &Entry) -> Self {
        let values = entry
            .panel
            .values()
            .rows()
            .into_iter()
            .map(|row| row.iter().map(|v| (!v.is_nan()).then_some(*v)).collect())
            .collect();
        Self {
            factor: factor.to_string(),
            covered: entry.covered,
            index: entry.panel.index().to_vec(),
            columns: entry.panel.columns().to_vec(),
            values,
            labels: entry.panel.categories().cloned(),
        }
    }

    fn into_entry(self) -> Result<(String, Entry)> {
        let ncols = self.columns.len();
        let flat: Vec<f64> = self
            .values
            .iter()
            .flat_map(|row| row.iter().map(|v| v.unwrap_or(f64::NAN)))
            .collect();
        let values = Array2::from_shape_vec((self.values.len(), ncols), flat).map_err(|e| {
            crate::FactorError::InvalidData(format!("stored panel for {}: {e}", self.factor))
        })?;
        let mut panel = Panel::new(self.index, self.columns, values)?;
        if let Some(labels) = self.labels {
            panel = panel.with_categories(labels);
        }
        Ok((
            self.factor,
            Entry {
                panel,
                covered: self.covered,
                dirty: false,
            },
        ))
    }
}

/// Per-factor panels and their covered ranges.
///
/// Mutated only through [`extend`](Self::extend); nothing is ever evicted.
#[derive(Debug, Default)]
pub struct CachedFactorStore {
    dir: Option<PathBuf>,
    entries: BTreeMap<String, Entry>,
}

impl CachedFactorStore {
    /// Store that lives and dies with the process.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a directory-backed store, loading every persisted factor.
    ///
    /// The directory is created when absent.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut entries = BTreeMap::new();
        for item in fs::read_dir(&dir)? {
            let path = item?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let stored: StoredFactor = serde_json::from_reader(BufReader::new(File::open(&path)?))?;
            let (name, entry) = stored.into_entry()?;
            entries.insert(name, entry);
        }
        tracing::info!(dir = %dir.display(), factors = entries.len(), "opened factor store");
        Ok(Self {
            dir: Some(dir),
            entries,
        })
    }

    /// Backing directory, if any.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Cached panel of `factor`.
    pub fn get(&self, factor: &str) -> Option<&Panel> {
        self.entries.get(factor).map(|e| &e.panel)
    }

    /// Codes computed over the whole covered range of `factor`.
    pub fn codes(&self, factor: &str) -> Option<&[String]> {
        self.get(factor).map(Panel::columns)
    }

    /// Range currently covered for `factor`.
    pub fn covered(&self, factor: &str) -> Option<DateRange> {
        self.entries.get(factor).map(|e| e.covered)
    }

    /// Names of cached factors.
    pub fn factors(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Merge `panel`, computed over `range`, into the cache of `factor`.
    ///
    /// Cells already stored are kept as they are; coverage becomes the union
    /// of the old and new ranges. A panel of new codes over the covered
    /// range adds those columns.
    pub fn extend(&mut self, factor: &str, range: DateRange, panel: Panel) {
        match self.entries.get_mut(factor) {
            Some(entry) => {
                entry.panel = entry.panel.extend_with(&panel);
                entry.covered = entry.covered.union(&range);
                entry.dirty = true;
            }
            None => {
                self.entries.insert(
                    factor.to_string(),
                    Entry {
                        panel,
                        covered: range,
                        dirty: true,
                    },
                );
            }
        }
    }

    /// Write every modified factor; returns how many were written.
    ///
    /// A store without a directory has nothing to write.
    pub fn flush(&mut self) -> Result<usize> {
        let Some(dir) = self.dir.clone() else {
            return Ok(0);
        };
        let mut written = 0;
        for (name, entry) in self.entries.iter_mut().filter(|(_, e)| e.dirty) {
            write_atomically(&dir.join(format!("{name}.json")), &StoredFactor::from_entry(name, entry))?;
            entry.dirty = false;
            written += 1;
        }
        if written > 0 {
            tracing::info!(dir = %dir.display(), written, "flushed factor store");
        }
        Ok(written)
    }

    /// Flush and release the store.
    pub fn close(mut self) -> Result<()> {
        self.flush().map(|_| ())
    }
}

/// Serialize to a temporary sibling, then rename over the target.
fn write_atomically(path: &Path, stored: &StoredFactor) -> Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut writer, stored)?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn panel(index: Vec<NaiveDate>, values: Array2<f64>) -> Panel {
        Panel::new(index, vec!["A".to_string(), "B".to_string()], values).unwrap()
    }

    #[test]
    fn test_extend_is_monotonic() {
        let mut store = CachedFactorStore::in_memory();
        let first = panel(vec![date(2010, 1, 4), date(2010, 1, 5)], array![[1.0, 2.0], [3.0, 4.0]]);
        store.extend("F", DateRange::new(date(2010, 1, 4), date(2010, 1, 5)), first);

        // an overlapping row must not replace the stored one
        let second = panel(vec![date(2010, 1, 5), date(2010, 1, 6)], array![[9.0, 9.0], [5.0, 6.0]]);
        store.extend("F", DateRange::new(date(2010, 1, 5), date(2010, 1, 6)), second);

        let cached = store.get("F").unwrap();
        assert_eq!(cached.nrows(), 3);
        assert_eq!(cached.get(date(2010, 1, 5), "A"), Some(3.0));
        assert_eq!(cached.get(date(2010, 1, 6), "B"), Some(6.0));
        assert_eq!(
            store.covered("F"),
            Some(DateRange::new(date(2010, 1, 4), date(2010, 1, 6)))
        );
    }

    #[test]
    fn test_extend_adds_codes_over_covered_range() {
        let mut store = CachedFactorStore::in_memory();
        let range = DateRange::new(date(2010, 1, 4), date(2010, 1, 5));
        store.extend("F", range, panel(vec![date(2010, 1, 4), date(2010, 1, 5)], array![[1.0, 2.0], [3.0, 4.0]]));

        let new_code = Panel::new(
            vec![date(2010, 1, 4), date(2010, 1, 5)],
            vec!["C".to_string()],
            array![[5.0], [6.0]],
        )
        .unwrap();
        store.extend("F", range, new_code);

        assert_eq!(store.codes("F").unwrap(), &["A", "B", "C"]);
        assert_eq!(store.covered("F"), Some(range));
        let cached = store.get("F").unwrap();
        assert_eq!(cached.column("C").unwrap(), vec![5.0, 6.0]);
        assert_eq!(cached.column("A").unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_round_trip_keeps_labels() {
        let dir = tempfile::tempdir().unwrap();
        let original = panel(
            vec![date(2010, 1, 4), date(2010, 1, 5)],
            array![[0.0, f64::NAN], [1.0, 0.0]],
        )
        .with_categories(Categories::from_labels(["Banks", "Steel"]));
        let range = DateRange::new(date(2010, 1, 4), date(2010, 1, 5));

        let mut store = CachedFactorStore::open(dir.path()).unwrap();
        store.extend("ZX_IND", range, original.clone());
        store.close().unwrap();

        let reopened = CachedFactorStore::open(dir.path()).unwrap();
        let cached = reopened.get("ZX_IND").unwrap();
        assert!(cached.bit_eq(&original));
        assert_eq!(cached.label(date(2010, 1, 5), "A"), Some("Steel"));
        assert_eq!(cached.label(date(2010, 1, 4), "B"), None);
    }

    #[test]
    fn test_in_memory_flush_writes_nothing() {
        let mut store = CachedFactorStore::in_memory();
        store.extend(
            "F",
            DateRange::new(date(2010, 1, 4), date(2010, 1, 4)),
            panel(vec![date(2010, 1, 4)], array![[1.0, 2.0]]),
        );
        assert_eq!(store.flush().unwrap(), 0);
        assert!(store.dir().is_none());
    }

    #[test]
    fn test_round_trip_keeps_missing_cells() {
        let dir = tempfile::tempdir().unwrap();
        let original = panel(
            vec![date(2010, 1, 4), date(2010, 1, 5)],
            array![[1.5, f64::NAN], [f64::NAN, -2.0]],
        );
        let range = DateRange::new(date(2010, 1, 1), date(2010, 1, 5));

        let mut store = CachedFactorStore::open(dir.path()).unwrap();
        store.extend("NI_TTM", range, original.clone());
        assert_eq!(store.flush().unwrap(), 1);
        // clean entries are not rewritten
        assert_eq!(store.flush().unwrap(), 0);
        store.close().unwrap();

        let reopened = CachedFactorStore::open(dir.path()).unwrap();
        assert_eq!(reopened.factors().collect::<Vec<_>>(), vec!["NI_TTM"]);
        assert_eq!(reopened.covered("NI_TTM"), Some(range));
        assert!(reopened.get("NI_TTM").unwrap().bit_eq(&original));
    }

    #[test]
    fn test_date_range() {
        let outer = DateRange::new(date(2010, 1, 1), date(2010, 12, 31));
        let inner = DateRange::new(date(2010, 3, 1), date(2010, 3, 31));
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert_eq!(inner.union(&outer), outer);
    }
}
