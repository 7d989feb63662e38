//! Date-by-entity panels.
//!
//! A [`Panel`] is the result type of every factor query: rows are trading
//! dates, columns are entity codes, and each cell is either a value or the
//! missing sentinel (`NaN`). Row order is not enforced on construction, since
//! compute routines are allowed to produce bad panels that the validators
//! then reject; every constructor that *derives* a panel from another keeps
//! rows ascending.
//!
//! A panel may carry a [`Categories`] dictionary, in which case its cells are
//! label codes. Row and column reshaping keeps the dictionary; arithmetic
//! (`map`, `zip_with`, `map_columns`) yields a plain numeric panel.

use crate::{FactorError, Result, categorical::Categories, universe::Universe};
use chrono::NaiveDate;
use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Whether a cell holds the missing sentinel.
#[inline]
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// Caller-requested imputation applied to a returned panel.
#[derive(Debug, Clone, PartialEq)]
pub enum FillNa {
    /// Replace every missing cell with this value
    Value(f64),
    /// Per-column default; columns without an entry keep their missing cells
    PerColumn(BTreeMap<String, f64>),
}

impl FillNa {
    fn value_for(&self, column: &str) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::PerColumn(map) => map.get(column).copied(),
        }
    }
}

/// Rectangular table of values indexed by trading date and entity code.
#[derive(Debug, Clone)]
pub struct Panel {
    index: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Array2<f64>,
    categories: Option<Categories>,
}

impl Panel {
    /// Create a panel from labels and a `rows x columns` value matrix.
    pub fn new(index: Vec<NaiveDate>, columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if values.nrows() != index.len() || values.ncols() != columns.len() {
            return Err(FactorError::ShapeMismatch(format!(
                "{} dates x {} columns with a {}x{} matrix",
                index.len(),
                columns.len(),
                values.nrows(),
                values.ncols()
            )));
        }
        Ok(Self {
            index,
            columns,
            values,
            categories: None,
        })
    }

    /// Panel of the given shape with every cell missing.
    pub fn missing(index: Vec<NaiveDate>, columns: Vec<String>) -> Self {
        let values = Array2::from_elem((index.len(), columns.len()), f64::NAN);
        Self {
            index,
            columns,
            values,
            categories: None,
        }
    }

    /// Panel with no rows over the given columns.
    pub fn empty(columns: Vec<String>) -> Self {
        Self::missing(Vec::new(), columns)
    }

    /// Build from per-column value vectors; columns come out in sorted order.
    pub fn from_column_map(index: Vec<NaiveDate>, columns: BTreeMap<String, Vec<f64>>) -> Result<Self> {
        let mut values = Array2::from_elem((index.len(), columns.len()), f64::NAN);
        for (j, (code, column)) in columns.iter().enumerate() {
            if column.len() != index.len() {
                return Err(FactorError::ShapeMismatch(format!(
                    "column {code} has {} values for {} dates",
                    column.len(),
                    index.len()
                )));
            }
            values.column_mut(j).assign(&ArrayView1::from(column.as_slice()));
        }
        Ok(Self {
            index,
            columns: columns.into_keys().collect(),
            values,
            categories: None,
        })
    }

    /// Mark the cells as codes into `categories`.
    pub fn with_categories(mut self, categories: Categories) -> Self {
        self.categories = Some(categories);
        self
    }

    /// Label dictionary of a categorical panel.
    pub const fn categories(&self) -> Option<&Categories> {
        self.categories.as_ref()
    }

    /// Row labels.
    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    /// Column labels.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Cell matrix.
    pub const fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of rows.
    pub fn nrows(&self) -> usize {
        self.index.len()
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Whether the panel has no rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// First and last row dates.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.index.first()?, *self.index.last()?))
    }

    fn column_position(&self, code: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == code)
    }

    fn row_position(&self, date: NaiveDate) -> Option<usize> {
        self.index.iter().position(|d| *d == date)
    }

    /// Cell at `(date, code)`; `None` when either label is absent.
    pub fn get(&self, date: NaiveDate, code: &str) -> Option<f64> {
        Some(self.values[[self.row_position(date)?, self.column_position(code)?]])
    }

    /// Label at `(date, code)` of a categorical panel; `None` when missing.
    pub fn label(&self, date: NaiveDate, code: &str) -> Option<&str> {
        self.categories.as_ref()?.label(self.get(date, code)?)
    }

    /// Values of one column in row order.
    pub fn column(&self, code: &str) -> Option<Vec<f64>> {
        self.column_position(code)
            .map(|j| self.values.column(j).to_vec())
    }

    /// Whether row `i` holds at least one non-missing cell.
    pub fn row_has_value(&self, i: usize) -> bool {
        self.values.row(i).iter().any(|v| !is_missing(*v))
    }

    /// Rows whose date falls in `[start, end]`.
    pub fn slice(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let rows: Vec<usize> = (0..self.index.len())
            .filter(|&i| self.index[i] >= start && self.index[i] <= end)
            .collect();
        self.take_rows(&rows)
    }

    fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            index: rows.iter().map(|&i| self.index[i]).collect(),
            columns: self.columns.clone(),
            values: self.values.select(Axis(0), rows),
            categories: self.categories.clone(),
        }
    }

    /// Rows relabelled to exactly `dates`; dates absent from the panel are missing.
    pub fn reindex_rows(&self, dates: &[NaiveDate]) -> Self {
        let lookup: HashMap<NaiveDate, usize> =
            self.index.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        let mut values = Array2::from_elem((dates.len(), self.columns.len()), f64::NAN);
        for (i, date) in dates.iter().enumerate() {
            if let Some(&src) = lookup.get(date) {
                values.row_mut(i).assign(&self.values.row(src));
            }
        }
        Self {
            index: dates.to_vec(),
            columns: self.columns.clone(),
            values,
            categories: self.categories.clone(),
        }
    }

    /// Columns restricted and ordered to `universe`; codes the panel lacks are all missing.
    pub fn select(&self, universe: &Universe) -> Self {
        self.select_columns(universe.codes())
    }

    fn select_columns(&self, codes: &[String]) -> Self {
        let lookup: HashMap<&str, usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(j, c)| (c.as_str(), j))
            .collect();
        let mut values = Array2::from_elem((self.index.len(), codes.len()), f64::NAN);
        for (j, code) in codes.iter().enumerate() {
            if let Some(&src) = lookup.get(code.as_str()) {
                values.column_mut(j).assign(&self.values.column(src));
            }
        }
        Self {
            index: self.index.clone(),
            columns: codes.to_vec(),
            values,
            categories: self.categories.clone(),
        }
    }

    /// Drop rows in which every cell is missing.
    pub fn drop_missing_rows(&self) -> Self {
        let rows: Vec<usize> = (0..self.index.len())
            .filter(|&i| self.row_has_value(i))
            .collect();
        self.take_rows(&rows)
    }

    /// Copy with missing cells imputed according to `policy`.
    pub fn fill_missing(&self, policy: &FillNa) -> Self {
        let mut out = self.clone();
        for (j, code) in self.columns.iter().enumerate() {
            if let Some(fill) = policy.value_for(code) {
                out.values
                    .column_mut(j)
                    .mapv_inplace(|v| if is_missing(v) { fill } else { v });
            }
        }
        out
    }

    /// Apply `f` to every cell.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            index: self.index.clone(),
            columns: self.columns.clone(),
            values: self.values.mapv(f),
            categories: None,
        }
    }

    /// Combine two panels cell by cell; both must carry identical labels.
    pub fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Result<Self> {
        if self.index != other.index || self.columns != other.columns {
            return Err(FactorError::ShapeMismatch(format!(
                "cannot combine {}x{} panel with {}x{} panel of different labels",
                self.nrows(),
                self.ncols(),
                other.nrows(),
                other.ncols()
            )));
        }
        let values = Zip::from(&self.values)
            .and(&other.values)
            .map_collect(|&a, &b| f(a, b));
        Ok(Self {
            index: self.index.clone(),
            columns: self.columns.clone(),
            values,
            categories: None,
        })
    }

    /// Transform each column as a whole time series; `f` must preserve length.
    pub fn map_columns(&self, f: impl Fn(&[f64]) -> Vec<f64>) -> Result<Self> {
        let mut values = Array2::from_elem(self.values.raw_dim(), f64::NAN);
        for (j, code) in self.columns.iter().enumerate() {
            let series = self.values.column(j).to_vec();
            let mapped = f(&series);
            if mapped.len() != series.len() {
                return Err(FactorError::ShapeMismatch(format!(
                    "column transform on {code} returned {} values for {} rows",
                    mapped.len(),
                    series.len()
                )));
            }
            values.column_mut(j).assign(&Array1::from(mapped));
        }
        Ok(Self {
            index: self.index.clone(),
            columns: self.columns.clone(),
            values,
            categories: None,
        })
    }

    /// Union with `newer`, never overwriting a cell this panel already holds.
    ///
    /// A cell is held when both its date and its code are labels of this
    /// panel, missing or not. Rows come out ascending; columns are the sorted
    /// union of both label sets. Categorical codes of `newer` are translated
    /// into this panel's dictionary.
    pub fn extend_with(&self, newer: &Self) -> Self {
        let (categories, recoded) = match (&self.categories, &newer.categories) {
            (Some(own), Some(theirs)) => {
                let mut merged = own.clone();
                let table = merged.absorb(theirs);
                let values = newer.values.mapv(|v| Categories::recode(v, &table));
                (Some(merged), Some(values))
            }
            (own, theirs) => (own.clone().or_else(|| theirs.clone()), None),
        };
        let newer_values = recoded.as_ref().unwrap_or(&newer.values);

        let columns: Vec<String> = self
            .columns
            .iter()
            .chain(newer.columns.iter())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index: Vec<NaiveDate> = self
            .index
            .iter()
            .chain(newer.index.iter())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let column_pos: HashMap<&str, usize> = columns
            .iter()
            .enumerate()
            .map(|(j, c)| (c.as_str(), j))
            .collect();
        let row_pos: HashMap<NaiveDate, usize> =
            index.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut values = Array2::from_elem((index.len(), columns.len()), f64::NAN);
        // older cells are written last and win
        for (dates, codes, cells) in [
            (&newer.index, &newer.columns, newer_values),
            (&self.index, &self.columns, &self.values),
        ] {
            for (i, date) in dates.iter().enumerate() {
                let Some(&r) = row_pos.get(date) else { continue };
                for (j, code) in codes.iter().enumerate() {
                    if let Some(&c) = column_pos.get(code.as_str()) {
                        values[[r, c]] = cells[[i, j]];
                    }
                }
            }
        }
        Self {
            index,
            columns,
            values,
            categories,
        }
    }

    /// Whether both panels carry the same labels and bit-identical cells.
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.columns == other.columns
            && self.categories == other.categories
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    /// Long `symbol`, `date`, `<value_name>` frame; missing cells become nulls.
    ///
    /// A categorical panel yields its labels as a string column.
    pub fn to_frame(&self, value_name: &str) -> Result<DataFrame> {
        let capacity = self.nrows() * self.ncols();
        let mut symbols = Vec::with_capacity(capacity);
        let mut dates = Vec::with_capacity(capacity);
        let mut cells = Vec::with_capacity(capacity);
        for (i, date) in self.index.iter().enumerate() {
            let date = date.format("%Y-%m-%d").to_string();
            for (j, code) in self.columns.iter().enumerate() {
                symbols.push(code.clone());
                dates.push(date.clone());
                cells.push(self.values[[i, j]]);
            }
        }
        let value_column = match &self.categories {
            Some(categories) => {
                let labels: Vec<Option<&str>> = cells.iter().map(|v| categories.label(*v)).collect();
                Column::new(value_name.into(), labels)
            }
            None => {
                let values: Vec<Option<f64>> = cells
                    .iter()
                    .map(|v| (!is_missing(*v)).then_some(*v))
                    .collect();
                Column::new(value_name.into(), values)
            }
        };
        let df = DataFrame::new(vec![
            Column::new("symbol".into(), symbols),
            Column::new("date".into(), dates),
            value_column,
        ])?;
        Ok(df)
    }
}
