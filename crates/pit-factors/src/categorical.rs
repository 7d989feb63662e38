//! Label dictionaries for categorical panels.
//!
//! Categorical factors (industry classifications and the like) are stored in
//! the same `f64` cells as numeric ones: each cell holds the position of its
//! label in a [`Categories`] dictionary carried by the panel, and a missing
//! label is the usual `NaN`.

use serde::{Deserialize, Serialize};

/// Ordered, duplicate-free list of labels; a label's code is its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Categories {
    labels: Vec<String>,
}

impl Categories {
    /// Empty dictionary.
    pub const fn new() -> Self {
        Self { labels: Vec::new() }
    }

    /// Dictionary over `labels`, keeping the first occurrence of repeats.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut categories = Self::new();
        for label in labels {
            categories.intern(label.as_ref());
        }
        categories
    }

    /// Labels in code order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Code of `label`, if known.
    pub fn code(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|pos| pos as f64)
    }

    /// Code of `label`, appending it when unknown.
    pub fn intern(&mut self, label: &str) -> f64 {
        self.code(label).unwrap_or_else(|| {
            self.labels.push(label.to_string());
            (self.labels.len() - 1) as f64
        })
    }

    /// Label behind a cell value; `None` for missing or unknown codes.
    pub fn label(&self, code: f64) -> Option<&str> {
        if code.is_nan() || code < 0.0 || code.fract() != 0.0 {
            return None;
        }
        self.labels.get(code as usize).map(String::as_str)
    }

    /// Add the labels of `other` and return, for each of its codes, the
    /// matching code in this dictionary.
    pub fn absorb(&mut self, other: &Self) -> Vec<f64> {
        other.labels.iter().map(|label| self.intern(label)).collect()
    }

    /// Translate a cell coded against another dictionary through a table
    /// returned by [`absorb`](Self::absorb).
    pub fn recode(code: f64, table: &[f64]) -> f64 {
        if code.is_nan() || code < 0.0 {
            return f64::NAN;
        }
        table.get(code as usize).copied().unwrap_or(f64::NAN)
    }
}
