//! Canonically ordered set of entity codes.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Entity codes a query is restricted to, always sorted and deduplicated.
///
/// Cloning is cheap; compute routines receive their own handle while the
/// engine keeps its copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Universe {
    codes: Arc<[String]>,
}

impl Universe {
    /// Build from any collection of codes.
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut codes: Vec<String> = codes.into_iter().map(Into::into).collect();
        codes.sort_unstable();
        codes.dedup();
        Self {
            codes: codes.into(),
        }
    }

    /// Codes in canonical order.
    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// Whether `code` belongs to the universe.
    pub fn contains(&self, code: &str) -> bool {
        self.codes
            .binary_search_by(|c| c.as_str().cmp(code))
            .is_ok()
    }

    /// Number of codes.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the universe is empty.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Codes of either universe.
    pub fn union<S: AsRef<str>>(&self, codes: &[S]) -> Self {
        Self::new(
            self.codes
                .iter()
                .map(String::as_str)
                .chain(codes.iter().map(AsRef::as_ref)),
        )
    }

    /// Codes of this universe absent from `codes`.
    pub fn missing_from<S: AsRef<str>>(&self, codes: &[S]) -> Self {
        Self::new(
            self.codes
                .iter()
                .filter(|c| !codes.iter().any(|k| k.as_ref() == c.as_str()))
                .cloned(),
        )
    }
}

impl From<Vec<String>> for Universe {
    fn from(codes: Vec<String>) -> Self {
        Self::new(codes)
    }
}

impl From<Universe> for Vec<String> {
    fn from(universe: Universe) -> Self {
        universe.codes.to_vec()
    }
}
