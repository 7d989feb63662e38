//! Factor registry for discovery, introspection and dependency checks.
//!
//! The registry is populated once at start-up and then shared read-only by
//! the query engine. Every structural problem (a reused name, a dependency
//! on an unregistered factor, a dependency cycle) is reported while the
//! registry is built, before any query can run.

use crate::{FactorError, Result, traits::Compute};
use chrono::NaiveDate;
use derive_more::Display;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

/// Factor category for grouping related factors.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FactorCategory {
    /// General - listing, special treatment, tradability and index membership
    General,
    /// Quote - daily prices and market values
    Quote,
    /// Fundamental - financial statement fields keyed by announcement
    Fundamental,
    /// Value - relative valuation factors
    Value,
    /// Growth - statement growth rates
    Growth,
    /// Quality - profitability factors
    Quality,
    /// Momentum - trend persistence factors
    Momentum,
    /// Volatility - risk, beta and higher moment factors
    Volatility,
}

/// Immutable identity and compute routine of one factor.
#[derive(Clone)]
pub struct FactorDescriptor {
    name: String,
    compute: Arc<dyn Compute>,
    validity_start: NaiveDate,
    dependencies: BTreeSet<String>,
    description: String,
    category: FactorCategory,
}

impl FactorDescriptor {
    /// Descriptor without dependencies, queryable from any date.
    pub fn new(name: impl Into<String>, compute: impl Compute + 'static) -> Self {
        Self {
            name: name.into(),
            compute: Arc::new(compute),
            validity_start: NaiveDate::MIN,
            dependencies: BTreeSet::new(),
            description: String::new(),
            category: FactorCategory::General,
        }
    }

    /// Earliest date the factor may be requested from.
    pub fn valid_from(mut self, date: NaiveDate) -> Self {
        self.validity_start = date;
        self
    }

    /// Factors the compute routine queries.
    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    /// Human-readable description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Grouping category.
    pub fn in_category(mut self, category: FactorCategory) -> Self {
        self.category = category;
        self
    }

    /// Unique factor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compute routine.
    pub fn compute(&self) -> &Arc<dyn Compute> {
        &self.compute
    }

    /// Earliest queryable date.
    pub const fn validity_start(&self) -> NaiveDate {
        self.validity_start
    }

    /// Declared dependencies, sorted.
    pub const fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Grouping category.
    pub const fn category(&self) -> FactorCategory {
        self.category
    }

    /// Metadata snapshot.
    pub fn info(&self) -> FactorInfo {
        FactorInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category,
            dependencies: self.dependencies.iter().cloned().collect(),
            validity_start: self.validity_start,
        }
    }
}

impl std::fmt::Debug for FactorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactorDescriptor")
            .field("name", &self.name)
            .field("validity_start", &self.validity_start)
            .field("dependencies", &self.dependencies)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Metadata for factor introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorInfo {
    /// Factor name (unique identifier)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Factor category
    pub category: FactorCategory,
    /// Declared dependencies
    pub dependencies: Vec<String>,
    /// Earliest queryable date
    pub validity_start: NaiveDate,
}

/// Registry for factor discovery and dependency validation.
#[derive(Debug, Default)]
pub struct FactorRegistry {
    factors: BTreeMap<String, Arc<FactorDescriptor>>,
}

impl FactorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factors: BTreeMap::new(),
        }
    }

    /// Register the built-in catalog and validate it.
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        for descriptor in crate::general::descriptors()
            .into_iter()
            .chain(crate::quote::descriptors())
            .chain(crate::fundamental::descriptors())
            .chain(crate::value::descriptors())
            .chain(crate::growth::descriptors())
            .chain(crate::quality::descriptors())
            .chain(crate::momentum::descriptors())
            .chain(crate::volatility::descriptors())
        {
            registry.register(descriptor)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Register a factor; a name already present is rejected.
    pub fn register(&mut self, descriptor: FactorDescriptor) -> Result<()> {
        if self.factors.contains_key(descriptor.name()) {
            return Err(FactorError::DuplicateFactor(descriptor.name().to_string()));
        }
        self.factors
            .insert(descriptor.name().to_string(), Arc::new(descriptor));
        Ok(())
    }

    /// Check that every dependency is registered and the graph is acyclic.
    pub fn validate(&self) -> Result<()> {
        self.topological_order().map(|_| ())
    }

    /// Factor names ordered so that dependencies precede their dependents.
    ///
    /// Factors without dependencies lead, in name order.
    pub fn topological_order(&self) -> Result<Vec<&str>> {
        let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (name, descriptor) in &self.factors {
            for dependency in descriptor.dependencies() {
                if !self.factors.contains_key(dependency) {
                    return Err(FactorError::UnknownDependency {
                        factor: name.clone(),
                        dependency: dependency.clone(),
                    });
                }
                dependents
                    .entry(dependency.as_str())
                    .or_default()
                    .push(name.as_str());
            }
            pending.insert(name.as_str(), descriptor.dependencies().len());
        }

        let mut ready: VecDeque<&str> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut order = Vec::with_capacity(self.factors.len());
        while let Some(name) = ready.pop_front() {
            order.push(name);
            pending.remove(name);
            for dependent in dependents.get(name).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(*dependent);
                    }
                }
            }
        }

        if pending.is_empty() {
            Ok(order)
        } else {
            Err(FactorError::CyclicDependency(self.find_cycle(&pending)))
        }
    }

    /// Walk unresolved dependencies until a name repeats.
    fn find_cycle(&self, unresolved: &BTreeMap<&str, usize>) -> Vec<String> {
        let mut path: Vec<&str> = Vec::new();
        let mut current = unresolved.keys().next().copied();
        while let Some(name) = current {
            if let Some(pos) = path.iter().position(|p| *p == name) {
                let mut cycle: Vec<String> = path[pos..].iter().map(|s| (*s).to_string()).collect();
                cycle.push(name.to_string());
                return cycle;
            }
            path.push(name);
            current = self.factors.get(name).and_then(|d| {
                d.dependencies()
                    .iter()
                    .map(String::as_str)
                    .find(|dep| unresolved.contains_key(dep))
            });
        }
        path.into_iter().map(str::to_string).collect()
    }

    /// Get a factor by name.
    pub fn get(&self, name: &str) -> Option<&Arc<FactorDescriptor>> {
        self.factors.get(name)
    }

    /// Get factors by category.
    pub fn by_category(&self, category: FactorCategory) -> Vec<&FactorDescriptor> {
        self.factors
            .values()
            .filter(|f| f.category() == category)
            .map(|f| f.as_ref())
            .collect()
    }

    /// Get all factor metadata, sorted by name.
    pub fn all_info(&self) -> Vec<FactorInfo> {
        self.factors.values().map(|f| f.info()).collect()
    }

    /// Get all factor names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factors.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered factors.
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}
