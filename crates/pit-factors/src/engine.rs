//! Lazy, memoizing query engine.
//!
//! [`QueryEngine::query`] serves a factor over a date range from the store,
//! computing only the part of the range not covered yet. Compute routines
//! receive the engine itself and pull their dependencies through the same
//! `query` call, so each factor in a dependency chain is computed at most
//! once per range and served from the cache afterwards.
//!
//! Coverage has two axes. Dates outside the covered range are computed for
//! every code the cache holds, and codes of the universe the cache does not
//! hold yet are computed over the whole covered range.
//!
//! Every computed panel is checked for strictly increasing rows and for
//! completeness over the trading calendar before it is cached; a failing
//! panel is never stored and fails the request.

use crate::{
    FactorError, Result,
    calendar::TradingCalendar,
    panel::{FillNa, Panel},
    registry::{FactorDescriptor, FactorRegistry},
    source::{DataSource, FetchParams},
    store::{CachedFactorStore, DateRange},
    universe::Universe,
    validate,
};
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves factor queries against a registry, a store and the data adapters.
#[derive(Debug)]
pub struct QueryEngine {
    registry: Arc<FactorRegistry>,
    store: CachedFactorStore,
    calendar: Arc<dyn TradingCalendar>,
    source: Arc<dyn DataSource>,
    universe: Universe,
    // factors whose compute routine is on the current call stack, outermost first
    in_progress: Vec<String>,
    compute_counts: HashMap<String, usize>,
}

impl QueryEngine {
    /// Create an engine over an already validated registry.
    pub fn new(
        registry: Arc<FactorRegistry>,
        store: CachedFactorStore,
        calendar: Arc<dyn TradingCalendar>,
        source: Arc<dyn DataSource>,
        universe: Universe,
    ) -> Self {
        Self {
            registry,
            store,
            calendar,
            source,
            universe,
            in_progress: Vec::new(),
            compute_counts: HashMap::new(),
        }
    }

    /// Registered factors.
    pub fn registry(&self) -> &FactorRegistry {
        &self.registry
    }

    /// Trading calendar shared with compute routines.
    pub fn calendar(&self) -> &dyn TradingCalendar {
        self.calendar.as_ref()
    }

    /// Raw-data adapter shared with compute routines.
    pub fn source(&self) -> &dyn DataSource {
        self.source.as_ref()
    }

    /// Universe every returned panel is restricted to.
    pub const fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Replace the universe for subsequent queries.
    pub fn set_universe(&mut self, universe: Universe) {
        self.universe = universe;
    }

    /// Factor cache.
    pub const fn store(&self) -> &CachedFactorStore {
        &self.store
    }

    /// Sessions in `[start, end]`.
    pub fn trading_dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        self.calendar.trading_dates(start, end)
    }

    /// Fetch raw rows from the data adapter.
    pub fn fetch(&self, query_id: &str, params: &FetchParams, columns: &[&str]) -> Result<DataFrame> {
        self.source.fetch(query_id, params, columns)
    }

    /// How many times the compute routine of `name` has run.
    pub fn compute_count(&self, name: &str) -> usize {
        self.compute_counts.get(name).copied().unwrap_or(0)
    }

    /// Factor `name` over `[start, end]` for the configured universe.
    ///
    /// Missing coverage is computed and cached first. `fillna` only affects
    /// the returned copy; the cache keeps missing cells as they are. A range
    /// without trading sessions yields a panel with no rows.
    #[tracing::instrument(skip_all, fields(factor = name, %start, %end))]
    pub fn query(
        &mut self,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
        fillna: Option<&FillNa>,
    ) -> Result<Panel> {
        if start > end {
            return Err(FactorError::InvalidDateRange { start, end });
        }
        let descriptor = Arc::clone(
            self.registry
                .get(name)
                .ok_or_else(|| FactorError::NotFound(name.to_string()))?,
        );
        if start < descriptor.validity_start() {
            return Err(FactorError::BeforeValidityStart {
                factor: name.to_string(),
                valid_from: descriptor.validity_start(),
                start,
            });
        }

        let sessions = self.calendar.trading_dates(start, end);
        let (Some(&first), Some(&last)) = (sessions.first(), sessions.last()) else {
            tracing::debug!("no trading sessions in range");
            return Ok(Panel::empty(self.universe.codes().to_vec()));
        };
        let requested = DateRange::new(first, last);

        // codes the cache never computed are filled in over its whole range
        let new_codes = self
            .store
            .codes(name)
            .map(|codes| self.universe.missing_from(codes));
        if let (Some(covered), Some(new_codes)) = (self.store.covered(name), new_codes)
            && !new_codes.is_empty()
        {
            tracing::debug!(codes = new_codes.len(), "universe gained codes");
            self.extend_coverage(&descriptor, covered, new_codes)?;
        }

        let gaps = self.missing_ranges(name, requested);
        if gaps.is_empty() {
            tracing::debug!("served from cache");
        }
        let held = match self.store.codes(name) {
            Some(codes) => self.universe.union(codes),
            None => self.universe.clone(),
        };
        for gap in gaps {
            self.extend_coverage(&descriptor, gap, held.clone())?;
        }

        let panel = self
            .store
            .get(name)
            .ok_or_else(|| FactorError::NotFound(name.to_string()))?
            .slice(first, last)
            .select(&self.universe);
        validate::ensure_index_order(name, &panel)?;
        validate::ensure_complete(name, &panel, first, last, self.calendar.as_ref())?;

        Ok(match fillna {
            Some(policy) => panel.fill_missing(policy),
            None => panel,
        })
    }

    /// Like [`query`](Self::query), restricted to `universe` instead of the
    /// configured one. Dependencies pulled by compute routines follow the
    /// same universe; the configured one is restored afterwards.
    pub fn query_in(
        &mut self,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
        universe: &Universe,
        fillna: Option<&FillNa>,
    ) -> Result<Panel> {
        let configured = std::mem::replace(&mut self.universe, universe.clone());
        let result = self.query(name, start, end, fillna);
        self.universe = configured;
        result
    }

    /// Sub-ranges of `requested` outside the cached coverage of `name`.
    ///
    /// Coverage stays contiguous, so a request disjoint from it also
    /// pulls in the dates in between.
    fn missing_ranges(&self, name: &str, requested: DateRange) -> Vec<DateRange> {
        let Some(covered) = self.store.covered(name) else {
            return vec![requested];
        };
        let mut gaps = Vec::new();
        if requested.start < covered.start
            && let Some(day_before) = covered.start.pred_opt()
        {
            gaps.push(DateRange::new(requested.start, day_before));
        }
        if requested.end > covered.end
            && let Some(day_after) = covered.end.succ_opt()
        {
            gaps.push(DateRange::new(day_after, requested.end));
        }
        gaps
    }

    /// Run the compute routine over `gap` for `universe`, validate and cache
    /// the result.
    fn extend_coverage(
        &mut self,
        descriptor: &FactorDescriptor,
        gap: DateRange,
        universe: Universe,
    ) -> Result<()> {
        let name = descriptor.name();
        if let Some(pos) = self.in_progress.iter().position(|n| n == name) {
            let mut cycle = self.in_progress[pos..].to_vec();
            cycle.push(name.to_string());
            return Err(FactorError::CyclicDependency(cycle));
        }

        // dependencies are queried over the same codes
        let configured = std::mem::replace(&mut self.universe, universe.clone());
        self.in_progress.push(name.to_string());
        let computed = descriptor
            .compute()
            .compute(self, &universe, gap.start, gap.end);
        self.in_progress.pop();
        self.universe = configured;
        *self.compute_counts.entry(name.to_string()).or_default() += 1;
        let computed = computed?;

        if let Err(err) = validate::ensure_index_order(name, &computed) {
            tracing::warn!(%err, "rejected computed panel");
            return Err(err);
        }
        let trimmed = computed.slice(gap.start, gap.end).select(&universe);
        // new codes over covered dates are judged together with the held ones
        let merged;
        let checked = match self.store.get(name) {
            Some(cached) => {
                merged = cached.slice(gap.start, gap.end).extend_with(&trimmed);
                &merged
            }
            None => &trimmed,
        };
        if let Err(err) =
            validate::ensure_complete(name, checked, gap.start, gap.end, self.calendar.as_ref())
        {
            tracing::warn!(%err, "rejected computed panel");
            return Err(err);
        }

        tracing::info!(
            start = %gap.start,
            end = %gap.end,
            rows = trimmed.nrows(),
            codes = trimmed.ncols(),
            "extended coverage"
        );
        self.store.extend(name, gap, trimmed);
        Ok(())
    }

    /// Persist every factor extended since the last flush.
    pub fn flush(&mut self) -> Result<usize> {
        self.store.flush()
    }

    /// Flush the store and drop the engine.
    pub fn close(self) -> Result<()> {
        self.store.close()
    }
}
