//! SearchCoordinator - derives the visible formula list
//!
//! The coordinator owns the search term, the search mode and the cached
//! sources (full formula list and per-term deep-search results). After every
//! change the visible list is derived again from scratch.
//!
//! Network calls are split into `begin_*` / `apply_*` pairs so responses can
//! arrive in any order: every request carries a ticket, and a response is only
//! applied if its ticket is still the one the coordinator is waiting for.

use super::{Normalization, SearchMode, SearchView, normalize_key};
use crate::api::FormulaStore;
use crate::config::SearchConfig;
use crate::error::Result;
use crate::loadable::Loadable;
use crate::models::{FormulaRecord, MatchResult, NewFormula, SearchQuery};
use lru::LruCache;
use std::num::NonZeroUsize;

/// Handle for one in-flight list-all request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTicket {
    seq: u64,
}

impl ListTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Handle for one in-flight deep-search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepTicket {
    seq: u64,
    epoch: u64,
    term: String,
}

impl DeepTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Term the request was issued for
    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn query(&self) -> SearchQuery {
        SearchQuery::new(self.term.clone())
    }
}

/// What happened to a response handed back to the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Response feeds the current view
    Current,

    /// Response was kept for a term or mode that is not active right now
    Cached,

    /// Response was stale and dropped
    Discarded,
}

#[derive(Debug, Clone)]
struct DeepFailure {
    term: String,
    message: String,
}

/// Owner of search state and the derived result list
#[derive(Debug)]
pub struct SearchCoordinator {
    term: String,
    mode: SearchMode,
    normalization: Normalization,
    all_formulas: Loadable<Vec<FormulaRecord>>,
    list_pending: Option<u64>,
    deep_cache: LruCache<String, Vec<MatchResult>>,
    deep_pending: Option<(u64, String)>,
    deep_failure: Option<DeepFailure>,
    next_seq: u64,
    // Bumped by invalidation; deep responses from older epochs are dropped.
    epoch: u64,
    visible: Vec<FormulaRecord>,
}

impl Default for SearchCoordinator {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

impl SearchCoordinator {
    pub fn new(config: &SearchConfig) -> Self {
        let capacity = NonZeroUsize::new(config.deep_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            term: String::new(),
            mode: config.default_mode,
            normalization: config.normalization,
            all_formulas: Loadable::NotLoaded,
            list_pending: None,
            deep_cache: LruCache::new(capacity),
            deep_pending: None,
            deep_failure: None,
            next_seq: 0,
            epoch: 0,
            visible: Vec::new(),
        }
    }

    pub fn search_term(&self) -> &str {
        &self.term
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Current derived result list
    pub fn visible(&self) -> &[FormulaRecord] {
        &self.visible
    }

    pub fn all_formulas(&self) -> &Loadable<Vec<FormulaRecord>> {
        &self.all_formulas
    }

    /// Look a formula up in the cached list
    pub fn find_cached(&self, id: i64) -> Option<&FormulaRecord> {
        self.all_formulas
            .ready()
            .and_then(|formulas| formulas.iter().find(|f| f.id == Some(id)))
    }

    /// Snapshot for presentation
    pub fn view(&self) -> SearchView {
        let deep_active = self.mode == SearchMode::Deep;
        let deep_loading = deep_active
            && !self.deep_cache.contains(&self.term)
            && self
                .deep_pending
                .as_ref()
                .is_some_and(|(_, term)| *term == self.term);

        let deep_error = if deep_active {
            self.deep_failure
                .as_ref()
                .filter(|failure| failure.term == self.term)
                .map(|failure| failure.message.clone())
        } else {
            None
        };

        SearchView {
            term: self.term.clone(),
            mode: self.mode,
            visible: self.visible.clone(),
            loading: self.list_pending.is_some() || deep_loading,
            error: self.all_formulas.error().map(str::to_string).or(deep_error),
        }
    }

    /// Update the search term; returns whether it changed
    pub fn set_search_term(&mut self, term: impl Into<String>) -> bool {
        let term = term.into();
        if term == self.term {
            return false;
        }
        log::debug!("Search term changed: '{}' -> '{}'", self.term, term);
        self.term = term;
        self.rederive();
        true
    }

    /// Switch search strategy; returns whether it changed
    pub fn set_mode(&mut self, mode: SearchMode) -> bool {
        if mode == self.mode {
            return false;
        }
        log::debug!("Search mode changed: {} -> {}", self.mode, mode);
        self.mode = mode;
        if mode == SearchMode::Deep {
            // Re-entering deep mode is the manual retry for a failed query.
            self.deep_failure = None;
        }
        self.rederive();
        true
    }

    pub fn toggle_mode(&mut self) -> SearchMode {
        self.set_mode(self.mode.toggled());
        self.mode
    }

    /// The formula list has never been loaded or was invalidated
    pub fn needs_list_load(&self) -> bool {
        self.all_formulas.is_not_loaded() && self.list_pending.is_none()
    }

    /// Register a list-all request
    pub fn begin_list_load(&mut self) -> ListTicket {
        let seq = self.next_seq();
        self.list_pending = Some(seq);
        if !self.all_formulas.is_ready() {
            self.all_formulas = Loadable::Pending;
        }
        self.rederive();
        ListTicket { seq }
    }

    /// Apply the outcome of a list-all request
    pub fn apply_list_response(
        &mut self,
        ticket: ListTicket,
        result: Result<Vec<FormulaRecord>>,
    ) -> Applied {
        if self.list_pending != Some(ticket.seq) {
            log::warn!("Discarding stale formula list response #{}", ticket.seq);
            return Applied::Discarded;
        }
        self.list_pending = None;

        match &result {
            Ok(formulas) => log::info!("Loaded {} formulas", formulas.len()),
            Err(e) => log::warn!("Loading formulas failed: {}", e),
        }
        self.all_formulas.resolve(result);
        self.rederive();
        Applied::Current
    }

    /// A deep query for the current term is required and not yet in flight
    pub fn needs_deep_query(&self) -> bool {
        self.mode == SearchMode::Deep
            && !self.deep_cache.contains(&self.term)
            && !self
                .deep_pending
                .as_ref()
                .is_some_and(|(_, term)| *term == self.term)
            && !self
                .deep_failure
                .as_ref()
                .is_some_and(|failure| failure.term == self.term)
    }

    /// Register a deep query for the current term, if one is needed
    pub fn begin_deep_query(&mut self) -> Option<DeepTicket> {
        if !self.needs_deep_query() {
            if self.mode == SearchMode::Deep && self.deep_cache.contains(&self.term) {
                log::debug!("Deep results for '{}' served from cache", self.term);
                self.deep_cache.promote(&self.term);
            }
            return None;
        }

        let seq = self.next_seq();
        self.deep_pending = Some((seq, self.term.clone()));
        self.rederive();
        Some(DeepTicket {
            seq,
            epoch: self.epoch,
            term: self.term.clone(),
        })
    }

    /// Apply the outcome of a deep query
    pub fn apply_deep_response(
        &mut self,
        ticket: DeepTicket,
        result: Result<Vec<MatchResult>>,
    ) -> Applied {
        if ticket.epoch != self.epoch {
            log::warn!(
                "Discarding deep results for '{}' issued before invalidation",
                ticket.term
            );
            return Applied::Discarded;
        }

        let latest = self
            .deep_pending
            .as_ref()
            .is_some_and(|(seq, _)| *seq == ticket.seq);
        if latest {
            self.deep_pending = None;
        }

        match result {
            Ok(results) => {
                if !latest && self.deep_cache.contains(&ticket.term) {
                    log::warn!("Discarding superseded deep results for '{}'", ticket.term);
                    return Applied::Discarded;
                }
                log::info!(
                    "Deep search for '{}' returned {} records",
                    ticket.term,
                    results.len()
                );
                if self
                    .deep_failure
                    .as_ref()
                    .is_some_and(|failure| failure.term == ticket.term)
                {
                    self.deep_failure = None;
                }
                if ticket.term != self.term && self.deep_cache.contains(&self.term) {
                    // Never evict the results currently on display.
                    if self.deep_cache.cap().get() == 1 {
                        log::debug!("No room to cache deep results for '{}'", ticket.term);
                        return Applied::Discarded;
                    }
                    self.deep_cache.promote(&self.term);
                }
                self.deep_cache.put(ticket.term.clone(), results);
                self.rederive();
                if self.mode == SearchMode::Deep && ticket.term == self.term {
                    Applied::Current
                } else {
                    Applied::Cached
                }
            }
            Err(e) => {
                if !latest {
                    log::warn!("Ignoring failure of superseded deep query '{}': {}", ticket.term, e);
                    return Applied::Discarded;
                }
                log::warn!("Deep search for '{}' failed: {}", ticket.term, e);
                self.deep_failure = Some(DeepFailure {
                    term: ticket.term.clone(),
                    message: e.to_string(),
                });
                self.rederive();
                if ticket.term == self.term {
                    Applied::Current
                } else {
                    Applied::Discarded
                }
            }
        }
    }

    /// Drop every cached source after the formula set changed on the backend
    pub fn invalidate(&mut self) {
        log::info!("Formula cache invalidated");
        self.epoch += 1;
        self.all_formulas = Loadable::NotLoaded;
        self.list_pending = None;
        self.deep_cache.clear();
        self.deep_pending = None;
        self.deep_failure = None;
        self.rederive();
    }

    /// Fetch the full list and apply it
    pub async fn refresh<S: FormulaStore + ?Sized>(&mut self, store: &S) -> Applied {
        let ticket = self.begin_list_load();
        let result = store.list_formulas().await;
        self.apply_list_response(ticket, result)
    }

    /// Run the deep query for the current term if one is needed
    pub async fn sync_deep<S: FormulaStore + ?Sized>(&mut self, store: &S) -> Option<Applied> {
        let ticket = self.begin_deep_query()?;
        let result = store.compare_indexes(&ticket.query()).await;
        Some(self.apply_deep_response(ticket, result))
    }

    /// Create a formula, then invalidate and reload the cached list
    pub async fn create<S: FormulaStore + ?Sized>(
        &mut self,
        store: &S,
        formula: &NewFormula,
    ) -> Result<()> {
        formula.validate()?;
        store.create_formula(formula).await?;
        log::info!("Created formula '{}'", formula.name);
        self.invalidate();
        self.refresh(store).await;
        Ok(())
    }

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn rederive(&mut self) {
        let deep = match self.mode {
            SearchMode::Deep => self.deep_cache.get(&self.term).map(Vec::as_slice),
            SearchMode::Shallow => None,
        };
        self.visible = derive_visible(
            self.mode,
            &self.term,
            &self.all_formulas,
            deep,
            self.normalization,
        );
    }
}

/// Derive the visible list from the coordinator's sources
///
/// Pure function of its inputs; nothing is visible until the full list has
/// loaded, whatever the mode.
pub fn derive_visible(
    mode: SearchMode,
    term: &str,
    all_formulas: &Loadable<Vec<FormulaRecord>>,
    deep_results: Option<&[MatchResult]>,
    normalization: Normalization,
) -> Vec<FormulaRecord> {
    let Some(formulas) = all_formulas.ready() else {
        return Vec::new();
    };

    match mode {
        SearchMode::Shallow => shallow_filter(formulas, term, normalization),
        SearchMode::Deep => deep_results.map(deep_filter).unwrap_or_default(),
    }
}

/// Records whose normalized `latex` contains the normalized term, in order
pub fn shallow_filter(
    formulas: &[FormulaRecord],
    term: &str,
    normalization: Normalization,
) -> Vec<FormulaRecord> {
    let needle = normalize_key(term, normalization);
    formulas
        .iter()
        .filter(|formula| normalize_key(&formula.latex, normalization).contains(needle.as_str()))
        .cloned()
        .collect()
}

/// Records the backend reported at least one match for, in response order
pub fn deep_filter(results: &[MatchResult]) -> Vec<FormulaRecord> {
    results
        .iter()
        .filter(|result| result.is_match())
        .map(|result| result.formula.clone())
        .collect()
}
