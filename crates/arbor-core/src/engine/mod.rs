//! The category tree engine.
//!
//! `CategoryTree` owns the whole `TreeState` (active categories + deleted log)
//! together with the store it was loaded from. There is no ambient state: every
//! instance is independent, which is what the tests rely on.
//!
//! Mutation protocol (every operation follows it):
//! - validate against the current state; on failure return before touching anything
//! - clone the state and compute the complete next state
//! - regenerate display ids once, if the operation is structural
//! - persist the next state; only on success does it replace the in-memory state
//!
//! A failed save therefore leaves memory and store in agreement.
//!
//! Submodules group the operations:
//! - `edit`: create / update / delete / restore
//! - `structure`: move up/down, indent/outdent, duplicate
//! - `bulk`: bulk status / tags / delete, purge, reset
//! - `import`: batch insert of externally parsed records

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::config::{validate_config, EngineConfig};
use crate::display_id::regenerate_in_place;
use crate::errors::{ArborError, ArborResult, ValidationError};
use crate::model::{Category, DeletedLogEntry, NodeId, TreeState};
use crate::normalize::{normalize_legacy, repair};
use crate::search::{search, sort_categories, SearchFilters, SortBy, SortOrder};
use crate::store::StateStore;
use crate::tree;
use crate::verify::{verify_state, Finding, VerifyReport};

mod bulk;
mod edit;
mod import;
mod structure;

pub use import::{ImportRecord, ImportReport, SkippedRecord};
pub use structure::{LevelDirection, OrderDirection};

/// Summary counters for dashboards and `arbor stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeStats {
    pub total: usize,
    pub roots: usize,
    pub max_depth: u32,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub deleted: usize,
}

/// Hierarchical category tree bound to a store.
pub struct CategoryTree<S: StateStore> {
    store: S,
    state: TreeState,
    config: EngineConfig,
    clock: Box<dyn Clock>,
    load_findings: Vec<Finding>,
}

impl<S: StateStore> CategoryTree<S> {
    /// Open with default configuration and the system clock.
    pub fn open(store: S) -> ArborResult<Self> {
        Self::open_with(store, EngineConfig::default(), Box::new(SystemClock))
    }

    /// Load (and if necessary normalize and repair) the stored state.
    ///
    /// Repairs are kept in memory and reach the store with the next mutation.
    pub fn open_with(store: S, config: EngineConfig, clock: Box<dyn Clock>) -> ArborResult<Self> {
        validate_config(&config)?;

        let mut load_findings = Vec::new();
        let state = match store.load()? {
            None => TreeState::default(),
            Some(raw) => {
                let (state, version) = normalize_legacy(raw)?;
                let report = verify_state(&state);
                if report.ok && version.is_current() {
                    state
                } else {
                    tracing::warn!(
                        version = version.as_u32(),
                        errors = report.findings.len(),
                        "stored state needs repair"
                    );
                    let (repaired, findings) = repair(state);
                    load_findings = findings;
                    repaired
                }
            }
        };

        tracing::debug!(
            categories = state.categories.len(),
            deleted = state.deleted_logs.len(),
            "opened category tree"
        );
        Ok(Self {
            store,
            state,
            config,
            clock,
            load_findings,
        })
    }

    pub fn state(&self) -> &TreeState {
        &self.state
    }

    pub fn categories(&self) -> &[Category] {
        &self.state.categories
    }

    pub fn deleted_logs(&self) -> &[DeletedLogEntry] {
        &self.state.deleted_logs
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Repairs applied while opening the store.
    pub fn load_findings(&self) -> &[Finding] {
        &self.load_findings
    }

    pub fn get(&self, id: &NodeId) -> ArborResult<&Category> {
        tree::find(&self.state.categories, id).ok_or_else(|| ArborError::not_found(id.as_str()))
    }

    pub fn find_by_display_id(&self, display: &str) -> Option<&Category> {
        let wanted = display.trim();
        self.state
            .categories
            .iter()
            .find(|c| c.category_id.eq_ignore_ascii_case(wanted))
    }

    /// Resolve a user-supplied key: an opaque id first, then a display id.
    pub fn resolve(&self, key: &str) -> ArborResult<&Category> {
        let id = NodeId::new(key.trim());
        tree::find(&self.state.categories, &id)
            .or_else(|| self.find_by_display_id(key))
            .ok_or_else(|| ArborError::not_found(key))
    }

    /// Direct children of `parent` (roots for `None`), in array order.
    pub fn children(&self, parent: Option<&NodeId>) -> Vec<&Category> {
        tree::children_indices(&self.state.categories, parent)
            .into_iter()
            .map(|i| &self.state.categories[i])
            .collect()
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: &NodeId) -> ArborResult<Vec<&Category>> {
        self.get(id)?;
        Ok(self.lookup_all(tree::ancestor_ids(&self.state.categories, id)))
    }

    /// Descendants of `id`, depth-first.
    pub fn descendants(&self, id: &NodeId) -> ArborResult<Vec<&Category>> {
        self.get(id)?;
        Ok(self.lookup_all(tree::descendant_ids(&self.state.categories, id)))
    }

    fn lookup_all(&self, ids: Vec<NodeId>) -> Vec<&Category> {
        ids.iter()
            .filter_map(|id| tree::find(&self.state.categories, id))
            .collect()
    }

    /// Display-order walk with depths, for tree rendering.
    pub fn flatten(&self) -> Vec<(u32, &Category)> {
        tree::flatten(&self.state.categories)
            .into_iter()
            .map(|(i, depth)| (depth, &self.state.categories[i]))
            .collect()
    }

    pub fn search(&self, filters: &SearchFilters) -> BTreeSet<NodeId> {
        search(&self.state.categories, filters)
    }

    /// Search, then order the hits.
    pub fn search_sorted(&self, filters: &SearchFilters, by: SortBy, order: SortOrder) -> Vec<&Category> {
        let hits = self.search(filters);
        let mut list: Vec<&Category> = self
            .state
            .categories
            .iter()
            .filter(|c| hits.contains(&c.id))
            .collect();
        sort_categories(&mut list, by, order);
        list
    }

    /// Every active category, ordered.
    pub fn list(&self, by: SortBy, order: SortOrder) -> Vec<&Category> {
        let mut list: Vec<&Category> = self.state.categories.iter().collect();
        sort_categories(&mut list, by, order);
        list
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            total: self.state.categories.len(),
            deleted: self.state.deleted_logs.len(),
            ..TreeStats::default()
        };
        for c in &self.state.categories {
            if c.is_root() {
                stats.roots += 1;
            }
            stats.max_depth = stats.max_depth.max(c.hierarchy_level);
            *stats.by_status.entry(c.status.as_str().to_string()).or_default() += 1;
            *stats.by_priority.entry(c.priority.as_str().to_string()).or_default() += 1;
        }
        stats
    }

    pub fn verify(&self) -> VerifyReport {
        verify_state(&self.state)
    }

    fn now(&self) -> String {
        self.clock.now_iso8601()
    }

    fn index_of(&self, id: &NodeId) -> ArborResult<usize> {
        tree::index_of(&self.state.categories, id).ok_or_else(|| ArborError::not_found(id.as_str()))
    }

    /// Trimmed, length-checked name.
    fn check_name(&self, name: &str) -> ArborResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::NameRequired.into());
        }
        if name.chars().count() > self.config.limits.max_name_len {
            return Err(ArborError::invalid_argument(format!(
                "name exceeds {} characters",
                self.config.limits.max_name_len
            )));
        }
        Ok(name.to_string())
    }

    fn check_depth(&self, level: u32) -> ArborResult<()> {
        if level > self.config.limits.max_depth {
            return Err(ArborError::invalid_argument(format!(
                "hierarchy depth {level} exceeds the limit of {}",
                self.config.limits.max_depth
            )));
        }
        Ok(())
    }

    fn check_capacity(&self, adding: usize) -> ArborResult<()> {
        let max = self.config.limits.max_categories;
        if self.state.categories.len() + adding > max {
            return Err(ArborError::invalid_argument(format!(
                "category limit of {max} reached"
            )));
        }
        Ok(())
    }

    /// Regenerate display ids, then persist.
    fn commit_structural(&mut self, mut next: TreeState) -> ArborResult<()> {
        regenerate_in_place(&mut next.categories);
        self.commit(next)
    }

    /// Persist `next`; replace the in-memory state only if that succeeds.
    fn commit(&mut self, next: TreeState) -> ArborResult<()> {
        if let Err(e) = self.store.save(&next) {
            tracing::warn!(error = %e, "save failed; in-memory state left unchanged");
            return Err(e);
        }
        tracing::debug!(
            categories = next.categories.len(),
            deleted = next.deleted_logs.len(),
            "persisted state"
        );
        self.state = next;
        Ok(())
    }
}

fn check_description(description: &str) -> ArborResult<String> {
    let d = description.trim();
    if d.is_empty() {
        return Err(ValidationError::DescriptionRequired.into());
    }
    Ok(d.to_string())
}

/// Height of the subtree under `id` relative to `id` itself (0 for a leaf).
fn subtree_height(categories: &[Category], id: &NodeId) -> u32 {
    let base = tree::find(categories, id).map(|c| c.hierarchy_level).unwrap_or(0);
    tree::descendant_ids(categories, id)
        .iter()
        .filter_map(|d| tree::find(categories, d))
        .map(|c| c.hierarchy_level.saturating_sub(base))
        .max()
        .unwrap_or(0)
}
