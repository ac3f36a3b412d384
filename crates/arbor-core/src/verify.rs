//! Invariant verification for tree state.
//!
//! `verify_state` replays every structural check against an in-memory state and
//! returns a report with one finding per violation. It never mutates anything.
//!
//! Checks:
//! - ids are present and unique
//! - every parent reference resolves (no orphans)
//! - no category is its own ancestor
//! - `hierarchy_level` matches the parent chain
//! - `category_id` matches canonical regeneration
//! - active categories never carry the `deleted` marker
//! - names are present and unique among siblings
//! - deleted-log snapshots look like snapshots
//!
//! Used by:
//! - CLI (`arbor check`)
//! - tests (after every operation in property tests)
//! - the engine's load path, to decide whether a repair pass is needed

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::display_id::expected_display_ids;
use crate::model::{Category, NodeId, Status, TreeState};
use crate::ordering::name_key;
use crate::tree::depth_of;
use crate::version::CURRENT_STATE_VERSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FindingLevel {
    Info,
    Warning,
    Error,
}

impl FindingLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A structured verification or repair finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub level: FindingLevel,
    pub code: String,
    pub message: String,
    pub data: BTreeMap<String, String>,
}

impl Finding {
    pub fn new(level: FindingLevel, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            code: code.into(),
            message: message.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with(mut self, k: impl Into<String>, v: impl Into<String>) -> Self {
        self.data.insert(k.into(), v.into());
        self
    }
}

/// Verification report.
#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    pub ok: bool,
    pub findings: Vec<Finding>,
}

impl VerifyReport {
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.level == FindingLevel::Error)
    }

    pub fn warnings(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.level == FindingLevel::Warning)
            .count()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.findings.iter().map(|f| f.code.as_str()).collect()
    }
}

enum Reach {
    Root,
    Cycle,
    /// The chain ends at a missing parent or enters a cycle this node is not part of.
    Unrooted,
}

fn reach(by_id: &HashMap<&NodeId, &Category>, id: &NodeId) -> Reach {
    let mut visited: HashSet<&NodeId> = HashSet::new();
    let mut cur = id;
    loop {
        let Some(c) = by_id.get(cur) else {
            return Reach::Unrooted;
        };
        let Some(pid) = c.parent_id.as_ref() else {
            return Reach::Root;
        };
        if pid == id {
            return Reach::Cycle;
        }
        if !visited.insert(pid) {
            return Reach::Unrooted;
        }
        cur = pid;
    }
}

fn err(findings: &mut Vec<Finding>, code: &str, message: String, id: &NodeId) {
    findings.push(Finding::new(FindingLevel::Error, code, message).with("id", id.as_str()));
}

/// Verify all invariants of a state.
pub fn verify_state(state: &TreeState) -> VerifyReport {
    let mut findings = Vec::new();

    if state.version != CURRENT_STATE_VERSION {
        findings.push(Finding::new(
            FindingLevel::Info,
            "state.version",
            format!(
                "state version {} differs from current {}",
                state.version, CURRENT_STATE_VERSION
            ),
        ));
    }

    verify_categories(&state.categories, &mut findings);
    verify_deleted_logs(state, &mut findings);

    let ok = !findings.iter().any(|f| f.level == FindingLevel::Error);
    VerifyReport { ok, findings }
}

fn verify_categories(categories: &[Category], findings: &mut Vec<Finding>) {
    let mut seen: HashSet<&NodeId> = HashSet::new();
    for c in categories {
        if c.id.as_str().trim().is_empty() {
            err(findings, "id.empty", format!("category {:?} has an empty id", c.name), &c.id);
        } else if !seen.insert(&c.id) {
            err(findings, "id.duplicate", format!("duplicate category id: {}", c.id), &c.id);
        }
    }

    let by_id: HashMap<&NodeId, &Category> = categories.iter().map(|c| (&c.id, c)).collect();
    let mut unrooted: HashSet<&NodeId> = HashSet::new();

    for c in categories {
        if c.status == Status::Deleted {
            err(
                findings,
                "status.deleted_active",
                format!("active category {} carries the deleted marker", c.id),
                &c.id,
            );
        }

        if c.name.trim().is_empty() {
            err(findings, "name.empty", format!("category {} has no name", c.id), &c.id);
        }
        if c.description.trim().is_empty() {
            findings.push(
                Finding::new(
                    FindingLevel::Warning,
                    "description.empty",
                    format!("category {} has no description", c.id),
                )
                .with("id", c.id.as_str()),
            );
        }

        if let Some(pid) = &c.parent_id {
            if !by_id.contains_key(pid) {
                unrooted.insert(&c.id);
                err(
                    findings,
                    "parent.orphan",
                    format!("category {} references missing parent {pid}", c.id),
                    &c.id,
                );
                continue;
            }
        }
        match reach(&by_id, &c.id) {
            Reach::Root => {}
            Reach::Cycle => {
                unrooted.insert(&c.id);
                err(
                    findings,
                    "tree.cycle",
                    format!("category {} is its own ancestor", c.id),
                    &c.id,
                );
                continue;
            }
            Reach::Unrooted => {
                unrooted.insert(&c.id);
                err(
                    findings,
                    "tree.unrooted",
                    format!("category {} is not reachable from a root", c.id),
                    &c.id,
                );
                continue;
            }
        }

        let expected = depth_of(categories, &c.id);
        if c.hierarchy_level != expected {
            err(
                findings,
                "level.mismatch",
                format!(
                    "category {} has hierarchyLevel {} but its depth is {expected}",
                    c.id, c.hierarchy_level
                ),
                &c.id,
            );
        }
    }

    let expected_ids = expected_display_ids(categories);
    for c in categories {
        if unrooted.contains(&c.id) {
            continue;
        }
        match expected_ids.get(&c.id) {
            Some(display) if *display == c.category_id => {}
            Some(display) => err(
                findings,
                "display_id.mismatch",
                format!(
                    "category {} has categoryId {:?}, expected {display:?}",
                    c.id, c.category_id
                ),
                &c.id,
            ),
            None => {}
        }
    }

    let mut sibling_names: HashMap<(Option<&NodeId>, String), &NodeId> = HashMap::new();
    for c in categories {
        let key = (c.parent_id.as_ref(), name_key(&c.name));
        if let Some(first) = sibling_names.insert(key, &c.id) {
            findings.push(
                Finding::new(
                    FindingLevel::Warning,
                    "name.duplicate_sibling",
                    format!("categories {first} and {} share a name under the same parent", c.id),
                )
                .with("id", c.id.as_str()),
            );
        }
    }
}

fn verify_deleted_logs(state: &TreeState, findings: &mut Vec<Finding>) {
    let active: HashSet<&NodeId> = state.categories.iter().map(|c| &c.id).collect();
    for (i, entry) in state.deleted_logs.iter().enumerate() {
        if entry.category_data.status != Status::Deleted {
            findings.push(
                Finding::new(
                    FindingLevel::Warning,
                    "deleted.status",
                    format!("deleted log entry {i} snapshot is not marked deleted"),
                )
                .with("index", i.to_string()),
            );
        }
        if active.contains(&entry.category_data.id) {
            findings.push(
                Finding::new(
                    FindingLevel::Warning,
                    "deleted.id_active",
                    format!(
                        "deleted log entry {i} refers to id {} which is active again",
                        entry.category_data.id
                    ),
                )
                .with("index", i.to_string()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display_id::regenerate_in_place;
    use crate::tree::fixtures::node;
    use crate::tree::recompute_levels;

    fn healthy() -> TreeState {
        let mut cats = vec![
            node("a", None, "A"),
            node("b", Some("a"), "B"),
            node("c", Some("b"), "C"),
        ];
        recompute_levels(&mut cats);
        regenerate_in_place(&mut cats);
        TreeState::new(cats)
    }

    #[test]
    fn healthy_state_is_ok() {
        let r = verify_state(&healthy());
        assert!(r.ok, "{:?}", r.findings);
        assert!(r.findings.is_empty());
    }

    #[test]
    fn orphan_detected() {
        let mut s = healthy();
        s.categories[1].parent_id = Some(NodeId::new("ghost"));
        let r = verify_state(&s);
        assert!(!r.ok);
        assert!(r.codes().contains(&"parent.orphan"));
    }

    #[test]
    fn cycle_detected() {
        let mut s = healthy();
        s.categories[0].parent_id = Some(NodeId::new("c"));
        let r = verify_state(&s);
        assert!(r.codes().contains(&"tree.cycle"));
    }

    #[test]
    fn stale_level_and_display_id_detected() {
        let mut s = healthy();
        s.categories[2].hierarchy_level = 7;
        s.categories[1].category_id = "CAT9".into();
        let r = verify_state(&s);
        let codes = r.codes();
        assert!(codes.contains(&"level.mismatch"));
        assert!(codes.contains(&"display_id.mismatch"));
    }

    #[test]
    fn duplicate_sibling_names_warn() {
        let mut s = healthy();
        let mut twin = node("b2", Some("a"), "b");
        twin.hierarchy_level = 1;
        s.categories.push(twin);
        regenerate_in_place(&mut s.categories);
        let r = verify_state(&s);
        assert!(r.ok);
        assert_eq!(r.warnings(), 1);
    }
}
