//! Batch insert of externally parsed records.
//!
//! Parsing lives in `arbor-interchange`; this module only enforces tree rules:
//! - every accepted record gets a fresh id
//! - `parent_ref` resolves against `source_id` of accepted records in the same
//!   batch, nothing else; unresolved references become roots
//! - cycles inside the batch are broken by detaching the record that closes them
//! - invalid records are skipped and reported, never fatal
//!
//! The whole batch is regenerated and persisted once.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use super::CategoryTree;
use crate::errors::ArborResult;
use crate::model::{actions, Category, FieldDefinition, NodeId, Priority, Status};
use crate::ordering::name_key;
use crate::store::StateStore;

/// One loosely-typed record from an import file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportRecord {
    /// Identifier from the source file, used only for in-batch parent lookups.
    pub source_id: Option<String>,
    /// Display id from the source file. Informational; ids are regenerated.
    pub category_id: Option<String>,
    pub name: String,
    pub description: String,
    pub parent_ref: Option<String>,
    pub tags: Vec<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub fields: Vec<FieldDefinition>,
    pub field_values: BTreeMap<String, Value>,
}

impl ImportRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn source_id(mut self, id: impl Into<String>) -> Self {
        self.source_id = Some(id.into());
        self
    }

    pub fn parent_ref(mut self, id: impl Into<String>) -> Self {
        self.parent_ref = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    /// Zero-based position in the input batch.
    pub index: usize,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Ids of accepted records, in input order.
    pub created: Vec<NodeId>,
    pub skipped: Vec<SkippedRecord>,
    /// Records that declared a parent but were inserted as roots.
    pub detached: usize,
}

struct Candidate {
    index: usize,
    id: NodeId,
    name: String,
    description: String,
    parent: Option<usize>,
}

impl<S: StateStore> CategoryTree<S> {
    /// Insert a batch of records. See the module docs for the rules.
    pub fn import(&mut self, records: Vec<ImportRecord>) -> ArborResult<ImportReport> {
        let mut report = ImportReport::default();

        let mut candidates: Vec<Candidate> = Vec::with_capacity(records.len());
        for (index, r) in records.iter().enumerate() {
            let name = r.name.trim();
            let description = r.description.trim();
            let reason = if name.is_empty() {
                Some("name is required".to_string())
            } else if description.is_empty() {
                Some("description is required".to_string())
            } else if name.chars().count() > self.config.limits.max_name_len {
                Some(format!("name exceeds {} characters", self.config.limits.max_name_len))
            } else {
                None
            };
            if let Some(reason) = reason {
                skip(&mut report, index, &r.name, reason);
                continue;
            }
            candidates.push(Candidate {
                index,
                id: NodeId::generate(),
                name: name.to_string(),
                description: description.to_string(),
                parent: None,
            });
        }

        // Source id -> candidate position; the first record claiming an id wins.
        let mut by_source: HashMap<&str, usize> = HashMap::new();
        for (pos, c) in candidates.iter().enumerate() {
            if let Some(src) = records[c.index].source_id.as_deref().map(str::trim) {
                if !src.is_empty() {
                    by_source.entry(src).or_insert(pos);
                }
            }
        }
        for pos in 0..candidates.len() {
            let wanted = records[candidates[pos].index]
                .parent_ref
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty());
            let Some(wanted) = wanted else {
                continue;
            };
            match by_source.get(wanted) {
                Some(&p) if p != pos => candidates[pos].parent = Some(p),
                _ => report.detached += 1,
            }
        }
        report.detached += break_cycles(&mut candidates);

        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut pending: Vec<usize> = Vec::new();
        for (pos, c) in candidates.iter().enumerate() {
            match c.parent {
                Some(p) => children.entry(p).or_default().push(pos),
                None => pending.push(pos),
            }
        }

        // Depth-first from batch roots. A skipped record's children are retried as roots.
        let mut accepted: Vec<(usize, Category)> = Vec::new();
        let mut taken: HashSet<(Option<NodeId>, String)> = self
            .state
            .categories
            .iter()
            .map(|c| (c.parent_id.clone(), name_key(&c.name)))
            .collect();
        let now = self.now();
        let max_depth = self.config.limits.max_depth;

        pending.reverse();
        let mut stack: Vec<(usize, Option<usize>, u32)> = pending.into_iter().map(|p| (p, None, 0)).collect();
        let mut orphans: Vec<usize> = Vec::new();
        let mut accepted_pos: HashMap<usize, NodeId> = HashMap::new();

        loop {
            let Some((pos, parent, level)) = stack.pop() else {
                if orphans.is_empty() {
                    break;
                }
                report.detached += orphans.len();
                stack.extend(orphans.drain(..).rev().map(|p| (p, None, 0)));
                continue;
            };
            let cand = &candidates[pos];
            let parent_id = parent.and_then(|p| accepted_pos.get(&p).cloned());
            let key = (parent_id.clone(), name_key(&cand.name));

            let reason = if level > max_depth {
                Some(format!("hierarchy depth {level} exceeds the limit of {max_depth}"))
            } else if taken.contains(&key) {
                Some("a sibling category with this name already exists".to_string())
            } else {
                None
            };
            let kids = children.get(&pos).cloned().unwrap_or_default();
            if let Some(reason) = reason {
                skip(&mut report, cand.index, &cand.name, reason);
                orphans.extend(kids);
                continue;
            }

            taken.insert(key);
            accepted_pos.insert(pos, cand.id.clone());
            accepted.push((cand.index, build(&records[cand.index], cand, parent_id, level, &now)));
            for k in kids.into_iter().rev() {
                stack.push((k, Some(pos), level + 1));
            }
        }

        if accepted.is_empty() {
            tracing::debug!(skipped = report.skipped.len(), "import accepted nothing");
            report.skipped.sort_by_key(|s| s.index);
            return Ok(report);
        }
        self.check_capacity(accepted.len())?;

        accepted.sort_by_key(|(index, _)| *index);
        report.created = accepted.iter().map(|(_, c)| c.id.clone()).collect();
        report.skipped.sort_by_key(|s| s.index);

        let mut next = self.state.clone();
        next.categories.extend(accepted.into_iter().map(|(_, c)| c));
        self.commit_structural(next)?;

        tracing::info!(
            created = report.created.len(),
            skipped = report.skipped.len(),
            detached = report.detached,
            "imported categories"
        );
        Ok(report)
    }
}

fn skip(report: &mut ImportReport, index: usize, name: &str, reason: String) {
    tracing::warn!(index, name, %reason, "skipping import record");
    report.skipped.push(SkippedRecord {
        index,
        name: name.to_string(),
        reason,
    });
}

/// Detach the record that closes each cycle. Returns how many were detached.
fn break_cycles(candidates: &mut [Candidate]) -> usize {
    let mut broken = 0;
    for pos in 0..candidates.len() {
        let mut seen = HashSet::new();
        let mut cur = candidates[pos].parent;
        while let Some(p) = cur {
            if p == pos {
                candidates[pos].parent = None;
                broken += 1;
                break;
            }
            if !seen.insert(p) {
                break;
            }
            cur = candidates[p].parent;
        }
    }
    broken
}

fn build(record: &ImportRecord, cand: &Candidate, parent_id: Option<NodeId>, level: u32, now: &str) -> Category {
    let status = match record.status {
        Some(Status::Deleted) | None => Status::Active,
        Some(s) => s,
    };
    let mut c = Category {
        id: cand.id.clone(),
        category_id: String::new(),
        parent_id,
        hierarchy_level: level,
        name: cand.name.clone(),
        description: cand.description.clone(),
        status,
        tags: super::edit::clean_tags(record.tags.iter().cloned()),
        priority: record.priority.unwrap_or_default(),
        fields: record.fields.clone(),
        field_values: record.field_values.clone(),
        created_at: now.to_string(),
        modified_at: now.to_string(),
        logs: Vec::new(),
    };
    let details = match &record.source_id {
        Some(src) => format!("Imported from source id {src}"),
        None => "Imported".to_string(),
    };
    c.push_log(actions::IMPORTED, now, details);
    c
}

#[cfg(test)]
mod tests {
    use super::super::testkit::*;
    use super::*;

    fn rec(src: &str, name: &str, parent: Option<&str>) -> ImportRecord {
        let r = ImportRecord::new(name, "d").source_id(src);
        match parent {
            Some(p) => r.parent_ref(p),
            None => r,
        }
    }

    #[test]
    fn parents_resolve_within_batch_only() {
        let mut t = engine();
        let existing = add(&mut t, "Existing", None);

        let report = t
            .import(vec![
                rec("10", "Child", Some("1")),
                rec("1", "Parent", None),
                rec("11", "Stray", Some(existing.id.as_str())),
            ])
            .unwrap();

        assert_eq!(report.created.len(), 3);
        assert_eq!(report.detached, 1);
        let child = t.get(&report.created[0]).unwrap();
        assert_eq!(child.parent_id.as_ref(), Some(&report.created[1]));
        assert_eq!(child.hierarchy_level, 1);
        assert_ne!(child.id.as_str(), "10");
        let stray = t.get(&report.created[2]).unwrap();
        assert!(stray.parent_id.is_none());

        // Inserted in input order after the existing list.
        let order: Vec<&str> = t.categories().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(order, vec!["Existing", "Child", "Parent", "Stray"]);
        assert_eq!(t.store().saves(), 2);
        assert!(t.verify().ok);
    }

    #[test]
    fn invalid_records_are_skipped() {
        let mut t = engine();
        add(&mut t, "Taken", None);
        let mut blank_desc = rec("3", "NoDesc", None);
        blank_desc.description = " ".into();

        let report = t
            .import(vec![
                rec("1", " ", None),
                rec("2", "taken", None),
                blank_desc,
                rec("4", "Fine", None),
            ])
            .unwrap();
        let skipped: Vec<usize> = report.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![0, 1, 2]);
        assert_eq!(report.created.len(), 1);
    }

    #[test]
    fn children_of_skipped_parent_become_roots() {
        let mut t = engine();
        add(&mut t, "Dup", None);
        let report = t
            .import(vec![rec("1", "Dup", None), rec("2", "Kid", Some("1"))])
            .unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.detached, 1);
        assert!(t.get(&report.created[0]).unwrap().parent_id.is_none());
    }

    #[test]
    fn cycles_in_batch_are_broken() {
        let mut t = engine();
        let report = t
            .import(vec![rec("a", "A", Some("b")), rec("b", "B", Some("a"))])
            .unwrap();
        assert_eq!(report.created.len(), 2);
        assert_eq!(report.detached, 1);
        assert!(t.verify().ok);
        let a = t.get(&report.created[0]).unwrap();
        assert!(a.parent_id.is_none());
        assert_eq!(t.get(&report.created[1]).unwrap().parent_id.as_ref(), Some(&a.id));
    }

    #[test]
    fn deleted_status_is_coerced_and_log_written() {
        let mut t = engine();
        let mut r = rec("1", "A", None);
        r.status = Some(Status::Deleted);
        r.tags = vec!["x".into(), " ".into()];
        let report = t.import(vec![r]).unwrap();
        let a = t.get(&report.created[0]).unwrap();
        assert_eq!(a.status, Status::Active);
        assert_eq!(a.tags.len(), 1);
        assert_eq!(a.logs[0].action, "Imported");
    }

    #[test]
    fn empty_batch_does_not_persist() {
        let mut t = engine();
        let report = t.import(Vec::new()).unwrap();
        assert!(report.created.is_empty());
        assert_eq!(t.store().saves(), 0);
    }
}
