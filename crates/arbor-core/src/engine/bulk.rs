//! Batch operations over caller-supplied id sets.
//!
//! Every batch is all-or-nothing: one unknown id or one failed precondition
//! rejects the whole request before anything is touched.

use std::collections::HashSet;

use super::edit::{clean_tags, deleted_entry};
use super::CategoryTree;
use crate::errors::{ArborError, ArborResult, ValidationError};
use crate::model::{actions, DeletedLogEntry, NodeId, Status, TreeState};
use crate::store::StateStore;
use crate::tree;

impl<S: StateStore> CategoryTree<S> {
    /// Indices of `ids` in the active list, deduplicated, in request order.
    fn batch_indices(&self, ids: &[NodeId]) -> ArborResult<Vec<usize>> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let idx = self.index_of(id)?;
            if seen.insert(idx) {
                out.push(idx);
            }
        }
        Ok(out)
    }

    /// Set `status` on every target. Returns how many actually changed.
    pub fn bulk_status_change(&mut self, ids: &[NodeId], status: Status) -> ArborResult<usize> {
        if status == Status::Deleted {
            return Err(ArborError::invalid_argument(
                "use bulk_delete to remove categories",
            ));
        }
        let targets = self.batch_indices(ids)?;

        let now = self.now();
        let mut next = self.state.clone();
        let mut changed = 0;
        for idx in targets {
            let c = &mut next.categories[idx];
            if c.status == status {
                continue;
            }
            let details = format!("Status changed from {} to {}", c.status.as_str(), status.as_str());
            c.status = status;
            c.modified_at = now.clone();
            c.push_log(actions::STATUS_CHANGED, &now, details);
            changed += 1;
        }
        if changed > 0 {
            self.commit(next)?;
        }

        tracing::debug!(requested = ids.len(), changed, status = status.as_str(), "bulk status change");
        Ok(changed)
    }

    /// Union `tags` into every target's tag set. Returns how many gained a tag.
    pub fn bulk_add_tags<I, T>(&mut self, ids: &[NodeId], tags: I) -> ArborResult<usize>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tags = clean_tags(tags.into_iter().map(Into::into));
        if tags.is_empty() {
            return Ok(0);
        }
        let targets = self.batch_indices(ids)?;

        let now = self.now();
        let mut next = self.state.clone();
        let mut changed = 0;
        for idx in targets {
            let c = &mut next.categories[idx];
            let added: Vec<String> = tags.iter().filter(|t| !c.tags.contains(*t)).cloned().collect();
            if added.is_empty() {
                continue;
            }
            let details = format!("Added tags: {}", added.join(", "));
            c.tags.extend(added);
            c.modified_at = now.clone();
            c.push_log(actions::TAGS_ADDED, &now, details);
            changed += 1;
        }
        if changed > 0 {
            self.commit(next)?;
        }

        tracing::debug!(requested = ids.len(), changed, "bulk add tags");
        Ok(changed)
    }

    /// Delete every target, or nothing.
    ///
    /// Fails with `HasChildren` when any target has a child outside the batch.
    /// Targets are removed leaves first, each with its own deleted-log entry.
    pub fn bulk_delete(&mut self, ids: &[NodeId], reason: Option<&str>) -> ArborResult<Vec<DeletedLogEntry>> {
        let targets = self.batch_indices(ids)?;
        if targets.is_empty() {
            return Ok(Vec::new());
        }
        let batch: HashSet<&NodeId> = targets.iter().map(|&i| &self.state.categories[i].id).collect();

        for c in &self.state.categories {
            if let Some(pid) = &c.parent_id {
                if batch.contains(pid) && !batch.contains(&c.id) {
                    tracing::debug!(parent = %pid, child = %c.id, "bulk delete rejected");
                    return Err(ValidationError::HasChildren.into());
                }
            }
        }

        // Deepest first so every removal is of a leaf.
        let mut order = targets.clone();
        order.sort_by_key(|&i| {
            std::cmp::Reverse(tree::depth_of(&self.state.categories, &self.state.categories[i].id))
        });

        let now = self.now();
        let mut next = self.state.clone();
        let mut entries = Vec::with_capacity(order.len());
        for &i in &order {
            entries.push(deleted_entry(self.state.categories[i].clone(), &now, reason));
        }
        let doomed: HashSet<NodeId> = order.iter().map(|&i| self.state.categories[i].id.clone()).collect();
        next.categories.retain(|c| !doomed.contains(&c.id));
        next.deleted_logs.extend(entries.iter().cloned());
        self.commit_structural(next)?;

        tracing::debug!(deleted = entries.len(), "bulk delete");
        Ok(entries)
    }

    /// Drop the whole deleted log. Returns the number of entries removed.
    pub fn purge_deleted_logs(&mut self) -> ArborResult<usize> {
        let n = self.state.deleted_logs.len();
        if n == 0 {
            return Ok(0);
        }
        let mut next = self.state.clone();
        next.deleted_logs.clear();
        self.commit(next)?;
        tracing::info!(purged = n, "purged deleted log");
        Ok(n)
    }

    /// Replace everything with an empty state. The only hard delete.
    pub fn reset(&mut self) -> ArborResult<()> {
        self.commit(TreeState::default())?;
        tracing::info!("reset category tree");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use assert_matches::assert_matches;

    use super::super::testkit::*;
    use super::*;

    #[test]
    fn bulk_tags_union_without_duplicates() {
        let mut t = engine();
        let a = add(&mut t, "A", None);
        let b = add(&mut t, "B", None);
        t.bulk_add_tags(&[a.id.clone()], ["sale"]).unwrap();

        let n = t
            .bulk_add_tags(&[a.id.clone(), b.id.clone()], ["sale", "urgent", " "])
            .unwrap();
        assert_eq!(n, 2);
        let expected: BTreeSet<String> = ["sale", "urgent"].iter().map(|s| s.to_string()).collect();
        assert_eq!(t.get(&a.id).unwrap().tags, expected);
        assert_eq!(t.get(&b.id).unwrap().tags, expected);
        assert_eq!(t.get(&a.id).unwrap().logs.last().unwrap().details, "Added tags: urgent");
    }

    #[test]
    fn bulk_status_rejects_unknown_ids_atomically() {
        let mut t = engine();
        let a = add(&mut t, "A", None);
        let before = t.state().clone();
        assert_matches!(
            t.bulk_status_change(&[a.id.clone(), NodeId::new("ghost")], Status::Archived),
            Err(ArborError::NotFound(_))
        );
        assert_eq!(t.state(), &before);

        assert_eq!(t.bulk_status_change(&[a.id.clone(), a.id.clone()], Status::Archived).unwrap(), 1);
        assert_eq!(t.get(&a.id).unwrap().status, Status::Archived);
        assert_eq!(t.bulk_status_change(&[a.id.clone()], Status::Archived).unwrap(), 0);
        assert_matches!(
            t.bulk_status_change(&[a.id.clone()], Status::Deleted),
            Err(ArborError::InvalidArgument(_))
        );
    }

    #[test]
    fn bulk_delete_rejects_parent_without_its_children() {
        let mut t = engine();
        let a = add(&mut t, "A", None);
        add(&mut t, "B", Some(&a));
        let z = add(&mut t, "Z", None);
        let before = t.state().clone();

        assert_matches!(
            t.bulk_delete(&[z.id.clone(), a.id.clone()], None),
            Err(ArborError::Validation(ValidationError::HasChildren))
        );
        assert_eq!(t.state(), &before);
    }

    #[test]
    fn bulk_delete_whole_subtree_leaves_first() {
        let mut t = engine();
        let a = add(&mut t, "A", None);
        let b = add(&mut t, "B", Some(&a));
        let z = add(&mut t, "Z", None);

        let entries = t.bulk_delete(&[a.id.clone(), b.id.clone()], Some("cleanup")).unwrap();
        let order: Vec<&str> = entries.iter().map(|e| e.category_name.as_str()).collect();
        assert_eq!(order, vec!["B", "A"]);
        assert!(entries.iter().all(|e| e.details == "cleanup"));
        assert_eq!(t.categories().len(), 1);
        assert_eq!(t.get(&z.id).unwrap().category_id, "CAT1");
        assert_eq!(t.deleted_logs().len(), 2);
    }

    #[test]
    fn purge_and_reset() {
        let mut t = engine();
        let a = add(&mut t, "A", None);
        add(&mut t, "B", None);
        t.delete(&a.id, None).unwrap();
        assert_eq!(t.purge_deleted_logs().unwrap(), 1);
        assert_eq!(t.purge_deleted_logs().unwrap(), 0);
        t.reset().unwrap();
        assert!(t.categories().is_empty());
        assert_eq!(t.store().snapshot().unwrap()["categories"], serde_json::json!([]));
    }
}
