//! Structural moves and subtree duplication.

use std::collections::HashMap;

use super::{subtree_height, CategoryTree};
use crate::config::DuplicateNaming;
use crate::errors::{ArborError, ArborResult, ValidationError};
use crate::model::{actions, Category, NodeId};
use crate::store::StateStore;
use crate::tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelDirection {
    /// Become a sibling of the current parent.
    Outdent,
    /// Become the last child of the preceding sibling.
    Indent,
}

impl LevelDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outdent => "outdent",
            Self::Indent => "indent",
        }
    }
}

impl<S: StateStore> CategoryTree<S> {
    /// Swap `id` with its neighbouring sibling in array order.
    ///
    /// Returns `false` when already first (`Up`) or last (`Down`). Display ids
    /// are name-ranked, so they are left as they are.
    pub fn move_order(&mut self, id: &NodeId, direction: OrderDirection) -> ArborResult<bool> {
        let idx = self.index_of(id)?;
        let parent = self.state.categories[idx].parent_id.clone();
        let siblings = tree::children_indices(&self.state.categories, parent.as_ref());
        let Some(pos) = siblings.iter().position(|&i| i == idx) else {
            return Err(ArborError::invariant(format!(
                "category {id} missing from its own sibling group"
            )));
        };

        let other = match direction {
            OrderDirection::Up if pos > 0 => siblings[pos - 1],
            OrderDirection::Down if pos + 1 < siblings.len() => siblings[pos + 1],
            _ => return Ok(false),
        };

        let mut next = self.state.clone();
        next.categories.swap(idx, other);
        self.commit(next)?;

        tracing::debug!(id = %id, ?direction, "moved category");
        Ok(true)
    }

    /// Indent under the preceding sibling or outdent to the grandparent.
    ///
    /// Returns `false` when there is nowhere to go.
    pub fn reparent_level(&mut self, id: &NodeId, direction: LevelDirection) -> ArborResult<bool> {
        let idx = self.index_of(id)?;
        let current = &self.state.categories[idx];

        let new_parent: Option<NodeId> = match direction {
            LevelDirection::Outdent => {
                let Some(pid) = &current.parent_id else {
                    return Ok(false);
                };
                tree::find(&self.state.categories, pid)
                    .ok_or(ValidationError::ParentNotFound)?
                    .parent_id
                    .clone()
            }
            LevelDirection::Indent => {
                let siblings =
                    tree::children_indices(&self.state.categories, current.parent_id.as_ref());
                match siblings.iter().position(|&i| i == idx) {
                    Some(pos) if pos > 0 => Some(self.state.categories[siblings[pos - 1]].id.clone()),
                    _ => return Ok(false),
                }
            }
        };

        let new_level = match &new_parent {
            Some(pid) => self.get(pid)?.hierarchy_level + 1,
            None => 0,
        };
        self.check_depth(new_level + subtree_height(&self.state.categories, id))?;
        if tree::sibling_name_taken(&self.state.categories, new_parent.as_ref(), &current.name, Some(id)) {
            return Err(ValidationError::DuplicateName.into());
        }

        let details = match (&new_parent, direction) {
            (Some(pid), LevelDirection::Indent) => format!("Indented under {}", self.get(pid)?.name),
            (Some(pid), LevelDirection::Outdent) => format!("Outdented to {}", self.get(pid)?.name),
            (None, _) => "Outdented to root".to_string(),
        };

        let now = self.now();
        let mut next = self.state.clone();
        let mut moved = next.categories.remove(idx);
        moved.modified_at = now.clone();
        moved.push_log(actions::MOVED, &now, details);
        // An indented node goes after its new parent's existing subtree.
        let at = match (direction, &new_parent) {
            (LevelDirection::Indent, Some(pid)) => tree::subtree_end(&next.categories, pid).unwrap_or(idx),
            _ => idx,
        };
        moved.parent_id = new_parent;
        next.categories.insert(at, moved);
        tree::recompute_subtree_levels(&mut next.categories, id);
        self.commit_structural(next)?;

        tracing::debug!(id = %id, direction = direction.as_str(), "reparented category");
        Ok(true)
    }

    /// Clone `id` and its subtree as the original's next sibling.
    pub fn duplicate(&mut self, id: &NodeId) -> ArborResult<Category> {
        self.index_of(id)?;
        let mut members = vec![id.clone()];
        members.extend(tree::descendant_ids(&self.state.categories, id));
        self.check_capacity(members.len())?;

        let fresh: HashMap<&NodeId, NodeId> =
            members.iter().map(|m| (m, NodeId::generate())).collect();
        let now = self.now();
        let suffix = self.config.copy_suffix.clone();
        let policy = self.config.duplicate_naming;

        let mut clones = Vec::with_capacity(members.len());
        for member in &members {
            let src = self.get(member)?;
            let mut c = src.clone();
            c.id = fresh[member].clone();
            if member != id {
                c.parent_id = src.parent_id.as_ref().and_then(|p| fresh.get(p)).cloned();
                if policy == DuplicateNaming::AllNodes {
                    c.name = self.check_name(&format!("{} {suffix}", src.name))?;
                }
            }
            c.created_at = now.clone();
            c.modified_at = now.clone();
            c.logs.clear();
            c.push_log(
                actions::DUPLICATED,
                &now,
                format!("Duplicated from {}", src.category_id),
            );
            clones.push(c);
        }

        let original = self.get(id)?;
        clones[0].name = self.check_name(&copy_name(&self.state.categories, original, &suffix))?;

        let Some(at) = tree::subtree_end(&self.state.categories, id) else {
            return Err(ArborError::not_found(id.as_str()));
        };
        let root_id = clones[0].id.clone();
        let mut next = self.state.clone();
        next.categories.splice(at..at, clones);
        self.commit_structural(next)?;

        tracing::debug!(id = %id, copy = %root_id, nodes = members.len(), "duplicated subtree");
        Ok(self.get(&root_id)?.clone())
    }
}

/// First free `"<name> (Copy)"`, `"<name> (Copy 2)"`, ... among the original's siblings.
fn copy_name(categories: &[Category], original: &Category, suffix: &str) -> String {
    let parent = original.parent_id.as_ref();
    let first = format!("{} {suffix}", original.name);
    if !tree::sibling_name_taken(categories, parent, &first, None) {
        return first;
    }
    (2u32..)
        .map(|n| {
            let numbered = match suffix.strip_suffix(')') {
                Some(head) => format!("{head} {n})"),
                None => format!("{suffix} {n}"),
            };
            format!("{} {numbered}", original.name)
        })
        .find(|candidate| !tree::sibling_name_taken(categories, parent, candidate, None))
        .unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::super::testkit::*;
    use super::*;
    use crate::config::EngineConfig;
    use crate::model::CategoryPatch;

    fn names(t: &crate::engine::CategoryTree<crate::store::MemoryStore>) -> Vec<&str> {
        t.categories().iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn move_order_swaps_siblings_only() {
        let mut t = engine();
        let a = add(&mut t, "A", None);
        let x = add(&mut t, "X", Some(&a));
        let b = add(&mut t, "B", None);
        let before = t.get(&b.id).unwrap().category_id.clone();

        assert!(t.move_order(&b.id, OrderDirection::Up).unwrap());
        assert_eq!(names(&t), vec!["B", "X", "A"]);
        assert_eq!(t.get(&b.id).unwrap().category_id, before);
        assert_eq!(t.get(&x.id).unwrap().hierarchy_level, 1);

        assert!(!t.move_order(&b.id, OrderDirection::Up).unwrap());
        assert!(!t.move_order(&x.id, OrderDirection::Down).unwrap());
        assert_matches!(
            t.move_order(&NodeId::new("nope"), OrderDirection::Up),
            Err(ArborError::NotFound(_))
        );
    }

    #[test]
    fn indent_and_outdent_walk_levels() {
        let mut t = engine();
        let a = add(&mut t, "A", None);
        let b = add(&mut t, "B", None);
        let c = add(&mut t, "C", Some(&b));

        assert!(!t.reparent_level(&a.id, LevelDirection::Indent).unwrap());
        assert!(!t.reparent_level(&a.id, LevelDirection::Outdent).unwrap());

        assert!(t.reparent_level(&b.id, LevelDirection::Indent).unwrap());
        let b2 = t.get(&b.id).unwrap();
        assert_eq!(b2.parent_id.as_ref(), Some(&a.id));
        assert_eq!(b2.category_id, "CAT1.1");
        assert_eq!(b2.logs.last().unwrap().details, "Indented under A");
        assert_eq!(t.get(&c.id).unwrap().hierarchy_level, 2);

        assert!(t.reparent_level(&b.id, LevelDirection::Outdent).unwrap());
        let b3 = t.get(&b.id).unwrap();
        assert!(b3.parent_id.is_none());
        assert_eq!(b3.logs.last().unwrap().details, "Outdented to root");
        assert_eq!(t.get(&c.id).unwrap().hierarchy_level, 1);
        assert!(t.verify().ok);
    }

    #[test]
    fn indent_appends_after_existing_children() {
        let mut t = engine();
        let a = add(&mut t, "A", None);
        let b = add(&mut t, "B", None);
        add(&mut t, "C", Some(&a));

        assert!(t.reparent_level(&b.id, LevelDirection::Indent).unwrap());
        let kids: Vec<&str> = t.children(Some(&a.id)).iter().map(|c| c.name.as_str()).collect();
        assert_eq!(kids, vec!["C", "B"]);
        assert_eq!(names(&t), vec!["A", "C", "B"]);
        assert!(t.verify().ok);
    }

    #[test]
    fn indent_refuses_name_clash() {
        let mut t = engine();
        let a = add(&mut t, "A", None);
        add(&mut t, "B", Some(&a));
        let b = add(&mut t, "B", None);
        assert_matches!(
            t.reparent_level(&b.id, LevelDirection::Indent),
            Err(ArborError::Validation(ValidationError::DuplicateName))
        );
    }

    #[test]
    fn duplicate_clones_subtree_as_next_sibling() {
        let mut t = engine();
        let a = add(&mut t, "A", None);
        let b = add(&mut t, "B", Some(&a));
        add(&mut t, "C", Some(&b));
        add(&mut t, "Z", None);

        let copy = t.duplicate(&a.id).unwrap();
        assert_eq!(copy.name, "A (Copy)");
        assert!(copy.parent_id.is_none());
        assert_ne!(copy.id, a.id);
        assert_eq!(names(&t), vec!["A", "B", "C", "A (Copy)", "B", "C", "Z"]);

        let copied_kids = t.descendants(&copy.id).unwrap();
        assert_eq!(copied_kids.len(), 2);
        assert!(copied_kids.iter().all(|c| c.logs.len() == 1 && c.logs[0].action == "Duplicated"));
        assert_eq!(copied_kids[1].hierarchy_level, 2);
        assert_eq!(copy.category_id, "CAT2");
        assert_eq!(t.get(&a.id).unwrap().category_id, "CAT1");
        assert!(t.verify().ok);
    }

    #[test]
    fn duplicate_picks_next_free_copy_name() {
        let mut t = engine();
        let a = add(&mut t, "A", None);
        t.duplicate(&a.id).unwrap();
        let second = t.duplicate(&a.id).unwrap();
        assert_eq!(second.name, "A (Copy 2)");
    }

    #[test]
    fn duplicate_all_nodes_policy_renames_descendants() {
        let mut cfg = EngineConfig::default();
        cfg.duplicate_naming = DuplicateNaming::AllNodes;
        let mut t = engine_with(cfg);
        let a = add(&mut t, "A", None);
        add(&mut t, "B", Some(&a));
        let copy = t.duplicate(&a.id).unwrap();
        let kids = t.children(Some(&copy.id));
        assert_eq!(kids[0].name, "B (Copy)");
    }

    #[test]
    fn duplicate_all_nodes_policy_enforces_name_limit_on_descendants() {
        let mut cfg = EngineConfig::default();
        cfg.duplicate_naming = DuplicateNaming::AllNodes;
        let max = cfg.limits.max_name_len;
        let mut t = engine_with(cfg);
        let a = add(&mut t, "A", None);
        add(&mut t, &"b".repeat(max - 5), Some(&a));
        let before = t.categories().len();

        assert_matches!(t.duplicate(&a.id), Err(ArborError::InvalidArgument(_)));
        assert_eq!(t.categories().len(), before);
        assert!(t.categories().iter().all(|c| c.name.chars().count() <= max));
    }

    #[test]
    fn duplicate_of_child_stays_under_parent() {
        let mut t = engine();
        let a = add(&mut t, "A", None);
        let b = add(&mut t, "B", Some(&a));
        let copy = t.duplicate(&b.id).unwrap();
        assert_eq!(copy.parent_id.as_ref(), Some(&a.id));
        assert_eq!(copy.hierarchy_level, 1);
        t.update(&copy.id, CategoryPatch::new().name("Bee")).unwrap();
        assert_eq!(t.children(Some(&a.id)).len(), 2);
    }
}
