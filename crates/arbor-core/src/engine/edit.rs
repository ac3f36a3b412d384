//! Single-category create / update / delete / restore.

use super::{check_description, subtree_height, CategoryTree};
use crate::errors::{ArborError, ArborResult, ValidationError};
use crate::model::{
    actions, Category, CategoryInput, CategoryPatch, DeletedLogEntry, NodeId, Status,
};
use crate::store::StateStore;
use crate::tree;

impl<S: StateStore> CategoryTree<S> {
    /// Create a category under `parent_id` (root when `None`).
    pub fn create(&mut self, input: CategoryInput, parent_id: Option<&NodeId>) -> ArborResult<Category> {
        let name = self.check_name(&input.name)?;
        let description = check_description(&input.description)?;

        let level = match parent_id {
            Some(pid) => {
                tree::find(&self.state.categories, pid)
                    .ok_or(ValidationError::ParentNotFound)?
                    .hierarchy_level
                    + 1
            }
            None => 0,
        };
        if tree::sibling_name_taken(&self.state.categories, parent_id, &name, None) {
            return Err(ValidationError::DuplicateName.into());
        }
        if input.status == Status::Deleted {
            return Err(ArborError::invalid_argument(
                "new categories cannot carry the deleted status",
            ));
        }
        self.check_depth(level)?;
        self.check_capacity(1)?;

        let now = self.now();
        let id = NodeId::generate();
        let mut category = Category {
            id: id.clone(),
            category_id: String::new(),
            parent_id: parent_id.cloned(),
            hierarchy_level: level,
            name,
            description,
            status: input.status,
            tags: clean_tags(input.tags),
            priority: input.priority,
            fields: input.fields,
            field_values: input.field_values,
            created_at: now.clone(),
            modified_at: now.clone(),
            logs: Vec::new(),
        };
        let details = format!("Created category {}", category.name);
        category.push_log(actions::CREATED, &now, details);

        let mut next = self.state.clone();
        next.categories.push(category);
        self.commit_structural(next)?;

        tracing::debug!(id = %id, "created category");
        Ok(self.get(&id)?.clone())
    }

    /// Apply a partial update. Changing `parent_id` reparents the whole subtree.
    pub fn update(&mut self, id: &NodeId, patch: CategoryPatch) -> ArborResult<Category> {
        let idx = self.index_of(id)?;
        if patch.is_empty() {
            return Ok(self.state.categories[idx].clone());
        }
        let current = &self.state.categories[idx];

        let name = match &patch.name {
            Some(n) => self.check_name(n)?,
            None => current.name.clone(),
        };
        let description = match &patch.description {
            Some(d) => check_description(d)?,
            None => current.description.clone(),
        };

        let parent_change = match &patch.parent_id {
            Some(new_parent) if *new_parent != current.parent_id => Some(new_parent.clone()),
            _ => None,
        };
        let target_parent = parent_change.clone().unwrap_or_else(|| current.parent_id.clone());

        if let Some(Some(pid)) = &parent_change {
            let parent =
                tree::find(&self.state.categories, pid).ok_or(ValidationError::ParentNotFound)?;
            if tree::is_self_or_descendant(&self.state.categories, pid, id) {
                return Err(ValidationError::CyclicReparent.into());
            }
            let height = subtree_height(&self.state.categories, id);
            self.check_depth(parent.hierarchy_level + 1 + height)?;
        }

        let renamed = crate::ordering::name_key(&name) != crate::ordering::name_key(&current.name);
        if (renamed || parent_change.is_some())
            && tree::sibling_name_taken(&self.state.categories, target_parent.as_ref(), &name, Some(id))
        {
            return Err(ValidationError::DuplicateName.into());
        }
        if patch.status == Some(Status::Deleted) {
            return Err(ArborError::invalid_argument(
                "use delete to remove a category",
            ));
        }

        let now = self.now();
        let mut next = self.state.clone();
        let c = &mut next.categories[idx];
        let mut changed: Vec<&str> = Vec::new();

        if c.name != name {
            c.name = name;
            changed.push("name");
        }
        if c.description != description {
            c.description = description;
            changed.push("description");
        }
        if let Some(parent) = parent_change {
            c.parent_id = parent;
            changed.push("parent");
        }
        if let Some(status) = patch.status.filter(|s| *s != c.status) {
            c.status = status;
            changed.push("status");
        }
        if let Some(tags) = patch.tags {
            let tags = clean_tags(tags);
            if tags != c.tags {
                c.tags = tags;
                changed.push("tags");
            }
        }
        if let Some(priority) = patch.priority.filter(|p| *p != c.priority) {
            c.priority = priority;
            changed.push("priority");
        }
        if let Some(fields) = patch.fields {
            c.fields = fields;
            changed.push("fields");
        }
        if let Some(values) = patch.field_values {
            c.field_values = values;
            changed.push("fieldValues");
        }

        if changed.is_empty() {
            return Ok(self.state.categories[idx].clone());
        }

        c.modified_at = now.clone();
        c.push_log(actions::MODIFIED, &now, format!("Updated {}", changed.join(", ")));

        if changed.contains(&"parent") {
            tree::recompute_subtree_levels(&mut next.categories, id);
        }
        self.commit_structural(next)?;

        tracing::debug!(id = %id, fields = ?changed, "updated category");
        Ok(self.get(id)?.clone())
    }

    /// Soft-delete a leaf category into the deleted log.
    pub fn delete(&mut self, id: &NodeId, reason: Option<&str>) -> ArborResult<DeletedLogEntry> {
        let idx = self.index_of(id)?;
        if tree::has_children(&self.state.categories, id) {
            return Err(ValidationError::HasChildren.into());
        }

        let now = self.now();
        let mut next = self.state.clone();
        let removed = next.categories.remove(idx);
        let entry = deleted_entry(removed, &now, reason);
        next.deleted_logs.push(entry.clone());
        self.commit_structural(next)?;

        tracing::debug!(id = %id, "deleted category");
        Ok(entry)
    }

    /// Re-insert the snapshot held by deleted-log entry `index`.
    ///
    /// A parent that no longer exists makes the restored category a root. An id
    /// that has been reused gets replaced by a fresh one.
    pub fn restore(&mut self, index: usize) -> ArborResult<Category> {
        let entry = self
            .state
            .deleted_logs
            .get(index)
            .ok_or_else(|| ArborError::not_found(format!("deleted log entry {index}")))?;

        let mut category = entry.category_data.clone();
        category.status = Status::Active;
        if let Some(pid) = &category.parent_id {
            if tree::find(&self.state.categories, pid).is_none() {
                category.parent_id = None;
            }
        }
        if tree::find(&self.state.categories, &category.id).is_some() {
            category.id = NodeId::generate();
        }
        if tree::sibling_name_taken(
            &self.state.categories,
            category.parent_id.as_ref(),
            &category.name,
            None,
        ) {
            return Err(ValidationError::DuplicateName.into());
        }
        category.hierarchy_level = match &category.parent_id {
            Some(pid) => tree::depth_of(&self.state.categories, pid) + 1,
            None => 0,
        };
        self.check_depth(category.hierarchy_level)?;
        self.check_capacity(1)?;

        let now = self.now();
        category.modified_at = now.clone();
        category.push_log(actions::RESTORED, &now, "Restored from deleted log");
        let id = category.id.clone();

        let mut next = self.state.clone();
        next.deleted_logs.remove(index);
        next.categories.push(category);
        self.commit_structural(next)?;

        tracing::debug!(id = %id, index, "restored category");
        Ok(self.get(&id)?.clone())
    }
}

/// Trim tags and drop blanks.
pub(super) fn clean_tags<I: IntoIterator<Item = String>>(tags: I) -> std::collections::BTreeSet<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

pub(super) fn deleted_entry(mut removed: Category, now: &str, reason: Option<&str>) -> DeletedLogEntry {
    let details = reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("Category deleted")
        .to_string();
    removed.status = Status::Deleted;
    removed.push_log(actions::DELETED, now, details.clone());
    DeletedLogEntry {
        category_id: removed.category_id.clone(),
        category_name: removed.name.clone(),
        action: actions::DELETED.to_string(),
        timestamp: now.to_string(),
        details,
        category_data: removed,
    }
}
