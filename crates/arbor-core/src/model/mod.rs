//! Arbor data models.
//!
//! This module defines the strongly-typed Rust representation of the persisted
//! category tree. There is exactly one canonical schema; legacy field spellings
//! are handled once, at the load boundary, by `crate::normalize`.
//!
//! Design goals:
//! - **Flat storage:** categories live in one `Vec` with `parent_id` back-references.
//!   The relative array order of siblings is significant (move up/down).
//! - **Derived fields:** `category_id` and `hierarchy_level` are recomputed by the
//!   engine after every structural mutation. They are stored for readers but are
//!   never authoritative.
//! - **Minimal policy:** models are mostly "dumb" data. The engine applies
//!   validation, limits and persistence.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::version::CURRENT_STATE_VERSION;

/// Opaque, immutable category identifier.
///
/// New ids are UUID v4 strings. Any non-empty string loaded from a legacy store is
/// accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh, never-reused identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Category lifecycle status.
///
/// `Deleted` is the soft-delete marker carried by deleted-log snapshots. Active
/// categories never hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Inactive,
    Archived,
    Deleted,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    /// Lenient parse (case-insensitive, trimmed).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "archived" => Some(Self::Archived),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Numeric weight used for sorting (higher is more urgent).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A custom field definition attached to a category. Opaque to the tree engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    /// Unknown keys are preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Audit trail entry. Logs are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub action: String,
    pub timestamp: String,
    #[serde(default)]
    pub details: String,
}

/// Well-known log actions.
pub mod actions {
    pub const CREATED: &str = "Created";
    pub const MODIFIED: &str = "Modified";
    pub const MOVED: &str = "Moved";
    pub const DUPLICATED: &str = "Duplicated";
    pub const STATUS_CHANGED: &str = "Status changed";
    pub const TAGS_ADDED: &str = "Tags added";
    pub const IMPORTED: &str = "Imported";
    pub const RESTORED: &str = "Restored";
    pub const DELETED: &str = "Deleted";
}

/// A category node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: NodeId,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub hierarchy_level: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub field_values: BTreeMap<String, Value>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub modified_at: String,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn push_log(&mut self, action: &str, timestamp: &str, details: impl Into<String>) {
        self.logs.push(LogEntry {
            action: action.to_string(),
            timestamp: timestamp.to_string(),
            details: details.into(),
        });
    }
}

/// Snapshot of a soft-deleted category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedLogEntry {
    pub category_id: String,
    pub category_name: String,
    pub action: String,
    pub timestamp: String,
    #[serde(default)]
    pub details: String,
    pub category_data: Category,
}

/// The whole persisted unit: active categories plus the deleted log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeState {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub deleted_logs: Vec<DeletedLogEntry>,
}

fn current_version() -> u32 {
    CURRENT_STATE_VERSION
}

impl Default for TreeState {
    fn default() -> Self {
        Self {
            version: CURRENT_STATE_VERSION,
            categories: Vec::new(),
            deleted_logs: Vec::new(),
        }
    }
}

impl TreeState {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            categories,
            ..Self::default()
        }
    }
}

/// Attributes collected for a new category.
///
/// The parent is not part of the input: it is an explicit argument of
/// `CategoryTree::create`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryInput {
    pub name: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub priority: Priority,
    pub status: Status,
    pub fields: Vec<FieldDefinition>,
    pub field_values: BTreeMap<String, Value>,
}

impl CategoryInput {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn field(mut self, def: FieldDefinition) -> Self {
        self.fields.push(def);
        self
    }

    pub fn field_value(mut self, field_id: impl Into<String>, value: Value) -> Self {
        self.field_values.insert(field_id.into(), value);
        self
    }
}

/// Partial update of a category's mutable attributes.
///
/// `parent_id: Some(None)` moves the category to the root level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Option<NodeId>>,
    pub status: Option<Status>,
    pub tags: Option<BTreeSet<String>>,
    pub priority: Option<Priority>,
    pub fields: Option<Vec<FieldDefinition>>,
    pub field_values: Option<BTreeMap<String, Value>>,
}

impl CategoryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn parent(mut self, parent_id: Option<NodeId>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_serializes_camel_case() {
        let c = Category {
            id: NodeId::new("a"),
            category_id: "CAT1".into(),
            parent_id: None,
            hierarchy_level: 0,
            name: "Electronics".into(),
            description: "d".into(),
            status: Status::Active,
            tags: BTreeSet::new(),
            priority: Priority::High,
            fields: Vec::new(),
            field_values: BTreeMap::new(),
            created_at: String::new(),
            modified_at: String::new(),
            logs: Vec::new(),
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["categoryId"], "CAT1");
        assert_eq!(v["hierarchyLevel"], 0);
        assert_eq!(v["parentId"], Value::Null);
        assert_eq!(v["priority"], "high");
    }

    #[test]
    fn field_definition_keeps_unknown_keys() {
        let raw = serde_json::json!({"id": "f1", "name": "Color", "type": "select", "options": ["red"]});
        let f: FieldDefinition = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(f.field_type, "select");
        assert_eq!(serde_json::to_value(&f).unwrap()["options"], raw["options"]);
    }

    #[test]
    fn status_parse_is_lenient() {
        assert_eq!(Status::parse(" Archived "), Some(Status::Archived));
        assert_eq!(Status::parse("gone"), None);
        assert_eq!(Priority::parse("HIGH"), Some(Priority::High));
    }

    #[test]
    fn empty_patch_detected() {
        assert!(CategoryPatch::new().is_empty());
        assert!(!CategoryPatch::new().parent(None).is_empty());
    }
}
