//! Load-boundary normalization and repair.
//!
//! Stored blobs come in several historical shapes:
//! - current: `{ "version": 1, "categories": [...], "deletedLogs": [...] }`
//! - unversioned: `{ "categories": [...], "deletedLogs": [...] }`
//! - bare category array
//!
//! and categories may use legacy snake_case spellings (`category_name`,
//! `parent_category_id`, ...), numeric ids, or tag strings. `normalize_legacy`
//! is the only place that knows about any of this; everything downstream sees
//! the canonical schema.
//!
//! `repair` then restores the structural invariants a hand-edited or
//! half-migrated blob may violate. Each fix is reported as a `Finding`.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::clock::format_iso8601;
use crate::display_id::regenerate_in_place;
use crate::errors::{ArborError, ArborResult};
use crate::model::{Category, DeletedLogEntry, NodeId, Priority, Status, TreeState};
use crate::tree::recompute_levels;
use crate::verify::{Finding, FindingLevel};
use crate::version::{StateVersion, CURRENT_STATE_VERSION};

/// Legacy -> canonical key spellings for category objects.
const CATEGORY_KEYS: &[(&str, &str)] = &[
    ("category_name", "name"),
    ("parent_category_id", "parentId"),
    ("parent_id", "parentId"),
    ("category_id", "categoryId"),
    ("hierarchy_level", "hierarchyLevel"),
    ("created_at", "createdAt"),
    ("modified_at", "modifiedAt"),
    ("updated_at", "modifiedAt"),
    ("field_values", "fieldValues"),
    ("category_description", "description"),
];

const DELETED_KEYS: &[(&str, &str)] = &[
    ("category_id", "categoryId"),
    ("category_name", "categoryName"),
    ("category_data", "categoryData"),
];

/// Normalize any supported stored shape into canonical state.
///
/// Returns the detected source version alongside the state.
pub fn normalize_legacy(value: Value) -> ArborResult<(TreeState, StateVersion)> {
    let (version, categories, deleted) = match value {
        Value::Array(items) => (StateVersion::Legacy, items, Vec::new()),
        Value::Object(mut obj) => {
            let version = StateVersion::from_field(obj.get("version").and_then(Value::as_u64))?;
            let categories = take_array(&mut obj, &["categories"]);
            let deleted = take_array(&mut obj, &["deletedLogs", "deleted_logs"]);
            (version, categories, deleted)
        }
        Value::Null => (StateVersion::V1, Vec::new(), Vec::new()),
        other => {
            return Err(ArborError::invalid_argument(format!(
                "unsupported stored state shape: {}",
                type_name(&other)
            )))
        }
    };

    let mut state = TreeState::default();
    for (i, raw) in categories.into_iter().enumerate() {
        state.categories.push(normalize_category(raw, i)?);
    }
    for (i, raw) in deleted.into_iter().enumerate() {
        match normalize_deleted_entry(raw) {
            Some(entry) => state.deleted_logs.push(entry),
            None => tracing::warn!(index = i, "dropping unreadable deleted log entry"),
        }
    }
    Ok((state, version))
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn take_array(obj: &mut Map<String, Value>, keys: &[&str]) -> Vec<Value> {
    for k in keys {
        if let Some(Value::Array(items)) = obj.remove(*k) {
            return items;
        }
    }
    Vec::new()
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Move legacy keys onto canonical ones. A non-blank legacy value wins.
fn rename_keys(obj: &mut Map<String, Value>, pairs: &[(&str, &str)]) {
    for (legacy, canonical) in pairs {
        if let Some(v) = obj.remove(*legacy) {
            if !is_blank(&v) || !obj.contains_key(*canonical) {
                obj.insert((*canonical).to_string(), v);
            }
        }
    }
}

/// Ids may be stored as numbers (timestamp-based legacy ids).
fn coerce_id(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.trim().is_empty() && s != "null" => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_timestamp(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| time::OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000).ok())
            .map(format_iso8601)
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Split a tag cell on `;` or `,`, trimming and dropping blanks.
pub fn split_tags(s: &str) -> Vec<String> {
    s.split([';', ','])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn coerce_tags(v: Option<&Value>) -> Value {
    let tags: Vec<String> = match v {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|t| match t {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|t| !t.is_empty())
            .collect(),
        Some(Value::String(s)) => split_tags(s),
        _ => Vec::new(),
    };
    Value::from(tags)
}

fn coerce_str(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn normalize_category(raw: Value, index: usize) -> ArborResult<Category> {
    let Value::Object(mut obj) = raw else {
        return Err(ArborError::invalid_argument(format!(
            "category at index {index} is not an object"
        )));
    };
    rename_keys(&mut obj, CATEGORY_KEYS);

    let name = coerce_str(obj.get("name"));
    if name.trim().is_empty() {
        return Err(ArborError::invalid_argument(format!(
            "category at index {index} has no name"
        )));
    }
    obj.insert("name".into(), Value::from(name));

    // Missing ids are filled in by `repair`.
    let id = coerce_id(obj.get("id")).unwrap_or_default();
    obj.insert("id".into(), Value::from(id));
    obj.insert(
        "parentId".into(),
        coerce_id(obj.get("parentId")).map(Value::from).unwrap_or(Value::Null),
    );
    obj.insert("categoryId".into(), Value::from(coerce_str(obj.get("categoryId"))));
    obj.insert("description".into(), Value::from(coerce_str(obj.get("description"))));

    let level = match obj.get("hierarchyLevel") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };
    obj.insert("hierarchyLevel".into(), Value::from(level));

    let status = obj
        .get("status")
        .and_then(Value::as_str)
        .and_then(Status::parse)
        .unwrap_or_default();
    obj.insert("status".into(), Value::from(status.as_str()));
    let priority = obj
        .get("priority")
        .and_then(Value::as_str)
        .and_then(Priority::parse)
        .unwrap_or_default();
    obj.insert("priority".into(), Value::from(priority.as_str()));

    obj.insert("tags".into(), coerce_tags(obj.get("tags")));
    obj.insert("createdAt".into(), Value::from(coerce_timestamp(obj.get("createdAt"))));
    obj.insert("modifiedAt".into(), Value::from(coerce_timestamp(obj.get("modifiedAt"))));

    if !matches!(obj.get("fields"), Some(Value::Array(_))) {
        obj.insert("fields".into(), Value::Array(Vec::new()));
    }
    if !matches!(obj.get("fieldValues"), Some(Value::Object(_))) {
        obj.insert("fieldValues".into(), Value::Object(Map::new()));
    }
    let logs = match obj.remove("logs") {
        Some(Value::Array(items)) => items.into_iter().filter_map(normalize_log).collect(),
        _ => Vec::new(),
    };
    obj.insert("logs".into(), Value::Array(logs));

    serde_json::from_value(Value::Object(obj)).map_err(|e| {
        ArborError::invalid_argument(format!("category at index {index} is malformed: {e}"))
    })
}

fn normalize_log(raw: Value) -> Option<Value> {
    let Value::Object(obj) = raw else {
        return None;
    };
    let mut out = Map::new();
    out.insert("action".into(), Value::from(coerce_str(obj.get("action"))));
    out.insert("timestamp".into(), Value::from(coerce_timestamp(obj.get("timestamp"))));
    out.insert("details".into(), Value::from(coerce_str(obj.get("details"))));
    Some(Value::Object(out))
}

fn normalize_deleted_entry(raw: Value) -> Option<DeletedLogEntry> {
    let Value::Object(mut obj) = raw else {
        return None;
    };
    rename_keys(&mut obj, DELETED_KEYS);

    let data = obj.remove("categoryData")?;
    let mut snapshot = normalize_category(data, 0).ok()?;
    snapshot.status = Status::Deleted;

    Some(DeletedLogEntry {
        category_id: coerce_str(obj.get("categoryId")),
        category_name: match coerce_str(obj.get("categoryName")) {
            s if s.is_empty() => snapshot.name.clone(),
            s => s,
        },
        action: match coerce_str(obj.get("action")) {
            s if s.is_empty() => crate::model::actions::DELETED.to_string(),
            s => s,
        },
        timestamp: coerce_timestamp(obj.get("timestamp")),
        details: coerce_str(obj.get("details")),
        category_data: snapshot,
    })
}

/// Restore structural invariants. Returns the repaired state and one finding per fix.
///
/// Fixes, in order:
/// - missing ids get fresh ones
/// - duplicate ids: later occurrences are dropped
/// - active categories marked `deleted` become `active`
/// - parent references to missing categories (or to self) are cleared
/// - cycles are broken by detaching the first member found
/// - levels and display ids are recomputed
pub fn repair(mut state: TreeState) -> (TreeState, Vec<Finding>) {
    let mut findings = Vec::new();
    let fix = |code: &str, message: String, id: &NodeId| {
        tracing::warn!(code, id = %id, "{message}");
        Finding::new(FindingLevel::Warning, code, message).with("id", id.as_str())
    };

    for c in state.categories.iter_mut() {
        if c.id.as_str().trim().is_empty() {
            c.id = NodeId::generate();
            findings.push(fix("repair.id_assigned", format!("assigned id to {:?}", c.name), &c.id));
        }
    }

    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut kept = Vec::with_capacity(state.categories.len());
    for c in std::mem::take(&mut state.categories) {
        if seen.insert(c.id.clone()) {
            kept.push(c);
        } else {
            findings.push(fix("repair.duplicate_dropped", format!("dropped duplicate of {}", c.id), &c.id));
        }
    }
    state.categories = kept;

    for c in state.categories.iter_mut() {
        if c.status == Status::Deleted {
            c.status = Status::Active;
            findings.push(fix("repair.status_reset", format!("cleared deleted marker on {}", c.id), &c.id));
        }
    }

    let ids: HashSet<NodeId> = state.categories.iter().map(|c| c.id.clone()).collect();
    for c in state.categories.iter_mut() {
        let dangling = match &c.parent_id {
            Some(pid) => pid == &c.id || !ids.contains(pid),
            None => false,
        };
        if dangling {
            c.parent_id = None;
            findings.push(fix("repair.orphan_detached", format!("moved {} to the root level", c.id), &c.id));
        }
    }

    for i in 0..state.categories.len() {
        if on_cycle(&state.categories, i) {
            let c = &mut state.categories[i];
            c.parent_id = None;
            findings.push(fix("repair.cycle_broken", format!("detached {} to break a cycle", c.id), &c.id));
        }
    }

    let before: Vec<(u32, String)> = state
        .categories
        .iter()
        .map(|c| (c.hierarchy_level, c.category_id.clone()))
        .collect();
    recompute_levels(&mut state.categories);
    regenerate_in_place(&mut state.categories);
    let changed = state
        .categories
        .iter()
        .zip(before)
        .filter(|(c, (level, display))| c.hierarchy_level != *level || c.category_id != *display)
        .count();
    if changed > 0 {
        tracing::debug!(changed, "recomputed derived fields");
        findings.push(Finding::new(
            FindingLevel::Info,
            "repair.derived_recomputed",
            format!("recomputed level or display id of {changed} categories"),
        ));
    }

    state.version = CURRENT_STATE_VERSION;
    (state, findings)
}

fn on_cycle(categories: &[Category], index: usize) -> bool {
    let start = &categories[index].id;
    let mut visited: HashSet<&NodeId> = HashSet::new();
    let mut cur = categories[index].parent_id.as_ref();
    while let Some(pid) = cur {
        if pid == start {
            return true;
        }
        if !visited.insert(pid) {
            return false;
        }
        cur = categories
            .iter()
            .find(|c| &c.id == pid)
            .and_then(|c| c.parent_id.as_ref());
    }
    false
}
