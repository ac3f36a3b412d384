//! JSON import: a bare array of category objects or `{ "categories": [...] }`.
//!
//! Keys are accepted in camelCase or legacy snake_case. `tags` may be an array
//! or a `;`/`,` separated string.

use std::collections::BTreeMap;

use arbor_core::engine::ImportRecord;
use arbor_core::model::FieldDefinition;
use arbor_core::normalize::split_tags;
use serde_json::{Map, Value};

use super::{non_blank, parse_priority, parse_status};
use crate::error::ImportError;
use crate::importer::Importer;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonImporter;

impl Importer for JsonImporter {
    fn parse(&self, input: &str) -> Result<Vec<ImportRecord>, ImportError> {
        let doc: Value = serde_json::from_str(input)?;
        let items = match doc {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("categories") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(ImportError::shape(
                        "expected an array or an object with a \"categories\" array",
                    ))
                }
            },
            _ => {
                return Err(ImportError::shape(
                    "expected an array or an object with a \"categories\" array",
                ))
            }
        };

        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(obj) => Ok(record(&obj, i)),
                _ => Err(ImportError::shape(format!("item {i} is not an object"))),
            })
            .collect()
    }
}

/// First present key among `keys`.
fn pick<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| !v.is_null())
}

/// Text of a string or number value.
fn text(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) => non_blank(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn tags(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items.iter().filter_map(|t| text(Some(t))).collect(),
        Some(Value::String(s)) => split_tags(s),
        _ => Vec::new(),
    }
}

fn record(obj: &Map<String, Value>, index: usize) -> ImportRecord {
    let fields: Vec<FieldDefinition> = match pick(obj, &["fields"]) {
        Some(v) => serde_json::from_value(v.clone()).unwrap_or_else(|e| {
            tracing::warn!(index, error = %e, "ignoring unreadable field definitions");
            Vec::new()
        }),
        None => Vec::new(),
    };
    let field_values: BTreeMap<String, Value> = match pick(obj, &["fieldValues", "field_values"]) {
        Some(Value::Object(m)) => m.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        _ => BTreeMap::new(),
    };

    ImportRecord {
        source_id: text(pick(obj, &["id"])),
        category_id: text(pick(obj, &["categoryId", "category_id", "categoryid"])),
        name: text(pick(obj, &["name", "category_name"])).unwrap_or_default(),
        description: text(pick(obj, &["description", "category_description"])).unwrap_or_default(),
        parent_ref: text(pick(
            obj,
            &["parentId", "parent_id", "parent_category_id", "parentid"],
        )),
        tags: tags(pick(obj, &["tags"])),
        priority: text(pick(obj, &["priority"])).and_then(|p| parse_priority(&p, index)),
        status: text(pick(obj, &["status"])).and_then(|s| parse_status(&s, index)),
        fields,
        field_values,
    }
}

#[cfg(test)]
mod tests {
    use arbor_core::model::{Priority, Status};

    use super::*;

    #[test]
    fn bare_array_and_wrapped_object_are_equivalent() {
        let bare = r#"[{"id": 1, "name": "A", "description": "d"}]"#;
        let wrapped = r#"{"categories": [{"id": 1, "name": "A", "description": "d"}], "exportDate": "x"}"#;
        let a = JsonImporter.parse(bare).unwrap();
        let b = JsonImporter.parse(wrapped).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].source_id.as_deref(), Some("1"));
    }

    #[test]
    fn loose_fields_are_coerced() {
        let input = r#"[{
            "id": "x1", "category_name": "Legacy", "description": " d ",
            "parent_category_id": 7, "tags": "a; b, c", "priority": "HIGH",
            "status": "archived", "field_values": {"f1": 3}
        }]"#;
        let r = &JsonImporter.parse(input).unwrap()[0];
        assert_eq!(r.name, "Legacy");
        assert_eq!(r.parent_ref.as_deref(), Some("7"));
        assert_eq!(r.tags, vec!["a", "b", "c"]);
        assert_eq!(r.priority, Some(Priority::High));
        assert_eq!(r.status, Some(Status::Archived));
        assert_eq!(r.field_values["f1"], 3);
    }

    #[test]
    fn unknown_enum_values_fall_back() {
        let r = &JsonImporter
            .parse(r#"[{"name": "A", "description": "d", "priority": "urgent", "parentId": null}]"#)
            .unwrap()[0];
        assert_eq!(r.priority, None);
        assert_eq!(r.parent_ref, None);
    }

    #[test]
    fn wrong_shapes_are_errors() {
        assert!(matches!(JsonImporter.parse("{}"), Err(ImportError::Shape(_))));
        assert!(matches!(JsonImporter.parse("[1]"), Err(ImportError::Shape(_))));
        assert!(matches!(JsonImporter.parse("not json"), Err(ImportError::Json(_))));
    }
}
