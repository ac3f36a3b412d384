//! Export documents.
//!
//! JSON: `{ "categories": [...], "exportDate": "<rfc3339>", "totalCategories": n }`,
//! pretty-printed with two-space indentation.
//!
//! CSV: the import header (`CSV_HEADER`) and one row per category, so an export
//! can be fed straight back into `arbor import`.

use arbor_core::clock::format_iso8601;
use arbor_core::model::Category;
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::ExportError;

/// Canonical CSV column order, shared by import and export.
pub const CSV_HEADER: [&str; 8] = [
    "id",
    "categoryid",
    "name",
    "description",
    "parentid",
    "tags",
    "priority",
    "status",
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument<'a> {
    pub categories: &'a [Category],
    pub export_date: String,
    pub total_categories: usize,
}

impl<'a> ExportDocument<'a> {
    pub fn new(categories: &'a [Category], exported_at: OffsetDateTime) -> Self {
        Self {
            categories,
            export_date: format_iso8601(exported_at),
            total_categories: categories.len(),
        }
    }
}

pub fn to_json(categories: &[Category], exported_at: OffsetDateTime) -> Result<String, ExportError> {
    let doc = ExportDocument::new(categories, exported_at);
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub fn to_csv(categories: &[Category]) -> Result<String, ExportError> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(CSV_HEADER)?;
    for c in categories {
        let tags = c.tags.iter().map(String::as_str).collect::<Vec<_>>().join(";");
        w.write_record([
            c.id.as_str(),
            c.category_id.as_str(),
            c.name.as_str(),
            c.description.as_str(),
            c.parent_id.as_ref().map(|p| p.as_str()).unwrap_or(""),
            tags.as_str(),
            c.priority.as_str(),
            c.status.as_str(),
        ])?;
    }
    let bytes = w.into_inner().map_err(|e| ExportError::Flush(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}
