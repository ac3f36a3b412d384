//! Built-in importers: JSON and CSV.
//!
//! Both accept loosely typed input: ids may be numbers or strings, enum cells
//! are matched case-insensitively, and unknown values fall back to defaults
//! (with a `warn!`) instead of failing the file.

#![cfg(feature = "builtin")]

pub mod csv_file;
pub mod json_file;

use arbor_core::model::{Priority, Status};

use crate::export::CSV_HEADER;
use crate::importer::Importer;
use crate::spec::FormatSpec;

pub use csv_file::CsvImporter;
pub use json_file::JsonImporter;

/// Specs and importers for every built-in format.
pub fn formats() -> Vec<(FormatSpec, Box<dyn Importer>)> {
    vec![
        (
            FormatSpec::new("json", "JSON")
                .extension("json")
                .media_type("application/json")
                .meta("shape", "array or {categories: [...]}"),
            Box::new(JsonImporter),
        ),
        (
            FormatSpec::new("csv", "CSV")
                .extension("csv")
                .media_type("text/csv")
                .meta("header", CSV_HEADER.join(",")),
            Box::new(CsvImporter),
        ),
    ]
}

/// Trimmed, non-empty text or `None`.
pub(crate) fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

pub(crate) fn parse_priority(raw: &str, index: usize) -> Option<Priority> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let p = Priority::parse(raw);
    if p.is_none() {
        tracing::warn!(index, value = raw, "unknown priority, using default");
    }
    p
}

pub(crate) fn parse_status(raw: &str, index: usize) -> Option<Status> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let s = Status::parse(raw);
    if s.is_none() {
        tracing::warn!(index, value = raw, "unknown status, using default");
    }
    s
}
