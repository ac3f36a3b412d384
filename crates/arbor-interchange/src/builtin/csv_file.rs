//! CSV import.
//!
//! Header: `id,categoryid,name,description,parentid,tags,priority,status`
//! (`export::CSV_HEADER`).
//! Column names are matched case-insensitively and in any order; only `name`
//! is mandatory. `tags` is `;`-separated within its cell.

use std::collections::HashMap;

use arbor_core::engine::ImportRecord;
use csv::{ReaderBuilder, StringRecord, Trim};

use super::{non_blank, parse_priority, parse_status};
use crate::error::ImportError;
use crate::importer::Importer;

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvImporter;

/// Header name -> column index, keyed by lowercase name without `_`.
struct Columns(HashMap<String, usize>);

impl Columns {
    fn new(header: &StringRecord) -> Self {
        Self(
            header
                .iter()
                .enumerate()
                .map(|(i, h)| (h.trim().to_ascii_lowercase().replace('_', ""), i))
                .collect(),
        )
    }

    fn get<'r>(&self, row: &'r StringRecord, name: &str) -> &'r str {
        self.0.get(name).and_then(|&i| row.get(i)).unwrap_or("")
    }
}

impl Importer for CsvImporter {
    fn parse(&self, input: &str) -> Result<Vec<ImportRecord>, ImportError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(input.as_bytes());

        let cols = Columns::new(reader.headers()?);
        if !cols.0.contains_key("name") {
            return Err(ImportError::shape("csv header has no \"name\" column"));
        }

        let mut out = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row = row?;
            if row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            out.push(ImportRecord {
                source_id: non_blank(cols.get(&row, "id")),
                category_id: non_blank(cols.get(&row, "categoryid")),
                name: cols.get(&row, "name").to_string(),
                description: cols.get(&row, "description").to_string(),
                parent_ref: non_blank(cols.get(&row, "parentid")),
                tags: cols
                    .get(&row, "tags")
                    .split(';')
                    .filter_map(non_blank)
                    .collect(),
                priority: parse_priority(cols.get(&row, "priority"), index),
                status: parse_status(cols.get(&row, "status"), index),
                ..ImportRecord::default()
            });
        }
        Ok(out)
    }
}
