use std::io::Write;

use anyhow::Result;
use arbor_core::model::{Category, Status};
use arbor_core::search::{SearchField, SearchFilters, SortBy, SortOrder};
use serde::Serialize;

use super::Tree;
use crate::output;

pub fn list(tree: &Tree, (by, order): (SortBy, SortOrder)) -> Result<()> {
    let list = tree.list(by, order);
    output::emit(&list, |out| {
        for c in &list {
            output::category_line(out, 0, c)?;
        }
        writeln!(out, "{} categories", list.len())
    })
}

#[derive(Debug, Serialize)]
struct TreeRow<'a> {
    depth: u32,
    #[serde(flatten)]
    category: &'a Category,
}

pub fn tree(tree: &Tree) -> Result<()> {
    let rows: Vec<TreeRow<'_>> = tree
        .flatten()
        .into_iter()
        .map(|(depth, category)| TreeRow { depth, category })
        .collect();
    output::emit(&rows, |out| {
        if rows.is_empty() {
            return writeln!(out, "(empty)");
        }
        for r in &rows {
            output::category_line(out, r.depth as usize, r.category)?;
        }
        Ok(())
    })
}

pub fn show(tree: &Tree, key: &str) -> Result<()> {
    let c = tree.resolve(key)?;
    let path: Vec<&str> = tree
        .ancestors(&c.id)?
        .into_iter()
        .rev()
        .map(|a| a.name.as_str())
        .collect();

    output::emit(c, |out| {
        output::category_line(out, 0, c)?;
        writeln!(out, "  id:          {}", c.id)?;
        if !path.is_empty() {
            writeln!(out, "  path:        {}", path.join(" > "))?;
        }
        writeln!(out, "  description: {}", c.description)?;
        writeln!(out, "  created:     {}", c.created_at)?;
        writeln!(out, "  modified:    {}", c.modified_at)?;
        for log in &c.logs {
            writeln!(out, "  - {} {} {}", log.timestamp, log.action, log.details)?;
        }
        Ok(())
    })
}

pub fn search(
    tree: &Tree,
    query: String,
    field: SearchField,
    status: Option<Status>,
    (by, order): (SortBy, SortOrder),
) -> Result<()> {
    let mut filters = SearchFilters::query(query).field(field);
    if let Some(s) = status {
        filters = filters.status(s);
    }
    let hits = tree.search_sorted(&filters, by, order);
    output::emit(&hits, |out| {
        for c in &hits {
            output::category_line(out, 0, c)?;
        }
        writeln!(out, "{} matches (with ancestors and descendants)", hits.len())
    })
}

pub fn stats(tree: &Tree) -> Result<()> {
    let stats = tree.stats();
    output::emit(&stats, |out| {
        writeln!(out, "categories: {} ({} roots, max depth {})", stats.total, stats.roots, stats.max_depth)?;
        for (status, n) in &stats.by_status {
            writeln!(out, "  {status}: {n}")?;
        }
        for (priority, n) in &stats.by_priority {
            writeln!(out, "  priority {priority}: {n}")?;
        }
        writeln!(out, "deleted log: {}", stats.deleted)
    })
}

pub fn deleted(tree: &Tree) -> Result<()> {
    let logs = tree.deleted_logs();
    output::emit(logs, |out| {
        for (i, e) in logs.iter().enumerate() {
            writeln!(out, "{i:>3}  {}  {}  {}  {}", e.timestamp, e.category_id, e.category_name, e.details)?;
        }
        writeln!(out, "{} entries", logs.len())
    })
}
