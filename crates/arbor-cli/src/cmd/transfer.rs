use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use arbor_core::clock::{Clock, SystemClock};
use arbor_interchange::{to_csv, to_json, FormatRegistry};

use super::Tree;
use crate::args::ExportFormat;
use crate::io::{export, input};
use crate::output;

pub fn import(tree: &mut Tree, path: &Path, format: Option<&str>) -> Result<()> {
    let text = input::read_text_file(path)?;
    let registry = FormatRegistry::builtin();
    let records = registry
        .parse(format, path, &text)
        .with_context(|| format!("cannot parse {}", path.display()))?;
    tracing::info!(records = records.len(), path = %path.display(), "read import file");

    let report = tree.import(records)?;
    output::emit(&report, |out| {
        writeln!(out, "imported {} categories", report.created.len())?;
        if report.detached > 0 {
            writeln!(out, "  {} parent references not found; imported as roots", report.detached)?;
        }
        for s in &report.skipped {
            writeln!(out, "  skipped record {} ({}): {}", s.index, s.name, s.reason)?;
        }
        Ok(())
    })
}

pub fn export(tree: &Tree, format: ExportFormat, out: Option<&Path>) -> Result<()> {
    let body = match format {
        ExportFormat::Json => to_json(tree.categories(), SystemClock.now())?,
        ExportFormat::Csv => to_csv(tree.categories())?,
    };
    export::write_document(out, &body)
}
