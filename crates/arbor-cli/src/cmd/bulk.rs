use std::io::Write;

use anyhow::Result;
use arbor_core::model::Status;
use arbor_core::ArborError;
use serde::Serialize;

use super::{targets, Tree};
use crate::output;

#[derive(Debug, Serialize)]
pub struct CountOut {
    pub action: &'static str,
    pub affected: usize,
}

pub fn status(tree: &mut Tree, status: Status, keys: &[String]) -> Result<()> {
    let ids = targets(tree, keys)?;
    let affected = tree.bulk_status_change(&ids, status)?;
    count("status", affected)
}

pub fn tags(tree: &mut Tree, tags: Vec<String>, keys: &[String]) -> Result<()> {
    let ids = targets(tree, keys)?;
    let affected = tree.bulk_add_tags(&ids, tags)?;
    count("tags", affected)
}

pub fn delete(tree: &mut Tree, keys: &[String], reason: Option<&str>) -> Result<()> {
    let ids = targets(tree, keys)?;
    let entries = tree.bulk_delete(&ids, reason)?;
    output::emit(&entries, |out| {
        for e in &entries {
            writeln!(out, "deleted {} ({})", e.category_name, e.category_id)?;
        }
        Ok(())
    })
}

pub fn purge_deleted(tree: &mut Tree) -> Result<()> {
    let affected = tree.purge_deleted_logs()?;
    count("purge-deleted", affected)
}

pub fn reset(tree: &mut Tree, yes: bool) -> Result<()> {
    if !yes {
        return Err(ArborError::invalid_argument("reset removes every category; pass --yes to confirm").into());
    }
    let affected = tree.categories().len();
    tree.reset()?;
    count("reset", affected)
}

fn count(action: &'static str, affected: usize) -> Result<()> {
    let out = CountOut { action, affected };
    output::emit(&out, |w| writeln!(w, "{action}: {affected} categories affected"))
}
