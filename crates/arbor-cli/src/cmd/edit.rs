use std::io::Write;

use anyhow::Result;
use arbor_core::model::{CategoryInput, CategoryPatch, Priority, Status};

use super::{target, Tree};
use crate::output;

pub fn add(
    tree: &mut Tree,
    name: String,
    description: String,
    parent: Option<&str>,
    tags: Vec<String>,
    priority: Option<Priority>,
    status: Option<Status>,
) -> Result<()> {
    let parent_id = parent.map(|p| target(tree, p)).transpose()?;

    let mut input = CategoryInput::new(name, description);
    for tag in tags {
        input = input.tag(tag);
    }
    if let Some(p) = priority {
        input = input.priority(p);
    }
    if let Some(s) = status {
        input = input.status(s);
    }

    let created = tree.create(input, parent_id.as_ref())?;
    output::emit(&created, |out| {
        write!(out, "created ")?;
        output::category_line(out, 0, &created)
    })
}

pub struct UpdateArgs {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent: Option<String>,
    pub root: bool,
    pub tags: Option<Vec<String>>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
}

pub fn update(tree: &mut Tree, key: &str, args: UpdateArgs) -> Result<()> {
    let id = target(tree, key)?;

    let mut patch = CategoryPatch::new();
    if let Some(name) = args.name {
        patch = patch.name(name);
    }
    if let Some(d) = args.description {
        patch = patch.description(d);
    }
    if args.root {
        patch = patch.parent(None);
    } else if let Some(p) = args.parent {
        patch = patch.parent(Some(target(tree, &p)?));
    }
    if let Some(tags) = args.tags {
        patch = patch.tags(tags);
    }
    if let Some(p) = args.priority {
        patch = patch.priority(p);
    }
    if let Some(s) = args.status {
        patch = patch.status(s);
    }

    let updated = tree.update(&id, patch)?;
    output::emit(&updated, |out| {
        write!(out, "updated ")?;
        output::category_line(out, 0, &updated)
    })
}

pub fn delete(tree: &mut Tree, key: &str, reason: Option<&str>) -> Result<()> {
    let id = target(tree, key)?;
    let entry = tree.delete(&id, reason)?;
    let index = tree.deleted_logs().len().saturating_sub(1);
    output::emit(&entry, |out| {
        writeln!(
            out,
            "deleted {} ({}); restore with `arbor restore {index}`",
            entry.category_name, entry.category_id
        )
    })
}

pub fn restore(tree: &mut Tree, index: usize) -> Result<()> {
    let restored = tree.restore(index)?;
    output::emit(&restored, |out| {
        write!(out, "restored ")?;
        output::category_line(out, 0, &restored)
    })
}
