use anyhow::Result;
use arbor_core::config::{DuplicateNaming, EngineConfig};
use arbor_core::model::NodeId;
use arbor_core::prelude::SystemClock;
use arbor_core::search::{SortBy, SortOrder};
use arbor_core::{ArborError, CategoryTree};
use arbor_store::{FileStore, FileStoreConfig};

use crate::args::{Cli, Command, NamingArg, OrderArg, SortArg};

mod bulk;
mod check;
mod edit;
mod query;
mod structure;
mod transfer;

pub type Tree = CategoryTree<FileStore>;

pub fn dispatch(cli: Cli) -> Result<()> {
    let mut tree = open_tree(&cli)?;
    let t = &mut tree;

    match cli.command {
        Command::Add { name, description, parent, tags, priority, status } => {
            edit::add(t, name, description, parent.as_deref(), tags, priority, status)
        }
        Command::Update { target, name, description, parent, root, tags, priority, status } => edit::update(
            t,
            &target,
            edit::UpdateArgs { name, description, parent, root, tags, priority, status },
        ),
        Command::Delete { target, reason } => edit::delete(t, &target, reason.as_deref()),
        Command::Restore { index } => edit::restore(t, index),
        Command::Duplicate { target } => structure::duplicate(t, &target),
        Command::Move { target, direction } => structure::move_order(t, &target, direction),
        Command::Indent { target } => structure::indent(t, &target),
        Command::Outdent { target } => structure::outdent(t, &target),
        Command::List { sort, order } => query::list(t, sort_key(sort, order)),
        Command::Tree => query::tree(t),
        Command::Show { target } => query::show(t, &target),
        Command::Search { query: q, field, status, sort, order } => {
            query::search(t, q, field, status, sort_key(sort, order))
        }
        Command::Stats => query::stats(t),
        Command::Deleted => query::deleted(t),
        Command::BulkStatus { status, targets } => bulk::status(t, status, &targets),
        Command::BulkTags { tags, targets } => bulk::tags(t, tags, &targets),
        Command::BulkDelete { targets, reason } => bulk::delete(t, &targets, reason.as_deref()),
        Command::PurgeDeleted => bulk::purge_deleted(t),
        Command::Reset { yes } => bulk::reset(t, yes),
        Command::Import { path, format } => transfer::import(t, &path, format.as_deref()),
        Command::Export { format, out } => transfer::export(t, format, out.as_deref()),
        Command::Check => check::run(t),
    }
}

fn open_tree(cli: &Cli) -> Result<Tree> {
    let store = FileStore::open(FileStoreConfig::new(&cli.store, &cli.key)).map_err(ArborError::from)?;
    let config = EngineConfig {
        duplicate_naming: match cli.duplicate_naming {
            NamingArg::RootOnly => DuplicateNaming::RootOnly,
            NamingArg::AllNodes => DuplicateNaming::AllNodes,
        },
        ..EngineConfig::default()
    };
    let tree = CategoryTree::open_with(store, config, Box::new(SystemClock))?;
    for f in tree.load_findings() {
        tracing::warn!(code = %f.code, "{}", f.message);
    }
    Ok(tree)
}

fn sort_key(sort: SortArg, order: Option<OrderArg>) -> (SortBy, SortOrder) {
    let by = match sort {
        SortArg::Name => SortBy::Name,
        SortArg::Date => SortBy::Date,
        SortArg::Priority => SortBy::Priority,
    };
    let order = match order {
        Some(OrderArg::Asc) => SortOrder::Ascending,
        Some(OrderArg::Desc) => SortOrder::Descending,
        None => by.default_order(),
    };
    (by, order)
}

/// Resolve a user key (opaque id or display id) to the node's opaque id.
fn target(tree: &Tree, key: &str) -> Result<NodeId> {
    Ok(tree.resolve(key)?.id.clone())
}

fn targets(tree: &Tree, keys: &[String]) -> Result<Vec<NodeId>> {
    keys.iter().map(|k| target(tree, k)).collect()
}
