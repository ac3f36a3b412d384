use std::path::PathBuf;

use arbor_core::model::{Priority, Status};
use arbor_core::search::SearchField;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(name = "arbor", version, about = "Arbor category tree CLI")]
pub struct Cli {
    /// Emit JSON output on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Store root directory.
    #[arg(long, global = true, default_value = ".arbor")]
    pub store: PathBuf,

    /// Store key; the tree lives in `<store>/<key>.json`.
    #[arg(long, global = true, default_value = "categories")]
    pub key: String,

    /// Log filter (e.g. `debug`, `arbor_core=trace`). Falls back to ARBOR_LOG, then `warn`.
    #[arg(long, global = true)]
    pub log: Option<String>,

    /// Which duplicated nodes get the copy suffix.
    #[arg(long, global = true, value_enum, default_value_t = NamingArg::RootOnly)]
    pub duplicate_naming: NamingArg,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a category.
    Add {
        name: String,
        #[arg(long, short)]
        description: String,
        /// Parent id or display id (e.g. CAT1.2). Omit for a root.
        #[arg(long, short)]
        parent: Option<String>,
        #[arg(long = "tag", short)]
        tags: Vec<String>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long, value_parser = parse_status)]
        status: Option<Status>,
    },

    /// Change attributes or the parent of a category.
    Update {
        target: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
        /// New parent id or display id.
        #[arg(long, conflicts_with = "root")]
        parent: Option<String>,
        /// Move to the root level.
        #[arg(long)]
        root: bool,
        /// Replace the tag set (repeatable).
        #[arg(long = "tag", short)]
        tags: Option<Vec<String>>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long, value_parser = parse_status)]
        status: Option<Status>,
    },

    /// Soft-delete a category without children.
    Delete {
        target: String,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Copy a category and its subtree next to the original.
    Duplicate { target: String },

    /// Move a category up or down among its siblings.
    Move {
        target: String,
        #[arg(value_enum)]
        direction: DirectionArg,
    },

    /// Make a category a child of its preceding sibling.
    Indent { target: String },

    /// Make a category a sibling of its parent.
    Outdent { target: String },

    /// List categories.
    List {
        #[arg(long, value_enum, default_value_t = SortArg::Name)]
        sort: SortArg,
        #[arg(long, value_enum)]
        order: Option<OrderArg>,
    },

    /// Print the hierarchy.
    Tree,

    /// Show one category with its logs.
    Show { target: String },

    /// Search with ancestor/descendant expansion.
    Search {
        #[arg(default_value = "")]
        query: String,
        #[arg(long, value_parser = parse_field, default_value = "all")]
        field: SearchField,
        #[arg(long, value_parser = parse_status)]
        status: Option<Status>,
        #[arg(long, value_enum, default_value_t = SortArg::Name)]
        sort: SortArg,
        #[arg(long, value_enum)]
        order: Option<OrderArg>,
    },

    /// Set the status of several categories.
    BulkStatus {
        #[arg(value_parser = parse_status)]
        status: Status,
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Add tags to several categories.
    BulkTags {
        #[arg(long = "tag", short, required = true)]
        tags: Vec<String>,
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Delete several categories, all or nothing.
    BulkDelete {
        #[arg(required = true)]
        targets: Vec<String>,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Import categories from a JSON or CSV file.
    Import {
        path: PathBuf,
        /// Format id; defaults to the file extension.
        #[arg(long)]
        format: Option<String>,
    },

    /// Export categories.
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Output file; stdout when omitted.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Restore a deleted category by its deleted-log index.
    Restore { index: usize },

    /// List the deleted log.
    Deleted,

    /// Clear the deleted log.
    PurgeDeleted,

    /// Remove every category and the deleted log.
    Reset {
        /// Required confirmation.
        #[arg(long)]
        yes: bool,
    },

    /// Summary counters.
    Stats,

    /// Verify stored state invariants.
    Check,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingArg {
    RootOnly,
    AllNodes,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionArg {
    Up,
    Down,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortArg {
    Name,
    Date,
    Priority,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderArg {
    Asc,
    Desc,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

fn parse_status(s: &str) -> Result<Status, String> {
    Status::parse(s).ok_or_else(|| format!("unknown status {s:?} (active|inactive|archived)"))
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::parse(s).ok_or_else(|| format!("unknown priority {s:?} (low|medium|high)"))
}

fn parse_field(s: &str) -> Result<SearchField, String> {
    SearchField::parse(s).ok_or_else(|| format!("unknown search field {s:?} (all|name|id|tags)"))
}
