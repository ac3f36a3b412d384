//! Hierarchy-aware search and result ordering.
//!
//! A direct match pulls in its whole ancestor chain and its whole subtree, so a
//! tree view can render every hit in context. The status filter is applied last
//! as a plain intersection and does not trigger any further expansion.
//!
//! Sorting is a separate concern (`sort_categories`).

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use crate::clock::parse_iso8601;
use crate::model::{Category, NodeId, Status};
use crate::ordering::locale_cmp;
use crate::tree::{ancestor_ids, descendant_ids};

/// Which attribute the query text is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchField {
    #[default]
    All,
    Name,
    CategoryId,
    Tags,
}

impl SearchField {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "name" => Some(Self::Name),
            "id" | "categoryid" | "category_id" => Some(Self::CategoryId),
            "tags" | "tag" => Some(Self::Tags),
            _ => None,
        }
    }
}

/// Search request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    /// Case-insensitive substring; empty matches everything.
    pub query: String,
    pub field: SearchField,
    pub status: Option<Status>,
}

impl SearchFilters {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn field(mut self, field: SearchField) -> Self {
        self.field = field;
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }
}

fn matches(c: &Category, needle: &str, field: SearchField) -> bool {
    let name = || c.name.to_lowercase().contains(needle);
    let display = || c.category_id.to_lowercase().contains(needle);
    let tags = || c.tags.iter().any(|t| t.to_lowercase().contains(needle));
    match field {
        SearchField::Name => name(),
        SearchField::CategoryId => display(),
        SearchField::Tags => tags(),
        SearchField::All => name() || display() || tags(),
    }
}

/// Run a search and return the ids of every category to show.
pub fn search(categories: &[Category], filters: &SearchFilters) -> BTreeSet<NodeId> {
    let needle = filters.query.trim().to_lowercase();

    let mut result: BTreeSet<NodeId> = BTreeSet::new();
    if needle.is_empty() {
        result.extend(categories.iter().map(|c| c.id.clone()));
    } else {
        for c in categories.iter().filter(|c| matches(c, &needle, filters.field)) {
            result.insert(c.id.clone());
            result.extend(ancestor_ids(categories, &c.id));
            result.extend(descendant_ids(categories, &c.id));
        }
    }

    if let Some(status) = filters.status {
        let allowed: HashSet<&NodeId> = categories
            .iter()
            .filter(|c| c.status == status)
            .map(|c| &c.id)
            .collect();
        result.retain(|id| allowed.contains(id));
    }
    result
}

/// Ordering key for result lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Name,
    /// `created_at`
    Date,
    Priority,
}

impl SortBy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Some(Self::Name),
            "date" => Some(Self::Date),
            "priority" => Some(Self::Priority),
            _ => None,
        }
    }

    /// Natural direction: names A-Z, newest first, most urgent first.
    pub fn default_order(&self) -> SortOrder {
        match self {
            Self::Name => SortOrder::Ascending,
            Self::Date | Self::Priority => SortOrder::Descending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

fn compare(a: &Category, b: &Category, by: SortBy) -> Ordering {
    match by {
        SortBy::Name => locale_cmp(&a.name, &b.name),
        SortBy::Date => match (parse_iso8601(&a.created_at), parse_iso8601(&b.created_at)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => a.created_at.cmp(&b.created_at),
        },
        SortBy::Priority => a.priority.rank().cmp(&b.priority.rank()),
    }
}

/// Stable sort of a result list.
pub fn sort_categories(list: &mut [&Category], by: SortBy, order: SortOrder) {
    list.sort_by(|a, b| {
        let o = compare(a, b, by);
        match order {
            SortOrder::Ascending => o,
            SortOrder::Descending => o.reverse(),
        }
    });
}
