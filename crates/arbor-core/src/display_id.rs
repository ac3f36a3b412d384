//! Display identifier regeneration.
//!
//! `category_id` is derived purely from tree shape and names:
//! - roots get `CAT<rank>`
//! - children get `<parent category_id>.<rank>`
//!
//! where `rank` is the 1-based position among siblings sorted by name
//! (`ordering::locale_cmp`, ties in array order).
//!
//! Regeneration is deterministic and idempotent. It never reorders the list:
//! array order (which drives move up/down) is left exactly as given. Nodes that
//! cannot be reached from a root keep whatever display id they had.

use std::collections::{HashMap, HashSet};

use crate::model::{Category, NodeId};
use crate::ordering::sort_indices_by_name;
use crate::tree::child_map;

/// Prefix used for root display ids.
pub const ROOT_PREFIX: &str = "CAT";

/// Compute the canonical display id of every reachable category.
pub fn expected_display_ids(categories: &[Category]) -> HashMap<NodeId, String> {
    let map = child_map(categories);
    let mut out: HashMap<NodeId, String> = HashMap::with_capacity(categories.len());
    let mut visited: HashSet<usize> = HashSet::new();

    let roots = map.get(&None).cloned().unwrap_or_default();
    let mut stack: Vec<(usize, String)> = sort_indices_by_name(categories, &roots)
        .into_iter()
        .enumerate()
        .map(|(rank, i)| (i, format!("{ROOT_PREFIX}{}", rank + 1)))
        .collect();

    while let Some((i, display)) = stack.pop() {
        if !visited.insert(i) {
            continue;
        }
        if let Some(kids) = map.get(&Some(&categories[i].id)) {
            for (rank, k) in sort_indices_by_name(categories, kids).into_iter().enumerate() {
                stack.push((k, format!("{display}.{}", rank + 1)));
            }
        }
        out.insert(categories[i].id.clone(), display);
    }
    out
}

/// Pure regeneration: returns a new list with every reachable `category_id` recomputed.
pub fn regenerate_category_ids(categories: &[Category]) -> Vec<Category> {
    let mut out = categories.to_vec();
    regenerate_in_place(&mut out);
    out
}

/// In-place variant used by the engine's commit path.
pub fn regenerate_in_place(categories: &mut [Category]) {
    let ids = expected_display_ids(categories);
    for c in categories.iter_mut() {
        if let Some(display) = ids.get(&c.id) {
            if c.category_id != *display {
                c.category_id.clone_from(display);
            }
        }
    }
}
