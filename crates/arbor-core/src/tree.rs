//! Pure tree algorithms over the flat category list.
//!
//! The list is the only representation; edges are `parent_id` back-references.
//! Every walk here is guarded against cycles so that corrupt input (which the
//! verifier reports and `normalize::repair` fixes) cannot loop forever.
//!
//! Children are always visited in array order.

use std::collections::{HashMap, HashSet};

use crate::model::{Category, NodeId};
use crate::ordering::name_key;

/// Parent id -> child indices (array order).
pub type ChildMap<'a> = HashMap<Option<&'a NodeId>, Vec<usize>>;

pub fn child_map(categories: &[Category]) -> ChildMap<'_> {
    let mut map: ChildMap<'_> = HashMap::new();
    for (i, c) in categories.iter().enumerate() {
        map.entry(c.parent_id.as_ref()).or_default().push(i);
    }
    map
}

pub fn index_of(categories: &[Category], id: &NodeId) -> Option<usize> {
    categories.iter().position(|c| &c.id == id)
}

pub fn find<'a>(categories: &'a [Category], id: &NodeId) -> Option<&'a Category> {
    categories.iter().find(|c| &c.id == id)
}

/// Indices of the direct children of `parent` (or of the roots), in array order.
pub fn children_indices(categories: &[Category], parent: Option<&NodeId>) -> Vec<usize> {
    categories
        .iter()
        .enumerate()
        .filter(|(_, c)| c.parent_id.as_ref() == parent)
        .map(|(i, _)| i)
        .collect()
}

pub fn has_children(categories: &[Category], id: &NodeId) -> bool {
    categories.iter().any(|c| c.parent_id.as_ref() == Some(id))
}

/// All descendants of `id`, depth-first, excluding `id` itself.
pub fn descendant_ids(categories: &[Category], id: &NodeId) -> Vec<NodeId> {
    let map = child_map(categories);
    let mut out = Vec::new();
    let mut seen: HashSet<&NodeId> = HashSet::new();
    seen.insert(id);
    collect_descendants(categories, &map, id, &mut seen, &mut out);
    out
}

fn collect_descendants<'a>(
    categories: &'a [Category],
    map: &ChildMap<'a>,
    id: &NodeId,
    seen: &mut HashSet<&'a NodeId>,
    out: &mut Vec<NodeId>,
) {
    let Some(kids) = map.get(&Some(id)) else {
        return;
    };
    for &k in kids {
        let child = &categories[k].id;
        if !seen.insert(child) {
            continue;
        }
        out.push(child.clone());
        collect_descendants(categories, map, child, seen, out);
    }
}

/// Ancestor chain of `id`, nearest parent first. Stops at a missing parent or a cycle.
pub fn ancestor_ids(categories: &[Category], id: &NodeId) -> Vec<NodeId> {
    let by_id: HashMap<&NodeId, &Category> = categories.iter().map(|c| (&c.id, c)).collect();
    let mut out = Vec::new();
    let mut seen: HashSet<&NodeId> = HashSet::new();
    seen.insert(id);

    let mut cur = by_id.get(id).and_then(|c| c.parent_id.as_ref());
    while let Some(pid) = cur {
        if !seen.insert(pid) {
            break;
        }
        let Some(parent) = by_id.get(pid) else {
            break;
        };
        out.push(pid.clone());
        cur = parent.parent_id.as_ref();
    }
    out
}

/// True when `candidate` is `ancestor` itself or lies in its subtree.
pub fn is_self_or_descendant(categories: &[Category], candidate: &NodeId, ancestor: &NodeId) -> bool {
    candidate == ancestor || ancestor_ids(categories, candidate).iter().any(|a| a == ancestor)
}

/// Depth of `id` as implied by its parent chain.
pub fn depth_of(categories: &[Category], id: &NodeId) -> u32 {
    ancestor_ids(categories, id).len() as u32
}

/// Recompute `hierarchy_level` for `id` and every descendant, depth-first.
pub fn recompute_subtree_levels(categories: &mut [Category], id: &NodeId) {
    let base = depth_of(categories, id);
    let mut stack = vec![(id.clone(), base)];
    let mut seen: HashSet<NodeId> = HashSet::new();

    while let Some((cur, level)) = stack.pop() {
        if !seen.insert(cur.clone()) {
            continue;
        }
        let mut kids = Vec::new();
        for c in categories.iter_mut() {
            if c.id == cur {
                c.hierarchy_level = level;
            } else if c.parent_id.as_ref() == Some(&cur) {
                kids.push(c.id.clone());
            }
        }
        // Reverse so the first child is processed first.
        for k in kids.into_iter().rev() {
            stack.push((k, level + 1));
        }
    }
}

/// Recompute `hierarchy_level` for every category.
pub fn recompute_levels(categories: &mut [Category]) {
    let levels: Vec<u32> = categories
        .iter()
        .map(|c| depth_of(categories, &c.id))
        .collect();
    for (c, level) in categories.iter_mut().zip(levels) {
        c.hierarchy_level = level;
    }
}

/// True if a sibling under `parent` already uses `name` (trimmed, case-insensitive).
///
/// `exclude` skips the category being renamed or moved.
pub fn sibling_name_taken(
    categories: &[Category],
    parent: Option<&NodeId>,
    name: &str,
    exclude: Option<&NodeId>,
) -> bool {
    let key = name_key(name);
    categories.iter().any(|c| {
        c.parent_id.as_ref() == parent && Some(&c.id) != exclude && name_key(&c.name) == key
    })
}

/// Display-order walk: roots in array order, each followed by its subtree.
///
/// Returns `(index, depth)` pairs. Nodes not reachable from a root are omitted.
pub fn flatten(categories: &[Category]) -> Vec<(usize, u32)> {
    let map = child_map(categories);
    let mut out = Vec::with_capacity(categories.len());
    let mut seen: HashSet<usize> = HashSet::new();
    let mut stack: Vec<(usize, u32)> = map
        .get(&None)
        .map(|roots| roots.iter().rev().map(|&i| (i, 0)).collect())
        .unwrap_or_default();

    while let Some((i, depth)) = stack.pop() {
        if !seen.insert(i) {
            continue;
        }
        out.push((i, depth));
        if let Some(kids) = map.get(&Some(&categories[i].id)) {
            for &k in kids.iter().rev() {
                stack.push((k, depth + 1));
            }
        }
    }
    out
}

/// Array position just past the last member of `id`'s subtree.
pub fn subtree_end(categories: &[Category], id: &NodeId) -> Option<usize> {
    let start = index_of(categories, id)?;
    let members: HashSet<NodeId> = descendant_ids(categories, id).into_iter().collect();
    let last = categories
        .iter()
        .enumerate()
        .filter(|(_, c)| members.contains(&c.id))
        .map(|(i, _)| i)
        .max()
        .unwrap_or(start);
    Some(last.max(start) + 1)
}


#[cfg(test)]
mod tests {
    use super::fixtures::node;
    use super::*;

    fn sample() -> Vec<Category> {
        vec![
            node("a", None, "A"),
            node("b", Some("a"), "B"),
            node("c", Some("b"), "C"),
            node("d", Some("a"), "D"),
            node("e", None, "E"),
        ]
    }

    #[test]
    fn descendants_are_depth_first() {
        let cats = sample();
        let d = descendant_ids(&cats, &NodeId::new("a"));
        assert_eq!(d, vec![NodeId::new("b"), NodeId::new("c"), NodeId::new("d")]);
    }

    #[test]
    fn ancestors_nearest_first() {
        let cats = sample();
        let a = ancestor_ids(&cats, &NodeId::new("c"));
        assert_eq!(a, vec![NodeId::new("b"), NodeId::new("a")]);
    }

    #[test]
    fn ancestor_walk_survives_cycles() {
        let cats = vec![node("x", Some("y"), "X"), node("y", Some("x"), "Y")];
        assert_eq!(ancestor_ids(&cats, &NodeId::new("x")), vec![NodeId::new("y")]);
        assert_eq!(descendant_ids(&cats, &NodeId::new("x")), vec![NodeId::new("y")]);
    }

    #[test]
    fn self_or_descendant_detection() {
        let cats = sample();
        assert!(is_self_or_descendant(&cats, &NodeId::new("c"), &NodeId::new("a")));
        assert!(is_self_or_descendant(&cats, &NodeId::new("a"), &NodeId::new("a")));
        assert!(!is_self_or_descendant(&cats, &NodeId::new("e"), &NodeId::new("a")));
    }

    #[test]
    fn subtree_levels_follow_parent_chain() {
        let mut cats = sample();
        recompute_levels(&mut cats);
        let levels: Vec<u32> = cats.iter().map(|c| c.hierarchy_level).collect();
        assert_eq!(levels, vec![0, 1, 2, 1, 0]);

        // Move b (with c) under e, and e under d.
        cats[1].parent_id = Some(NodeId::new("e"));
        cats[4].parent_id = Some(NodeId::new("d"));
        recompute_subtree_levels(&mut cats, &NodeId::new("e"));
        assert_eq!(cats[4].hierarchy_level, 2);
        assert_eq!(cats[1].hierarchy_level, 3);
        assert_eq!(cats[2].hierarchy_level, 4);
    }

    #[test]
    fn sibling_names_compare_case_insensitively() {
        let cats = sample();
        assert!(sibling_name_taken(&cats, Some(&NodeId::new("a")), " b ", None));
        assert!(!sibling_name_taken(&cats, Some(&NodeId::new("a")), "B", Some(&NodeId::new("b"))));
        assert!(!sibling_name_taken(&cats, None, "B", None));
    }

    #[test]
    fn flatten_walks_in_display_order() {
        let cats = sample();
        let order: Vec<(&str, u32)> = flatten(&cats)
            .into_iter()
            .map(|(i, d)| (cats[i].id.as_str(), d))
            .collect();
        assert_eq!(order, vec![("a", 0), ("b", 1), ("c", 2), ("d", 1), ("e", 0)]);
    }

    #[test]
    fn subtree_end_is_past_last_descendant() {
        let cats = sample();
        assert_eq!(subtree_end(&cats, &NodeId::new("a")), Some(4));
        assert_eq!(subtree_end(&cats, &NodeId::new("e")), Some(5));
    }
}
