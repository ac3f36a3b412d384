//! Property tests over randomly grown trees.
//!
//! Trees are grown through the public engine API, so every generated state is
//! one a real caller could reach. Name collisions are frequent by construction
//! (small alphabet) and the resulting `DuplicateName` rejections are ignored.

use std::collections::{BTreeSet, HashMap};

use arbor_core::display_id::regenerate_category_ids;
use arbor_core::prelude::*;
use proptest::prelude::*;

type Tree = CategoryTree<MemoryStore>;

#[derive(Debug, Clone)]
enum Op {
    Add { parent: usize, name: u8 },
    Indent(usize),
    Outdent(usize),
    MoveUp(usize),
    Duplicate(usize),
    Delete(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), 0u8..12).prop_map(|(parent, name)| Op::Add { parent, name }),
        1 => any::<usize>().prop_map(Op::Indent),
        1 => any::<usize>().prop_map(Op::Outdent),
        1 => any::<usize>().prop_map(Op::MoveUp),
        1 => any::<usize>().prop_map(Op::Duplicate),
        1 => any::<usize>().prop_map(Op::Delete),
    ]
}

fn pick(t: &Tree, n: usize) -> Option<NodeId> {
    let cats = t.categories();
    if cats.is_empty() {
        None
    } else {
        Some(cats[n % cats.len()].id.clone())
    }
}

fn grow(ops: &[Op]) -> Tree {
    let mut t = CategoryTree::open(MemoryStore::new()).unwrap();
    for op in ops {
        match op {
            Op::Add { parent, name } => {
                // Roughly a third of additions are roots.
                let parent = if parent % 3 == 0 { None } else { pick(&t, *parent) };
                let name = format!("{}", (b'a' + name) as char);
                let _ = t.create(CategoryInput::new(name, "d"), parent.as_ref());
            }
            Op::Indent(n) => {
                if let Some(id) = pick(&t, *n) {
                    let _ = t.reparent_level(&id, LevelDirection::Indent);
                }
            }
            Op::Outdent(n) => {
                if let Some(id) = pick(&t, *n) {
                    let _ = t.reparent_level(&id, LevelDirection::Outdent);
                }
            }
            Op::MoveUp(n) => {
                if let Some(id) = pick(&t, *n) {
                    let _ = t.move_order(&id, OrderDirection::Up);
                }
            }
            Op::Duplicate(n) => {
                if let Some(id) = pick(&t, *n) {
                    let _ = t.duplicate(&id);
                }
            }
            Op::Delete(n) => {
                if let Some(id) = pick(&t, *n) {
                    let _ = t.delete(&id, None);
                }
            }
        }
    }
    t
}

/// Shape below `id` as nested `name[children]`, children in array order.
fn shape(cats: &[Category], id: &NodeId) -> String {
    let kids: Vec<String> = cats
        .iter()
        .filter(|k| k.parent_id.as_ref() == Some(id))
        .map(|k| format!("{}[{}]", k.name, shape(cats, &k.id)))
        .collect();
    kids.join(",")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_reachable_state_verifies(ops in prop::collection::vec(op(), 0..40)) {
        let t = grow(&ops);
        let report = t.verify();
        prop_assert!(report.ok, "{:?}", report.findings);
    }

    #[test]
    fn regeneration_is_idempotent(ops in prop::collection::vec(op(), 0..40)) {
        let t = grow(&ops);
        let once = regenerate_category_ids(t.categories());
        prop_assert_eq!(&once, &t.categories().to_vec());
        let twice = regenerate_category_ids(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn levels_match_parent_chain(ops in prop::collection::vec(op(), 0..40)) {
        let t = grow(&ops);
        for c in t.categories() {
            let depth = t.ancestors(&c.id).unwrap().len() as u32;
            prop_assert_eq!(c.hierarchy_level, depth);
        }
    }

    #[test]
    fn display_ids_are_contiguous_ranks(ops in prop::collection::vec(op(), 0..40)) {
        let t = grow(&ops);
        let by_id: HashMap<&NodeId, &Category> = t.categories().iter().map(|c| (&c.id, c)).collect();
        let mut groups: HashMap<Option<&NodeId>, Vec<&Category>> = HashMap::new();
        for c in t.categories() {
            groups.entry(c.parent_id.as_ref()).or_default().push(c);
        }
        for (parent, kids) in groups {
            let prefix = match parent {
                None => "CAT".to_string(),
                Some(pid) => format!("{}.", by_id[pid].category_id),
            };
            let mut ranks: Vec<u32> = kids
                .iter()
                .map(|c| {
                    let rest = c.category_id.strip_prefix(&prefix).unwrap_or_else(|| {
                        panic!("{} does not start with {prefix}", c.category_id)
                    });
                    rest.parse::<u32>().unwrap()
                })
                .collect();
            ranks.sort_unstable();
            let expected: Vec<u32> = (1..=kids.len() as u32).collect();
            prop_assert_eq!(ranks, expected);
        }
    }

    #[test]
    fn duplicate_is_isomorphic_with_fresh_ids(
        ops in prop::collection::vec(op(), 1..30),
        target in any::<usize>(),
    ) {
        let mut t = grow(&ops);
        prop_assume!(!t.categories().is_empty());
        let id = pick(&t, target).unwrap();
        let before: BTreeSet<NodeId> = t.categories().iter().map(|c| c.id.clone()).collect();

        let copy = t.duplicate(&id).unwrap();
        let original = t.get(&id).unwrap();
        prop_assert_eq!(&copy.parent_id, &original.parent_id);

        let copied: Vec<NodeId> = std::iter::once(copy.id.clone())
            .chain(t.descendants(&copy.id).unwrap().iter().map(|c| c.id.clone()))
            .collect();
        prop_assert!(copied.iter().all(|c| !before.contains(c)));

        let copy_prefix = format!("{} (Copy", original.name);
        prop_assert!(copy.name.starts_with(&copy_prefix));
        let cats = t.categories();
        prop_assert_eq!(shape(cats, &id), shape(cats, &copy.id));
    }

    #[test]
    fn search_expands_to_ancestors_and_descendants(
        ops in prop::collection::vec(op(), 0..40),
        letter in 0u8..12,
    ) {
        let t = grow(&ops);
        let needle = format!("{}", (b'a' + letter) as char);
        let hits = t.search(&SearchFilters::query(needle.clone()).field(SearchField::Name));
        for c in t.categories() {
            if c.name.to_lowercase().contains(&needle) {
                prop_assert!(hits.contains(&c.id));
                for a in t.ancestors(&c.id).unwrap() {
                    prop_assert!(hits.contains(&a.id));
                }
                for d in t.descendants(&c.id).unwrap() {
                    prop_assert!(hits.contains(&d.id));
                }
            }
        }
    }
}
