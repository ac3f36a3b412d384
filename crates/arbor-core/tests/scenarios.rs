//! End-to-end engine scenarios against the in-memory store.

use std::collections::BTreeSet;

use arbor_core::prelude::*;
use assert_matches::assert_matches;
use serde_json::json;
use time::macros::datetime;

fn open() -> CategoryTree<MemoryStore> {
    CategoryTree::open_with(
        MemoryStore::new(),
        EngineConfig::default(),
        Box::new(FixedClock(datetime!(2024-05-01 12:00 UTC))),
    )
    .unwrap()
}

fn create(t: &mut CategoryTree<MemoryStore>, name: &str, parent: Option<&NodeId>) -> Category {
    t.create(CategoryInput::new(name, "d"), parent).unwrap()
}

#[test]
fn electronics_phones_books() {
    let mut t = open();

    let electronics = create(&mut t, "Electronics", None);
    assert_eq!(electronics.category_id, "CAT1");

    let phones = create(&mut t, "Phones", Some(&electronics.id));
    assert_eq!(phones.category_id, "CAT1.1");
    assert_eq!(phones.hierarchy_level, 1);

    let books = create(&mut t, "Books", None);
    assert_eq!(books.category_id, "CAT1");
    assert_eq!(t.get(&electronics.id).unwrap().category_id, "CAT2");
    assert_eq!(t.get(&phones.id).unwrap().category_id, "CAT2.1");
}

#[test]
fn delete_parent_with_child_is_refused() {
    let mut t = open();
    let electronics = create(&mut t, "Electronics", None);
    create(&mut t, "Phones", Some(&electronics.id));

    let memory_before = serde_json::to_string(t.state()).unwrap();
    let stored_before = t.store().snapshot();

    assert_matches!(
        t.delete(&electronics.id, None),
        Err(ArborError::Validation(ValidationError::HasChildren))
    );
    assert_eq!(serde_json::to_string(t.state()).unwrap(), memory_before);
    assert_eq!(t.store().snapshot(), stored_before);
}

#[test]
fn bulk_tags_are_a_set_union() {
    let mut t = open();
    let a = t
        .create(CategoryInput::new("A", "d").tag("sale"), None)
        .unwrap();
    let b = create(&mut t, "B", None);

    t.bulk_add_tags(&[a.id.clone(), b.id.clone()], ["urgent"]).unwrap();

    let expected: BTreeSet<String> = ["sale", "urgent"].into_iter().map(String::from).collect();
    assert_eq!(t.get(&a.id).unwrap().tags, expected);
    assert_eq!(t.get(&b.id).unwrap().tags.len(), 1);
}

#[test]
fn search_for_leaf_returns_its_chain() {
    let mut t = open();
    let a = create(&mut t, "Alpha", None);
    let b = create(&mut t, "Beta", Some(&a.id));
    let c = create(&mut t, "Gamma", Some(&b.id));
    create(&mut t, "Other", None);

    let hits = t.search(&SearchFilters::query("gamm"));
    let expected: BTreeSet<NodeId> = [a.id, b.id, c.id].into_iter().collect();
    assert_eq!(hits, expected);
}

#[test]
fn status_filter_is_applied_after_expansion() {
    let mut t = open();
    let a = create(&mut t, "Alpha", None);
    let b = create(&mut t, "Beta", Some(&a.id));
    t.bulk_status_change(&[b.id.clone()], Status::Archived).unwrap();

    let hits = t.search(&SearchFilters::query("alpha").status(Status::Archived));
    assert_eq!(hits.into_iter().collect::<Vec<_>>(), vec![b.id]);
}

#[test]
fn instances_are_independent() {
    let mut one = open();
    let two = open();
    create(&mut one, "Only here", None);
    assert_eq!(one.categories().len(), 1);
    assert!(two.categories().is_empty());
}

#[test]
fn reopening_a_store_restores_state() {
    let mut t = open();
    let a = create(&mut t, "A", None);
    let b = create(&mut t, "B", Some(&a.id));
    t.delete(&b.id, Some("gone")).unwrap();

    let store = t.into_store();
    let reopened = CategoryTree::open(store).unwrap();
    assert_eq!(reopened.categories().len(), 1);
    assert_eq!(reopened.deleted_logs().len(), 1);
    assert_eq!(reopened.deleted_logs()[0].details, "gone");
    assert!(reopened.load_findings().is_empty());
}

#[test]
fn legacy_snake_case_blob_loads_clean() {
    let store = MemoryStore::with_value(json!({
        "categories": [
            {"id": 1, "category_name": "Garden", "description": "outdoor",
             "category_id": "CAT9", "hierarchy_level": 4, "tags": "green; tools"},
            {"id": 2, "category_name": "Hoses", "description": "water",
             "parent_category_id": 1, "status": "inactive"},
            {"id": 3, "name": "Lost", "description": "orphan", "parentId": 99}
        ],
        "deletedLogs": []
    }));

    let t = CategoryTree::open(store).unwrap();
    assert!(t.verify().ok, "{:?}", t.verify().findings);

    let garden = t.get(&NodeId::new("1")).unwrap();
    assert_eq!(garden.category_id, "CAT1");
    assert_eq!(garden.hierarchy_level, 0);
    assert_eq!(garden.tags.len(), 2);

    let hoses = t.get(&NodeId::new("2")).unwrap();
    assert_eq!(hoses.category_id, "CAT1.1");
    assert_eq!(hoses.status, Status::Inactive);

    let lost = t.get(&NodeId::new("3")).unwrap();
    assert!(lost.parent_id.is_none());
    let codes: Vec<&str> = t.load_findings().iter().map(|f| f.code.as_str()).collect();
    assert!(codes.contains(&"repair.orphan_detached"));

    // Nothing is written back until the next mutation.
    assert_eq!(t.store().saves(), 0);
}

#[test]
fn storage_failure_is_retryable_and_not_applied() {
    let mut t = open();
    let a = create(&mut t, "A", None);
    t.store().fail_next_save();

    let err = t.bulk_delete(&[a.id.clone()], None).unwrap_err();
    assert_matches!(err, ArborError::Storage(_));
    assert!(err.is_retryable());
    assert!(t.get(&a.id).is_ok());
    assert!(t.deleted_logs().is_empty());

    // The retry goes through.
    t.bulk_delete(&[a.id.clone()], None).unwrap();
    assert!(t.categories().is_empty());
}

#[test]
fn delete_then_restore_round_trip() {
    let mut t = open();
    let a = create(&mut t, "A", None);
    let b = create(&mut t, "B", Some(&a.id));
    t.delete(&b.id, None).unwrap();

    let restored = t.restore(0).unwrap();
    assert_eq!(restored.parent_id.as_ref(), Some(&a.id));
    assert_eq!(restored.category_id, "CAT1.1");
    let actions: Vec<&str> = restored.logs.iter().map(|l| l.action.as_str()).collect();
    assert_eq!(actions, vec!["Created", "Deleted", "Restored"]);
    assert!(t.deleted_logs().is_empty());
}
