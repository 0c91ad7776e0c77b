use super::{Item, Repository, SessionData, ITEM_KIND};
use crate::ids::NodeId;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn item(value: Value) -> Item {
    Item::try_from(value).unwrap()
}

fn ids(items: &[Item]) -> Vec<String> {
    items.iter().map(|i| i.id().unwrap().to_string()).collect()
}

// ============================================================================
// Repository
// ============================================================================

#[test]
fn test_new_identifier_format() {
    let repo = Repository::with_node_id(NodeId::from_string("node"));
    assert_eq!(repo.new_identifier("s"), "s-node-1");
    assert_eq!(repo.new_identifier("s"), "s-node-2");
    assert_eq!(repo.new_identifier("other"), "other-node-3");
}

#[test]
fn test_new_sessions_are_seeded_and_resolvable() {
    let repo = Repository::new();
    let mut seen = HashSet::new();
    for _ in 0..10 {
        let id = repo.new_identifier("b");
        assert!(seen.insert(id.clone()), "duplicate identifier {id}");

        let session = repo.get_session_data(&id).unwrap();
        let items = session.get_all_items_copy();
        assert_eq!(ids(&items), vec!["A", "B"]);
        assert!(items.iter().all(|i| i.kind() == Some(ITEM_KIND)));
    }
    assert_eq!(repo.session_count(), 10);
}

#[test]
fn test_remove_identifier() {
    let repo = Repository::new();
    let id = repo.new_identifier("s");

    assert!(repo.remove_identifier(&id).is_some());
    assert!(repo.get_session_data(&id).is_none());
    assert!(repo.remove_identifier(&id).is_none());
    assert!(repo.remove_identifier("never-issued").is_none());
}

#[test]
fn test_sequence_not_reused_after_removal() {
    let repo = Repository::with_node_id(NodeId::from_string("n"));
    let first = repo.new_identifier("s");
    repo.remove_identifier(&first);
    let second = repo.new_identifier("s");
    assert_ne!(first, second);
    assert_eq!(second, "s-n-2");
}

#[test]
fn test_removed_session_handle_stays_usable() {
    let repo = Repository::new();
    let id = repo.new_identifier("s");
    let session = repo.get_session_data(&id).unwrap();
    repo.remove_identifier(&id);

    // A request already holding the session finishes against it.
    assert!(session.get_item_copy("A").is_some());
}

#[test]
fn test_concurrent_identifiers_are_unique() {
    let repo = Arc::new(Repository::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repo = Arc::clone(&repo);
            thread::spawn(move || (0..50).map(|_| repo.new_identifier("c")).collect::<Vec<_>>())
        })
        .collect();

    let mut all = HashSet::new();
    for h in handles {
        for id in h.join().unwrap() {
            assert!(all.insert(id));
        }
    }
    assert_eq!(all.len(), 400);
    assert_eq!(repo.session_count(), 400);
}

// ============================================================================
// SessionData
// ============================================================================

#[test]
fn test_add_new_item_conflict_keeps_first() {
    let session = SessionData::new();
    let added = session
        .add_new_item("C", item(json!({"id": "C", "name": "first"})))
        .unwrap();
    assert_eq!(added.kind(), Some(ITEM_KIND));

    assert!(session
        .add_new_item("C", item(json!({"id": "C", "name": "second"})))
        .is_none());

    let stored = session.get_item_copy("C").unwrap();
    assert_eq!(stored, added);
    assert_eq!(stored.get("name").unwrap(), "first");
}

#[test]
fn test_add_new_item_appends() {
    let session = SessionData::new();
    session.add_new_item("C", item(json!({"id": "C"})));
    assert_eq!(ids(&session.get_all_items_copy()), vec!["A", "B", "C"]);
}

#[test]
fn test_add_new_item_overrides_caller_kind() {
    let session = SessionData::new();
    let added = session
        .add_new_item("C", item(json!({"id": "C", "kind": "bogus"})))
        .unwrap();
    assert_eq!(added.kind(), Some(ITEM_KIND));
}

#[test]
fn test_replace_item_drops_old_fields() {
    let session = SessionData::new();
    session.replace_item("K", item(json!({"id": "K", "a": 1, "b": 2})));
    let replaced = session.replace_item("K", item(json!({"id": "K", "c": 3})));

    assert_eq!(
        replaced.into_value(),
        json!({"id": "K", "c": 3, "kind": ITEM_KIND})
    );
    let stored = session.get_item_copy("K").unwrap();
    assert!(stored.get("a").is_none());
    assert!(stored.get("b").is_none());
}

#[test]
fn test_replace_item_moves_to_end() {
    let session = SessionData::new();
    session.replace_item("A", item(json!({"name": "new A"})));
    let all = session.get_all_items_copy();
    assert_eq!(ids(&all), vec!["B", "A"]);
    assert_eq!(all[1].get("name").unwrap(), "new A");
}

#[test]
fn test_replace_item_inserts_when_missing() {
    let session = SessionData::new();
    let stored = session.replace_item("Z", item(json!({"x": true})));
    assert_eq!(stored.id(), Some("Z"));
    assert_eq!(session.len(), 3);
}

#[test]
fn test_patch_item_merges_shallow() {
    let session = SessionData::new();
    session.add_new_item(
        "k",
        item(json!({"id": "k", "name": "old", "extra": 1, "nested": {"a": 1, "b": 2}})),
    );

    let patched = session
        .patch_item("k", &item(json!({"name": "X", "nested": {"a": 9}})))
        .unwrap();

    assert_eq!(
        patched.into_value(),
        json!({"id": "k", "name": "X", "extra": 1, "nested": {"a": 9}, "kind": ITEM_KIND})
    );
}

#[test]
fn test_patch_item_moves_to_end() {
    let session = SessionData::new();
    session.patch_item("A", &item(json!({"name": "patched"})));
    assert_eq!(ids(&session.get_all_items_copy()), vec!["B", "A"]);
}

#[test]
fn test_patch_item_unknown_key() {
    let session = SessionData::new();
    assert!(session.patch_item("missing", &item(json!({"x": 1}))).is_none());
    assert_eq!(session.len(), 2);
}

#[test]
fn test_patch_item_keeps_key_as_id() {
    let session = SessionData::new();
    let patched = session
        .patch_item("A", &item(json!({"id": "B", "kind": "other"})))
        .unwrap();
    assert_eq!(patched.id(), Some("A"));
    assert_eq!(patched.kind(), Some(ITEM_KIND));
    assert_eq!(ids(&session.get_all_items_copy()), vec!["B", "A"]);
}

#[test]
fn test_delete_item() {
    let session = SessionData::new();
    assert!(session.delete_item("nope").is_none());

    let removed = session.delete_item("A").unwrap();
    assert_eq!(removed.get("name").unwrap(), "Item A");
    assert!(session.get_item_copy("A").is_none());
    assert!(session.delete_item("A").is_none());
}

#[test]
fn test_reads_do_not_reorder() {
    let session = SessionData::new();
    session.get_item_copy("A");
    session.get_all_items_copy();
    assert_eq!(ids(&session.get_all_items_copy()), vec!["A", "B"]);
}

#[test]
fn test_copies_are_isolated() {
    let session = SessionData::new();
    session.add_new_item("N", item(json!({"id": "N", "list": [1, 2], "obj": {"k": "v"}})));

    let mut single = session.get_item_copy("N").unwrap();
    single.insert("list", json!([]));
    single.remove("obj");

    let mut all = session.get_all_items_copy();
    all.clear();

    let mut added = session
        .add_new_item("M", item(json!({"id": "M", "v": 1})))
        .unwrap();
    added.insert("v", json!(2));

    let stored = session.get_item_copy("N").unwrap();
    assert_eq!(stored.get("list").unwrap(), &json!([1, 2]));
    assert_eq!(stored.get("obj").unwrap(), &json!({"k": "v"}));
    assert_eq!(session.get_item_copy("M").unwrap().get("v").unwrap(), 1);
    assert_eq!(session.len(), 4);
}

#[test]
fn test_concurrent_inserts_have_single_winner() {
    let session = Arc::new(SessionData::new());
    let handles: Vec<_> = (0..16)
        .map(|n| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                session
                    .add_new_item("same", item(json!({"id": "same", "writer": n})))
                    .is_some()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(session.len(), 3);
}

#[test]
fn test_concurrent_mutations_keep_ids_unique() {
    let session = Arc::new(SessionData::new());
    let handles: Vec<_> = (0..8)
        .map(|n| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                for i in 0..100 {
                    let key = format!("k{}", i % 10);
                    match (n + i) % 4 {
                        0 => {
                            session.add_new_item(&key, item(json!({"n": n})));
                        }
                        1 => {
                            session.replace_item(&key, item(json!({"n": n})));
                        }
                        2 => {
                            session.patch_item(&key, &item(json!({"p": i})));
                        }
                        _ => {
                            session.delete_item(&key);
                        }
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let all = session.get_all_items_copy();
    let unique: HashSet<_> = all.iter().map(|i| i.id().unwrap().to_string()).collect();
    assert_eq!(unique.len(), all.len());
    assert!(all.iter().all(|i| i.kind() == Some(ITEM_KIND)));
}
