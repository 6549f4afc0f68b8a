use std::collections::HashSet;

use crossbeam_utils::thread;
use serde_json::json;
use triples::TripleStore;

#[test]
fn insert_then_lookup() {
    let store = TripleStore::new();
    assert!(store.insert("alice".to_owned(), "age".to_owned(), json!(30)));
    assert_eq!(store.lookup("alice", "age"), Some(json!(30)));
    assert_eq!(store.lookup("alice", "height"), None);
    assert_eq!(store.lookup("bob", "age"), None);
}

#[test]
fn insert_does_not_overwrite() {
    let store = TripleStore::new();
    assert!(store.insert("alice".to_owned(), "age".to_owned(), json!(30)));
    assert!(!store.insert("alice".to_owned(), "age".to_owned(), json!(31)));
    assert_eq!(store.lookup("alice", "age"), Some(json!(30)));
}

#[test]
fn insert_or_update_overwrites() {
    let store = TripleStore::new();
    store.insert_or_update("alice".to_owned(), "age".to_owned(), json!(30));
    store.insert_or_update("alice".to_owned(), "age".to_owned(), json!(31));
    assert_eq!(store.lookup("alice", "age"), Some(json!(31)));
    assert_eq!(store.len(), 1);
}

#[test]
fn values_are_opaque_json() {
    let store = TripleStore::new();
    let value = json!({"street": "Main", "numbers": [1, 2.5, null], "active": true});
    store.insert("alice".to_owned(), "address".to_owned(), value.clone());
    store.insert("alice".to_owned(), "nickname".to_owned(), json!(null));
    assert_eq!(store.lookup("alice", "address"), Some(value));
    // a stored null is still a stored value
    assert_eq!(store.lookup("alice", "nickname"), Some(json!(null)));
}

#[test]
fn delete_removes_pair_and_empty_key() {
    let store = TripleStore::new();
    store.insert("alice".to_owned(), "age".to_owned(), json!(30));
    store.insert("bob".to_owned(), "age".to_owned(), json!(40));

    store.delete("alice", "age");
    assert_eq!(store.lookup("alice", "age"), None);
    assert_eq!(store.list_keys(), vec!["bob".to_owned()]);
}

#[test]
fn delete_missing_pair_is_a_no_op() {
    let store = TripleStore::new();
    assert!(!store.delete("nobody", "nothing"));
    assert!(store.is_empty());
}

#[test]
fn list_ids_has_one_entry_per_relation() {
    let store = TripleStore::new();
    store.insert("alice".to_owned(), "age".to_owned(), json!(30));
    store.insert("alice".to_owned(), "city".to_owned(), json!("Paris"));
    store.insert("bob".to_owned(), "age".to_owned(), json!(40));

    let ids: HashSet<(String, String)> = store.list_ids().into_iter().collect();
    let expected: HashSet<(String, String)> = vec![
        ("alice".to_owned(), "age".to_owned()),
        ("alice".to_owned(), "city".to_owned()),
        ("bob".to_owned(), "age".to_owned()),
    ]
    .into_iter()
    .collect();
    assert_eq!(ids, expected);

    let mut keys = store.list_keys();
    keys.sort();
    assert_eq!(keys, vec!["alice".to_owned(), "bob".to_owned()]);
}

#[test]
fn example_scenario() {
    let store = TripleStore::new();
    assert!(store.insert("alice".to_owned(), "age".to_owned(), json!(30)));
    assert_eq!(store.lookup("alice", "age"), Some(json!(30)));
    assert!(!store.insert("alice".to_owned(), "age".to_owned(), json!(31)));
    assert_eq!(store.lookup("alice", "age"), Some(json!(30)));
    store.insert_or_update("alice".to_owned(), "age".to_owned(), json!(31));
    assert_eq!(store.lookup("alice", "age"), Some(json!(31)));
}

#[test]
fn concurrent_inserts_are_not_lost() {
    const WRITERS: usize = 8;
    const PER_WRITER: usize = 250;
    let store = TripleStore::new();

    thread::scope(|s| {
        for w in 0..WRITERS {
            let store = store.clone();
            s.spawn(move |_| {
                for i in 0..PER_WRITER {
                    // writers share keys but never a (key, relation) pair
                    let inserted = store.insert(format!("key{}", i % 10), format!("rel-{}-{}", w, i), json!(i));
                    assert!(inserted);
                }
            });
        }
    })
    .unwrap();

    let ids = store.list_ids();
    let unique: HashSet<_> = ids.iter().cloned().collect();
    assert_eq!(ids.len(), WRITERS * PER_WRITER);
    assert_eq!(unique.len(), WRITERS * PER_WRITER);
    assert_eq!(store.len(), WRITERS * PER_WRITER);
}

#[test]
fn concurrent_insert_of_same_pair_has_one_winner() {
    const CONTENDERS: usize = 16;

    for round in 0..20 {
        let store = TripleStore::new();
        let wins: Vec<bool> = thread::scope(|s| {
            let handles: Vec<_> = (0..CONTENDERS)
                .map(|c| {
                    let store = store.clone();
                    s.spawn(move |_| store.insert("k".to_owned(), "r".to_owned(), json!(c)))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
        .unwrap();

        assert_eq!(wins.iter().filter(|won| **won).count(), 1, "round {}", round);
        assert_eq!(store.len(), 1);
    }
}

#[test]
fn readers_never_see_a_key_without_relations() {
    let store = TripleStore::new();

    thread::scope(|s| {
        let writer = store.clone();
        s.spawn(move |_| {
            for i in 0..2000 {
                let key = format!("k{}", i % 5);
                writer.insert(key.clone(), "r".to_owned(), json!(i));
                writer.delete(&key, "r");
            }
        });

        let reader = store.clone();
        s.spawn(move |_| {
            for _ in 0..2000 {
                // every listed key must own a relation at the moment of listing
                let keys = reader.list_keys().len();
                let snapshot = reader.snapshot();
                assert!(snapshot.values().all(|relations| !relations.is_empty()));
                assert!(keys <= 5);
            }
        });
    })
    .unwrap();

    assert!(store.is_empty());
}
