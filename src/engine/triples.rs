use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

/// The raw key -> relation -> value structure held by a [`TripleStore`].
///
/// This is also the exact shape of a snapshot file.
pub type Triples = HashMap<String, HashMap<String, Value>>;

/// A concurrent, in-memory store of (key, relation, value) triples.
///
/// `TripleStore` is a cheap handle: cloning it produces another handle to the same data, which
/// is how each connection thread gets access to the store.
///
/// A key is present only while it owns at least one relation. Removing the last relation of a
/// key removes the key as well.
#[derive(Debug, Clone, Default)]
pub struct TripleStore {
    triples: Arc<RwLock<Triples>>,
}

impl TripleStore {
    /// creates a new, empty store
    pub fn new() -> Self {
        TripleStore::default()
    }

    /// creates a store holding the given `triples`.
    /// Keys that own no relations are dropped.
    pub fn from_triples(mut triples: Triples) -> Self {
        triples.retain(|_, relations| !relations.is_empty());
        TripleStore {
            triples: Arc::new(RwLock::new(triples)),
        }
    }

    /// returns a copy of the value stored for `key` and `relation`, or `None` if there is no
    /// such triple
    pub fn lookup(&self, key: &str, relation: &str) -> Option<Value> {
        let triples = self.triples.read();
        triples
            .get(key)
            .and_then(|relations| relations.get(relation))
            .cloned()
    }

    /// stores `value` under `key` and `relation` only if nothing is stored there yet.
    ///
    /// Returns `true` if the value was inserted, `false` if an existing value was left in place.
    pub fn insert(&self, key: String, relation: String, value: Value) -> bool {
        let mut triples = self.triples.write();
        match triples.entry(key).or_default().entry(relation) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    /// stores `value` under `key` and `relation`, overwriting any existing value
    pub fn insert_or_update(&self, key: String, relation: String, value: Value) {
        let mut triples = self.triples.write();
        triples.entry(key).or_default().insert(relation, value);
    }

    /// removes the triple identified by `key` and `relation`, and the key itself if that was its
    /// last relation.
    ///
    /// Returns `true` if a triple was removed. Deleting a triple that does not exist is a no-op.
    pub fn delete(&self, key: &str, relation: &str) -> bool {
        let mut triples = self.triples.write();
        let relations = match triples.get_mut(key) {
            Some(relations) => relations,
            None => return false,
        };
        let removed = relations.remove(relation).is_some();
        if relations.is_empty() {
            triples.remove(key);
        }
        removed
    }

    /// returns every key currently in the store, in no particular order
    pub fn list_keys(&self) -> Vec<String> {
        self.triples.read().keys().cloned().collect()
    }

    /// returns the (key, relation) pair of every triple in the store, in no particular order
    pub fn list_ids(&self) -> Vec<(String, String)> {
        let triples = self.triples.read();
        triples
            .iter()
            .flat_map(|(key, relations)| {
                relations
                    .keys()
                    .map(move |relation| (key.clone(), relation.clone()))
            })
            .collect()
    }

    /// the number of triples in the store
    pub fn len(&self) -> usize {
        self.triples.read().values().map(HashMap::len).sum()
    }

    /// returns `true` if the store holds no triples
    pub fn is_empty(&self) -> bool {
        self.triples.read().is_empty()
    }

    /// returns a consistent copy of the whole store, taken under a single read lock
    pub fn snapshot(&self) -> Triples {
        self.triples.read().clone()
    }
}
