//! This module provides the in-memory triple storage engine, [`TripleStore`].
//!
//! The engine maps a key to a set of named relations, and each relation to a single JSON
//! value. All access goes through one reader/writer lock, so any number of lookups and
//! listings can run together while inserts, updates and deletes run alone.

mod triples;

pub use self::triples::{TripleStore, Triples};
