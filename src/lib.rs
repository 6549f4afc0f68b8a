#![deny(missing_docs)]
//! A multithreaded, networked triple store that maps a key and a relation name to a JSON value.
//!
//! This crate provides the [`TripleStore`] itself, a [`TriplesServer`] that serves it over TCP,
//! and a [`TriplesClient`] to talk to that server. The `triples-server` and `triples-client`
//! executables wrap the server and client.
//!
//! ## Supported Operations
//! The store supports seven request methods:
//!
//! - `lookup` the value of a (key, relation) pair
//! - `insert` a triple, only if the pair is not already present
//! - `insertOrUpdate` a triple, overwriting any existing value
//! - `delete` a triple. If it was the last relation of its key, the key goes too
//! - `listKeys` every key in the store
//! - `listIDs` every (key, relation) pair in the store
//! - `shutdown` save the store to its snapshot file and stop the server
//!
//! See the [`Request`] and [`Response`] types for more information on the structure of these
//! operations.
//!
//! ## TripleStore
//! [`TripleStore`] holds the key -> relation -> value data behind a single reader/writer lock.
//! Lookups and listings share the lock; inserts, updates and deletes take it exclusively, so a
//! reader never sees half of a write.
//!
//! ## Protocol
//! Requests and responses are JSON objects, one per line, sent over a plain TCP stream:
//!
//! ```text
//! -> {"method": "insert", "params": ["alice", "age", 30], "id": 1}
//! <- {"result": true, "id": 1}
//! -> {"method": "lookup", "params": ["alice", "height"], "id": 2}
//! <- {"result": null, "id": 2, "error": "not found"}
//! ```
//!
//! The `error` field is only present when a request failed. A request that cannot be decoded is
//! answered with an error, and the connection stays open.
//!
//! ## Snapshot File
//! The store is loaded from a JSON snapshot file when the server starts and written back to it,
//! in full, when the server receives `shutdown`. See the [`persistence`] module.
//!
//! [`TripleStore`]: ./struct.TripleStore.html
//! [`TriplesServer`]: ./struct.TriplesServer.html
//! [`TriplesClient`]: ./struct.TriplesClient.html
//! [`Request`]: ./enum.Request.html
//! [`Response`]: ./struct.Response.html
//! [`persistence`]: ./persistence/index.html

pub use client::TriplesClient;
pub use command::{Request, RequestEnvelope, Response, NOT_FOUND};
pub use config::{Port, ServerConfig, StorageContainer};
pub use dispatcher::{Dispatched, Dispatcher};
pub use engine::{TripleStore, Triples};
pub use error::{Result, TriplesError};
pub use server::{TriplesServer, MAX_REQUEST_BYTES};
pub use thread_pool::{NaiveThreadPool, RayonThreadPool, SharedQueueThreadPool, ThreadPool};

mod client;
mod command;
mod config;
mod dispatcher;
mod engine;
mod error;
pub mod persistence;
mod server;
pub mod thread_pool;
