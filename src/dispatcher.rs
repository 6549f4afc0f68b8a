//! Decodes request lines, runs them against a [`TripleStore`] and builds the responses.
//!
//! [`TripleStore`]: ../struct.TripleStore.html
use serde_json::{json, Value};
use tracing::debug;

use crate::command::{Request, RequestEnvelope, Response};
use crate::engine::TripleStore;
use crate::error::{Result, TriplesError};

/// What a connection should do after a request has been dispatched
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// send the response and keep serving the connection
    Reply(Response),
    /// a `shutdown` request with the given id was received. The store has not been saved yet;
    /// that is left to the server.
    Shutdown(i64),
}

/// Maps each request method to its [`TripleStore`] operation.
///
/// A `Dispatcher` never fails: malformed requests are turned into error [`Response`]s so that
/// one bad request cannot take down its connection or the server.
///
/// [`TripleStore`]: ../struct.TripleStore.html
/// [`Response`]: ../struct.Response.html
#[derive(Debug, Clone)]
pub struct Dispatcher {
    store: TripleStore,
}

impl Dispatcher {
    /// creates a dispatcher over the given store handle
    pub fn new(store: TripleStore) -> Self {
        Dispatcher { store }
    }

    /// the store this dispatcher runs requests against
    pub fn store(&self) -> &TripleStore {
        &self.store
    }

    /// decodes and dispatches a single request `line`
    pub fn dispatch_line(&self, line: &str) -> Dispatched {
        self.dispatch_bytes(line.as_bytes())
    }

    /// decodes and dispatches a single request read straight off the wire. Bytes that are not
    /// valid UTF-8 JSON are answered with an error.
    pub fn dispatch_bytes(&self, bytes: &[u8]) -> Dispatched {
        let raw: Value = match serde_json::from_slice(bytes) {
            Ok(raw) => raw,
            Err(e) => return Dispatched::Reply(Response::err(None, TriplesError::Json(e))),
        };
        // keep hold of the id, if there is one, so a decoding error can still be correlated
        let id = raw.get("id").and_then(Value::as_i64);

        match decode(raw) {
            Ok((id, request)) => self.dispatch(id, request),
            Err(e) => {
                debug!("could not decode request: {}", e);
                Dispatched::Reply(Response::err(id, e))
            }
        }
    }

    /// runs an already decoded `request`
    pub fn dispatch(&self, id: i64, request: Request) -> Dispatched {
        let response = match request {
            Request::Lookup { key, relation } => match self.store.lookup(&key, &relation) {
                Some(value) => Response::ok(id, value),
                None => Response::not_found(id),
            },
            Request::Insert { key, relation, value } => {
                let inserted = self.store.insert(key, relation, value);
                Response::ok(id, json!(inserted))
            }
            Request::InsertOrUpdate { key, relation, value } => {
                self.store.insert_or_update(key, relation, value);
                Response::ok(id, Value::Null)
            }
            Request::Delete { key, relation } => {
                self.store.delete(&key, &relation);
                Response::ok(id, Value::Null)
            }
            Request::ListKeys => Response::ok(id, json!(self.store.list_keys())),
            Request::ListIds => Response::ok(id, json!(self.store.list_ids())),
            Request::Shutdown => return Dispatched::Shutdown(id),
        };
        Dispatched::Reply(response)
    }
}

/// decodes a raw JSON value into its envelope, then into a typed [`Request`]
fn decode(raw: Value) -> Result<(i64, Request)> {
    let envelope: RequestEnvelope = serde_json::from_value(raw)?;
    let request = Request::decode(&envelope.method, envelope.params)?;
    Ok((envelope.id, request))
}
