use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, TriplesError};

/// The `error` value returned by a `lookup` that found nothing
pub const NOT_FOUND: &str = "not found";

/// The request envelope as it appears on the wire:
/// `{"method": "<name>", "params": [...], "id": <integer>}`
///
/// `params` may be omitted for methods that take no parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// the name of the method to invoke
    pub method: String,
    /// positional parameters: `[key, relation, value?]`
    #[serde(default)]
    pub params: Vec<Value>,
    /// the id used to correlate the response with this request
    pub id: i64,
}

/// These are the request "commands" that can be made to a triple store, decoded and validated
/// from a [`RequestEnvelope`].
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// get the value of a triple
    Lookup {
        /// the key of the triple
        key: String,
        /// the relation of the triple
        relation: String,
    },
    /// add a triple if it does not already exist
    Insert {
        /// the key of the triple
        key: String,
        /// the relation of the triple
        relation: String,
        /// the value to store
        value: Value,
    },
    /// add a triple, overwriting any existing value
    InsertOrUpdate {
        /// the key of the triple
        key: String,
        /// the relation of the triple
        relation: String,
        /// the value to store
        value: Value,
    },
    /// remove a triple
    Delete {
        /// the key of the triple
        key: String,
        /// the relation of the triple
        relation: String,
    },
    /// list every key in the store
    ListKeys,
    /// list every (key, relation) pair in the store
    ListIds,
    /// save the store and stop the server
    Shutdown,
}

impl Request {
    /// the wire name of this request's method
    pub fn method(&self) -> &'static str {
        match self {
            Request::Lookup { .. } => "lookup",
            Request::Insert { .. } => "insert",
            Request::InsertOrUpdate { .. } => "insertOrUpdate",
            Request::Delete { .. } => "delete",
            Request::ListKeys => "listKeys",
            Request::ListIds => "listIDs",
            Request::Shutdown => "shutdown",
        }
    }

    /// decodes a typed `Request` from a method name and its positional `params`.
    ///
    /// Method names are matched case-sensitively. Each method takes an exact number of params,
    /// and keys and relations must be JSON strings.
    ///
    /// # Errors
    /// returns [`TriplesError::UnknownMethod`] or [`TriplesError::InvalidParams`]
    ///
    /// [`TriplesError::UnknownMethod`]: ./enum.TriplesError.html
    /// [`TriplesError::InvalidParams`]: ./enum.TriplesError.html
    pub fn decode(method: &str, params: Vec<Value>) -> Result<Request> {
        match method {
            "lookup" => {
                let [key, relation] = key_relation("lookup", params)?;
                Ok(Request::Lookup { key, relation })
            }
            "insert" => {
                let (key, relation, value) = key_relation_value("insert", params)?;
                Ok(Request::Insert { key, relation, value })
            }
            "insertOrUpdate" => {
                let (key, relation, value) = key_relation_value("insertOrUpdate", params)?;
                Ok(Request::InsertOrUpdate { key, relation, value })
            }
            "delete" => {
                let [key, relation] = key_relation("delete", params)?;
                Ok(Request::Delete { key, relation })
            }
            "listKeys" => no_params("listKeys", params).map(|_| Request::ListKeys),
            "listIDs" => no_params("listIDs", params).map(|_| Request::ListIds),
            "shutdown" => no_params("shutdown", params).map(|_| Request::Shutdown),
            other => Err(TriplesError::UnknownMethod(other.to_string())),
        }
    }

    /// encodes this request into an envelope carrying the given `id`
    pub fn into_envelope(self, id: i64) -> RequestEnvelope {
        let method = self.method().to_string();
        let params = match self {
            Request::Lookup { key, relation } | Request::Delete { key, relation } => {
                vec![Value::String(key), Value::String(relation)]
            }
            Request::Insert { key, relation, value }
            | Request::InsertOrUpdate { key, relation, value } => {
                vec![Value::String(key), Value::String(relation), value]
            }
            Request::ListKeys | Request::ListIds | Request::Shutdown => vec![],
        };
        RequestEnvelope { method, params, id }
    }
}

fn check_arity(method: &'static str, params: &[Value], expected: usize) -> Result<()> {
    if params.len() != expected {
        return Err(TriplesError::InvalidParams {
            method,
            reason: format!("expected {} params, got {}", expected, params.len()),
        });
    }
    Ok(())
}

fn no_params(method: &'static str, params: Vec<Value>) -> Result<()> {
    check_arity(method, &params, 0)
}

fn string_param(method: &'static str, name: &str, param: Value) -> Result<String> {
    match param {
        Value::String(s) => Ok(s),
        other => Err(TriplesError::InvalidParams {
            method,
            reason: format!("{} must be a string, got {}", name, other),
        }),
    }
}

fn key_relation(method: &'static str, params: Vec<Value>) -> Result<[String; 2]> {
    check_arity(method, &params, 2)?;
    let mut params = params.into_iter();
    let key = string_param(method, "key", params.next().unwrap_or_default())?;
    let relation = string_param(method, "relation", params.next().unwrap_or_default())?;
    Ok([key, relation])
}

fn key_relation_value(method: &'static str, params: Vec<Value>) -> Result<(String, String, Value)> {
    check_arity(method, &params, 3)?;
    let mut params = params.into_iter();
    let key = string_param(method, "key", params.next().unwrap_or_default())?;
    let relation = string_param(method, "relation", params.next().unwrap_or_default())?;
    let value = params.next().unwrap_or_default();
    Ok((key, relation, value))
}

/// The response envelope sent for every request:
/// `{"result": <any>, "id": <integer>, "error": <any>}`
///
/// `error` is left out entirely when the request succeeded. `id` is `null` only when the
/// request was too malformed for its id to be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// the result of the request, `null` when there is nothing to return
    pub result: Value,
    /// the id of the request this responds to
    pub id: Option<i64>,
    /// present only if the request failed, or if a lookup found nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Response {
    /// a successful response carrying `result`
    pub fn ok(id: i64, result: Value) -> Self {
        Response {
            result,
            id: Some(id),
            error: None,
        }
    }

    /// the response to a lookup that found nothing
    pub fn not_found(id: i64) -> Self {
        Response {
            result: Value::Null,
            id: Some(id),
            error: Some(json!(NOT_FOUND)),
        }
    }

    /// a failed response, carrying a description of the error
    pub fn err(id: Option<i64>, error: impl ToString) -> Self {
        Response {
            result: Value::Null,
            id,
            error: Some(Value::String(error.to_string())),
        }
    }

    /// returns `true` if this response carries an error (including "not found")
    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}
