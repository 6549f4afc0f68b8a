use serde_json::{json, Value};
use triples::{Dispatched, Dispatcher, Request, Response, TripleStore, NOT_FOUND};

fn reply(dispatcher: &Dispatcher, line: &str) -> Response {
    match dispatcher.dispatch_line(line) {
        Dispatched::Reply(resp) => resp,
        Dispatched::Shutdown(id) => panic!("unexpected shutdown for request {}", id),
    }
}

#[test]
fn insert_and_lookup_over_the_wire_format() {
    let dispatcher = Dispatcher::new(TripleStore::new());

    let resp = reply(&dispatcher, r#"{"method": "insert", "params": ["alice", "age", 30], "id": 1}"#);
    assert_eq!(resp, Response::ok(1, json!(true)));

    let resp = reply(&dispatcher, r#"{"method": "insert", "params": ["alice", "age", 31], "id": 2}"#);
    assert_eq!(resp, Response::ok(2, json!(false)));

    let resp = reply(&dispatcher, r#"{"method": "lookup", "params": ["alice", "age"], "id": 3}"#);
    assert_eq!(resp, Response::ok(3, json!(30)));
    assert!(!resp.is_err());
}

#[test]
fn lookup_miss_reports_not_found() {
    let dispatcher = Dispatcher::new(TripleStore::new());
    let resp = reply(&dispatcher, r#"{"method": "lookup", "params": ["alice", "age"], "id": 7}"#);
    assert_eq!(resp.result, Value::Null);
    assert_eq!(resp.id, Some(7));
    assert_eq!(resp.error, Some(json!(NOT_FOUND)));
}

#[test]
fn update_delete_and_listings() {
    let store = TripleStore::new();
    let dispatcher = Dispatcher::new(store.clone());

    let resp = reply(&dispatcher, r#"{"method": "insertOrUpdate", "params": ["bob", "age", 40], "id": 1}"#);
    assert_eq!(resp, Response::ok(1, Value::Null));
    let resp = reply(&dispatcher, r#"{"method": "insertOrUpdate", "params": ["bob", "city", "Oslo"], "id": 2}"#);
    assert_eq!(resp, Response::ok(2, Value::Null));

    let resp = reply(&dispatcher, r#"{"method": "listKeys", "params": [], "id": 3}"#);
    assert_eq!(resp, Response::ok(3, json!(["bob"])));

    let resp = reply(&dispatcher, r#"{"method": "delete", "params": ["bob", "city"], "id": 4}"#);
    assert_eq!(resp, Response::ok(4, Value::Null));

    // params may be left out for methods that take none
    let resp = reply(&dispatcher, r#"{"method": "listIDs", "id": 5}"#);
    assert_eq!(resp, Response::ok(5, json!([["bob", "age"]])));

    // deleting something that is not there is not an error
    let resp = reply(&dispatcher, r#"{"method": "delete", "params": ["nobody", "age"], "id": 6}"#);
    assert_eq!(resp, Response::ok(6, Value::Null));
    assert_eq!(store.len(), 1);
}

#[test]
fn shutdown_is_handed_back_to_the_caller() {
    let dispatcher = Dispatcher::new(TripleStore::new());
    assert_eq!(
        dispatcher.dispatch_line(r#"{"method": "shutdown", "params": [], "id": 99}"#),
        Dispatched::Shutdown(99)
    );
}

#[test]
fn malformed_requests_are_answered_with_errors() {
    let dispatcher = Dispatcher::new(TripleStore::new());

    // not JSON at all: the id cannot be known
    let resp = reply(&dispatcher, "{not json");
    assert!(resp.is_err());
    assert_eq!(resp.id, None);

    let cases = [
        // unknown method, methods are case sensitive
        r#"{"method": "Lookup", "params": ["a", "b"], "id": 1}"#,
        r#"{"method": "drop", "params": [], "id": 1}"#,
        // wrong arity
        r#"{"method": "lookup", "params": ["a"], "id": 1}"#,
        r#"{"method": "insert", "params": ["a", "b"], "id": 1}"#,
        r#"{"method": "insert", "params": ["a", "b", 1, 2], "id": 1}"#,
        r#"{"method": "listKeys", "params": ["a"], "id": 1}"#,
        // keys and relations must be strings
        r#"{"method": "insert", "params": [1, "b", 1], "id": 1}"#,
        r#"{"method": "delete", "params": ["a", null], "id": 1}"#,
        // params must be an array
        r#"{"method": "lookup", "params": {"key": "a"}, "id": 1}"#,
    ];
    for case in cases.iter() {
        let resp = reply(&dispatcher, case);
        assert!(resp.is_err(), "expected an error for {}", case);
        assert_eq!(resp.id, Some(1), "id not echoed for {}", case);
        assert_eq!(resp.result, Value::Null);
    }

    // missing id
    let resp = reply(&dispatcher, r#"{"method": "listKeys", "params": []}"#);
    assert!(resp.is_err());
    assert_eq!(resp.id, None);

    assert!(dispatcher.store().is_empty());
}

#[test]
fn error_field_is_absent_on_success() {
    let resp = Response::ok(4, json!(true));
    let encoded = serde_json::to_value(&resp).unwrap();
    assert_eq!(encoded, json!({"result": true, "id": 4}));

    let encoded = serde_json::to_value(&Response::not_found(5)).unwrap();
    assert_eq!(encoded, json!({"result": null, "id": 5, "error": NOT_FOUND}));
}

#[test]
fn requests_encode_to_positional_params() {
    let envelope = Request::Insert {
        key: "alice".to_owned(),
        relation: "age".to_owned(),
        value: json!(30),
    }
    .into_envelope(12);
    assert_eq!(
        serde_json::to_value(&envelope).unwrap(),
        json!({"method": "insert", "params": ["alice", "age", 30], "id": 12})
    );

    let decoded = Request::decode(&envelope.method, envelope.params.clone()).unwrap();
    assert_eq!(decoded.method(), "insert");
    assert_eq!(Request::ListIds.into_envelope(1).method, "listIDs");
}

#[test]
fn non_utf8_bytes_are_answered_with_an_error() {
    let dispatcher = Dispatcher::new(TripleStore::new());
    match dispatcher.dispatch_bytes(b"{\"method\":\"lookup\",\"params\":[\"a\xff\",\"b\"],\"id\":7}") {
        Dispatched::Reply(resp) => {
            assert!(resp.is_err());
            assert_eq!(resp.id, None);
        }
        other => panic!("unexpected {:?}", other),
    }

    let resp = reply(&dispatcher, r#"{"method": "listKeys", "id": 8}"#);
    assert_eq!(resp, Response::ok(8, json!([])));
}
