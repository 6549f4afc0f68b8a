use std::io::{BufRead, BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};

use serde_json::Value;

use crate::command::{Request, RequestEnvelope, Response, NOT_FOUND};
use crate::{Result, TriplesError};

/// `TriplesClient` contains the functionality for communicating with a [`TriplesServer`]
///
/// Every call sends one request line and waits for its response line. Requests are given
/// increasing ids, and each response is checked against the id of the request it answers.
///
/// [`TriplesServer`]: ./struct.TriplesServer.html
pub struct TriplesClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    next_id: i64,
}

impl TriplesClient {
    /// creates a client and establishes a socket connection to the server at the given `addr`
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let tcp_reader = TcpStream::connect(addr)?;
        let tcp_writer = tcp_reader.try_clone()?;

        Ok(TriplesClient {
            reader: BufReader::new(tcp_reader),
            writer: BufWriter::new(tcp_writer),
            next_id: 1,
        })
    }

    /// gets the value of the triple identified by `key` and `relation`
    /// ## Returns
    /// `Ok<Some<Value>>` if the triple was found, `Ok<None>` if it was not
    pub fn lookup(&mut self, key: &str, relation: &str) -> Result<Option<Value>> {
        let resp = self.call(Request::Lookup {
            key: key.to_string(),
            relation: relation.to_string(),
        })?;
        match resp.error {
            None => Ok(Some(resp.result)),
            Some(Value::String(msg)) if msg == NOT_FOUND => Ok(None),
            Some(other) => Err(relay(other)),
        }
    }

    /// inserts a triple unless one already exists for `key` and `relation`
    /// # Returns
    /// `Ok<true>` if the triple was inserted, `Ok<false>` if a value was already present
    pub fn insert(&mut self, key: &str, relation: &str, value: Value) -> Result<bool> {
        let resp = self.call_ok(Request::Insert {
            key: key.to_string(),
            relation: relation.to_string(),
            value,
        })?;
        resp.result
            .as_bool()
            .ok_or_else(|| TriplesError::StringErr(format!("unexpected insert result: {}", resp.result)))
    }

    /// inserts a triple, overwriting any existing value for `key` and `relation`
    pub fn insert_or_update(&mut self, key: &str, relation: &str, value: Value) -> Result<()> {
        self.call_ok(Request::InsertOrUpdate {
            key: key.to_string(),
            relation: relation.to_string(),
            value,
        })?;
        Ok(())
    }

    /// deletes the triple identified by `key` and `relation`, if there is one
    pub fn delete(&mut self, key: &str, relation: &str) -> Result<()> {
        self.call_ok(Request::Delete {
            key: key.to_string(),
            relation: relation.to_string(),
        })?;
        Ok(())
    }

    /// lists every key in the store
    pub fn list_keys(&mut self) -> Result<Vec<String>> {
        let resp = self.call_ok(Request::ListKeys)?;
        Ok(serde_json::from_value(resp.result)?)
    }

    /// lists the (key, relation) pair of every triple in the store
    pub fn list_ids(&mut self) -> Result<Vec<(String, String)>> {
        let resp = self.call_ok(Request::ListIds)?;
        Ok(serde_json::from_value(resp.result)?)
    }

    /// asks the server to save its store and stop.
    ///
    /// # Errors
    /// returns an error if the server reported that the store could not be saved. A server that
    /// closes the connection before answering is not treated as an error.
    pub fn shutdown(&mut self) -> Result<()> {
        let envelope = self.envelope(Request::Shutdown);
        self.send(&serde_json::to_string(&envelope)?)?;
        match self.receive()? {
            Some(resp) => ok_or_relay(resp).map(|_| ()),
            None => Ok(()),
        }
    }

    /// sends an already encoded request `line` as-is and returns the server's response.
    /// No id checking is done, as the request may not have a valid id.
    pub fn call_raw(&mut self, line: &str) -> Result<Response> {
        self.send(line)?;
        self.receive()?
            .ok_or_else(|| TriplesError::StringErr("server closed the connection".to_string()))
    }

    /// sends `request` and returns its response, which may carry an error
    fn call(&mut self, request: Request) -> Result<Response> {
        let envelope = self.envelope(request);
        self.send(&serde_json::to_string(&envelope)?)?;
        let resp = self
            .receive()?
            .ok_or_else(|| TriplesError::StringErr("server closed the connection".to_string()))?;
        if resp.id != Some(envelope.id) {
            return Err(TriplesError::StringErr(format!(
                "response id {:?} does not match request id {}",
                resp.id, envelope.id
            )));
        }
        Ok(resp)
    }

    /// sends `request` and re-throws any error carried by its response
    fn call_ok(&mut self, request: Request) -> Result<Response> {
        let resp = self.call(request)?;
        ok_or_relay(resp)
    }

    fn envelope(&mut self, request: Request) -> RequestEnvelope {
        let id = self.next_id;
        self.next_id += 1;
        request.into_envelope(id)
    }

    fn send(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// reads the next response line, `None` if the server closed the connection
    fn receive(&mut self) -> Result<Option<Response>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&line)?))
    }
}

fn ok_or_relay(resp: Response) -> Result<Response> {
    match resp.error {
        None => Ok(resp),
        Some(error) => Err(relay(error)),
    }
}

/// turns the `error` value of a response into a [`TriplesError::StringErr`]
fn relay(error: Value) -> TriplesError {
    match error {
        Value::String(msg) => TriplesError::StringErr(msg),
        other => TriplesError::StringErr(other.to_string()),
    }
}
