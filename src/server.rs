use std::io::{self, BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::command::Response;
use crate::dispatcher::{Dispatched, Dispatcher};
use crate::engine::TripleStore;
use crate::persistence;
use crate::thread_pool::ThreadPool;
use crate::Result;

/// the default limit on the size of a single request line, in bytes
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// A TCP socket server over a [`TripleStore`].
///
/// It listens for connections on a [`SocketAddr`](https://doc.rust-lang.org/std/net/enum.SocketAddr.html)
/// and serves each one as a job on its [`ThreadPool`]. A connection is a sequence of
/// newline-delimited JSON requests, each answered by one newline-delimited JSON [`Response`].
///
/// The server runs until a client sends a `shutdown` request. The store is then saved to the
/// snapshot file, the listening socket is closed and [`run`](TriplesServer::run) returns.
///
/// # Example
/// Create a server listening on "127.0.0.1:4000", with a thread for every connection
/// ```rust,no_run
/// use std::path::Path;
/// use triples::{persistence, NaiveThreadPool, ThreadPool, TriplesServer};
/// # fn main() -> triples::Result<()> {
/// let snapshot = Path::new("triples.json");
/// let store = persistence::load(snapshot);
/// let server = TriplesServer::new(store, NaiveThreadPool::new(0)?, snapshot);
/// server.run("127.0.0.1:4000")?;
/// # Ok(())
/// # }
/// ```
///
/// [`Response`]: ./struct.Response.html
pub struct TriplesServer<P: ThreadPool> {
    /// dispatches the requests of every connection against the shared store
    dispatcher: Dispatcher,
    /// a pool of threads that serve the connections
    pool: P,
    /// where the store is saved on shutdown
    snapshot_path: PathBuf,
    /// how long a connection may sit waiting for its next request
    read_timeout: Option<Duration>,
    /// the largest request line a connection will accept
    max_request_bytes: usize,
}

impl<P: ThreadPool> TriplesServer<P> {
    /// Create a new `TriplesServer` over the given `store`, serving connections on `pool` and
    /// saving to `snapshot_path` on shutdown.
    pub fn new(store: TripleStore, pool: P, snapshot_path: impl Into<PathBuf>) -> Self {
        TriplesServer {
            dispatcher: Dispatcher::new(store),
            pool,
            snapshot_path: snapshot_path.into(),
            read_timeout: None,
            max_request_bytes: MAX_REQUEST_BYTES,
        }
    }

    /// sets a limit on how long a connection may wait for its next request before it is closed.
    /// `None`, the default, waits forever.
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// sets the largest request line, in bytes, that a connection will accept.
    /// Longer requests are discarded and answered with an error.
    pub fn with_max_request_bytes(mut self, max_request_bytes: usize) -> Self {
        self.max_request_bytes = max_request_bytes;
        self
    }

    /// binds to the given address and serves connections until a `shutdown` request is received.
    ///
    /// # Errors
    /// returns an error if the address could not be bound, or if the store could not be saved
    /// during shutdown
    pub fn run<A: ToSocketAddrs>(self, addr: A) -> Result<()> {
        let listener = TcpListener::bind(addr)?;
        self.run_on(listener)
    }

    /// serves connections from an already bound `listener` until a `shutdown` request is
    /// received. Returns the outcome of saving the store.
    pub fn run_on(self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("Listening on {}", local_addr);
        let shutdown = Arc::new(Shutdown::new(wake_addr(local_addr)));

        for stream in listener.incoming() {
            if shutdown.is_closing() {
                break;
            }
            match stream {
                Ok(stream) => {
                    let conn = Connection {
                        dispatcher: self.dispatcher.clone(),
                        snapshot_path: self.snapshot_path.clone(),
                        shutdown: Arc::clone(&shutdown),
                        read_timeout: self.read_timeout,
                        max_request_bytes: self.max_request_bytes,
                    };
                    self.pool.spawn(move || {
                        if let Err(e) = conn.serve(stream) {
                            error!("Error on serving client: {}", e);
                        }
                    });
                }
                Err(e) => error!("Connection failed: {}", e),
            }
        }

        drop(listener);
        info!("Listener on {} closed", local_addr);
        shutdown.take_outcome()
    }
}

/// Coordinates a shutdown between the connection that received it and the accept loop
struct Shutdown {
    /// set by the first `shutdown` request, later ones are only acknowledged
    requested: AtomicBool,
    /// set once the store has been saved, tells the accept loop to stop
    closing: AtomicBool,
    /// the result of saving the store
    outcome: Mutex<Option<Result<()>>>,
    /// an address the accept loop can be reached on, used to wake it up
    wake_addr: SocketAddr,
}

impl Shutdown {
    fn new(wake_addr: SocketAddr) -> Self {
        Shutdown {
            requested: AtomicBool::new(false),
            closing: AtomicBool::new(false),
            outcome: Mutex::new(None),
            wake_addr,
        }
    }

    /// returns `true` for the first caller only
    fn begin(&self) -> bool {
        !self.requested.swap(true, Ordering::SeqCst)
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// records the save `outcome` and wakes the accept loop so it can close the listener
    fn finish(&self, outcome: Result<()>) {
        *self.outcome.lock() = Some(outcome);
        self.closing.store(true, Ordering::SeqCst);
        if let Err(e) = TcpStream::connect(self.wake_addr) {
            warn!("could not wake the listener on {}: {}", self.wake_addr, e);
        }
    }

    fn take_outcome(&self) -> Result<()> {
        self.outcome.lock().take().unwrap_or(Ok(()))
    }
}

/// the address to connect to in order to reach a listener bound to `local_addr`
fn wake_addr(local_addr: SocketAddr) -> SocketAddr {
    match local_addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), local_addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), local_addr.port())
        }
        _ => local_addr,
    }
}

/// Everything a single connection needs to serve its requests
struct Connection {
    dispatcher: Dispatcher,
    snapshot_path: PathBuf,
    shutdown: Arc<Shutdown>,
    read_timeout: Option<Duration>,
    max_request_bytes: usize,
}

/// What was read from a connection for one request
enum Frame {
    /// the client closed the connection
    Eof,
    /// a complete request line is in the buffer
    Request,
    /// the request was longer than allowed and has been discarded
    TooLong,
}

impl Connection {
    /// Reads requests from the given `tcp` stream one line at a time, dispatches them, and writes
    /// back one response line per request. Returns when the client disconnects or a `shutdown`
    /// request has been handled.
    fn serve(self, tcp: TcpStream) -> Result<()> {
        let peer_addr = tcp.peer_addr()?;
        tcp.set_read_timeout(self.read_timeout)?;
        let mut reader = BufReader::new(&tcp);
        let mut writer = BufWriter::new(&tcp);
        debug!("Accepted connection from {}", peer_addr);

        let mut buf = Vec::new();
        loop {
            match read_request(&mut reader, &mut buf, self.max_request_bytes) {
                Ok(Frame::Eof) => {
                    debug!("Connection from {} closed", peer_addr);
                    return Ok(());
                }
                Ok(Frame::Request) => {}
                Ok(Frame::TooLong) => {
                    warn!("Request from {} exceeds {} bytes", peer_addr, self.max_request_bytes);
                    let resp = Response::err(
                        None,
                        format!("request exceeds {} bytes", self.max_request_bytes),
                    );
                    send_response(&mut writer, &resp)?;
                    continue;
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    debug!("Connection from {} idle for too long, closing", peer_addr);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
            if buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            debug!("Receive request from {}: {}", peer_addr, String::from_utf8_lossy(&buf).trim());

            match self.dispatcher.dispatch_bytes(&buf) {
                Dispatched::Reply(resp) => {
                    send_response(&mut writer, &resp)?;
                    debug!("Response sent to {}: {:?}", peer_addr, resp);
                }
                Dispatched::Shutdown(id) => {
                    info!("Shutdown requested by {}", peer_addr);
                    self.shut_down(id, &mut writer);
                    return Ok(());
                }
            }
        }
    }

    /// saves the store, answers the `shutdown` request and then tells the listener to close.
    /// The answer is best effort: the client may already be gone.
    fn shut_down<W: Write>(&self, id: i64, writer: &mut W) {
        if !self.shutdown.begin() {
            debug!("shutdown already in progress");
            let _ = send_response(writer, &Response::err(Some(id), "shutdown already in progress"));
            return;
        }

        let outcome = persistence::save(&self.snapshot_path, self.dispatcher.store());
        let resp = match &outcome {
            Ok(()) => Response::ok(id, Value::Null),
            Err(e) => {
                error!("{}", e);
                Response::err(Some(id), e)
            }
        };
        if let Err(e) = send_response(writer, &resp) {
            debug!("could not answer shutdown request: {}", e);
        }
        self.shutdown.finish(outcome);
    }
}

/// reads the next newline-terminated request into `buf`, reading at most `limit` bytes of it
/// into memory. A longer request is read to its end and thrown away.
fn read_request<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>, limit: usize) -> io::Result<Frame> {
    buf.clear();
    let read = reader.by_ref().take(limit as u64 + 1).read_until(b'\n', buf)?;
    if read == 0 {
        return Ok(Frame::Eof);
    }
    if buf.ends_with(b"\n") || buf.len() <= limit {
        return Ok(Frame::Request);
    }

    loop {
        buf.clear();
        let read = reader.by_ref().take(limit as u64 + 1).read_until(b'\n', buf)?;
        if read == 0 || buf.ends_with(b"\n") {
            break;
        }
    }
    buf.clear();
    Ok(Frame::TooLong)
}

/// writes `resp` as a single line of JSON and flushes it
fn send_response<W: Write>(writer: &mut W, resp: &Response) -> Result<()> {
    serde_json::to_writer(&mut *writer, resp)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
