//! The triples-client executable sends requests to a triples-server:
//!
//! `triples-client <CONFIG>`
//!
//!     Connects to the `ipAddress` and `port` given in the CONFIG file, then reads requests
//!     from STDIN, one JSON object per line, e.g.
//!     {"method": "insert", "params": ["alice", "age", 30], "id": 1}
//!     Every request is sent to the server and its response is printed to STDOUT as one line of
//!     JSON. Lines that are not JSON objects are skipped.
//!
//! `triples-client -V`
//!
//!     Print the version.

use std::io::{self, BufRead};
use std::path::Path;
use std::process::exit;

use clap::{crate_version, App, Arg};
use serde_json::Value;
use tracing::{debug, warn, Level};
use tracing_subscriber::FmtSubscriber;
use triples::{Result, ServerConfig, TriplesClient};

fn main() {
    // configure a subscriber that will log messages to STDERR
    subscriber_config();

    let matches = App::new("triples-client")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("sends requests read from STDIN to a triples-server")
        .arg(Arg::with_name("CONFIG")
            .required(true)
            .index(1)
            .help("path to the JSON config file of the server to connect to"))
        .get_matches();

    let config = matches.value_of("CONFIG").unwrap_or_default();
    if let Err(e) = run(Path::new(config)) {
        eprintln!("{}", e);
        exit(1);
    }
}

/// connects to the server named in the config file at `config` and relays requests from STDIN
fn run(config: &Path) -> Result<()> {
    let addr = ServerConfig::from_file(config)?.socket_addr()?;
    let mut client = TriplesClient::connect(addr)?;
    debug!("connected to {}", addr);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // ignore the bad requests and proceed with the next ones
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(_)) => {}
            _ => {
                warn!("skipping a line that is not a JSON object: {}", line);
                continue;
            }
        }

        let resp = client.call_raw(line)?;
        println!("{}", serde_json::to_string(&resp)?);
    }
    Ok(())
}

/// configures a tracing subscriber that will log to STDERR
fn subscriber_config() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        // log to stderr instead of stdout
        .with_writer(std::io::stderr)
        // completes the builder.
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting tracing default subscriber failed");
}
