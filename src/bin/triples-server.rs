//! this binary starts the triples server
//! to see the list of options, type: `triples-server --help`
//!
//! `triples-server <CONFIG> [--pool naive|shared|rayon] [--threads N] [--log-level LEVEL]`
//!
//!     CONFIG is the path to a JSON config file holding the `ipAddress` and `port` to listen
//!     on, and the `persistentStorageContainer.file` the store is loaded from and saved to.
//!     The server runs until a client sends a `shutdown` request.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::exit;

use clap::{arg_enum, crate_version, value_t, App, Arg, ArgMatches};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use triples::{
    persistence, NaiveThreadPool, RayonThreadPool, Result, ServerConfig, SharedQueueThreadPool,
    ThreadPool, TripleStore, TriplesError, TriplesServer,
};

arg_enum! {
    #[allow(non_camel_case_types)]
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    enum Pool {
        naive,
        shared,
        rayon
    }
}

const DEFAULT_POOL: &str = "naive";
const DEFAULT_THREADS: &str = "4";
const DEFAULT_LOG_LEVEL: &str = "info";

/// ['Opt'] holds parsed and validated options from the command line
#[derive(Debug)]
struct Opt {
    config: PathBuf,
    pool: Pool,
    threads: u32,
    log_level: Level,
}

impl Opt {
    /// validates the command line `matches`
    /// returns `Ok<Opt>` if everything is valid
    /// # Errors
    /// returns [`TriplesError::Parsing`] if one of the parameters is invalid
    fn build(matches: &ArgMatches) -> Result<Opt> {
        let config = matches
            .value_of("CONFIG")
            .map(PathBuf::from)
            .ok_or_else(|| TriplesError::Parsing("a config file is required".to_string()))?;
        let pool = value_t!(matches, "pool", Pool)
            .map_err(|e| TriplesError::Parsing(format!("invalid thread pool: {}", e)))?;
        let threads = value_t!(matches, "threads", u32)
            .map_err(|e| TriplesError::Parsing(format!("invalid thread count: {}", e)))?;
        if threads == 0 && pool != Pool::naive {
            return Err(TriplesError::Parsing(format!("the {} pool needs at least one thread", pool)));
        }
        let log_level = value_t!(matches, "log-level", Level)
            .map_err(|e| TriplesError::Parsing(format!("invalid log level: {}", e)))?;

        Ok(Opt {
            config,
            pool,
            threads,
            log_level,
        })
    }
}

fn main() {
    // parse command line args
    let matches = App::new("triples-server")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("a multi-threaded, networked triple store")
        .arg(Arg::with_name("CONFIG")
            .required(true)
            .index(1)
            .help("path to the JSON config file"))
        .arg(Arg::with_name("pool")
            .long("pool")
            .value_name("POOL")
            .help("sets the thread pool used to serve connections, 'naive' runs a thread per connection")
            .possible_values(&Pool::variants())
            .default_value(DEFAULT_POOL))
        .arg(Arg::with_name("threads")
            .long("threads")
            .value_name("N")
            .help("sets the number of threads in the 'shared' and 'rayon' pools")
            .default_value(DEFAULT_THREADS))
        .arg(Arg::with_name("log-level")
            .long("log-level")
            .value_name("LEVEL")
            .help("sets the maximum level of log messages written to STDERR")
            .default_value(DEFAULT_LOG_LEVEL))
        .get_matches();

    // validate command line options, store them in Opt
    let opt = match Opt::build(&matches) {
        Ok(opt) => opt,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };

    // set up a tracing subscriber to log to STDERR
    subscriber_config(opt.log_level);

    // start the server, it returns once a shutdown request has been handled
    if let Err(e) = run(opt) {
        error!("{}", e);
        eprintln!("{}", e);
        exit(1);
    }
}

fn run(opt: Opt) -> Result<()> {
    let config = ServerConfig::from_file(&opt.config)?;
    let addr = config.socket_addr()?;

    info!("triples-server {}", env!("CARGO_PKG_VERSION"));
    info!("Server ID: {}", config.server_id);
    info!("Thread pool: {} ({} threads)", opt.pool, opt.threads);
    info!("Snapshot file: {:?}", config.snapshot_path());

    let store = persistence::load(config.snapshot_path());

    match opt.pool {
        Pool::naive => run_with_pool(NaiveThreadPool::new(opt.threads)?, store, &config, addr),
        Pool::shared => run_with_pool(SharedQueueThreadPool::new(opt.threads)?, store, &config, addr),
        Pool::rayon => run_with_pool(RayonThreadPool::new(opt.threads)?, store, &config, addr),
    }
}

fn run_with_pool<P: ThreadPool>(
    pool: P,
    store: TripleStore,
    config: &ServerConfig,
    addr: SocketAddr,
) -> Result<()> {
    let server = TriplesServer::new(store, pool, config.snapshot_path())
        .with_read_timeout(config.read_timeout());
    server.run(addr)?;
    info!("Store saved, shutting down");
    Ok(())
}

/// configures a tracing subscriber that will log to STDERR
fn subscriber_config(level: Level) {
    let subscriber = FmtSubscriber::builder()
        // all spans/events at `level` or more severe will be written
        .with_max_level(level)
        // log to stderr instead of stdout
        .with_writer(std::io::stderr)
        // completes the builder.
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting tracing default subscriber failed");
}
