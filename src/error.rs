use thiserror::Error;

/// type alias for all operations on a [`TripleStore`] or its server/client that could fail
/// with a [`TriplesError`]
///
/// [`TripleStore`]: ./struct.TripleStore.html
pub type Result<T> = std::result::Result<T, TriplesError>;

/// The Error variants used by the triple store, its server and its client.
/// Lower level errors from std and third party crates are wrapped with `#[from]`
#[derive(Debug, Error)]
pub enum TriplesError {
    /// variant for errors caused from file or socket IO
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// serde_json (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// a command line argument or configuration value could not be parsed
    #[error("{0}")]
    Parsing(String),

    /// a request named a method that the dispatcher does not know about
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// a request's `params` did not match what its method expects
    #[error("invalid params for {method}: {reason}")]
    InvalidParams {
        /// the method the params were meant for
        method: &'static str,
        /// what was wrong with them
        reason: String,
    },

    /// the snapshot file could not be written
    #[error("could not save snapshot to {path}: {source}")]
    Persistence {
        /// the snapshot path that was being written
        path: String,
        /// the underlying IO failure
        source: std::io::Error,
    },

    /// an error message relayed from a server response
    #[error("{0}")]
    StringErr(String),
}
