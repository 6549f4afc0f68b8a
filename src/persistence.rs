//! Whole-snapshot persistence for a [`TripleStore`].
//!
//! A snapshot is a single JSON object mapping key -> (relation -> value). It is read once when
//! the server starts and written once when the server is shut down.
//!
//! [`TripleStore`]: ../struct.TripleStore.html
use std::ffi::OsString;
use std::fs;
use std::fs::OpenOptions;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::engine::{TripleStore, Triples};
use crate::error::{Result, TriplesError};

/// loads a [`TripleStore`] from the snapshot file at `path`.
///
/// A missing file is the normal first-run case and yields an empty store. A file that cannot be
/// read or does not contain a valid snapshot is logged and also yields an empty store.
///
/// [`TripleStore`]: ../struct.TripleStore.html
pub fn load(path: &Path) -> TripleStore {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("no snapshot found at {:?}, starting with an empty store", path);
            return TripleStore::new();
        }
        Err(e) => {
            warn!("could not read snapshot {:?}, starting with an empty store: {}", path, e);
            return TripleStore::new();
        }
    };

    match serde_json::from_slice::<Triples>(&bytes) {
        Ok(triples) => {
            let store = TripleStore::from_triples(triples);
            info!("loaded {} triples from {:?}", store.len(), path);
            store
        }
        Err(e) => {
            warn!("snapshot {:?} is not valid, starting with an empty store: {}", path, e);
            TripleStore::new()
        }
    }
}

/// writes the full contents of `store` to the snapshot file at `path`, replacing any previous
/// snapshot.
///
/// The snapshot is first written to a sibling `.tmp` file and then renamed over `path`, so a
/// failed save leaves the previous snapshot intact.
///
/// # Errors
/// returns [`TriplesError::Persistence`] if the snapshot could not be written
///
/// [`TriplesError::Persistence`]: ../enum.TriplesError.html
pub fn save(path: &Path, store: &TripleStore) -> Result<()> {
    let triples = store.snapshot();
    let tmp_path = tmp_path(path);
    debug!("writing {} keys to {:?}", triples.len(), tmp_path);

    write_snapshot(&tmp_path, &triples)
        .and_then(|_| fs::rename(&tmp_path, path).map_err(TriplesError::from))
        .map_err(|e| {
            // best effort, the tmp file may not exist
            let _ = fs::remove_file(&tmp_path);
            persistence_error(path, e)
        })?;

    info!("saved {} keys to {:?}", triples.len(), path);
    Ok(())
}

fn write_snapshot(tmp_path: &Path, triples: &Triples) -> Result<()> {
    if let Some(parent) = tmp_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(tmp_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, triples)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// builds the path of the temporary file a snapshot is staged in: `<path>.tmp`
fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

fn persistence_error(path: &Path, e: TriplesError) -> TriplesError {
    let source = match e {
        TriplesError::Io(e) => e,
        other => std::io::Error::new(ErrorKind::Other, other.to_string()),
    };
    TriplesError::Persistence {
        path: path.display().to_string(),
        source,
    }
}
