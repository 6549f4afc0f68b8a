use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, TriplesError};

/// The server configuration, read from a JSON file such as:
///
/// ```json
/// {
///   "serverID": "triples",
///   "ipAddress": "127.0.0.1",
///   "port": "4000",
///   "persistentStorageContainer": { "file": "./triples.json" }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// a name for this server, only used in log messages
    #[serde(rename = "serverID", default)]
    pub server_id: String,
    /// the IP address to listen on (or, for a client, to connect to)
    pub ip_address: String,
    /// the port to listen on, given either as a string or a number
    pub port: Port,
    /// where the snapshot file lives
    pub persistent_storage_container: StorageContainer,
    /// optional limit, in seconds, on how long a connection may sit idle while a request is read
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
}

/// The location of the snapshot file
#[derive(Debug, Clone, Deserialize)]
pub struct StorageContainer {
    /// path to the snapshot file
    pub file: PathBuf,
}

/// A port number that may be written as `"4000"` or `4000` in the config file
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Port {
    /// a numeric port
    Number(u64),
    /// a port given as a string
    Text(String),
}

impl Port {
    /// validates this port into a `u16`
    fn to_u16(&self) -> Result<u16> {
        let port = match self {
            Port::Number(n) => u16::try_from(*n).ok(),
            Port::Text(s) => s.trim().parse::<u16>().ok(),
        };
        port.ok_or_else(|| TriplesError::Parsing(format!("invalid port: {:?}", self)))
    }
}

impl ServerConfig {
    /// reads and parses the config file at `path`
    ///
    /// # Errors
    /// returns an error if the file could not be read or is not a valid config
    pub fn from_file(path: &Path) -> Result<ServerConfig> {
        let contents = fs::read_to_string(path).map_err(|e| {
            TriplesError::Parsing(format!("could not read config file {:?}: {}", path, e))
        })?;
        ServerConfig::from_json(&contents)
    }

    /// parses a config from a JSON string
    pub fn from_json(json: &str) -> Result<ServerConfig> {
        serde_json::from_str(json)
            .map_err(|e| TriplesError::Parsing(format!("invalid config: {}", e)))
    }

    /// validates `ipAddress` and `port` into a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.ip_address.trim().parse().map_err(|_| {
            TriplesError::Parsing(format!("could not parse {} into an IP address", self.ip_address))
        })?;
        Ok(SocketAddr::new(ip, self.port.to_u16()?))
    }

    /// the path of the snapshot file
    pub fn snapshot_path(&self) -> &Path {
        &self.persistent_storage_container.file
    }

    /// the per-connection read timeout, if one was configured
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
