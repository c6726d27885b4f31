//! Server and client configuration files.
//!
//! Both configurations live in JSON files under a named section, so one file
//! may carry either or both:
//!
//! ```json
//! {
//!   "server": { "server_address": "127.0.0.1", "port": 8080, "buffer_size": 1024,
//!               "max_clients": 16, "bplus_tree_threads": 4 },
//!   "client": { "server_address": "127.0.0.1", "port": 8080, "buffer_size": 1024,
//!               "max_retry_attempts": 5, "retry_interval": 2 }
//! }
//! ```
use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use log::info;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::protocol::DEFAULT_BUFFER_SIZE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not open config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config, {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub server_address: String,
    pub port: u16,
    /// Size of the per-read buffer; also the largest request accepted.
    pub buffer_size: usize,
    /// Admission capacity and worker pool size.
    pub max_clients: usize,
    /// Reserved for the index search threads; not used by the connection layer.
    pub bplus_tree_threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1".to_string(),
            port: 8080,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_clients: 16,
            bplus_tree_threads: 4,
        }
    }
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file: ServerFile = read_json(path.as_ref())?;
        let config = file.server;
        config.validate()?;

        info!(
            "loaded server config: server_address = {}, port = {}, buffer_size = {}, max_clients = {}, bplus_tree_threads = {}",
            config.server_address,
            config.port,
            config.buffer_size,
            config.max_clients,
            config.bplus_tree_threads
        );
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        write_json(path.as_ref(), &ServerFile { server: self.clone() })?;
        info!("server config saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid("buffer_size must be positive".to_string()));
        }
        if self.max_clients == 0 {
            return Err(ConfigError::Invalid("max_clients must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub server_address: String,
    pub port: u16,
    pub buffer_size: usize,
    /// Consecutive failed connection attempts tolerated before giving up.
    pub max_retry_attempts: u32,
    /// Seconds to wait between connection attempts.
    pub retry_interval: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1".to_string(),
            port: 8080,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_retry_attempts: 5,
            retry_interval: 2,
        }
    }
}

impl ClientConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file: ClientFile = read_json(path.as_ref())?;
        let config = file.client;
        config.validate()?;

        info!(
            "loaded client config: server_address = {}, port = {}, buffer_size = {}, max_retry_attempts = {}, retry_interval = {}",
            config.server_address,
            config.port,
            config.buffer_size,
            config.max_retry_attempts,
            config.retry_interval
        );
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        write_json(path.as_ref(), &ClientFile { client: self.clone() })?;
        info!("client config saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid("buffer_size must be positive".to_string()));
        }
        if self.max_retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_retry_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval)
    }
}

#[derive(Serialize, Deserialize)]
struct ServerFile {
    server: ServerConfig,
}

#[derive(Serialize, Deserialize)]
struct ClientFile {
    client: ClientConfig,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush().map_err(io_err)?;
    Ok(())
}
