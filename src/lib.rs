pub mod cli;
pub mod client;
pub mod config;
pub mod executor;
pub mod protocol;
pub mod sync;

pub use cli::prompt;
pub use client::{Client, ClientError, ClientExit};
pub use config::{ClientConfig, ConfigError, ServerConfig};
pub use executor::{Executor, PlaceholderExecutor};
pub use protocol::{DatabaseServer, Request, Response, SqlCommand};
pub use sync::SharedExclusiveLock;
