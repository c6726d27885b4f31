use std::{
    io,
    net::{IpAddr, SocketAddr, TcpListener, TcpStream},
    sync::Arc,
};

use log::{error, info, warn};
use thiserror::Error;

use crate::{
    ConfigError, ServerConfig,
    executor::{Executor, PlaceholderExecutor},
};

use super::{
    Admission, AdmissionController, ProtocolTransport, Session, ThreadPool,
};

/// How many ports above the configured one are tried before giving up.
pub const PORT_FALLBACK_RANGE: u16 = 10;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid server address '{0}'")]
    InvalidAddress(String),
    #[error("all ports in range {first}-{last} are unavailable")]
    NoPortAvailable { first: u16, last: u16 },
    #[error("failed to read listener address: {0}")]
    LocalAddr(#[source] io::Error),
}

/// Accepts client connections and serves each on the worker pool.
pub struct DatabaseServer {
    listener: TcpListener,
    address: SocketAddr,
    buffer_size: usize,
    admission: AdmissionController,
    executor: Arc<dyn Executor>,
    pool: ThreadPool,
}

impl DatabaseServer {
    /// Bind using the placeholder executor.
    pub fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        Self::with_executor(config, Arc::new(PlaceholderExecutor))
    }

    /// Bind the listening socket, falling back to the next free port in
    /// `port..=port + PORT_FALLBACK_RANGE` when the configured one is taken.
    pub fn with_executor(
        config: &ServerConfig,
        executor: Arc<dyn Executor>,
    ) -> Result<Self, ServerError> {
        config.validate()?;
        let ip: IpAddr = config
            .server_address
            .parse()
            .map_err(|_| ServerError::InvalidAddress(config.server_address.clone()))?;
        let listener = bind_with_fallback(ip, config.port)?;
        let address = listener.local_addr().map_err(ServerError::LocalAddr)?;
        info!("server is listening on {address}");

        Ok(Self {
            listener,
            address,
            buffer_size: config.buffer_size,
            admission: AdmissionController::new(config.max_clients),
            executor,
            pool: ThreadPool::new(config.max_clients),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    #[cfg(test)]
    fn pool_activity(&self) -> Arc<std::sync::atomic::AtomicUsize> {
        self.pool.active_counter()
    }

    /// Accept connections forever. Only returns if the pool shuts down.
    pub fn listen(self) -> Result<(), ServerError> {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if !self.dispatch(stream, peer) {
                        return Ok(());
                    }
                }
                Err(e) => warn!("failed to accept connection: {e}"),
            }
        }
    }

    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) -> bool {
        let permit = match self.admission.admit() {
            Admission::Admitted(permit) => permit,
            Admission::Rejected => {
                if let Err(e) = self.admission.reject(stream) {
                    warn!("failed to send rejection to {peer}: {e}");
                }
                return true;
            }
        };

        info!(
            "new connection, ip is: {}, port: {}",
            peer.ip(),
            peer.port()
        );

        let transport = ProtocolTransport::with_buffer_size(stream, self.buffer_size);
        let session = Session::new(transport, Some(peer), Arc::clone(&self.executor), permit);
        if let Err(e) = self.pool.execute(move || {
            session.run();
        }) {
            error!("unable to schedule session for {peer}: {e}");
            return false;
        }
        true
    }
}

fn bind_with_fallback(ip: IpAddr, first: u16) -> Result<TcpListener, ServerError> {
    let last = first.saturating_add(PORT_FALLBACK_RANGE);

    for port in first..=last {
        match TcpListener::bind(SocketAddr::new(ip, port)) {
            Ok(listener) => return Ok(listener),
            Err(e) => warn!("bind failed on port {port}: {e}"),
        }
    }
    Err(ServerError::NoPortAvailable { first, last })
}
