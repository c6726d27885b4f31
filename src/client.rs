//! Interactive client driver.
//!
//! The client connects to a server, retrying a bounded number of times, then
//! runs a prompt loop: one line of input becomes one [`SqlCommand`], and the
//! single [`Response`] it produces is printed before the next prompt.
//!
//! A connection ends when the server asks for a disconnect or the exchange
//! fails; the client then reconnects. It stops for good after sending `exit`,
//! when input runs out, when the server turns it away for being at capacity,
//! or after `max_retry_attempts` consecutive failed connection attempts.
use std::{
    io::{self, BufRead, Read, Write},
    net::{IpAddr, SocketAddr, TcpStream},
    thread,
};

use log::{debug, warn};
use thiserror::Error;

use crate::{
    ClientConfig, ConfigError,
    cli::prompt,
    protocol::{ProtocolTransport, Response, SqlCommand, TransportError},
};

/// Command that ends the session on both sides.
pub const EXIT_COMMAND: &str = "exit";

const PROMPT: &str = "Enter SQL command: ";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid address '{0}'")]
    InvalidAddress(String),
    #[error("connection failed: {0}")]
    Connect(#[source] io::Error),
    #[error("console IO error: {0}")]
    Console(#[from] io::Error),
}

/// How the client finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientExit {
    /// The user sent `exit` and the server answered.
    Exited,
    /// The server was at capacity.
    Rejected,
    /// Input ended before `exit` was sent.
    InputClosed,
    /// Every allowed connection attempt failed.
    RetriesExhausted,
}

enum Conversation {
    Finished(ClientExit),
    Reconnect,
}

pub struct Client {
    config: ClientConfig,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Connect over TCP and converse using `input` and `output`.
    pub fn run<R, W>(&self, input: R, output: W) -> Result<ClientExit, ClientError>
    where
        R: BufRead,
        W: Write,
    {
        let ip: IpAddr = self
            .config
            .server_address
            .parse()
            .map_err(|_| ClientError::InvalidAddress(self.config.server_address.clone()))?;
        let address = SocketAddr::new(ip, self.config.port);

        self.run_with(
            || TcpStream::connect(address).map_err(ClientError::Connect),
            input,
            output,
        )
    }

    /// Like [`Client::run`], with `connect` opening each connection.
    pub fn run_with<C, S, R, W>(
        &self,
        mut connect: C,
        mut input: R,
        mut output: W,
    ) -> Result<ClientExit, ClientError>
    where
        C: FnMut() -> Result<S, ClientError>,
        S: Read + Write,
        R: BufRead,
        W: Write,
    {
        self.config.validate()?;
        let max_attempts = self.config.max_retry_attempts;
        let mut failures = 0;

        while failures < max_attempts {
            let stream = match connect() {
                Ok(stream) => stream,
                Err(e) => {
                    failures += 1;
                    warn!("connection attempt {failures}/{max_attempts} failed: {e}");
                    if failures < max_attempts {
                        eprintln!(
                            "Failed to connect to server. Retrying in {} seconds...",
                            self.config.retry_interval
                        );
                        thread::sleep(self.config.retry_interval());
                    }
                    continue;
                }
            };
            failures = 0;
            debug!("connected to server");

            match self.converse(stream, &mut input, &mut output)? {
                Conversation::Finished(exit) => return Ok(exit),
                Conversation::Reconnect => continue,
            }
        }

        eprintln!("Reached maximum retry attempts. Exiting client.");
        Ok(ClientExit::RetriesExhausted)
    }

    fn converse<S, R, W>(
        &self,
        stream: S,
        input: &mut R,
        output: &mut W,
    ) -> Result<Conversation, ClientError>
    where
        S: Read + Write,
        R: BufRead,
        W: Write,
    {
        let mut transport = ProtocolTransport::with_buffer_size(stream, self.config.buffer_size);

        loop {
            let Some(query) = prompt(&mut *input, &mut *output, PROMPT)? else {
                return Ok(Conversation::Finished(ClientExit::InputClosed));
            };
            let exiting = query == EXIT_COMMAND;

            let resp = match exchange(&mut transport, query) {
                Ok(resp) => resp,
                Err(e) => {
                    eprintln!("Server disconnected or error occurred: {e}");
                    return Ok(Conversation::Reconnect);
                }
            };
            writeln!(output, "Server response: {resp}")?;

            if resp.is_rejection() {
                eprintln!("Max connections reached. Stopping client.");
                return Ok(Conversation::Finished(ClientExit::Rejected));
            }
            if exiting {
                writeln!(output, "Exiting client.")?;
                return Ok(Conversation::Finished(ClientExit::Exited));
            }
            if resp.need_disconnect() {
                writeln!(output, "Server requested disconnect")?;
                return Ok(Conversation::Reconnect);
            }
        }
    }
}

fn exchange<S: Read + Write>(
    transport: &mut ProtocolTransport<S>,
    query: String,
) -> Result<Response, TransportError> {
    transport.write_request(SqlCommand::new(query).into())?;
    transport.read_response()
}
