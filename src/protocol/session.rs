//! Per-connection request/response loop.
//!
//! A [`Session`] owns one admitted connection and drives it through
//!
//! ```text
//! AwaitingRequest -> Processing -> Responding -> AwaitingRequest
//!        \               \             \
//!         `---------------`-------------`--> Closed
//! ```
//!
//! `Closed` is reached on peer EOF, any I/O error, an undecodable request, or
//! after writing a response that asks for disconnection. Undecodable requests
//! get no reply. Running the session consumes it, so the transport and the
//! admission permit are both released exactly once when `run` returns.
use std::{
    fmt,
    io::{Read, Write},
    net::SocketAddr,
    sync::Arc,
};

use log::{debug, info, trace, warn};

use crate::executor::Executor;

use super::{
    ProtocolTransport, Request, Response, admission::AdmissionPermit,
    transport::TransportError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingRequest,
    Processing,
    Responding,
    Closed,
}

/// Why a session reached [`SessionState::Closed`].
#[derive(Debug)]
pub enum SessionEnd {
    /// Peer closed its end of the connection.
    PeerClosed,
    /// The executor asked for the connection to be dropped.
    Disconnected,
    /// Request bytes could not be decoded.
    Malformed(TransportError),
    /// Reading or writing the socket failed.
    Io(TransportError),
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::PeerClosed => write!(f, "peer closed connection"),
            SessionEnd::Disconnected => write!(f, "disconnect requested"),
            SessionEnd::Malformed(e) => write!(f, "malformed request: {e}"),
            SessionEnd::Io(e) => write!(f, "transport failure: {e}"),
        }
    }
}

pub struct Session<T: Read + Write> {
    transport: ProtocolTransport<T>,
    peer: Option<SocketAddr>,
    state: SessionState,
    executor: Arc<dyn Executor>,
    _permit: AdmissionPermit,
}

impl<T: Read + Write> Session<T> {
    pub fn new(
        transport: ProtocolTransport<T>,
        peer: Option<SocketAddr>,
        executor: Arc<dyn Executor>,
        permit: AdmissionPermit,
    ) -> Self {
        Self {
            transport,
            peer,
            state: SessionState::AwaitingRequest,
            executor,
            _permit: permit,
        }
    }

    /// Serve requests until the connection closes.
    pub fn run(mut self) -> SessionEnd {
        let end = loop {
            if let Err(end) = self.step() {
                break end;
            }
        };

        self.transition(SessionState::Closed);
        match &end {
            SessionEnd::Malformed(e) => warn!("error deserializing command: {e}"),
            SessionEnd::Io(e) => warn!("error on client connection: {e}"),
            SessionEnd::PeerClosed | SessionEnd::Disconnected => {}
        }
        match self.peer {
            Some(peer) => info!(
                "client disconnected. IP: {}, Port: {}",
                peer.ip(),
                peer.port()
            ),
            None => info!("client disconnected ({end})"),
        }
        end
    }

    /// One full request/response exchange.
    fn step(&mut self) -> Result<(), SessionEnd> {
        self.transition(SessionState::AwaitingRequest);
        let req = match self.transport.read_request() {
            Ok(req) => req,
            Err(TransportError::Closed) => return Err(SessionEnd::PeerClosed),
            Err(e @ TransportError::Deserialize(_)) => return Err(SessionEnd::Malformed(e)),
            Err(e) => return Err(SessionEnd::Io(e)),
        };
        debug!("received request: {req:?}");

        self.transition(SessionState::Processing);
        let resp = match req {
            Request::Sql(command) => self.executor.execute(&command),
        };

        self.transition(SessionState::Responding);
        let disconnect = resp.need_disconnect();
        self.respond(resp)?;

        if disconnect {
            return Err(SessionEnd::Disconnected);
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            match self.peer {
                Some(peer) => trace!("session {peer}: {:?} -> {next:?}", self.state),
                None => trace!("session: {:?} -> {next:?}", self.state),
            }
            self.state = next;
        }
    }

    fn respond(&mut self, resp: Response) -> Result<(), SessionEnd> {
        debug!("sending response: {resp:?}");
        self.transport.write_response(resp).map_err(SessionEnd::Io)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{collections::VecDeque, io};

    use crate::{
        executor::PlaceholderExecutor,
        protocol::{
            Admission, AdmissionController, SqlCommand,
            transport::{decode_request, decode_response, encode_request, encode_response},
        },
    };

    use super::*;

    /// In-memory stream that hands out one scripted chunk per read and
    /// records each write separately.
    #[derive(Default)]
    pub(crate) struct ScriptedStream {
        pub reads: VecDeque<io::Result<Vec<u8>>>,
        pub writes: Vec<Vec<u8>>,
        pub fail_writes: bool,
    }

    impl ScriptedStream {
        pub fn with_requests(queries: &[&str]) -> Self {
            let reads = queries
                .iter()
                .map(|q| Ok(encode_request(SqlCommand::new(*q).into()).unwrap()))
                .collect();
            Self {
                reads,
                ..Default::default()
            }
        }

        pub fn with_responses(responses: &[Response]) -> Self {
            let reads = responses
                .iter()
                .map(|r| Ok(encode_response(r.clone()).unwrap()))
                .collect();
            Self {
                reads,
                ..Default::default()
            }
        }

        pub fn requests(&self) -> Vec<Request> {
            self.writes
                .iter()
                .map(|w| decode_request(w).unwrap())
                .collect()
        }

        pub fn responses(&self) -> Vec<Response> {
            self.writes
                .iter()
                .map(|w| decode_response(w).unwrap())
                .collect()
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
            }
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn run_session(
        stream: &mut ScriptedStream,
        controller: &AdmissionController,
    ) -> SessionEnd {
        let Admission::Admitted(permit) = controller.admit() else {
            panic!("admission unexpectedly rejected");
        };
        let session = Session::new(
            ProtocolTransport::new(stream),
            None,
            Arc::new(PlaceholderExecutor),
            permit,
        );
        session.run()
    }

    #[test]
    fn serves_until_peer_closes() {
        let controller = AdmissionController::new(1);
        let mut stream = ScriptedStream::with_requests(&["execute", "select"]);

        let end = run_session(&mut stream, &controller);

        assert!(matches!(end, SessionEnd::PeerClosed));
        assert_eq!(
            stream.responses(),
            vec![
                Response::execute("Execution successful", false),
                Response::query(
                    vec![
                        vec!["Result1".into(), "Result2".into()],
                        vec!["Row2Col1".into(), "Row2Col2".into()],
                    ],
                    false
                ),
            ]
        );
        assert_eq!(controller.live(), 0);
    }

    #[test]
    fn exit_closes_after_reply() {
        let controller = AdmissionController::new(1);
        let mut stream = ScriptedStream::with_requests(&["exit", "execute"]);

        let end = run_session(&mut stream, &controller);

        assert!(matches!(end, SessionEnd::Disconnected));
        assert_eq!(stream.responses(), vec![Response::execute("Exiting", true)]);
        assert_eq!(stream.reads.len(), 1);
        assert_eq!(controller.live(), 0);
    }

    #[test]
    fn malformed_request_closes_silently() {
        let controller = AdmissionController::new(2);
        let _other = controller.admit();
        let mut stream = ScriptedStream::default();
        stream.reads.push_back(Ok(b"{\"command\": 12}".to_vec()));

        assert_eq!(controller.live(), 1);
        let end = run_session(&mut stream, &controller);

        assert!(matches!(end, SessionEnd::Malformed(_)));
        assert!(stream.writes.is_empty());
        assert_eq!(controller.live(), 1);
    }

    #[test]
    fn unknown_command_tag_closes_silently() {
        let controller = AdmissionController::new(1);
        let mut stream = ScriptedStream::default();
        stream.reads.push_back(Ok(
            br#"{"command": {"type": "Shutdown", "base": {}}}"#.to_vec()
        ));

        let end = run_session(&mut stream, &controller);

        assert!(matches!(end, SessionEnd::Malformed(_)));
        assert!(stream.writes.is_empty());
        assert_eq!(controller.live(), 0);
    }

    #[test]
    fn read_error_closes() {
        let controller = AdmissionController::new(1);
        let mut stream = ScriptedStream::default();
        stream
            .reads
            .push_back(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")));

        let end = run_session(&mut stream, &controller);

        assert!(matches!(end, SessionEnd::Io(TransportError::Io(_))));
        assert_eq!(controller.live(), 0);
    }

    #[test]
    fn write_error_closes() {
        let controller = AdmissionController::new(1);
        let mut stream = ScriptedStream::with_requests(&["execute", "execute"]);
        stream.fail_writes = true;

        let end = run_session(&mut stream, &controller);

        assert!(matches!(end, SessionEnd::Io(_)));
        assert_eq!(stream.reads.len(), 1);
        assert_eq!(controller.live(), 0);
    }
}
