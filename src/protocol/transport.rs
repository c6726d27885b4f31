use std::io::{self, ErrorKind, Read, Write};

use log::trace;
use thiserror::Error;

use super::{
    Request, Response, request::RequestEnvelope, response::ResponseEnvelope,
};

/// Read buffer size used when none is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode message: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to decode message: {0}")]
    Deserialize(#[source] serde_json::Error),
    #[error("Transport IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("connection closed by peer")]
    Closed,
}

pub fn encode_request(request: Request) -> Result<Vec<u8>, TransportError> {
    serde_json::to_vec(&RequestEnvelope { command: request }).map_err(TransportError::Serialize)
}

pub fn decode_request(bytes: &[u8]) -> Result<Request, TransportError> {
    let envelope: RequestEnvelope =
        serde_json::from_slice(bytes).map_err(TransportError::Deserialize)?;
    Ok(envelope.command)
}

pub fn encode_response(response: Response) -> Result<Vec<u8>, TransportError> {
    serde_json::to_vec(&ResponseEnvelope { response }).map_err(TransportError::Serialize)
}

pub fn decode_response(bytes: &[u8]) -> Result<Response, TransportError> {
    let envelope: ResponseEnvelope =
        serde_json::from_slice(bytes).map_err(TransportError::Deserialize)?;
    Ok(envelope.response)
}

/// Message transport over a byte stream.
///
/// Messages are not length-prefixed: each write carries exactly one encoded
/// message and each read is expected to return exactly one. A message larger
/// than the read buffer is truncated and fails to decode.
pub struct ProtocolTransport<T: Read + Write> {
    stream: T,
    buffer: Vec<u8>,
}

impl<T: Read + Write> ProtocolTransport<T> {
    pub fn new(stream: T) -> Self {
        Self::with_buffer_size(stream, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(stream: T, buffer_size: usize) -> Self {
        assert!(buffer_size > 0);

        Self {
            stream,
            buffer: vec![0; buffer_size],
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.stream
    }

    pub fn into_inner(self) -> T {
        self.stream
    }

    pub fn write_request(&mut self, request: Request) -> Result<(), TransportError> {
        let bytes = encode_request(request)?;
        self.write_message(&bytes)
    }

    pub fn write_response(&mut self, resp: Response) -> Result<(), TransportError> {
        let bytes = encode_response(resp)?;
        self.write_message(&bytes)
    }

    pub fn read_response(&mut self) -> Result<Response, TransportError> {
        let bytes = self.read_message()?;
        decode_response(bytes)
    }

    pub fn read_request(&mut self) -> Result<Request, TransportError> {
        let bytes = self.read_message()?;
        decode_request(bytes)
    }

    fn write_message(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        trace!("writing {} byte message", bytes.len());
        self.stream.write_all(bytes)?;
        self.stream.flush()?;
        Ok(())
    }

    fn read_message(&mut self) -> Result<&[u8], TransportError> {
        let read = loop {
            match self.stream.read(&mut self.buffer) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };

        if read == 0 {
            return Err(TransportError::Closed);
        }
        trace!("read {read} byte message");
        Ok(&self.buffer[..read])
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Seek};

    use crate::protocol::SqlCommand;

    use super::*;

    #[test]
    fn read_write_request() {
        let stream = Cursor::new(Vec::new());
        let mut transport = ProtocolTransport::new(stream);

        transport
            .write_request(SqlCommand::new("exit").into())
            .unwrap();
        transport.stream.seek(std::io::SeekFrom::Start(0)).unwrap();
        let req = transport.read_request().unwrap();
        assert_eq!(req, Request::Sql(SqlCommand::new("exit")));
    }

    #[test]
    fn read_write_response() {
        let stream = Cursor::new(Vec::new());
        let mut transport = ProtocolTransport::new(stream);

        transport
            .write_response(Response::execute("Execution successful", false))
            .unwrap();
        transport.stream.seek(std::io::SeekFrom::Start(0)).unwrap();
        let resp = transport.read_response().unwrap();
        assert_eq!(resp, Response::execute("Execution successful", false));
    }

    #[test]
    fn read_from_closed_stream() {
        let mut transport = ProtocolTransport::new(Cursor::new(Vec::new()));

        assert!(matches!(
            transport.read_request(),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn read_garbage() {
        let mut transport = ProtocolTransport::new(Cursor::new(b"not json".to_vec()));

        assert!(matches!(
            transport.read_request(),
            Err(TransportError::Deserialize(_))
        ));
    }

    #[test]
    fn oversized_message_is_truncated() {
        let bytes = encode_request(SqlCommand::new("x".repeat(64)).into()).unwrap();
        let mut transport = ProtocolTransport::with_buffer_size(Cursor::new(bytes), 16);

        assert!(matches!(
            transport.read_request(),
            Err(TransportError::Deserialize(_))
        ));
    }

    #[test]
    fn codec_round_trip() {
        let requests = vec![
            Request::Sql(SqlCommand::new("select * from users")),
            Request::Sql(SqlCommand::new("")),
        ];
        for req in requests {
            let bytes = encode_request(req.clone()).unwrap();
            assert_eq!(decode_request(&bytes).unwrap(), req);
        }

        let responses = vec![
            Response::execute("Exiting", true),
            Response::rejected(),
            Response::query(vec![vec!["a".into()], vec![]], false),
        ];
        for resp in responses {
            let bytes = encode_response(resp.clone()).unwrap();
            assert_eq!(decode_response(&bytes).unwrap(), resp);
        }
    }

    #[test]
    fn request_is_not_a_response() {
        let bytes = encode_request(SqlCommand::new("select").into()).unwrap();

        assert!(decode_response(&bytes).is_err());
    }
}
