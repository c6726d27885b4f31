//! Client-server communication protocol.
//!
//! This module defines how Rime clients and servers talk to each other: the message
//! types, their JSON encoding, the stream transport, and the server side machinery that
//! accepts, admits and serves connections.
//!
//! # Wire Format
//!
//! Every message is a single JSON object with exactly one top-level key: `command` for
//! client requests and `response` for server replies. The value is a tagged variant; the
//! `type` field names the variant, `base` holds the fields every variant of that family
//! shares, and the remaining fields belong to the variant itself:
//!
//! ```json
//! {"command": {"type": "SqlCommand", "base": {}, "query": "select"}}
//! {"response": {"type": "ExecuteResult", "base": {"need_disconnect": false}, "extra_info": "ok"}}
//! {"response": {"type": "QueryResult", "base": {"need_disconnect": false}, "results": [["a"]]}}
//! ```
//!
//! There is no length prefix. One write carries one message and the receiver expects one
//! read to return it whole, using a buffer of the configured `buffer_size`.
//!
//! # Extensibility
//!
//! - New request or result variants are added as new tags; peers that do not know a tag
//!   fail to decode that message and treat it as a protocol error.
//! - Unknown fields are ignored, so existing variants may grow new fields.
//!
//! # Serving
//!
//! - [`DatabaseServer`]: owns the listening socket and accepts connections.
//! - [`AdmissionController`]: caps live connections; overflow gets a rejection and is closed.
//! - [`ThreadPool`]: fixed set of worker threads, one admitted connection per worker.
//! - [`Session`]: per-connection request/response loop.
//!
//! # See Also
//!
//! - [`executor`](crate::executor): Turns decoded commands into results.
mod admission;
mod request;
mod response;
mod server;
mod session;
mod thread;
mod transport;

pub use admission::{Admission, AdmissionController, AdmissionPermit};
pub use request::{CommandBase, Request, SqlCommand};
pub use response::{ExecuteResult, MAX_CONNECTIONS_REACHED, QueryResult, Response, ResultBase};
pub use server::{DatabaseServer, PORT_FALLBACK_RANGE, ServerError};
pub use session::{Session, SessionEnd, SessionState};
pub use thread::{PoolError, ThreadPool};
pub use transport::{
    DEFAULT_BUFFER_SIZE, ProtocolTransport, TransportError, decode_request, decode_response,
    encode_request, encode_response,
};

#[cfg(test)]
pub(crate) use session::tests::ScriptedStream;
