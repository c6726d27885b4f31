//! Admission control for incoming connections.
//!
//! The server accepts at most `capacity` connections at a time. Every admitted
//! connection holds an [`AdmissionPermit`] for as long as its session runs;
//! dropping the permit gives the slot back. Both the check-and-increment on
//! admission and the decrement on release happen under one mutex, so the live
//! count can never leave `0..=capacity`.
use std::{
    io::{Read, Write},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::{trace, warn};

use super::{ProtocolTransport, Response, transport::TransportError};

#[derive(Debug)]
struct AdmissionState {
    live: Mutex<usize>,
    capacity: usize,
}

impl AdmissionState {
    fn live(&self) -> MutexGuard<'_, usize> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Outcome of an admission attempt.
#[derive(Debug)]
pub enum Admission {
    Admitted(AdmissionPermit),
    Rejected,
}

/// Tracks live connections against a fixed capacity.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    state: Arc<AdmissionState>,
}

impl AdmissionController {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(AdmissionState {
                live: Mutex::new(0),
                capacity,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.state.capacity
    }

    /// Number of currently admitted connections.
    pub fn live(&self) -> usize {
        *self.state.live()
    }

    pub fn admit(&self) -> Admission {
        let mut live = self.state.live();
        if *live >= self.state.capacity {
            return Admission::Rejected;
        }

        *live += 1;
        trace!("admitted connection ({}/{})", *live, self.state.capacity);
        Admission::Admitted(AdmissionPermit {
            state: Arc::clone(&self.state),
        })
    }

    /// Tell a turned-away peer the server is full, then close the connection.
    ///
    /// The stream is consumed so the connection is closed on return even if
    /// the rejection could not be delivered.
    pub fn reject<T: Read + Write>(&self, stream: T) -> Result<(), TransportError> {
        warn!("max client connections reached, rejecting new connection");
        let mut transport = ProtocolTransport::new(stream);
        transport.write_response(Response::rejected())
    }
}

/// Proof of admission. Releases its slot exactly once, when dropped.
#[derive(Debug)]
pub struct AdmissionPermit {
    state: Arc<AdmissionState>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        let mut live = self.state.live();
        *live -= 1;
        trace!("released connection ({}/{})", *live, self.state.capacity);
    }
}
