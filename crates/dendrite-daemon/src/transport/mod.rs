//! Transport abstraction over accepted connections.
//!
//! Connections are bidirectional: requests flow in, and both responses
//! and relayed events flow out. The write half is shared (as an
//! `EventSink`) between the connection's own handler thread and
//! publishers delivering to its subscriptions.

mod unix_socket;

pub use unix_socket::UnixSocketConnection;
pub use unix_socket::UnixSocketListener;

use std::sync::Arc;
use std::time::Duration;

use dendrite_ipc::{RpcRequest, RpcResponse};
use thiserror::Error;

use crate::relay::EventSink;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Request exceeds {max_bytes} bytes")]
    SizeLimit { max_bytes: usize },
    #[error("Connection timeout")]
    Timeout,
    #[error("Connection closed")]
    ConnectionClosed,
}

impl TransportError {
    pub fn from_io(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::Timeout,
            ErrorKind::UnexpectedEof | ErrorKind::BrokenPipe | ErrorKind::ConnectionReset => {
                TransportError::ConnectionClosed
            }
            _ => TransportError::Io(e),
        }
    }
}

pub trait TransportConnection {
    fn read_request(&mut self) -> Result<RpcRequest, TransportError>;

    fn write_response(&mut self, response: &RpcResponse) -> Result<(), TransportError>;

    /// Shared write half for event delivery; remains valid for the
    /// connection's lifetime.
    fn event_sink(&self) -> Arc<dyn EventSink>;

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError>;

    fn set_write_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError>;
}

pub trait TransportListener {
    type Connection: TransportConnection;

    fn accept(&self) -> Result<Self::Connection, TransportError>;

    fn set_nonblocking(&self, nonblocking: bool) -> Result<(), TransportError>;
}
