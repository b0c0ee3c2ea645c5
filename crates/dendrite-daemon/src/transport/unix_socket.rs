use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use dendrite_common::mutex_lock_or_recover;
use dendrite_ipc::{Event, RpcRequest, RpcResponse};

use super::{TransportConnection, TransportError, TransportListener};
use crate::relay::EventSink;

const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Shared write half of a connection. Responses and pushed events are
/// serialized by the mutex so concurrent writers can never interleave
/// partial lines.
pub struct ConnectionSink {
    writer: Arc<Mutex<UnixStream>>,
}

impl EventSink for ConnectionSink {
    fn send(&self, event: &Event) -> std::io::Result<()> {
        let line = serde_json::to_string(event)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut writer = mutex_lock_or_recover(&self.writer);
        writeln!(writer, "{}", line)?;
        writer.flush()
    }
}

pub struct UnixSocketConnection {
    reader: BufReader<UnixStream>,
    writer: Arc<Mutex<UnixStream>>,
    max_line_bytes: usize,
}

impl UnixSocketConnection {
    pub fn new(stream: UnixStream) -> Result<Self, TransportError> {
        Self::with_max_line_bytes(stream, DEFAULT_MAX_LINE_BYTES)
    }

    pub fn with_max_line_bytes(
        stream: UnixStream,
        max_line_bytes: usize,
    ) -> Result<Self, TransportError> {
        // Accepted sockets must be blocking so read timeouts apply.
        let _ = stream.set_nonblocking(false);
        let reader_stream = stream.try_clone().map_err(TransportError::from_io)?;
        Ok(Self {
            reader: BufReader::new(reader_stream),
            writer: Arc::new(Mutex::new(stream)),
            max_line_bytes,
        })
    }

    /// Read one line, bounded per line so a long-lived event connection
    /// never trips a cumulative cap.
    fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(n) => {
                if n > self.max_line_bytes {
                    return Err(TransportError::SizeLimit {
                        max_bytes: self.max_line_bytes,
                    });
                }
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Ok(Some(line))
            }
            Err(e) => Err(TransportError::from_io(e)),
        }
    }
}

impl TransportConnection for UnixSocketConnection {
    fn read_request(&mut self) -> Result<RpcRequest, TransportError> {
        loop {
            match self.read_line()? {
                None => return Err(TransportError::ConnectionClosed),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => {
                    return serde_json::from_str(&line)
                        .map_err(|e| TransportError::Parse(e.to_string()));
                }
            }
        }
    }

    fn write_response(&mut self, response: &RpcResponse) -> Result<(), TransportError> {
        let json = serde_json::to_string(response)
            .map_err(|e| TransportError::Parse(format!("Failed to serialize response: {}", e)))?;
        let mut writer = mutex_lock_or_recover(&self.writer);
        writeln!(writer, "{}", json).map_err(TransportError::from_io)?;
        writer.flush().map_err(TransportError::from_io)
    }

    fn event_sink(&self) -> Arc<dyn EventSink> {
        Arc::new(ConnectionSink {
            writer: Arc::clone(&self.writer),
        })
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        mutex_lock_or_recover(&self.writer)
            .set_read_timeout(timeout)
            .map_err(TransportError::from_io)
    }

    fn set_write_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        mutex_lock_or_recover(&self.writer)
            .set_write_timeout(timeout)
            .map_err(TransportError::from_io)
    }
}

pub struct UnixSocketListener {
    inner: UnixListener,
}

impl UnixSocketListener {
    pub fn bind(path: &Path) -> Result<Self, TransportError> {
        let listener = UnixListener::bind(path).map_err(TransportError::from_io)?;
        Ok(Self { inner: listener })
    }
}

impl TransportListener for UnixSocketListener {
    type Connection = UnixSocketConnection;

    fn accept(&self) -> Result<Self::Connection, TransportError> {
        let (stream, _addr) = self.inner.accept().map_err(TransportError::from_io)?;
        UnixSocketConnection::new(stream)
    }

    fn set_nonblocking(&self, nonblocking: bool) -> Result<(), TransportError> {
        self.inner
            .set_nonblocking(nonblocking)
            .map_err(TransportError::from_io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::BufRead;
    use std::thread;

    #[test]
    fn test_request_response_roundtrip() {
        let (client, server) = UnixStream::pair().unwrap();
        let mut conn = UnixSocketConnection::new(server).unwrap();

        let mut client_writer = client.try_clone().unwrap();
        let handle = thread::spawn(move || {
            writeln!(
                client_writer,
                r#"{{"jsonrpc":"2.0","id":5,"method":"ping"}}"#
            )
            .unwrap();
            let mut reader = BufReader::new(client);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            line
        });

        let request = conn.read_request().unwrap();
        assert_eq!(request.method, "ping");
        conn.write_response(&RpcResponse::success(request.id, json!({"pong": true})))
            .unwrap();

        let line = handle.join().unwrap();
        assert!(line.contains("\"pong\":true"));
    }

    #[test]
    fn test_event_sink_shares_the_connection() {
        let (client, server) = UnixStream::pair().unwrap();
        let conn = UnixSocketConnection::new(server).unwrap();
        let sink = conn.event_sink();

        sink.send(&Event::SimulationData {
            data_channel_id: "ch-1".to_string(),
            payload: json!({"t": 1}),
        })
        .unwrap();

        let mut reader = BufReader::new(client);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert!(line.contains("\"event\":\"simulation_data\""));
        assert!(line.contains("ch-1"));
    }

    #[test]
    fn test_oversized_line_rejected() {
        let (client, server) = UnixStream::pair().unwrap();
        let mut conn = UnixSocketConnection::with_max_line_bytes(server, 32).unwrap();

        let mut client_writer = client;
        writeln!(client_writer, "{}", "x".repeat(64)).unwrap();

        assert!(matches!(
            conn.read_request(),
            Err(TransportError::SizeLimit { .. })
        ));
    }

    #[test]
    fn test_eof_reports_connection_closed() {
        let (client, server) = UnixStream::pair().unwrap();
        drop(client);
        let mut conn = UnixSocketConnection::new(server).unwrap();
        assert!(matches!(
            conn.read_request(),
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let (client, server) = UnixStream::pair().unwrap();
        let mut conn = UnixSocketConnection::new(server).unwrap();

        let mut client_writer = client;
        writeln!(client_writer).unwrap();
        writeln!(client_writer, r#"{{"jsonrpc":"2.0","id":1,"method":"ping"}}"#).unwrap();

        assert_eq!(conn.read_request().unwrap().method, "ping");
    }
}
