//! Blocking socket client.
//!
//! Holds one connection open so event-style methods (`register_client`,
//! `join_channel`) and the relayed events they unlock arrive on the same
//! connection — the daemon scopes subscriptions and cleanup to the
//! connection that issued them.

use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;
use crate::event::Event;
use crate::event::ServerFrame;
use crate::socket::socket_path;

static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Serialize)]
struct Request {
    jsonrpc: String,
    id: u64,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

pub struct DaemonClient {
    reader: BufReader<UnixStream>,
    writer: UnixStream,
}

impl DaemonClient {
    pub fn connect() -> Result<Self, ClientError> {
        Self::connect_to(&socket_path())
    }

    pub fn connect_to(path: &Path) -> Result<Self, ClientError> {
        if !path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }

        let stream = UnixStream::connect(path)?;
        stream.set_write_timeout(Some(Duration::from_secs(10)))?;
        let reader_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(reader_stream),
            writer: stream,
        })
    }

    pub fn is_daemon_running() -> bool {
        let path = socket_path();
        path.exists() && UnixStream::connect(path).is_ok()
    }

    /// Send a request and block until its response arrives.
    ///
    /// Events that arrive while waiting are discarded; use `read_event`
    /// loops for subscription-style workflows.
    pub fn call(&mut self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        let id = self.send(method, params)?;

        loop {
            match self.read_frame()? {
                ServerFrame::Response(resp) if resp.id == id => {
                    if let Some(error) = resp.error {
                        return Err(ClientError::Rpc {
                            code: error.code,
                            message: error.message,
                        });
                    }
                    return resp.result.ok_or(ClientError::InvalidResponse);
                }
                ServerFrame::Response(_) | ServerFrame::Event(_) => continue,
            }
        }
    }

    /// Block until the next pushed event arrives, skipping responses.
    pub fn read_event(&mut self) -> Result<Event, ClientError> {
        loop {
            if let ServerFrame::Event(event) = self.read_frame()? {
                return Ok(event);
            }
        }
    }

    fn send(&mut self, method: &str, params: Option<Value>) -> Result<u64, ClientError> {
        let id = REQUEST_ID.fetch_add(1, Ordering::SeqCst);
        let request = Request {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        };
        writeln!(self.writer, "{}", serde_json::to_string(&request)?)?;
        self.writer.flush()?;
        Ok(id)
    }

    fn read_frame(&mut self) -> Result<ServerFrame, ClientError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(ServerFrame::parse(line.trim_end())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;

    #[test]
    fn test_call_roundtrip_over_socketpair() {
        let (client_stream, server_stream) = UnixStream::pair().unwrap();
        let reader_stream = client_stream.try_clone().unwrap();
        let mut client = DaemonClient {
            reader: BufReader::new(reader_stream),
            writer: client_stream,
        };

        let server = thread::spawn(move || {
            let mut reader = BufReader::new(server_stream.try_clone().unwrap());
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let req: Value = serde_json::from_str(&line).unwrap();
            assert_eq!(req["method"], "status");

            let mut writer = server_stream;
            // An interleaved event must not be mistaken for the response.
            writeln!(
                writer,
                r#"{{"event":"simulation_data","data_channel_id":"ch","payload":1}}"#
            )
            .unwrap();
            writeln!(
                writer,
                r#"{{"jsonrpc":"2.0","id":{},"result":{{"status":"running"}}}}"#,
                req["id"]
            )
            .unwrap();
        });

        let result = client.call("status", Some(json!({"pid": 1}))).unwrap();
        assert_eq!(result["status"], "running");
        server.join().unwrap();
    }

    #[test]
    fn test_read_event_skips_responses() {
        let (client_stream, server_stream) = UnixStream::pair().unwrap();
        let reader_stream = client_stream.try_clone().unwrap();
        let mut client = DaemonClient {
            reader: BufReader::new(reader_stream),
            writer: client_stream,
        };

        let mut writer = server_stream;
        writeln!(writer, r#"{{"jsonrpc":"2.0","id":99,"result":{{}}}}"#).unwrap();
        writeln!(
            writer,
            r#"{{"event":"simulation_data","data_channel_id":"ch-2","payload":{{"v":1}}}}"#
        )
        .unwrap();

        let event = client.read_event().unwrap();
        assert_eq!(event.channel(), "ch-2");
    }

    #[test]
    fn test_closed_connection_errors() {
        let (client_stream, server_stream) = UnixStream::pair().unwrap();
        drop(server_stream);
        let reader_stream = client_stream.try_clone().unwrap();
        let mut client = DaemonClient {
            reader: BufReader::new(reader_stream),
            writer: client_stream,
        };
        assert!(matches!(
            client.read_event(),
            Err(ClientError::ConnectionClosed)
        ));
    }
}
