use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Daemon is not running")]
    DaemonNotRunning,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Protocol error: {0}")]
    Protocol(#[from] serde_json::Error),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },
    #[error("Daemon returned a response with neither result nor error")]
    InvalidResponse,
    #[error("Connection closed by daemon")]
    ConnectionClosed,
}
