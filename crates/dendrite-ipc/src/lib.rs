#![deny(clippy::all)]

mod client;
mod error;
mod event;
mod socket;
mod types;

// Re-export error_codes from common so protocol consumers need one import.
pub use dendrite_common::error_codes;

pub use client::DaemonClient;
pub use error::ClientError;
pub use event::Event;
pub use event::ServerFrame;
pub use socket::socket_path;
pub use types::RpcRequest;
pub use types::RpcResponse;

pub type Result<T> = std::result::Result<T, ClientError>;
