#![deny(clippy::all)]

mod config;
mod connections;
mod domain;
mod error;
mod handlers;
mod lock_helpers;
mod metrics;
mod relay;
mod repository;
mod server;
mod sessions;
mod signal_handler;
mod sleeper;
mod streamer;
mod supervisor;
#[cfg(test)]
mod test_support;
mod transport;
mod usecases;

pub use config::DaemonConfig;
pub use connections::ConnectionId;
pub use connections::ConnectionRegistry;
pub use domain::LaunchOutput;
pub use domain::SimInfo;
pub use domain::SimStatus;
pub use error::DaemonError;
pub use error::SimError;
pub use relay::DataRelay;
pub use relay::EventSink;
pub use repository::SimRepository;
pub use server::DaemonServer;
pub use server::start_daemon;
pub use sessions::SessionStore;
pub use sleeper::RealSleeper;
pub use sleeper::Sleeper;
pub use supervisor::SimProcess;
pub use supervisor::Supervisor;
pub use transport::UnixSocketListener;

pub type Result<T> = std::result::Result<T, SimError>;
