#![deny(clippy::all)]

mod error;
pub mod fake;
mod launcher;

pub use error::ProcError;
pub use launcher::ChildHandle;
pub use launcher::OsProcessLauncher;
pub use launcher::ProcessLauncher;
pub use launcher::Signal;
pub use launcher::SpawnSpec;

pub type Result<T> = std::result::Result<T, ProcError>;
