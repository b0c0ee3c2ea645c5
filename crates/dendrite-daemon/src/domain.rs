//! Domain types shared by the supervisor, use cases, and handlers.

use serde::Serialize;

/// Lifecycle state reported for a registered (or unknown) pid.
///
/// A process that exited is `Completed` only if its expected artifact
/// exists in the owning client's session directory; the exit code is not
/// consulted. This mirrors the simulator contract: the artifact is the
/// completion signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SimStatus {
    Running,
    Completed,
    CompletedError,
    #[default]
    NotFound,
}

impl SimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimStatus::Running => "running",
            SimStatus::Completed => "completed",
            SimStatus::CompletedError => "completed_error",
            SimStatus::NotFound => "not_found",
        }
    }
}

/// Identifiers the caller needs after a successful launch: the pid to
/// poll and terminate, the channel to join, the artifact to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutput {
    pub pid: u32,
    pub data_channel_id: String,
    pub artifact: String,
}

/// Snapshot of one registered process, for listings and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct SimInfo {
    pub pid: u32,
    pub client_id: String,
    pub data_channel_id: String,
    pub running: bool,
    pub started_at: String,
}
