//! Repository trait over the supervisor.
//!
//! Abstracts simulation registry operations so use cases can be tested
//! against a mock instead of a real supervisor spawning processes.

use serde_json::Value;

use crate::domain::{LaunchOutput, SimInfo, SimStatus};
use crate::error::SimError;
use crate::supervisor::Supervisor;

pub trait SimRepository: Send + Sync {
    /// Launch a simulation for a client, preempting any prior one.
    fn launch(&self, client_id: &str, config: &Value) -> Result<LaunchOutput, SimError>;

    /// Terminate a pid; idempotent, returns whether it was registered.
    fn terminate(&self, pid: u32) -> bool;

    /// Terminate the client's active process, returning its pid.
    fn terminate_for_client(&self, client_id: &str) -> Option<u32>;

    /// Lifecycle state of a pid.
    fn status(&self, pid: u32) -> SimStatus;

    /// Relay a command line to a running process; silent drop on miss.
    fn command(&self, pid: u32, command: &str, params: &Value) -> bool;

    /// Snapshot of all registered processes.
    fn list(&self) -> Vec<SimInfo>;

    /// Number of registered processes.
    fn process_count(&self) -> usize;
}

impl SimRepository for Supervisor {
    fn launch(&self, client_id: &str, config: &Value) -> Result<LaunchOutput, SimError> {
        Supervisor::launch(self, client_id, config)
    }

    fn terminate(&self, pid: u32) -> bool {
        Supervisor::terminate(self, pid)
    }

    fn terminate_for_client(&self, client_id: &str) -> Option<u32> {
        Supervisor::terminate_for_client(self, client_id)
    }

    fn status(&self, pid: u32) -> SimStatus {
        Supervisor::status(self, pid)
    }

    fn command(&self, pid: u32, command: &str, params: &Value) -> bool {
        Supervisor::command(self, pid, command, params)
    }

    fn list(&self) -> Vec<SimInfo> {
        Supervisor::list(self)
    }

    fn process_count(&self) -> usize {
        Supervisor::process_count(self)
    }
}
