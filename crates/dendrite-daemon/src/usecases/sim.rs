use std::sync::Arc;

use serde_json::Value;

use crate::domain::{LaunchOutput, SimInfo, SimStatus};
use crate::error::SimError;
use crate::repository::SimRepository;

/// Use case for launching a simulation.
pub trait LaunchUseCase: Send + Sync {
    fn execute(&self, client_id: &str, config: &Value) -> Result<LaunchOutput, SimError>;
}

pub struct LaunchUseCaseImpl<R: SimRepository> {
    repository: Arc<R>,
}

impl<R: SimRepository> LaunchUseCaseImpl<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: SimRepository> LaunchUseCase for LaunchUseCaseImpl<R> {
    fn execute(&self, client_id: &str, config: &Value) -> Result<LaunchOutput, SimError> {
        self.repository.launch(client_id, config)
    }
}

/// Use case for terminating a simulation by pid.
pub trait TerminateUseCase: Send + Sync {
    fn execute(&self, pid: u32) -> bool;
}

pub struct TerminateUseCaseImpl<R: SimRepository> {
    repository: Arc<R>,
}

impl<R: SimRepository> TerminateUseCaseImpl<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: SimRepository> TerminateUseCase for TerminateUseCaseImpl<R> {
    fn execute(&self, pid: u32) -> bool {
        self.repository.terminate(pid)
    }
}

/// Use case for polling a simulation's status.
pub trait StatusUseCase: Send + Sync {
    fn execute(&self, pid: u32) -> SimStatus;
}

pub struct StatusUseCaseImpl<R: SimRepository> {
    repository: Arc<R>,
}

impl<R: SimRepository> StatusUseCaseImpl<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: SimRepository> StatusUseCase for StatusUseCaseImpl<R> {
    fn execute(&self, pid: u32) -> SimStatus {
        self.repository.status(pid)
    }
}

/// Use case for relaying an interactive command to a running process.
pub trait CommandUseCase: Send + Sync {
    fn execute(&self, pid: u32, command: &str, params: &Value) -> bool;
}

pub struct CommandUseCaseImpl<R: SimRepository> {
    repository: Arc<R>,
}

impl<R: SimRepository> CommandUseCaseImpl<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: SimRepository> CommandUseCase for CommandUseCaseImpl<R> {
    fn execute(&self, pid: u32, command: &str, params: &Value) -> bool {
        self.repository.command(pid, command, params)
    }
}

/// Use case for listing registered simulations.
pub trait SimsUseCase: Send + Sync {
    fn execute(&self) -> Vec<SimInfo>;
}

pub struct SimsUseCaseImpl<R: SimRepository> {
    repository: Arc<R>,
}

impl<R: SimRepository> SimsUseCaseImpl<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

impl<R: SimRepository> SimsUseCase for SimsUseCaseImpl<R> {
    fn execute(&self) -> Vec<SimInfo> {
        self.repository.list()
    }
}
