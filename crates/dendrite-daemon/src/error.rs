//! Domain errors for daemon operations.
//!
//! Each error maps to a JSON-RPC error code and carries structured
//! context so clients can handle failures programmatically.

use dendrite_ipc::error_codes::{self, ErrorCategory};
use dendrite_proc::ProcError;
use serde_json::{Value, json};
use thiserror::Error;

/// Simulation-level errors surfaced through the RPC layer.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Missing or invalid '{field}'")]
    InvalidRequest { field: String },
    #[error("PID not found: {0}")]
    NotFound(u32),
    #[error("Process error: {0}")]
    Process(#[from] ProcError),
    #[error("Session store error during {operation}: {reason}")]
    Session { operation: String, reason: String },
    #[error("Artifact '{filename}' not found for client {client_id}")]
    ArtifactNotFound { client_id: String, filename: String },
}

impl SimError {
    pub fn invalid(field: impl Into<String>) -> Self {
        SimError::InvalidRequest {
            field: field.into(),
        }
    }

    pub fn session(operation: impl Into<String>, e: std::io::Error) -> Self {
        SimError::Session {
            operation: operation.into(),
            reason: e.to_string(),
        }
    }

    /// Returns the JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            SimError::InvalidRequest { .. } => error_codes::INVALID_REQUEST,
            SimError::NotFound(_) => error_codes::SIM_NOT_FOUND,
            SimError::Process(e) => e.code(),
            SimError::Session { .. } => error_codes::SESSION_IO,
            SimError::ArtifactNotFound { .. } => error_codes::ARTIFACT_NOT_FOUND,
        }
    }

    /// Returns the error category for programmatic handling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            SimError::Process(e) => e.category(),
            _ => error_codes::category_for_code(self.code()),
        }
    }

    /// Returns structured context about the error for debugging.
    pub fn context(&self) -> Value {
        match self {
            SimError::InvalidRequest { field } => json!({ "field": field }),
            SimError::NotFound(pid) => json!({ "pid": pid }),
            SimError::Process(e) => e.context(),
            SimError::Session { operation, reason } => {
                json!({ "operation": operation, "reason": reason })
            }
            SimError::ArtifactNotFound {
                client_id,
                filename,
            } => json!({ "client_id": client_id, "filename": filename }),
        }
    }

    /// Returns a helpful suggestion for resolving the error.
    pub fn suggestion(&self) -> String {
        match self {
            SimError::InvalidRequest { field } => {
                format!("Provide a non-empty '{}' in the request params.", field)
            }
            SimError::NotFound(_) => {
                "The simulation may have been terminated or preempted. Launch again.".to_string()
            }
            SimError::Process(e) => e.suggestion(),
            SimError::Session { .. } => {
                "Check that the data directory exists and is writable.".to_string()
            }
            SimError::ArtifactNotFound { .. } => {
                "The simulation may not have finished. Poll status until 'completed'.".to_string()
            }
        }
    }

    /// Returns whether this error is potentially transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            SimError::Process(e) => e.is_retryable(),
            _ => error_codes::is_retryable(self.code()),
        }
    }
}

/// Daemon startup and lifecycle errors.
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Failed to bind socket: {0}")]
    SocketBind(String),
    #[error("Another daemon instance is already running")]
    AlreadyRunning,
    #[error("Failed to setup signal handler: {0}")]
    SignalSetup(String),
    #[error("Failed to create thread pool: {0}")]
    ThreadPool(String),
}

impl DaemonError {
    pub fn code(&self) -> i32 {
        error_codes::DAEMON_ERROR
    }

    pub fn suggestion(&self) -> String {
        match self {
            DaemonError::SocketBind(_) => {
                "Check that the socket directory is writable and no stale socket remains."
                    .to_string()
            }
            DaemonError::AlreadyRunning => {
                "Another daemon owns the socket. Stop it first or point DENDRITE_SOCKET elsewhere."
                    .to_string()
            }
            DaemonError::SignalSetup(_) => {
                "Signal handler setup failed. Check system signal configuration.".to_string()
            }
            DaemonError::ThreadPool(_) => {
                "Thread pool creation failed. Check system thread limits (ulimit -u).".to_string()
            }
        }
    }
}
