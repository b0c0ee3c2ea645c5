//! Process-control errors with structured context.
//!
//! These carry the failing operation and OS reason so the daemon can map
//! them onto RPC error responses without string-matching.

use dendrite_common::error_codes::{self, ErrorCategory};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcError {
    #[error("Failed to spawn process: {0}")]
    Spawn(String),
    #[error("Failed to signal process {pid}: {reason}")]
    Signal { pid: u32, reason: String },
    #[error("Failed to write to process stdin: {0}")]
    Stdin(String),
    #[error("Failed to poll process status: {0}")]
    Wait(String),
}

impl ProcError {
    pub fn code(&self) -> i32 {
        match self {
            ProcError::Spawn(_) => error_codes::LAUNCH_FAILURE,
            _ => error_codes::PROCESS_ERROR,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::External
    }

    pub fn context(&self) -> Value {
        match self {
            ProcError::Spawn(reason) => json!({ "operation": "spawn", "reason": reason }),
            ProcError::Signal { pid, reason } => {
                json!({ "operation": "signal", "pid": pid, "reason": reason })
            }
            ProcError::Stdin(reason) => json!({ "operation": "stdin", "reason": reason }),
            ProcError::Wait(reason) => json!({ "operation": "wait", "reason": reason }),
        }
    }

    pub fn suggestion(&self) -> String {
        match self {
            ProcError::Spawn(reason) => {
                if reason.contains("No such file") || reason.contains("not found") {
                    "Simulator executable not found. Check DENDRITE_SIM_CMD and PATH.".to_string()
                } else if reason.contains("Permission denied") {
                    "Simulator executable is not runnable. Check file permissions.".to_string()
                } else {
                    "Process spawn failed. Check the simulator command and its arguments."
                        .to_string()
                }
            }
            ProcError::Signal { .. } => {
                "The process may already have exited. Check its status.".to_string()
            }
            ProcError::Stdin(_) => {
                "The simulation may have exited; commands to dead processes are dropped."
                    .to_string()
            }
            ProcError::Wait(_) => "Status polling failed. Retry the status request.".to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ProcError::Wait(_))
    }
}
