//! RPC handlers: thin coordinators between the wire protocol and the
//! use cases. Each handler parses params, delegates, and adapts the
//! outcome to an `RpcResponse`.

pub mod relay;
pub mod sim;

use dendrite_ipc::RpcResponse;
use serde_json::json;

use crate::error::SimError;

/// Adapt a domain error to an error response with structured context.
pub fn sim_error_response(id: u64, err: &SimError) -> RpcResponse {
    RpcResponse::error_with_data(
        id,
        err.code(),
        &err.to_string(),
        json!({
            "category": err.category().as_str(),
            "context": err.context(),
            "suggestion": err.suggestion(),
            "retryable": err.is_retryable(),
        }),
    )
}
