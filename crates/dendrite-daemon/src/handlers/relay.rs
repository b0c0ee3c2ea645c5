use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use dendrite_ipc::{RpcRequest, RpcResponse};
use serde_json::json;

use crate::handlers::sim_error_response;
use crate::usecases::{FetchArtifactUseCase, PushUseCase};

/// The internal push endpoint. Zero subscribers is success: publish is
/// fire-and-forget by design.
pub fn handle_push<U: PushUseCase>(usecase: &U, request: RpcRequest) -> RpcResponse {
    let channel = match request.require_str("data_channel_id") {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let payload = match request.param_value("payload") {
        Some(p) => p.clone(),
        None => {
            return RpcResponse::error(
                request.id,
                dendrite_ipc::error_codes::INVALID_REQUEST,
                "Missing 'payload' param",
            );
        }
    };

    let delivered = usecase.execute(channel, payload);
    RpcResponse::success(
        request.id,
        json!({ "status": "success", "delivered": delivered }),
    )
}

pub fn handle_fetch_artifact<U: FetchArtifactUseCase>(
    usecase: &U,
    request: RpcRequest,
) -> RpcResponse {
    let client_id = match request.require_str("client_id") {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let filename = match request.require_str("filename") {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    match usecase.execute(client_id, filename) {
        Ok(bytes) => RpcResponse::success(
            request.id,
            json!({
                "filename": filename,
                "content_base64": BASE64.encode(bytes),
            }),
        ),
        Err(e) => sim_error_response(request.id, &e),
    }
}
