use dendrite_ipc::error_codes;
use dendrite_ipc::{RpcRequest, RpcResponse};
use serde_json::Value;
use serde_json::json;

use crate::domain::SimStatus;
use crate::handlers::sim_error_response;
use crate::usecases::{
    CommandUseCase, LaunchUseCase, SimsUseCase, StatusUseCase, TerminateUseCase,
};

pub fn handle_launch<U: LaunchUseCase>(usecase: &U, request: RpcRequest) -> RpcResponse {
    let client_id = match request.require_str("client_id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let config = request.param_value("config").cloned().unwrap_or(Value::Null);

    match usecase.execute(client_id, &config) {
        Ok(out) => RpcResponse::success(
            request.id,
            json!({
                "pid": out.pid,
                "data_channel_id": out.data_channel_id,
                "artifact": out.artifact,
            }),
        ),
        Err(e) => sim_error_response(request.id, &e),
    }
}

pub fn handle_terminate<U: TerminateUseCase>(usecase: &U, request: RpcRequest) -> RpcResponse {
    let pid = match request.require_u32("pid") {
        Ok(pid) => pid,
        Err(resp) => return resp,
    };

    let terminated = usecase.execute(pid);
    RpcResponse::success(request.id, json!({ "terminated": terminated, "pid": pid }))
}

pub fn handle_status<U: StatusUseCase>(usecase: &U, request: RpcRequest) -> RpcResponse {
    let pid = match request.require_u32("pid") {
        Ok(pid) => pid,
        Err(resp) => return resp,
    };

    match usecase.execute(pid) {
        SimStatus::NotFound => RpcResponse::error(
            request.id,
            error_codes::SIM_NOT_FOUND,
            &format!("PID not found: {}", pid),
        ),
        status => RpcResponse::success(
            request.id,
            json!({ "status": status.as_str(), "pid": pid }),
        ),
    }
}

/// Command relay is fire-and-forget: a miss (unknown pid, exited
/// process) is reported in the result, never as an error.
pub fn handle_command<U: CommandUseCase>(usecase: &U, request: RpcRequest) -> RpcResponse {
    let pid = match request.require_u32("pid") {
        Ok(pid) => pid,
        Err(resp) => return resp,
    };
    let command = match request.require_str("command") {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let params = request
        .param_value("params")
        .cloned()
        .unwrap_or_else(|| json!({}));

    let delivered = usecase.execute(pid, command, &params);
    RpcResponse::success(request.id, json!({ "delivered": delivered }))
}

pub fn handle_sims<U: SimsUseCase>(usecase: &U, request: RpcRequest) -> RpcResponse {
    let sims = usecase.execute();
    let count = sims.len();
    RpcResponse::success(
        request.id,
        json!({ "sims": sims, "count": count }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use crate::test_support::MockSimRepository;
    use crate::usecases::{
        CommandUseCaseImpl, LaunchUseCaseImpl, StatusUseCaseImpl, TerminateUseCaseImpl,
    };
    use std::sync::Arc;

    fn request(method: &str, params: Value) -> RpcRequest {
        serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        }))
        .unwrap()
    }

    fn to_value(resp: RpcResponse) -> Value {
        serde_json::to_value(resp).unwrap()
    }

    #[test]
    fn test_launch_success_payload() {
        let repo = Arc::new(MockSimRepository::new());
        let usecase = LaunchUseCaseImpl::new(repo);

        let resp = handle_launch(
            &usecase,
            request("launch", json!({ "client_id": "u1", "config": {"steps": 10} })),
        );
        let value = to_value(resp);
        assert_eq!(value["result"]["pid"], 1234);
        assert_eq!(value["result"]["data_channel_id"], "ch-1");
        assert_eq!(value["result"]["artifact"], "plot.svg");
    }

    #[test]
    fn test_launch_missing_client_id() {
        let repo = Arc::new(MockSimRepository::new());
        let usecase = LaunchUseCaseImpl::new(Arc::clone(&repo));

        let resp = handle_launch(&usecase, request("launch", json!({ "config": {"a": 1} })));
        let value = to_value(resp);
        assert_eq!(value["error"]["code"], error_codes::INVALID_REQUEST);
        assert_eq!(repo.launch_call_count(), 0);
    }

    #[test]
    fn test_launch_error_carries_context() {
        let repo =
            Arc::new(MockSimRepository::new().with_launch_err(SimError::invalid("config")));
        let usecase = LaunchUseCaseImpl::new(repo);

        let resp = handle_launch(
            &usecase,
            request("launch", json!({ "client_id": "u1" })),
        );
        let value = to_value(resp);
        assert_eq!(value["error"]["code"], error_codes::INVALID_REQUEST);
        assert_eq!(value["error"]["data"]["category"], "invalid_input");
        assert_eq!(value["error"]["data"]["context"]["field"], "config");
    }

    #[test]
    fn test_terminate_reports_bool() {
        let repo = Arc::new(MockSimRepository::new().with_terminate_results([true, false]));
        let usecase = TerminateUseCaseImpl::new(repo);

        let first = to_value(handle_terminate(
            &usecase,
            request("terminate", json!({ "pid": 9 })),
        ));
        assert_eq!(first["result"]["terminated"], true);

        let second = to_value(handle_terminate(
            &usecase,
            request("terminate", json!({ "pid": 9 })),
        ));
        assert_eq!(second["result"]["terminated"], false);
    }

    #[test]
    fn test_status_not_found_is_an_error() {
        let repo = Arc::new(MockSimRepository::new().with_status(SimStatus::NotFound));
        let usecase = StatusUseCaseImpl::new(repo);

        let value = to_value(handle_status(&usecase, request("status", json!({ "pid": 9 }))));
        assert_eq!(value["error"]["code"], error_codes::SIM_NOT_FOUND);
    }

    #[test]
    fn test_status_running() {
        let repo = Arc::new(MockSimRepository::new().with_status(SimStatus::Running));
        let usecase = StatusUseCaseImpl::new(repo);

        let value = to_value(handle_status(&usecase, request("status", json!({ "pid": 9 }))));
        assert_eq!(value["result"]["status"], "running");
    }

    #[test]
    fn test_command_defaults_params_and_reports_drop() {
        let repo = Arc::new(MockSimRepository::new().with_command_result(false));
        let usecase = CommandUseCaseImpl::new(Arc::clone(&repo));

        let value = to_value(handle_command(
            &usecase,
            request("sim_command", json!({ "pid": 9, "command": "pause" })),
        ));
        // A dropped command is still a successful response.
        assert_eq!(value["result"]["delivered"], false);
        assert!(value.get("error").is_none());
        assert_eq!(repo.commands(), vec![(9, "pause".to_string(), json!({}))]);
    }
}
