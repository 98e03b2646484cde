//! JSON-RPC protocol representations and formatting utilities
//!
//! Maps transport-level `AppError`s to JSON-RPC payloads and wraps SDK result types.

use rust_mcp_sdk::schema::{
    JsonrpcErrorResponse, JsonrpcResultResponse, RequestId, Result as McpResult, RpcError,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::AppError;

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const UNAUTHORIZED: i32 = -32001;
pub const FORBIDDEN: i32 = -32003;

pub fn is_json_rpc_error(value: &Value) -> bool {
    value.get("error").is_some()
}

pub fn app_error_to_json_rpc(id: Option<Value>, err: AppError) -> Value {
    match err {
        AppError::BadRequest { code, message } => json_rpc_error_with_data(
            id,
            INVALID_PARAMS,
            "Invalid params",
            Some(error_data(code, message, json!({}))),
        ),
        AppError::Unauthorized { code, message } => json_rpc_error_with_data(
            id,
            UNAUTHORIZED,
            "Unauthorized",
            Some(error_data(code, message, json!({}))),
        ),
        AppError::Forbidden { code, message } => json_rpc_error_with_data(
            id,
            FORBIDDEN,
            "Forbidden",
            Some(error_data(code, message, json!({}))),
        ),
        AppError::Internal { message, .. } => {
            tracing::error!(error = %message, "json-rpc request failed with internal error");
            json_rpc_error(id, INTERNAL_ERROR, "Internal error")
        }
    }
}

pub fn error_data(code: &str, message: &str, details: Value) -> Value {
    json!({
        "code": code,
        "message": message,
        "details": details,
    })
}

pub fn json_rpc_error(id: Option<Value>, code: i32, message: &str) -> Value {
    json_rpc_error_with_data(id, code, message, None)
}

pub fn json_rpc_error_with_data(
    id: Option<Value>,
    code: i32,
    message: &str,
    data: Option<Value>,
) -> Value {
    let response = JsonrpcErrorResponse::new(
        RpcError {
            code: i64::from(code),
            data,
            message: message.to_string(),
        },
        id.as_ref().and_then(value_to_request_id),
    );
    serde_json::to_value(response).expect("jsonrpc error response serialization")
}

pub fn json_rpc_result(id: Option<Value>, result: Value) -> Value {
    if let Some(request_id) = id.as_ref().and_then(value_to_request_id) {
        let extra = result.as_object().cloned();
        let response = JsonrpcResultResponse::new(request_id, McpResult { meta: None, extra });
        return serde_json::to_value(response).expect("jsonrpc result response serialization");
    }

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

/// Serializes an SDK result type into a JSON-RPC result envelope.
pub fn json_rpc_typed_result<T: Serialize>(id: Option<Value>, result: &T) -> Value {
    match serde_json::to_value(result) {
        Ok(value) => json_rpc_result(id, value),
        Err(err) => app_error_to_json_rpc(
            id,
            AppError::internal(format!("failed to serialize result: {err}")),
        ),
    }
}

pub fn value_to_request_id(value: &Value) -> Option<RequestId> {
    if let Some(string_id) = value.as_str() {
        return Some(RequestId::String(string_id.to_string()));
    }

    value.as_i64().map(RequestId::Integer)
}

pub fn request_id_to_value(id: RequestId) -> Value {
    match id {
        RequestId::String(value) => Value::String(value),
        RequestId::Integer(value) => Value::Number(value.into()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bad_request_maps_to_invalid_params_with_data() {
        let value = app_error_to_json_rpc(
            Some(json!(4)),
            AppError::bad_request("invalid_resource_uri", "bad uri"),
        );

        assert_eq!(value["error"]["code"], INVALID_PARAMS);
        assert_eq!(value["error"]["data"]["code"], "invalid_resource_uri");
        assert_eq!(value["id"], 4);
    }

    #[test]
    fn forbidden_is_distinct_from_unauthorized() {
        let forbidden = app_error_to_json_rpc(
            Some(json!(1)),
            AppError::forbidden("address_not_allowed", "client address is not allowed"),
        );
        let unauthorized = app_error_to_json_rpc(
            Some(json!(2)),
            AppError::unauthorized("invalid_token", "invalid bearer token"),
        );

        assert_eq!(forbidden["error"]["code"], FORBIDDEN);
        assert_eq!(forbidden["error"]["message"], "Forbidden");
        assert_eq!(forbidden["error"]["data"]["code"], "address_not_allowed");
        assert_eq!(unauthorized["error"]["code"], UNAUTHORIZED);
        assert_eq!(unauthorized["error"]["message"], "Unauthorized");
    }

    #[test]
    fn internal_error_hides_message() {
        let value = app_error_to_json_rpc(Some(json!("a")), AppError::internal("secret detail"));

        assert_eq!(value["error"]["code"], INTERNAL_ERROR);
        assert_eq!(value["error"]["message"], "Internal error");
        assert!(value["error"].get("data").is_none());
    }

    #[test]
    fn request_ids_round_trip_through_values() {
        let id = value_to_request_id(&json!("req-1")).expect("string id");
        assert_eq!(request_id_to_value(id), json!("req-1"));

        assert!(value_to_request_id(&json!(1.5)).is_none());
    }
}
