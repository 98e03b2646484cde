//! Interactive tools exposed via Model Context Protocol
//!
//! `list_resources`, `get_resource_logs` and `execute_resource_command` delegate to the
//! `QueryFacade`; `echo` and `reverse_echo` are connectivity checks that need no provider.

use chrono::{SecondsFormat, Utc};
use rust_mcp_sdk::{
    macros,
    schema::{CallToolRequestParams, CallToolResult, ContentBlock, TextContent, Tool},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

use crate::mcp::rpc::{
    error_data, json_rpc_error, json_rpc_error_with_data, json_rpc_typed_result, INVALID_PARAMS,
    METHOD_NOT_FOUND,
};
use crate::provider::CommandOutcome;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogsParams {
    pub resource_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommandParams {
    pub resource_id: Option<String>,
    pub command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EchoParams {
    pub message: Option<String>,
}

#[macros::mcp_tool(
    name = "list_resources",
    description = "List all resources with their type, state, log availability and enabled commands"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct ListResourcesTool {}

#[macros::mcp_tool(
    name = "get_resource_logs",
    description = "Get up to the first 100 console log lines of a resource, waiting at most 5 seconds"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetResourceLogsTool {
    /// Name of the resource, as shown by list_resources
    pub resource_name: String,
}

#[macros::mcp_tool(
    name = "execute_resource_command",
    description = "Execute a command (Start, Stop, or Restart) on a resource"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct ExecuteResourceCommandTool {
    /// The ID of the resource to manage
    pub resource_id: String,
    /// The command to execute: Start, Stop, or Restart
    pub command: String,
}

#[macros::mcp_tool(name = "echo", description = "Echoes the message back to the client")]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct EchoTool {
    pub message: String,
}

#[macros::mcp_tool(
    name = "reverse_echo",
    description = "Echoes in reverse the message sent by the client"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct ReverseEchoTool {
    pub message: String,
}

pub fn build_tools_list() -> Vec<Tool> {
    vec![
        ListResourcesTool::tool(),
        GetResourceLogsTool::tool(),
        ExecuteResourceCommandTool::tool(),
        EchoTool::tool(),
        ReverseEchoTool::tool(),
    ]
}

pub fn echo(message: &str) -> String {
    format!("Hello from Rust: {message}")
}

pub fn reverse_echo(message: &str) -> String {
    message.chars().rev().collect()
}

fn text_result(
    id: Option<Value>,
    text: String,
    structured_content: Option<Map<String, Value>>,
    is_error: bool,
) -> Value {
    json_rpc_typed_result(
        id,
        &CallToolResult {
            content: vec![ContentBlock::from(TextContent::new(text, None, None))],
            is_error: is_error.then_some(true),
            meta: None,
            structured_content,
        },
    )
}

fn parse_arguments<T: for<'de> Deserialize<'de>>(
    arguments: Option<Map<String, Value>>,
) -> Option<T> {
    serde_json::from_value(Value::Object(arguments.unwrap_or_default())).ok()
}

pub async fn handle_tools_call(
    state: &AppState,
    id: Option<Value>,
    params: Option<Value>,
    cancel: &CancellationToken,
) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };

    let tool_call: CallToolRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    match tool_call.name.as_str() {
        "list_resources" => {
            let text = state.adapter.list_resources(cancel).await;
            let generated_at_utc = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

            text_result(
                id,
                text,
                Some(Map::from_iter([
                    ("available".to_string(), json!(state.adapter.is_available())),
                    ("generated_at_utc".to_string(), json!(generated_at_utc)),
                ])),
                false,
            )
        }
        "get_resource_logs" => {
            let Some(query) = parse_arguments::<LogsParams>(tool_call.arguments) else {
                return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
            };

            let resource_name = query.resource_name.unwrap_or_default();
            let text = state.adapter.get_logs(&resource_name, cancel).await;
            text_result(id, text, None, false)
        }
        "execute_resource_command" => {
            let Some(query) = parse_arguments::<CommandParams>(tool_call.arguments) else {
                return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
            };

            let resource_id = query.resource_id.unwrap_or_default();
            let command = query.command.unwrap_or_default();
            let response = state
                .adapter
                .execute_command(&resource_id, &command, cancel)
                .await;

            let is_error = !matches!(
                response.outcome,
                Some(CommandOutcome::Succeeded | CommandOutcome::Cancelled)
            );

            text_result(
                id,
                response.text,
                Some(Map::from_iter([
                    ("resource_id".to_string(), json!(resource_id.trim())),
                    ("command".to_string(), json!(command)),
                    ("outcome".to_string(), json!(response.outcome)),
                ])),
                is_error,
            )
        }
        "echo" | "reverse_echo" => {
            let Some(query) = parse_arguments::<EchoParams>(tool_call.arguments) else {
                return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
            };

            let message = query.message.unwrap_or_default();
            let text = if tool_call.name == "echo" {
                echo(&message)
            } else {
                reverse_echo(&message)
            };
            text_result(id, text, None, false)
        }
        _ => json_rpc_error_with_data(
            id,
            METHOD_NOT_FOUND,
            "Method not found",
            Some(error_data(
                "tool_not_found",
                "unknown tool name",
                json!({ "name": tool_call.name }),
            )),
        ),
    }
}
