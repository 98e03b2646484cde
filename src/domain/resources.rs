//! Model Context Protocol resources
//!
//! A fixed listing resource plus a console logs template keyed by resource name. Both read
//! through the `QueryFacade`, so reading them never fails for adapter reasons.

use rust_mcp_sdk::schema::{
    ReadResourceContent, ReadResourceRequestParams, ReadResourceResult, Resource,
    TextResourceContents,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::domain::utils::console_logs_resource_name;
use crate::mcp::rpc::{
    app_error_to_json_rpc, error_data, json_rpc_error, json_rpc_error_with_data,
    json_rpc_typed_result, INVALID_PARAMS, METHOD_NOT_FOUND,
};
use crate::AppState;

pub const APPHOST_RESOURCES_URI: &str = "resource://apphost/resources";
pub const CONSOLE_LOGS_URI_TEMPLATE: &str = "resource://console_logs/{resourceName}";

pub fn build_resources_list() -> Vec<Resource> {
    vec![Resource {
        annotations: None,
        description: Some("List all resources in the AppHost".to_string()),
        icons: vec![],
        meta: None,
        mime_type: Some("text/plain".to_string()),
        name: "apphost_resources".to_string(),
        size: None,
        title: None,
        uri: APPHOST_RESOURCES_URI.to_string(),
    }]
}

pub fn build_resource_templates_list() -> Vec<Value> {
    vec![json!({
        "uriTemplate": CONSOLE_LOGS_URI_TEMPLATE,
        "name": "console_logs",
        "description": "Get console logs for a specific AppHost resource",
        "mimeType": "text/plain",
    })]
}

fn text_contents(id: Option<Value>, uri: String, text: String) -> Value {
    json_rpc_typed_result(
        id,
        &ReadResourceResult {
            contents: vec![ReadResourceContent::from(TextResourceContents {
                meta: None,
                mime_type: Some("text/plain".to_string()),
                text,
                uri,
            })],
            meta: None,
        },
    )
}

pub async fn handle_resources_read(
    state: &AppState,
    id: Option<Value>,
    params: Option<Value>,
    cancel: &CancellationToken,
) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
    };

    let resource_read: ReadResourceRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
    };

    if resource_read.uri == APPHOST_RESOURCES_URI {
        let text = state.adapter.list_resources(cancel).await;
        return text_contents(id, resource_read.uri, text);
    }

    match console_logs_resource_name(&resource_read.uri) {
        Some(Ok(resource_name)) => {
            let text = state.adapter.get_logs(&resource_name, cancel).await;
            text_contents(id, resource_read.uri, text)
        }
        Some(Err(err)) => app_error_to_json_rpc(id, err),
        None => json_rpc_error_with_data(
            id,
            METHOD_NOT_FOUND,
            "Method not found",
            Some(error_data(
                "resource_not_found",
                "unknown resource uri",
                json!({
                    "uri": resource_read.uri,
                    "templates": [CONSOLE_LOGS_URI_TEMPLATE],
                }),
            )),
        ),
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::utils::CONSOLE_LOGS_URI_PREFIX;

    use super::*;

    #[test]
    fn template_matches_the_uri_prefix() {
        assert!(CONSOLE_LOGS_URI_TEMPLATE.starts_with(CONSOLE_LOGS_URI_PREFIX));
        assert_eq!(
            build_resource_templates_list()[0]["uriTemplate"],
            CONSOLE_LOGS_URI_TEMPLATE
        );
    }

    #[test]
    fn resources_list_exposes_the_listing() {
        let resources = build_resources_list();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].uri, APPHOST_RESOURCES_URI);
    }
}
