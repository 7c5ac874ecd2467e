use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{Connector, ConnectorError};
use rmcp::model::*;

/// MCP server wrapping a single connector.
pub struct McpServer {
    connector: Arc<dyn Connector>,
}

impl McpServer {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    pub async fn handle_initialize(
        &self,
        request: InitializeRequestParam,
    ) -> Result<InitializeResult, ConnectorError> {
        info!(
            client = %request.client_info.name,
            version = %request.client_info.version,
            "Client connected"
        );
        self.connector.initialize(request).await
    }

    pub async fn handle_list_resources(
        &self,
        request: Option<PaginatedRequestParam>,
    ) -> Result<ListResourcesResult, ConnectorError> {
        self.connector.list_resources(request).await
    }

    pub async fn handle_list_tools(
        &self,
        request: Option<PaginatedRequestParam>,
    ) -> Result<ListToolsResult, ConnectorError> {
        self.connector.list_tools(request).await
    }

    pub async fn handle_call_tool(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, ConnectorError> {
        let name = request.name.to_string();
        let result = self.connector.call_tool(request).await;
        match &result {
            Ok(r) if r.is_error == Some(true) => warn!(tool = %name, "Tool reported an error"),
            Ok(_) => debug!(tool = %name, "Tool call succeeded"),
            Err(e) => warn!(tool = %name, error = %e, "Tool call failed"),
        }
        result
    }

    pub async fn handle_list_prompts(
        &self,
        request: Option<PaginatedRequestParam>,
    ) -> Result<ListPromptsResult, ConnectorError> {
        self.connector.list_prompts(request).await
    }
}

/// JSON-RPC 2.0 dispatcher for [`McpServer`].
pub struct JsonRpcHandler {
    server: McpServer,
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, Value> {
    serde_json::from_value(params)
        .map_err(|e| ConnectorError::InvalidParams(format!("Invalid params: {}", e)).to_jsonrpc_error())
}

fn to_result<T: Serialize>(result: Result<T, ConnectorError>) -> Result<Value, Value> {
    result
        .and_then(|r| serde_json::to_value(r).map_err(ConnectorError::SerdeJson))
        .map_err(|e| e.to_jsonrpc_error())
}

impl JsonRpcHandler {
    pub fn new(server: McpServer) -> Self {
        Self { server }
    }

    /// Process a JSON-RPC message. Notifications (no `id`) yield `None`.
    pub async fn handle_request(&self, request: Value) -> Option<Value> {
        debug!("Handling JSON-RPC request: {:?}", request);

        let id = request.get("id").cloned();
        let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
        let params = match request.get("params") {
            Some(Value::Null) | None => json!({}),
            Some(p) => p.clone(),
        };

        if id.is_none() {
            debug!(method, "Notification received");
            return None;
        }

        let result = match method {
            "initialize" => match parse_params::<InitializeRequestParam>(params) {
                Ok(req) => to_result(self.server.handle_initialize(req).await),
                Err(e) => Err(e),
            },
            "ping" => Ok(json!({})),
            "tools/list" => match parse_params::<Option<PaginatedRequestParam>>(params) {
                Ok(req) => to_result(self.server.handle_list_tools(req).await),
                Err(e) => Err(e),
            },
            "tools/call" => match parse_params::<CallToolRequestParam>(params) {
                Ok(req) => to_result(self.server.handle_call_tool(req).await),
                Err(e) => Err(e),
            },
            "resources/list" => match parse_params::<Option<PaginatedRequestParam>>(params) {
                Ok(req) => to_result(self.server.handle_list_resources(req).await),
                Err(e) => Err(e),
            },
            "prompts/list" => match parse_params::<Option<PaginatedRequestParam>>(params) {
                Ok(req) => to_result(self.server.handle_list_prompts(req).await),
                Err(e) => Err(e),
            },
            _ => Err(ConnectorError::MethodNotFound.to_jsonrpc_error()),
        };

        Some(match result {
            Ok(result) => json!({
                "jsonrpc": "2.0",
                "result": result,
                "id": id,
            }),
            Err(error) => json!({
                "jsonrpc": "2.0",
                "error": error,
                "id": id,
            }),
        })
    }
}
