// src/lib.rs
pub mod config;
pub mod connectors;
pub mod error;
pub mod logging;
pub mod markdown;
pub mod mcp_server;
pub mod transport;
use std::sync::Arc;

// Re-export types from rmcp that users of the library need
pub use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, InitializeRequestParam,
    InitializeResult, ListPromptsResult, ListResourcesResult, ListToolsResult,
    PaginatedRequestParam, Prompt, ProtocolVersion, RawContent, ReadResourceRequestParam,
    ResourceContents, ServerCapabilities, Tool,
};

use crate::config::NotesConfig;
use crate::connectors::apple_notes::AppleNotesConnector;
pub use crate::error::ConnectorError;
use async_trait::async_trait;

#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns the unique name of the connector (acting as the MCP server name).
    fn name(&self) -> &'static str;

    /// Returns a description of the connector.
    fn description(&self) -> &'static str;

    /// Returns the MCP capabilities of this connector.
    async fn capabilities(&self) -> ServerCapabilities;

    /// Verify the backends are reachable (automation permission, database).
    async fn check_access(&self) -> Result<(), ConnectorError>;

    // --- MCP Request Handlers ---
    async fn initialize(
        &self,
        request: InitializeRequestParam,
    ) -> Result<InitializeResult, ConnectorError>;
    async fn list_resources(
        &self,
        request: Option<PaginatedRequestParam>,
    ) -> Result<ListResourcesResult, ConnectorError>;
    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
    ) -> Result<Vec<ResourceContents>, ConnectorError>;
    async fn list_tools(
        &self,
        request: Option<PaginatedRequestParam>,
    ) -> Result<ListToolsResult, ConnectorError>;
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, ConnectorError>;
    async fn list_prompts(
        &self,
        request: Option<PaginatedRequestParam>,
    ) -> Result<ListPromptsResult, ConnectorError>;
    async fn get_prompt(&self, name: &str) -> Result<Prompt, ConnectorError>;
}

/// Build the Apple Notes connector for `config`.
pub fn build_connector(config: &NotesConfig) -> Arc<dyn Connector> {
    Arc::new(AppleNotesConnector::new(config))
}
